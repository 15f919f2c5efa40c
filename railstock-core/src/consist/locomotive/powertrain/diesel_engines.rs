use super::*;

/// Ordered set of prime movers on one locomotive.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DieselEngines {
    pub engines: Vec<DieselEngine>,
}

impl Init for DieselEngines {
    fn init(&mut self) -> Result<(), Error> {
        for engine in self.engines.iter_mut() {
            engine.init()?;
        }
        Ok(())
    }
}
impl SerdeAPI for DieselEngines {}

impl DieselEngines {
    pub fn new(engines: Vec<DieselEngine>) -> Self {
        Self { engines }
    }

    /// Builds one engine per config entry, see [DieselEngine::from_config]
    pub fn from_configs(
        configs: &[DieselEngineConfig],
        loco: &LocoEngineDefaults,
        verbose: bool,
    ) -> Self {
        Self {
            engines: configs
                .iter()
                .map(|config| DieselEngine::from_config(config, loco, verbose))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DieselEngine> {
        self.engines.iter()
    }

    pub fn engine(&self, idx: usize) -> Option<&DieselEngine> {
        self.engines.get(idx)
    }

    pub fn engine_mut(&mut self, idx: usize) -> Option<&mut DieselEngine> {
        self.engines.get_mut(idx)
    }

    fn checked_engine_mut(&mut self, idx: usize) -> anyhow::Result<&mut DieselEngine> {
        let n = self.engines.len();
        self.engines
            .get_mut(idx)
            .with_context(|| format!("{}\nengine {} out of range for {} engines", format_dbg!(), idx, n))
    }

    /// Requests start on every engine
    pub fn start_all(&mut self) {
        for engine in self.engines.iter_mut() {
            engine.start();
        }
    }

    /// Requests stop on every engine
    pub fn stop_all(&mut self) {
        for engine in self.engines.iter_mut() {
            engine.stop();
        }
    }

    /// Starts engine `idx`; `Ok(false)` if its status ignores the request
    pub fn start_engine(&mut self, idx: usize) -> anyhow::Result<bool> {
        Ok(self.checked_engine_mut(idx)?.start())
    }

    /// Stops engine `idx`; `Ok(false)` if its status ignores the request
    pub fn stop_engine(&mut self, idx: usize) -> anyhow::Result<bool> {
        Ok(self.checked_engine_mut(idx)?.stop())
    }

    /// Number of engines currently running
    pub fn num_active_engines(&self) -> usize {
        self.engines
            .iter()
            .filter(|engine| engine.status().is_running())
            .count()
    }

    /// Sum of rated power over all engines
    pub fn max_output_power(&self) -> si::Power {
        self.engines.iter().map(|engine| engine.max_power).sum()
    }

    pub fn current_output_power(&self) -> si::Power {
        self.engines.iter().map(|engine| engine.output_power()).sum()
    }

    pub fn total_fuel_flow(&self) -> si::VolumeRate {
        self.engines.iter().map(|engine| engine.fuel_flow()).sum()
    }

    /// Highest max RPM over all engines, 0 when there are none
    pub fn max_rpm(&self) -> f64 {
        self.engines
            .iter()
            .map(|engine| engine.max_rpm)
            .fold(0.0, f64::max)
    }

    pub fn any_running(&self) -> bool {
        self.engines.iter().any(|engine| engine.status().is_running())
    }

    pub fn all_stopped(&self) -> bool {
        self.engines.iter().all(|engine| engine.status().is_stopped())
    }

    pub fn has_gearbox(&self) -> bool {
        self.engines.iter().any(|engine| engine.gearbox.is_some())
    }

    /// Updates every engine with the same inputs
    pub fn update(&mut self, dt: si::Time, inputs: &EngineInputs) -> anyhow::Result<()> {
        for (idx, engine) in self.engines.iter_mut().enumerate() {
            engine
                .update(dt, inputs)
                .with_context(|| format!("{}\nengine {}", format_dbg!(), idx))?;
        }
        Ok(())
    }
}

impl SaveRestore for DieselEngines {
    type Snapshot = Vec<DieselEngineSnapshot>;

    fn snapshot(&self) -> Self::Snapshot {
        self.engines.iter().map(|engine| engine.snapshot()).collect()
    }

    fn apply_snapshot(&mut self, snapshot: Self::Snapshot) -> anyhow::Result<()> {
        if snapshot.len() != self.engines.len() {
            bail!(Error::SerdeError(format!(
                "{}\nsaved {} engines, locomotive has {}",
                format_dbg!(),
                snapshot.len(),
                self.engines.len()
            )));
        }
        // applied to a copy so a failing engine leaves the set untouched
        let mut engines = self.engines.clone();
        for (idx, (engine, engine_snapshot)) in engines.iter_mut().zip(snapshot).enumerate() {
            engine
                .apply_snapshot(engine_snapshot)
                .with_context(|| format!("{}
engine {}", format_dbg!(), idx))?;
        }
        self.engines = engines;
        Ok(())
    }
}
