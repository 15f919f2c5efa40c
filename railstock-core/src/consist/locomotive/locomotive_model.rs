use super::*;

/// Driver and route inputs for one locomotive tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocoInputs {
    /// Throttle position, 0 to 100
    pub throttle_percent: f64,
    pub brake_controller: BrakeController,
    /// Speed of the train body, imposed by the surrounding train model
    pub train_speed: si::Velocity,
    /// Fraction of engine power lost, 0 to 1
    pub power_reduction: f64,
}

/// Diesel locomotive with one driven axle.
///
/// Engines and axle are mutually coupled: engine RPM sets the motive force on
/// the axle and axle speed sets the gearbox shaft speed. Each [Self::step]
/// breaks the loop by letting both read the other's value from the previous
/// tick.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DieselLocomotive {
    pub engines: DieselEngines,
    pub axle: Axle,
    pub brake: VacuumBrake,
    #[serde(default)]
    pub environment: Environment,
    /// Tractive force at full throttle for engines without a gearbox
    pub max_force: si::Force,
    /// Engine to rail efficiency of the (electric) transmission used by
    /// engines without a gearbox
    pub transmission_efficiency: f64,
    /// Speed below which power-limited force is evaluated as if at this speed
    pub min_power_speed: si::Velocity,
    #[serde(default)]
    pub state: DieselLocomotiveState,
    /// time step interval between saves. 1 is a good option. If None, no saving occurs.
    #[serde(default)]
    pub save_interval: Option<usize>,
    #[serde(default)]
    pub history: DieselLocomotiveStateHistoryVec,
}

impl Default for DieselLocomotive {
    fn default() -> Self {
        Self {
            engines: DieselEngines::new(vec![DieselEngine::default()]),
            axle: Axle::default(),
            brake: VacuumBrake::default(),
            environment: Environment::default(),
            max_force: 60.0 * uc::KN,
            transmission_efficiency: 0.85,
            min_power_speed: 1.0 * uc::MPS,
            state: Default::default(),
            save_interval: None,
            history: Default::default(),
        }
    }
}

impl Init for DieselLocomotive {
    fn init(&mut self) -> Result<(), Error> {
        self.engines.init()?;
        self.axle.init()?;
        self.brake.init()?;
        self.environment.init()?;
        if !(self.transmission_efficiency > 0.0 && self.transmission_efficiency <= 1.0) {
            return Err(Error::InvalidParameter(format!(
                "{}\n`transmission_efficiency` must be in (0, 1]",
                format_dbg!(self.transmission_efficiency)
            )));
        }
        ensure_positive!(self.min_power_speed.get::<si::meter_per_second>(), "min_power_speed");
        Ok(())
    }
}
impl SerdeAPI for DieselLocomotive {}

impl DieselLocomotive {
    /// Sets `save_interval` on the locomotive and all of its components
    pub fn set_save_interval(&mut self, save_interval: Option<usize>) {
        self.save_interval = save_interval;
        self.axle.save_interval = save_interval;
        self.brake.save_interval = save_interval;
        for engine in self.engines.engines.iter_mut() {
            engine.save_interval = save_interval;
            if let Some(gearbox) = engine.gearbox.as_mut() {
                gearbox.save_interval = save_interval;
            }
        }
    }

    /// Force the current engine state can put on the axle at `speed`.
    /// Engines with a gearbox use their gear's force curve; the rest share an
    /// electric transmission limited by [Self::max_force] and by power.
    pub fn tractive_force(&self, throttle_percent: f64, speed: si::Velocity) -> si::Force {
        let throttle = (throttle_percent / 100.0).clamp(0.0, 1.0);
        let mut geared_force = si::Force::ZERO;
        let mut electric_power = si::Power::ZERO;
        for engine in self.engines.iter() {
            match &engine.gearbox {
                Some(gearbox) => {
                    geared_force +=
                        gearbox.tractive_force(throttle_percent, engine.output_power(), speed)
                }
                None => electric_power += engine.output_power(),
            }
        }
        let electric_force = if electric_power > si::Power::ZERO {
            let speed = speed.abs().max(self.min_power_speed);
            (self.max_force * throttle)
                .min(electric_power * throttle * self.transmission_efficiency / speed)
        } else {
            si::Force::ZERO
        };
        geared_force + electric_force
    }

    /// Advances engines, brake, and axle by one tick. Returns the brake sound
    /// cues of this tick.
    pub fn step(
        &mut self,
        dt: si::Time,
        inputs: &LocoInputs,
    ) -> anyhow::Result<Vec<BrakeSoundEvent>> {
        self.state.i += 1;
        // previous-tick values coupling the components
        let prev_axle_speed = self.axle.axle_speed();
        let prev_tractive_force = self.state.tractive_force;
        let wheel_skid = self.axle.is_wheel_slip();

        let tractive_force = self.tractive_force(inputs.throttle_percent, prev_axle_speed);

        let engine_inputs = EngineInputs {
            throttle_percent: inputs.throttle_percent,
            motive_force: prev_tractive_force,
            speed: prev_axle_speed,
            power_reduction: inputs.power_reduction,
            ambient_temp_deg_c: self.environment.ambient_temp_deg_c,
        };
        self.engines
            .update(dt, &engine_inputs)
            .with_context(|| format_dbg!())?;

        self.brake
            .drive_pipe(dt, &inputs.brake_controller, &self.environment);
        let events = self
            .brake
            .update(dt, &inputs.brake_controller, &self.environment, wheel_skid)
            .with_context(|| format_dbg!())?;

        self.axle
            .set_adhesion_conditions(self.environment.adhesion_conditions);
        self.axle.set_train_speed(inputs.train_speed);
        self.axle.set_drive_force(tractive_force);
        self.axle.set_brake_retard_force(self.brake.brake_force());
        self.axle.update(dt).with_context(|| format_dbg!())?;

        self.state.tractive_force = tractive_force;
        self.state.brake_force = self.brake.brake_force();
        self.state.axle_force = self.axle.axle_force();
        self.state.fuel_flow = self.engines.total_fuel_flow();
        self.state.is_wheel_slip = self.axle.is_wheel_slip();
        self.save_state();
        Ok(events)
    }
}

impl_save_state!(DieselLocomotive);

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, HistoryVec)]
pub struct DieselLocomotiveState {
    /// iteration counter
    pub i: usize,
    /// force handed to the axle this tick
    pub tractive_force: si::Force,
    pub brake_force: si::Force,
    /// adhesion force at the rail
    pub axle_force: si::Force,
    pub fuel_flow: si::VolumeRate,
    pub is_wheel_slip: bool,
}

/// Persisted locomotive fields: engines, then axle, then brake
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DieselLocomotiveSnapshot {
    pub engines: Vec<DieselEngineSnapshot>,
    pub axle: AxleSnapshot,
    pub brake: VacuumBrakeSnapshot,
}

impl SaveRestore for DieselLocomotive {
    type Snapshot = DieselLocomotiveSnapshot;

    fn snapshot(&self) -> Self::Snapshot {
        DieselLocomotiveSnapshot {
            engines: self.engines.snapshot(),
            axle: self.axle.snapshot(),
            brake: self.brake.snapshot(),
        }
    }

    fn apply_snapshot(&mut self, snapshot: Self::Snapshot) -> anyhow::Result<()> {
        let (mut engines, mut axle, mut brake) =
            (self.engines.clone(), self.axle.clone(), self.brake.clone());
        engines
            .apply_snapshot(snapshot.engines)
            .with_context(|| format_dbg!())?;
        axle.apply_snapshot(snapshot.axle)
            .with_context(|| format_dbg!())?;
        brake
            .apply_snapshot(snapshot.brake)
            .with_context(|| format_dbg!())?;
        self.engines = engines;
        self.axle = axle;
        self.brake = brake;
        Ok(())
    }
}
