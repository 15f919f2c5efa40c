use super::*;

/// Fraction of starting RPM at which a starting engine "catches"
const CATCH_FRACTION: f64 = 0.9;
/// Demanded RPM boost, relative to the confirmation RPM, while catching
const CATCH_BOOST: f64 = 1.1;
/// RPM rate (RPM/s) at which running exhaust is fully transient or fully
/// decelerating; slower changes blend with the steady exhaust
const EXHAUST_BLEND_RPM_RATE: f64 = 20.0;
/// Ambient temperature assumed before the first update
pub const DEFAULT_AMBIENT_DEG_C: f64 = 15.0;

/// Engine lifecycle. Transitions happen only through [EngineStatus::next].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, IsVariant)]
pub enum EngineStatus {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Events driving [EngineStatus] transitions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// Driver requests start
    Start,
    /// Driver requests stop
    Stop,
    /// RPM exceeded the starting confirmation RPM
    StartConfirmed,
    /// RPM reached zero
    SpunDown,
}

impl EngineStatus {
    /// Transition table; `None` means the event is ignored in this status
    pub fn next(self, event: EngineEvent) -> Option<Self> {
        use EngineEvent::*;
        use EngineStatus::*;
        match (self, event) {
            (Stopped | Stopping, Start) => Some(Starting),
            (Starting | Running, Stop) => Some(Stopping),
            (Starting, StartConfirmed) => Some(Running),
            (Stopping, SpunDown) => Some(Stopped),
            _ => None,
        }
    }
}

/// How the engine sheds heat
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, IsVariant)]
pub enum CoolingMode {
    /// Radiator only; temperature follows load unchecked
    NoCooling,
    /// Engine-driven fan, always on while running
    #[default]
    Mechanical,
    /// Thermostatic fan switching on at max temperature and off again
    /// `cooling_hysteresis_deg_c` below it
    Hysteresis,
    /// Fan effort rising linearly over the hysteresis band below max
    /// temperature
    Proportional,
}

/// Exhaust appearance parameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exhaust {
    pub initial_magnitude: f64,
    pub max_magnitude: f64,
    pub initial_particles: f64,
    pub max_particles: f64,
    /// RGBA while running steadily
    pub steady_color: [f64; 4],
    /// RGBA while accelerating or starting
    pub transient_color: [f64; 4],
    /// RGBA while decelerating or stopping
    pub decel_color: [f64; 4],
}

impl Default for Exhaust {
    fn default() -> Self {
        Self {
            initial_magnitude: 1.5,
            max_magnitude: 4.0,
            initial_particles: 10.0,
            max_particles: 40.0,
            steady_color: [0.2, 0.2, 0.2, 0.6],
            transient_color: [0.1, 0.1, 0.1, 0.9],
            decel_color: [0.5, 0.5, 0.5, 0.3],
        }
    }
}

/// Per-tick inputs shared by all engines of a locomotive
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineInputs {
    /// Throttle position, 0 to 100
    pub throttle_percent: f64,
    /// Motive force developed by the locomotive in the previous tick
    pub motive_force: si::Force,
    /// Axle speed from the previous tick, drives the gearbox shaft
    pub speed: si::Velocity,
    /// Fraction of power lost to e.g. a tripped compressor, 0 to 1
    pub power_reduction: f64,
    pub ambient_temp_deg_c: f64,
}

impl Default for EngineInputs {
    fn default() -> Self {
        Self {
            throttle_percent: 0.0,
            motive_force: si::Force::ZERO,
            speed: si::Velocity::ZERO,
            power_reduction: 0.0,
            ambient_temp_deg_c: DEFAULT_AMBIENT_DEG_C,
        }
    }
}

/// Engine description as found in vehicle content, where any field may be
/// missing. See [DieselEngine::from_config].
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DieselEngineConfig {
    pub idle_rpm: Option<f64>,
    pub max_rpm: Option<f64>,
    pub starting_rpm: Option<f64>,
    pub starting_confirmation_rpm: Option<f64>,
    pub change_up_rpmps: Option<f64>,
    pub change_down_rpmps: Option<f64>,
    pub rate_of_change_up_rpmpss: Option<f64>,
    pub rate_of_change_down_rpmpss: Option<f64>,
    pub max_power: Option<si::Power>,
    pub power_table: Option<Interpolator>,
    pub throttle_rpm_table: Option<Interpolator>,
    pub fuel_table: Option<Interpolator>,
    pub idle_fuel_lph: Option<f64>,
    pub max_fuel_lph: Option<f64>,
    pub max_temperature_deg_c: Option<f64>,
    pub temperature_time_constant: Option<si::Time>,
    pub cooling: Option<CoolingMode>,
    pub cooling_hysteresis_deg_c: Option<f64>,
    pub idle_oil_pressure_psi: Option<f64>,
    pub max_oil_pressure_psi: Option<f64>,
    pub oil_leak_psi: Option<f64>,
    pub exhaust: Option<Exhaust>,
    pub gearbox: Option<GearBox>,
}

impl Init for DieselEngineConfig {}
impl SerdeAPI for DieselEngineConfig {}

/// Locomotive-level values used when an engine's own configuration omits them
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LocoEngineDefaults {
    pub idle_rpm: Option<f64>,
    pub max_rpm: Option<f64>,
    pub change_up_rpmps: Option<f64>,
    pub change_down_rpmps: Option<f64>,
    pub max_power: Option<si::Power>,
    pub idle_fuel_lph: Option<f64>,
    pub max_fuel_lph: Option<f64>,
    pub max_temperature_deg_c: Option<f64>,
}

impl Init for LocoEngineDefaults {}
impl SerdeAPI for LocoEngineDefaults {}

/// Picks the configured value, else the locomotive value, else `fallback`
fn fill<T: Copy + fmt::Debug>(
    name: &str,
    value: Option<T>,
    loco_value: Option<T>,
    fallback: T,
    verbose: bool,
) -> T {
    match (value, loco_value) {
        (Some(value), _) => value,
        (None, Some(loco_value)) => {
            if verbose {
                log::info!("diesel engine `{name}` not set, using locomotive value {loco_value:?}");
            }
            loco_value
        }
        (None, None) => {
            if verbose {
                log::info!("diesel engine `{name}` not set, using default {fallback:?}");
            }
            fallback
        }
    }
}

/// Keeps a table only if it passes validation
fn checked_table(name: &str, table: Option<Interpolator>) -> Option<Interpolator> {
    let mut table = table?;
    match table.init() {
        Ok(()) => Some(table),
        Err(err) => {
            log::warn!("diesel engine `{name}` ignored: {err}");
            None
        }
    }
}

/// Diesel prime mover with optional mechanical gearbox.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DieselEngine {
    pub idle_rpm: f64,
    /// Corrected at init to be at least 1.5 × [Self::idle_rpm]
    pub max_rpm: f64,
    /// RPM demanded from the starter
    pub starting_rpm: f64,
    /// RPM above which the engine counts as started
    pub starting_confirmation_rpm: f64,
    /// Linear RPM rate limit when speeding up, RPM/s
    pub change_up_rpmps: f64,
    /// Linear RPM rate limit when slowing down, RPM/s
    pub change_down_rpmps: f64,
    /// Limit on how fast the RPM rate may grow when speeding up, RPM/s²
    pub rate_of_change_up_rpmpss: f64,
    /// Limit on how fast the RPM rate may grow when slowing down, RPM/s²
    pub rate_of_change_down_rpmpss: f64,
    pub max_power: si::Power,
    /// Available power (W) against RPM; linear idle-to-max when absent
    #[serde(default)]
    pub power_table: Option<Interpolator>,
    /// Demanded RPM against throttle percent; linear idle-to-max when absent
    #[serde(default)]
    pub throttle_rpm_table: Option<Interpolator>,
    /// Fuel consumption (L/h) against RPM; linear in load when absent
    #[serde(default)]
    pub fuel_table: Option<Interpolator>,
    pub idle_fuel_lph: f64,
    pub max_fuel_lph: f64,
    pub max_temperature_deg_c: f64,
    pub temperature_time_constant: si::Time,
    #[serde(default)]
    pub cooling: CoolingMode,
    pub cooling_hysteresis_deg_c: f64,
    pub idle_oil_pressure_psi: f64,
    pub max_oil_pressure_psi: f64,
    #[serde(default)]
    pub oil_leak_psi: f64,
    #[serde(default)]
    pub exhaust: Exhaust,
    #[serde(default)]
    pub gearbox: Option<GearBox>,
    #[serde(default)]
    pub state: DieselEngineState,
    /// time step interval between saves. 1 is a good option. If None, no saving occurs.
    #[serde(default)]
    pub save_interval: Option<usize>,
    #[serde(default)]
    pub history: DieselEngineStateHistoryVec,
}

impl Default for DieselEngine {
    fn default() -> Self {
        let file_contents = include_str!("diesel_engine.default.yaml");
        Self::from_yaml(file_contents, false).unwrap()
    }
}

impl Init for DieselEngine {
    fn init(&mut self) -> Result<(), Error> {
        for (name, value) in [
            ("change_up_rpmps", self.change_up_rpmps),
            ("change_down_rpmps", self.change_down_rpmps),
            ("rate_of_change_up_rpmpss", self.rate_of_change_up_rpmpss),
            ("rate_of_change_down_rpmpss", self.rate_of_change_down_rpmpss),
            ("idle_rpm", self.idle_rpm),
        ] {
            if !(value > 0.0) {
                return Err(Error::InitError(format!(
                    "{}\n`{}` must be positive, got {}",
                    format_dbg!(),
                    name,
                    value
                )));
            }
        }
        for table in [
            &mut self.power_table,
            &mut self.throttle_rpm_table,
            &mut self.fuel_table,
        ]
        .into_iter()
        .flatten()
        {
            table.init()?;
        }
        if let Some(gearbox) = self.gearbox.as_mut() {
            gearbox.init()?;
        }
        self.correct_rpm_limits();
        Ok(())
    }
}
impl SerdeAPI for DieselEngine {}

impl DieselEngine {
    /// Builds an engine from possibly incomplete content, filling missing
    /// fields from `loco` and then from built-in fallbacks. Never fails: an
    /// invalid table is dropped with a warning and its linear substitute used.
    /// With `verbose`, every substituted field is traced at info level.
    pub fn from_config(config: &DieselEngineConfig, loco: &LocoEngineDefaults, verbose: bool) -> Self {
        let idle_rpm = fill("idle_rpm", config.idle_rpm, loco.idle_rpm, 300.0, verbose);
        let max_rpm = fill("max_rpm", config.max_rpm, loco.max_rpm, 600.0, verbose);
        let starting_rpm = fill(
            "starting_rpm",
            config.starting_rpm,
            None,
            idle_rpm * 2.0 / 3.0,
            verbose,
        );
        let starting_confirmation_rpm = fill(
            "starting_confirmation_rpm",
            config.starting_confirmation_rpm,
            None,
            starting_rpm * 1.1,
            verbose,
        );
        let change_up_rpmps = fill(
            "change_up_rpmps",
            config.change_up_rpmps,
            loco.change_up_rpmps,
            50.0,
            verbose,
        );
        let change_down_rpmps = fill(
            "change_down_rpmps",
            config.change_down_rpmps,
            loco.change_down_rpmps,
            40.0,
            verbose,
        );
        let rate_of_change_up_rpmpss = fill(
            "rate_of_change_up_rpmpss",
            config.rate_of_change_up_rpmpss,
            None,
            change_up_rpmps,
            verbose,
        );
        let rate_of_change_down_rpmpss = fill(
            "rate_of_change_down_rpmpss",
            config.rate_of_change_down_rpmpss,
            None,
            change_down_rpmps,
            verbose,
        );
        let max_power = fill(
            "max_power",
            config.max_power,
            loco.max_power,
            500.0 * uc::KW,
            verbose,
        );
        let idle_fuel_lph = fill(
            "idle_fuel_lph",
            config.idle_fuel_lph,
            loco.idle_fuel_lph,
            10.0,
            verbose,
        );
        let max_fuel_lph = fill(
            "max_fuel_lph",
            config.max_fuel_lph,
            loco.max_fuel_lph,
            // roughly 250 g/kWh of diesel at 0.84 kg/L
            max_power.get::<si::kilowatt>() * 0.3,
            verbose,
        );
        let max_temperature_deg_c = fill(
            "max_temperature_deg_c",
            config.max_temperature_deg_c,
            loco.max_temperature_deg_c,
            90.0,
            verbose,
        );

        let mut engine = Self {
            idle_rpm,
            max_rpm,
            starting_rpm,
            starting_confirmation_rpm,
            change_up_rpmps,
            change_down_rpmps,
            rate_of_change_up_rpmpss,
            rate_of_change_down_rpmpss,
            max_power,
            power_table: checked_table("power_table", config.power_table.clone()),
            throttle_rpm_table: checked_table(
                "throttle_rpm_table",
                config.throttle_rpm_table.clone(),
            ),
            fuel_table: checked_table("fuel_table", config.fuel_table.clone()),
            idle_fuel_lph,
            max_fuel_lph,
            max_temperature_deg_c,
            temperature_time_constant: fill(
                "temperature_time_constant",
                config.temperature_time_constant,
                None,
                240.0 * uc::S,
                verbose,
            ),
            cooling: fill("cooling", config.cooling, None, CoolingMode::Mechanical, verbose),
            cooling_hysteresis_deg_c: fill(
                "cooling_hysteresis_deg_c",
                config.cooling_hysteresis_deg_c,
                None,
                5.0,
                verbose,
            ),
            idle_oil_pressure_psi: fill(
                "idle_oil_pressure_psi",
                config.idle_oil_pressure_psi,
                None,
                40.0,
                verbose,
            ),
            max_oil_pressure_psi: fill(
                "max_oil_pressure_psi",
                config.max_oil_pressure_psi,
                None,
                90.0,
                verbose,
            ),
            oil_leak_psi: config.oil_leak_psi.unwrap_or_default(),
            exhaust: config.exhaust.clone().unwrap_or_default(),
            gearbox: None,
            state: Default::default(),
            save_interval: None,
            history: Default::default(),
        };
        if let Some(power_table) = &engine.power_table {
            if power_table.has_negative_value() {
                log::warn!("diesel engine `power_table` has negative values, output is floored at zero");
            }
        }
        engine.gearbox = config.gearbox.clone().and_then(|mut gearbox| match gearbox.init() {
            Ok(()) => Some(gearbox),
            Err(err) => {
                log::warn!("diesel engine gearbox ignored: {err}");
                None
            }
        });
        for (name, rate) in [
            ("change_up_rpmps", &mut engine.change_up_rpmps),
            ("change_down_rpmps", &mut engine.change_down_rpmps),
            ("rate_of_change_up_rpmpss", &mut engine.rate_of_change_up_rpmpss),
            ("rate_of_change_down_rpmpss", &mut engine.rate_of_change_down_rpmpss),
        ] {
            if !(*rate > 0.0) {
                log::warn!("diesel engine `{name}` must be positive, got {rate}; using 1");
                *rate = 1.0;
            }
        }
        if !(engine.idle_rpm > 0.0) {
            log::warn!("diesel engine `idle_rpm` must be positive, got {idle_rpm}; using 300");
            engine.idle_rpm = 300.0;
        }
        engine.correct_rpm_limits();
        engine
    }

    /// Enforces `max_rpm >= 1.5 * idle_rpm` and a confirmation RPM above the
    /// starting RPM
    fn correct_rpm_limits(&mut self) {
        if self.max_rpm < 1.5 * self.idle_rpm {
            log::warn!(
                "diesel engine `max_rpm` ({}) is below 1.5 × `idle_rpm` ({}), using {}",
                self.max_rpm,
                self.idle_rpm,
                1.5 * self.idle_rpm
            );
            self.max_rpm = 1.5 * self.idle_rpm;
        }
        if self.starting_confirmation_rpm <= self.starting_rpm {
            log::warn!(
                "diesel engine `starting_confirmation_rpm` ({}) must exceed `starting_rpm` ({}), using {}",
                self.starting_confirmation_rpm,
                self.starting_rpm,
                1.1 * self.starting_rpm
            );
            self.starting_confirmation_rpm = 1.1 * self.starting_rpm;
        }
    }

    pub fn status(&self) -> EngineStatus {
        self.state.status
    }

    pub fn real_rpm(&self) -> f64 {
        self.state.real_rpm
    }

    pub fn demanded_rpm(&self) -> f64 {
        self.state.demanded_rpm
    }

    pub fn output_power(&self) -> si::Power {
        self.state.output_power
    }

    pub fn fuel_flow(&self) -> si::VolumeRate {
        self.state.fuel_flow
    }

    pub fn temperature_deg_c(&self) -> f64 {
        self.state.temperature_deg_c
    }

    pub fn oil_pressure_psi(&self) -> f64 {
        self.state.oil_pressure_psi
    }

    fn handle(&mut self, event: EngineEvent) -> bool {
        match self.state.status.next(event) {
            Some(next) => {
                log::debug!(
                    "{}\nengine {:?} -> {:?} on {:?}",
                    format_dbg!(),
                    self.state.status,
                    next,
                    event
                );
                self.state.status = next;
                true
            }
            None => false,
        }
    }

    /// Starts the engine; returns whether the request was accepted
    pub fn start(&mut self) -> bool {
        let accepted = self.handle(EngineEvent::Start);
        if accepted {
            self.state.demanded_rpm = self.starting_rpm;
        }
        accepted
    }

    /// Stops the engine; returns whether the request was accepted
    pub fn stop(&mut self) -> bool {
        let accepted = self.handle(EngineEvent::Stop);
        if accepted {
            self.state.demanded_rpm = 0.0;
        }
        accepted
    }

    /// RPM the governor targets for `throttle_percent` with a free clutch
    pub fn throttle_rpm(&self, throttle_percent: f64) -> f64 {
        let throttle_percent = throttle_percent.clamp(0.0, 100.0);
        let rpm = match &self.throttle_rpm_table {
            Some(table) => table.get(throttle_percent),
            None => self.idle_rpm + throttle_percent / 100.0 * (self.max_rpm - self.idle_rpm),
        };
        rpm.clamp(self.idle_rpm, self.max_rpm)
    }

    /// Power available at `rpm` before any reduction
    pub fn available_power(&self, rpm: f64) -> si::Power {
        match &self.power_table {
            Some(table) => si::Power::new::<si::watt>(table.get(rpm)).min(self.max_power),
            None => {
                let frac = (rpm - self.idle_rpm) / (self.max_rpm - self.idle_rpm);
                self.max_power * frac.clamp(0.0, 1.0)
            }
        }
    }

    fn update_demanded_rpm(&mut self, inputs: &EngineInputs) {
        self.state.demanded_rpm = match self.state.status {
            EngineStatus::Starting => {
                if self.state.real_rpm >= CATCH_FRACTION * self.starting_rpm {
                    CATCH_BOOST * self.starting_confirmation_rpm
                } else {
                    self.starting_rpm
                }
            }
            EngineStatus::Running => match &self.gearbox {
                Some(gearbox) if gearbox.is_clutch_on() => {
                    gearbox.shaft_rpm().clamp(0.0, self.max_rpm)
                }
                _ => self.throttle_rpm(inputs.throttle_percent),
            },
            EngineStatus::Stopping | EngineStatus::Stopped => 0.0,
        };
    }

    /// Moves real RPM toward demanded RPM. The rate is limited linearly by
    /// `change_*_rpmps`, may only grow by `rate_of_change_*_rpmpss` per second,
    /// and shrinks as `sqrt(2 * rate_of_change * remaining)` so the target is
    /// approached without overshoot.
    fn limit_rpm(&mut self, dt: f64) {
        let diff = self.state.demanded_rpm - self.state.real_rpm;
        let rate = if diff > 0.0 {
            (self.state.rpm_rate.max(0.0) + self.rate_of_change_up_rpmpss * dt)
                .min((2.0 * self.rate_of_change_up_rpmpss * diff).sqrt())
                .min(self.change_up_rpmps)
        } else if diff < 0.0 {
            -((-self.state.rpm_rate).max(0.0) + self.rate_of_change_down_rpmpss * dt)
                .min((2.0 * self.rate_of_change_down_rpmpss * -diff).sqrt())
                .min(self.change_down_rpmps)
        } else {
            0.0
        };
        let mut step = rate * dt;
        if step.abs() > diff.abs() {
            step = diff;
        }
        let prev_rpm = self.state.real_rpm;
        self.state.real_rpm = (prev_rpm + step).clamp(0.0, self.max_rpm);
        self.state.rpm_rate = if dt > 0.0 {
            (self.state.real_rpm - prev_rpm) / dt
        } else {
            0.0
        };
    }

    fn advance_status(&mut self) {
        match self.state.status {
            EngineStatus::Starting if self.state.real_rpm > self.starting_confirmation_rpm => {
                self.handle(EngineEvent::StartConfirmed);
            }
            EngineStatus::Stopping if self.state.real_rpm <= 0.0 => {
                self.handle(EngineEvent::SpunDown);
            }
            _ => {}
        }
    }

    /// Fraction of max power drawn by traction
    fn load_fraction(&self, inputs: &EngineInputs) -> f64 {
        if self.max_power <= si::Power::ZERO || inputs.motive_force <= si::Force::ZERO {
            return 0.0;
        }
        (self.state.output_power / self.max_power)
            .get::<si::ratio>()
            .clamp(0.0, 1.0)
    }

    fn update_power_and_fuel(&mut self, inputs: &EngineInputs) {
        self.state.output_power = if self.state.status.is_running() {
            let reduction = inputs.power_reduction.clamp(0.0, 1.0);
            (self.available_power(self.state.real_rpm) * (1.0 - reduction)).max(si::Power::ZERO)
        } else {
            si::Power::ZERO
        };
        let load = self.load_fraction(inputs);
        let fuel_lph = match self.state.status {
            EngineStatus::Running => match &self.fuel_table {
                Some(table) => table.get(self.state.real_rpm).max(0.0),
                None => self.idle_fuel_lph + (self.max_fuel_lph - self.idle_fuel_lph) * load,
            },
            EngineStatus::Starting => self.idle_fuel_lph,
            EngineStatus::Stopping | EngineStatus::Stopped => 0.0,
        };
        self.state.fuel_flow = si::VolumeRate::new::<si::liter_per_second>(crate::conversions::lps_from_lph(fuel_lph));
    }

    /// First-order lag of engine temperature toward a load-dependent target
    fn update_temperature(&mut self, dt: f64, inputs: &EngineInputs) {
        let ambient = inputs.ambient_temp_deg_c;
        let max_temp = self.max_temperature_deg_c;
        let temp = self.state.temperature_deg_c;
        let firing = self.state.status.is_running() || self.state.status.is_starting();
        // without a fan, full load heats the engine well past its max temperature
        let natural = if firing {
            ambient + (max_temp - ambient) * (0.5 + self.load_fraction(inputs))
        } else {
            ambient
        };
        let fan_cooled = ambient + (natural - ambient) * 2.0 / 3.0;
        let tau = self.temperature_time_constant.get::<si::second>().max(f64::EPSILON);
        let band = self.cooling_hysteresis_deg_c.max(f64::EPSILON);
        let (target, tau, cooling_active) = match self.cooling {
            CoolingMode::NoCooling => (natural, tau, false),
            CoolingMode::Mechanical if firing => (fan_cooled, tau * 2.0 / 3.0, true),
            CoolingMode::Mechanical => (natural, tau, false),
            CoolingMode::Hysteresis => {
                let active = if temp > max_temp {
                    true
                } else if temp < max_temp - band {
                    false
                } else {
                    self.state.cooling_active
                };
                if active {
                    (ambient, tau / 2.0, true)
                } else {
                    (natural, tau, false)
                }
            }
            CoolingMode::Proportional => {
                let effort = ((temp - (max_temp - band)) / band).clamp(0.0, 1.0);
                (natural + (fan_cooled - natural) * effort, tau, effort > 0.0)
            }
        };
        self.state.cooling_active = cooling_active;
        self.state.temperature_deg_c = temp + (target - temp) * (1.0 - (-dt / tau).exp());
    }

    fn update_oil_pressure(&mut self) {
        let rpm = self.state.real_rpm;
        let pressure = if rpm <= 0.0 {
            0.0
        } else if rpm < self.idle_rpm {
            self.idle_oil_pressure_psi * rpm / self.idle_rpm
        } else {
            let frac = ((rpm - self.idle_rpm) / (self.max_rpm - self.idle_rpm)).clamp(0.0, 1.0);
            self.idle_oil_pressure_psi
                + (self.max_oil_pressure_psi - self.idle_oil_pressure_psi) * frac
        };
        self.state.oil_pressure_psi = (pressure - self.oil_leak_psi).max(0.0);
    }

    fn update_exhaust(&mut self, inputs: &EngineInputs) {
        let exhaust = &self.exhaust;
        let load = self.load_fraction(inputs);
        let (particles, magnitude, color) = match self.state.status {
            EngineStatus::Stopped => (0.0, 0.0, exhaust.steady_color),
            EngineStatus::Starting => (
                exhaust.max_particles,
                exhaust.max_magnitude,
                exhaust.transient_color,
            ),
            EngineStatus::Stopping => (
                exhaust.initial_particles,
                exhaust.initial_magnitude,
                exhaust.decel_color,
            ),
            EngineStatus::Running => {
                let steady_particles =
                    utils::lerp(exhaust.initial_particles, exhaust.max_particles, load);
                let steady_magnitude =
                    utils::lerp(exhaust.initial_magnitude, exhaust.max_magnitude, load);
                // -1 fully decelerating, 0 steady, 1 fully accelerating
                let blend = (self.state.rpm_rate / EXHAUST_BLEND_RPM_RATE).clamp(-1.0, 1.0);
                let (particles, magnitude, color) = if blend >= 0.0 {
                    (
                        exhaust.max_particles,
                        exhaust.max_magnitude,
                        exhaust.transient_color,
                    )
                } else {
                    (
                        exhaust.initial_particles,
                        exhaust.initial_magnitude,
                        exhaust.decel_color,
                    )
                };
                let frac = blend.abs();
                let mut blended = exhaust.steady_color;
                for (c, target) in blended.iter_mut().zip(color) {
                    *c = utils::lerp(*c, target, frac);
                }
                (
                    utils::lerp(steady_particles, particles, frac),
                    utils::lerp(steady_magnitude, magnitude, frac),
                    blended,
                )
            }
        };
        self.state.exhaust_particles = particles;
        self.state.exhaust_magnitude = magnitude;
        self.state.exhaust_color = color;
    }

    /// Advances the engine by `dt`. The gearbox is updated first from the
    /// previous tick's engine RPM and the axle speed in `inputs`.
    pub fn update(&mut self, dt: si::Time, inputs: &EngineInputs) -> anyhow::Result<()> {
        ensure!(
            dt >= si::Time::ZERO,
            format!("{}\n`dt` must not be negative", format_dbg!(dt))
        );
        self.state.i += 1;
        let dt_s = dt.get::<si::second>();
        let (rpm, idle, max) = (self.state.real_rpm, self.idle_rpm, self.max_rpm);
        if let Some(gearbox) = self.gearbox.as_mut() {
            gearbox.update(dt, rpm, idle, max, inputs.speed, inputs.throttle_percent);
        }
        self.update_demanded_rpm(inputs);
        self.limit_rpm(dt_s);
        self.advance_status();
        self.update_power_and_fuel(inputs);
        self.update_temperature(dt_s, inputs);
        self.update_oil_pressure();
        self.update_exhaust(inputs);
        self.save_state();
        Ok(())
    }
}

impl_save_state!(DieselEngine);

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, HistoryVec)]
pub struct DieselEngineState {
    /// iteration counter
    pub i: usize,
    pub status: EngineStatus,
    pub real_rpm: f64,
    pub demanded_rpm: f64,
    /// rate of change of real RPM over the last update, RPM/s
    pub rpm_rate: f64,
    pub output_power: si::Power,
    pub fuel_flow: si::VolumeRate,
    pub temperature_deg_c: f64,
    pub cooling_active: bool,
    pub oil_pressure_psi: f64,
    pub exhaust_particles: f64,
    pub exhaust_magnitude: f64,
    /// RGBA
    pub exhaust_color: [f64; 4],
}

impl Default for DieselEngineState {
    fn default() -> Self {
        Self {
            i: 0,
            status: EngineStatus::Stopped,
            real_rpm: 0.0,
            demanded_rpm: 0.0,
            rpm_rate: 0.0,
            output_power: si::Power::ZERO,
            fuel_flow: si::VolumeRate::ZERO,
            temperature_deg_c: DEFAULT_AMBIENT_DEG_C,
            cooling_active: false,
            oil_pressure_psi: 0.0,
            exhaust_particles: 0.0,
            exhaust_magnitude: 0.0,
            exhaust_color: [0.0; 4],
        }
    }
}

/// Persisted engine fields, in save-file order
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DieselEngineSnapshot {
    pub status: EngineStatus,
    pub real_rpm: f64,
    pub output_power_w: f64,
    pub temperature_deg_c: f64,
    pub cooling_active: bool,
    pub gearbox: Option<GearBoxSnapshot>,
}

impl SaveRestore for DieselEngine {
    type Snapshot = DieselEngineSnapshot;

    fn snapshot(&self) -> Self::Snapshot {
        DieselEngineSnapshot {
            status: self.state.status,
            real_rpm: self.state.real_rpm,
            output_power_w: self.state.output_power.get::<si::watt>(),
            temperature_deg_c: self.state.temperature_deg_c,
            cooling_active: self.state.cooling_active,
            gearbox: self.gearbox.as_ref().map(|gb| gb.snapshot()),
        }
    }

    fn apply_snapshot(&mut self, snapshot: Self::Snapshot) -> anyhow::Result<()> {
        match (self.gearbox.as_mut(), snapshot.gearbox) {
            (Some(gearbox), Some(gb_snapshot)) => gearbox
                .apply_snapshot(gb_snapshot)
                .with_context(|| format_dbg!())?,
            (None, None) => {}
            (gearbox, gb_snapshot) => bail!(Error::SerdeError(format!(
                "{}\nsaved gearbox present: {}, engine gearbox present: {}",
                format_dbg!(),
                gb_snapshot.is_some(),
                gearbox.is_some()
            ))),
        }
        self.state.status = snapshot.status;
        self.state.real_rpm = snapshot.real_rpm;
        self.state.demanded_rpm = snapshot.real_rpm;
        self.state.rpm_rate = 0.0;
        self.state.output_power = snapshot.output_power_w * uc::W;
        self.state.temperature_deg_c = snapshot.temperature_deg_c;
        self.state.cooling_active = snapshot.cooling_active;
        Ok(())
    }
}
