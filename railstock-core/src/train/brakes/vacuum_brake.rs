use super::*;

/// Brake valve positions of a straight (direct-acting) vacuum brake
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, IsVariant)]
pub enum StraightBrakeState {
    /// Destroys vacuum in the pipe, releasing the brakes
    Release,
    /// Holds the pipe at its current pressure
    #[default]
    Lap,
    /// Creates vacuum in the pipe, applying the brakes
    Apply,
    /// [StraightBrakeState::Apply] at twice the exhauster rate
    Emergency,
}

/// Driver's brake valve on the lead vehicle
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, IsVariant)]
pub enum BrakeController {
    /// Automatic brake; the valve drives the pipe toward an absolute pressure.
    /// Higher pressure means less vacuum and a harder application.
    Automatic { pipe_target: si::Pressure },
    Straight(StraightBrakeState),
}

impl Default for BrakeController {
    fn default() -> Self {
        Self::auto_release()
    }
}

impl BrakeController {
    /// Automatic brake fully released (pipe at maximum vacuum)
    pub fn auto_release() -> Self {
        Self::Automatic {
            pipe_target: si::Pressure::ZERO,
        }
    }

    /// Automatic brake fully applied (pipe at atmospheric pressure)
    pub fn auto_full_service() -> Self {
        Self::Automatic {
            pipe_target: 2.0 * uc::ATM,
        }
    }
}

/// Brake equipment fitted to a vehicle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, IsVariant)]
pub enum BrakeSystemKind {
    #[default]
    Automatic,
    Straight {
        /// A straight-braked vehicle with an auxiliary (vacuum) reservoir can
        /// run as an automatic brake behind an automatic-braked lead
        has_aux_reservoir: bool,
    },
}

/// Behavior a vehicle's brake actually takes for a given lead controller
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, IsVariant)]
pub enum BrakeRegime {
    #[default]
    Auto,
    Straight,
    /// Straight brake without reservoir behind an automatic lead: train brake
    /// is inoperative and only the handbrake acts
    Isolated,
}

impl BrakeSystemKind {
    /// Effective regime of this equipment behind a lead using `lead`
    pub fn regime(&self, lead: &BrakeController) -> BrakeRegime {
        match (self, lead) {
            (Self::Automatic, _) => BrakeRegime::Auto,
            (Self::Straight { .. }, BrakeController::Straight(_)) => BrakeRegime::Straight,
            (Self::Straight { has_aux_reservoir: true }, BrakeController::Automatic { .. }) => {
                BrakeRegime::Auto
            }
            (Self::Straight { has_aux_reservoir: false }, BrakeController::Automatic { .. }) => {
                BrakeRegime::Isolated
            }
        }
    }
}

/// Gauge readings for one vehicle
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrakeStatus {
    pub pipe_vacuum_inhg: f64,
    pub cylinder_vacuum_inhg: f64,
    pub brake_force: si::Force,
}

/// Moves `value` toward `target` by at most `max_down` or `max_up`
fn approach(value: f64, target: f64, max_down: f64, max_up: f64) -> f64 {
    if target < value {
        (value - max_down).max(target)
    } else {
        (value + max_up).min(target)
    }
}

/// Vacuum brake of one vehicle: brake pipe section, cylinders, and vacuum
/// reservoir.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VacuumBrake {
    #[serde(default)]
    pub kind: BrakeSystemKind,
    /// Brake force at full cylinder pressure difference
    pub max_brake_force: si::Force,
    pub max_handbrake_force: si::Force,
    /// Vacuum the exhauster can hold at sea level
    pub max_vacuum_inhg: f64,
    pub num_cylinders: u32,
    pub cylinder_volume: si::Volume,
    pub pipe_volume: si::Volume,
    pub reservoir_volume: si::Volume,
    /// Cylinder pressure rate when applying, psi/s
    pub apply_rate_psips: f64,
    /// Cylinder pressure rate when releasing, psi/s
    pub release_rate_psips: f64,
    /// Rate at which the lead valve lowers pipe pressure, psi/s
    pub exhauster_rate_psips: f64,
    /// Rate at which the lead valve admits air to the pipe, psi/s
    pub vent_rate_psips: f64,
    /// Fraction of brake force retained while the wheels are sliding
    pub skid_friction_factor: f64,
    #[serde(default)]
    pub state: VacuumBrakeState,
    /// time step interval between saves. 1 is a good option. If None, no saving occurs.
    #[serde(default)]
    pub save_interval: Option<usize>,
    #[serde(default)]
    pub history: VacuumBrakeStateHistoryVec,
}

impl Default for VacuumBrake {
    fn default() -> Self {
        let mut brake = Self {
            kind: BrakeSystemKind::Automatic,
            max_brake_force: 60.0 * uc::KN,
            max_handbrake_force: 20.0 * uc::KN,
            max_vacuum_inhg: 21.0,
            num_cylinders: 2,
            cylinder_volume: 57.0 * uc::L,
            pipe_volume: 150.0 * uc::L,
            reservoir_volume: 200.0 * uc::L,
            apply_rate_psips: 2.0,
            release_rate_psips: 1.5,
            exhauster_rate_psips: 1.0,
            vent_rate_psips: 2.0,
            skid_friction_factor: 0.7,
            state: Default::default(),
            save_interval: None,
            history: Default::default(),
        };
        brake.reset_released(&BrakeController::default(), &Environment::default());
        brake
    }
}

impl Init for VacuumBrake {
    fn init(&mut self) -> Result<(), Error> {
        let check = |value: f64, name: &str| -> Result<(), Error> {
            ensure_positive!(value, name);
            Ok(())
        };
        check(self.max_vacuum_inhg, "max_vacuum_inhg")?;
        check(self.num_cylinders as f64, "num_cylinders")?;
        check(self.cylinder_volume.get::<si::cubic_meter>(), "cylinder_volume")?;
        check(self.pipe_volume.get::<si::cubic_meter>(), "pipe_volume")?;
        check(self.reservoir_volume.get::<si::cubic_meter>(), "reservoir_volume")?;
        check(self.apply_rate_psips, "apply_rate_psips")?;
        check(self.release_rate_psips, "release_rate_psips")?;
        check(self.exhauster_rate_psips, "exhauster_rate_psips")?;
        check(self.vent_rate_psips, "vent_rate_psips")?;
        if !(0.0..=1.0).contains(&self.skid_friction_factor) {
            return Err(Error::InvalidParameter(format!(
                "{}\n`skid_friction_factor` must be within [0, 1]",
                format_dbg!(self.skid_friction_factor)
            )));
        }
        // state never set, e.g. loaded from a file without one
        if self.state.atmospheric_psia == 0.0 {
            self.reset_released(&BrakeController::default(), &Environment::default());
        }
        Ok(())
    }
}
impl SerdeAPI for VacuumBrake {}

impl VacuumBrake {
    /// Lowest pressure the brake can reach: the sea-level vacuum limit, never
    /// above `atm_psia`
    pub fn vacuum_floor_psia(&self, atm_psia: f64) -> f64 {
        let sea_level_psia = uc::ATM.get::<si::psi>();
        (sea_level_psia - conversions::psi_from_inhg(self.max_vacuum_inhg)).min(atm_psia)
    }

    /// Cylinder to pipe volume ratio over all cylinders
    pub fn volume_ratio(&self) -> f64 {
        self.num_cylinders as f64 * (self.cylinder_volume / self.pipe_volume).get::<si::ratio>()
    }

    /// Puts the brake in its released state for `lead` under `env`
    pub fn reset_released(&mut self, lead: &BrakeController, env: &Environment) {
        let atm = env.atmospheric_psia();
        let floor = self.vacuum_floor_psia(atm);
        let regime = self.kind.regime(lead);
        let released = match regime {
            BrakeRegime::Auto => floor,
            BrakeRegime::Straight | BrakeRegime::Isolated => atm,
        };
        self.state.regime = regime;
        self.state.atmospheric_psia = atm;
        self.state.vacuum_floor_psia = floor;
        self.state.pipe_psia = released;
        self.state.cylinder_psia = released;
        self.state.reservoir_psia = floor;
        self.state.brake_force = si::Force::ZERO;
        self.state.sound = BrakeSoundTriggers::new(released, released);
    }

    pub fn pipe_pressure(&self) -> si::Pressure {
        si::Pressure::new::<si::psi>(self.state.pipe_psia)
    }

    pub fn set_pipe_pressure(&mut self, pressure: si::Pressure) {
        self.state.pipe_psia = pressure.get::<si::psi>();
    }

    pub fn cylinder_pressure(&self) -> si::Pressure {
        si::Pressure::new::<si::psi>(self.state.cylinder_psia)
    }

    pub fn reservoir_pressure(&self) -> si::Pressure {
        si::Pressure::new::<si::psi>(self.state.reservoir_psia)
    }

    pub fn brake_force(&self) -> si::Force {
        self.state.brake_force
    }

    pub fn regime(&self) -> BrakeRegime {
        self.state.regime
    }

    pub fn handbrake_percent(&self) -> f64 {
        self.state.handbrake_percent
    }

    pub fn set_handbrake_percent(&mut self, percent: f64) {
        self.state.handbrake_percent = percent.clamp(0.0, 100.0);
    }

    pub fn status(&self) -> BrakeStatus {
        let atm = self.state.atmospheric_psia;
        BrakeStatus {
            pipe_vacuum_inhg: conversions::vacuum_inhg_from_psia(self.state.pipe_psia, atm),
            cylinder_vacuum_inhg: conversions::vacuum_inhg_from_psia(self.state.cylinder_psia, atm),
            brake_force: self.state.brake_force,
        }
    }

    /// Driver's valve action on this vehicle's pipe section. Only the lead
    /// vehicle's pipe is driven; the rest follow through [BrakePipe].
    pub fn drive_pipe(&mut self, dt: si::Time, controller: &BrakeController, env: &Environment) {
        let dt_s = dt.get::<si::second>().max(0.0);
        let atm = env.atmospheric_psia();
        let floor = self.vacuum_floor_psia(atm);
        let exhaust = self.exhauster_rate_psips * dt_s;
        let vent = self.vent_rate_psips * dt_s;
        let pipe = self.state.pipe_psia;
        self.state.pipe_psia = match controller {
            BrakeController::Automatic { pipe_target } => {
                let target = pipe_target.get::<si::psi>().clamp(floor, atm);
                approach(pipe, target, exhaust, vent)
            }
            BrakeController::Straight(valve) => match valve {
                StraightBrakeState::Release => approach(pipe, atm, exhaust, vent),
                StraightBrakeState::Lap => pipe,
                StraightBrakeState::Apply => approach(pipe, floor, exhaust, vent),
                StraightBrakeState::Emergency => approach(pipe, floor, 2.0 * exhaust, vent),
            },
        };
    }

    /// Flows air between pipe and cylinders. Each step is bounded by the rate
    /// and by the pressure at which pipe and cylinder would equalize, so the
    /// cylinder never passes the pipe.
    fn equalize_cylinder(&mut self, dt_s: f64, rate_up: f64, rate_down: f64) {
        let vr = self.volume_ratio();
        let pipe = self.state.pipe_psia;
        let cyl = self.state.cylinder_psia;
        if pipe > cyl {
            let mut dp = rate_up * dt_s;
            if cyl + dp > pipe - dp * vr {
                dp = (pipe - cyl) / (1.0 + vr);
            }
            self.state.cylinder_psia = cyl + dp;
            self.state.pipe_psia = pipe - dp * vr;
        } else if pipe < cyl {
            let mut dp = rate_down * dt_s;
            if cyl - dp < pipe + dp * vr {
                dp = (cyl - pipe) / (1.0 + vr);
            }
            self.state.cylinder_psia = cyl - dp;
            self.state.pipe_psia = pipe + dp * vr;
        }
    }

    /// Ball valve exhausting the reservoir into the pipe when the pipe holds
    /// more vacuum
    fn equalize_reservoir(&mut self) {
        if self.state.pipe_psia < self.state.reservoir_psia {
            let v_res = self.reservoir_volume.get::<si::cubic_meter>();
            let v_pipe = self.pipe_volume.get::<si::cubic_meter>();
            let mixed = (self.state.reservoir_psia * v_res + self.state.pipe_psia * v_pipe)
                / (v_res + v_pipe);
            self.state.reservoir_psia = mixed;
            self.state.pipe_psia = mixed;
        }
    }

    /// Advances cylinders and reservoir by `dt` and recomputes brake force.
    /// `controller` is the lead vehicle's valve, which decides the regime of
    /// this vehicle. Returns the sound cues raised this tick.
    pub fn update(
        &mut self,
        dt: si::Time,
        controller: &BrakeController,
        env: &Environment,
        wheel_skid: bool,
    ) -> anyhow::Result<Vec<BrakeSoundEvent>> {
        ensure!(
            dt >= si::Time::ZERO,
            format!("{}\n`dt` must not be negative", format_dbg!(dt))
        );
        self.state.i += 1;
        let dt_s = dt.get::<si::second>();
        let atm = env.atmospheric_psia();
        let floor = self.vacuum_floor_psia(atm);
        self.state.atmospheric_psia = atm;
        self.state.vacuum_floor_psia = floor;

        let regime = self.kind.regime(controller);
        if regime != self.state.regime {
            log::debug!(
                "{}\nbrake regime {:?} -> {:?}",
                format_dbg!(),
                self.state.regime,
                regime
            );
            self.state.regime = regime;
        }

        match regime {
            BrakeRegime::Auto => {
                self.equalize_cylinder(dt_s, self.apply_rate_psips, self.release_rate_psips);
                self.equalize_reservoir();
            }
            BrakeRegime::Straight => {
                self.equalize_cylinder(dt_s, self.release_rate_psips, self.apply_rate_psips);
            }
            BrakeRegime::Isolated => {
                self.state.cylinder_psia = approach(
                    self.state.cylinder_psia,
                    atm,
                    self.release_rate_psips * dt_s,
                    self.release_rate_psips * dt_s,
                );
            }
        }

        let state = &mut self.state;
        state.pipe_psia = state.pipe_psia.clamp(floor, atm);
        state.cylinder_psia = state.cylinder_psia.clamp(floor, atm);
        state.reservoir_psia = state.reservoir_psia.clamp(floor, atm);

        let span = atm - floor;
        let fraction = if span > 0.0 {
            match regime {
                BrakeRegime::Auto => (state.cylinder_psia - state.reservoir_psia) / span,
                BrakeRegime::Straight => (atm - state.cylinder_psia) / span,
                BrakeRegime::Isolated => 0.0,
            }
            .clamp(0.0, 1.0)
        } else {
            0.0
        };
        let handbrake = self.max_handbrake_force * state.handbrake_percent / 100.0;
        let mut force = (self.max_brake_force * fraction).max(handbrake);
        if wheel_skid {
            force = force * self.skid_friction_factor;
        }
        state.brake_force = force;

        let events = state.sound.tick(state.pipe_psia, state.cylinder_psia);
        self.save_state();
        Ok(events)
    }
}

impl_save_state!(VacuumBrake);

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, HistoryVec)]
pub struct VacuumBrakeState {
    /// iteration counter
    pub i: usize,
    pub regime: BrakeRegime,
    pub pipe_psia: f64,
    pub reservoir_psia: f64,
    pub cylinder_psia: f64,
    pub handbrake_percent: f64,
    pub brake_force: si::Force,
    /// atmospheric pressure at the last update
    pub atmospheric_psia: f64,
    /// lowest reachable pressure at the last update
    pub vacuum_floor_psia: f64,
    pub sound: BrakeSoundTriggers,
}

/// Persisted brake fields, in save-file order
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VacuumBrakeSnapshot {
    pub pipe_psia: f64,
    pub reservoir_psia: f64,
    pub cylinder_psia: f64,
    pub handbrake_percent: f64,
    pub prev_pipe_sample_psia: f64,
    pub prev_cylinder_sample_psia: f64,
    pub sound_counter: u32,
    pub pipe_trend: PressureTrend,
    pub cylinder_trend: PressureTrend,
}

impl SaveRestore for VacuumBrake {
    type Snapshot = VacuumBrakeSnapshot;

    fn snapshot(&self) -> Self::Snapshot {
        let state = &self.state;
        VacuumBrakeSnapshot {
            pipe_psia: state.pipe_psia,
            reservoir_psia: state.reservoir_psia,
            cylinder_psia: state.cylinder_psia,
            handbrake_percent: state.handbrake_percent,
            prev_pipe_sample_psia: state.sound.pipe.prev_sample_psi,
            prev_cylinder_sample_psia: state.sound.cylinder.prev_sample_psi,
            sound_counter: state.sound.counter,
            pipe_trend: state.sound.pipe.trend,
            cylinder_trend: state.sound.cylinder.trend,
        }
    }

    fn apply_snapshot(&mut self, snapshot: Self::Snapshot) -> anyhow::Result<()> {
        ensure!(
            (0.0..=100.0).contains(&snapshot.handbrake_percent),
            format_dbg!(snapshot.handbrake_percent)
        );
        let state = &mut self.state;
        state.pipe_psia = snapshot.pipe_psia;
        state.reservoir_psia = snapshot.reservoir_psia;
        state.cylinder_psia = snapshot.cylinder_psia;
        state.handbrake_percent = snapshot.handbrake_percent;
        state.sound.pipe.prev_sample_psi = snapshot.prev_pipe_sample_psia;
        state.sound.cylinder.prev_sample_psi = snapshot.prev_cylinder_sample_psia;
        state.sound.counter = snapshot.sound_counter;
        state.sound.pipe.trend = snapshot.pipe_trend;
        state.sound.cylinder.trend = snapshot.cylinder_trend;
        Ok(())
    }
}
