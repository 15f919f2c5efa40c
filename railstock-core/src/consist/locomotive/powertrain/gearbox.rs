use super::*;

/// One gear of a mechanical transmission
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Gear {
    /// Engine shaft RPM per m/s of vehicle speed
    pub ratio: f64,
    /// Highest vehicle speed usable in this gear
    pub max_speed: si::Velocity,
    /// Tractive force at full throttle
    pub max_tractive_force: si::Force,
    /// Retarding force when the throttle is closed in gear
    #[serde(default)]
    pub coasting_force: si::Force,
    /// Fraction of engine max RPM above which automatic operation shifts up
    pub up_shift_proportion: f64,
    /// Fraction of engine max RPM below which automatic operation shifts down
    pub down_shift_proportion: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, IsVariant)]
pub enum GearBoxOperation {
    /// Gear changes only on [GearBox::gear_up] and [GearBox::gear_down]
    #[default]
    Manual,
    /// Gear changes when shaft RPM crosses the shift thresholds
    Automatic,
}

/// Mechanical gearbox coupling a diesel engine to the wheels through a clutch.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GearBox {
    pub gears: Vec<Gear>,
    #[serde(default)]
    pub operation: GearBoxOperation,
    /// Time the clutch stays disengaged while changing gear
    pub change_delay: si::Time,
    #[serde(default)]
    pub state: GearBoxState,
    /// time step interval between saves. 1 is a good option. If None, no saving occurs.
    #[serde(default)]
    pub save_interval: Option<usize>,
    #[serde(default)]
    pub history: GearBoxStateHistoryVec,
}

impl Init for GearBox {
    fn init(&mut self) -> Result<(), Error> {
        if self.gears.is_empty() {
            return Err(Error::InitError(format!(
                "{}\ngearbox must have at least one gear",
                format_dbg!()
            )));
        }
        for (i, gear) in self.gears.iter().enumerate() {
            if !(gear.ratio > 0.0) {
                return Err(Error::InvalidParameter(format!(
                    "{}\ngear {} ratio must be positive, got {}",
                    format_dbg!(),
                    i,
                    gear.ratio
                )));
            }
        }
        let n = self.gears.len();
        for g in [self.state.current_gear, self.state.next_gear].into_iter().flatten() {
            if g >= n {
                return Err(Error::InitError(format!(
                    "{}\ngear index {} out of range for {} gears",
                    format_dbg!(),
                    g,
                    n
                )));
            }
        }
        Ok(())
    }
}
impl SerdeAPI for GearBox {}

impl GearBox {
    pub fn current_gear(&self) -> Option<&Gear> {
        self.state.current_gear.and_then(|g| self.gears.get(g))
    }

    pub fn is_changing_gear(&self) -> bool {
        self.state.current_gear != self.state.next_gear
    }

    pub fn is_clutch_on(&self) -> bool {
        self.state.clutch_on
    }

    pub fn clutch_percent(&self) -> f64 {
        self.state.clutch_percent
    }

    pub fn shaft_rpm(&self) -> f64 {
        self.state.shaft_rpm
    }

    /// Selects the next higher gear, engaging first gear from neutral
    pub fn gear_up(&mut self) {
        let top = self.gears.len().saturating_sub(1);
        self.state.next_gear = match self.state.next_gear {
            None => Some(0),
            Some(g) if g < top => Some(g + 1),
            Some(g) => {
                log::debug!("{}\nalready in top gear {}", format_dbg!(), g);
                Some(g)
            }
        };
    }

    /// Selects the next lower gear, dropping to neutral from first gear
    pub fn gear_down(&mut self) {
        self.state.next_gear = match self.state.next_gear {
            Some(0) | None => None,
            Some(g) => Some(g - 1),
        };
    }

    fn shaft_rpm_at(&self, speed: si::Velocity) -> f64 {
        self.current_gear()
            .map(|gear| gear.ratio * speed.get::<si::meter_per_second>().abs())
            .unwrap_or_default()
    }

    /// Advances gear changes and recomputes clutch slip for the engine RPM and
    /// vehicle speed of the previous tick.
    pub fn update(
        &mut self,
        dt: si::Time,
        engine_rpm: f64,
        engine_idle_rpm: f64,
        engine_max_rpm: f64,
        speed: si::Velocity,
        throttle_percent: f64,
    ) {
        self.state.i += 1;
        if self.operation.is_automatic() && !self.is_changing_gear() {
            let shaft_rpm = self.shaft_rpm_at(speed);
            match self.state.current_gear {
                None if throttle_percent > 0.0 => self.state.next_gear = Some(0),
                None => {}
                Some(g) => {
                    let gear = &self.gears[g];
                    if g + 1 < self.gears.len()
                        && shaft_rpm > gear.up_shift_proportion * engine_max_rpm
                    {
                        self.state.next_gear = Some(g + 1);
                    } else if g > 0 && shaft_rpm < gear.down_shift_proportion * engine_max_rpm {
                        self.state.next_gear = Some(g - 1);
                    }
                }
            }
        }

        if self.is_changing_gear() {
            self.state.clutch_on = false;
            self.state.change_timer += dt;
            if self.state.change_timer >= self.change_delay {
                log::debug!(
                    "{}\ngear change {:?} -> {:?} complete",
                    format_dbg!(),
                    self.state.current_gear,
                    self.state.next_gear
                );
                self.state.current_gear = self.state.next_gear;
                self.state.change_timer = si::Time::ZERO;
            }
        }

        self.state.shaft_rpm = self.shaft_rpm_at(speed);
        self.state.clutch_percent = if engine_rpm > 0.0 {
            (engine_rpm - self.state.shaft_rpm) / engine_rpm * 100.0
        } else {
            100.0
        };
        let engaged = self.state.current_gear.is_some() && !self.is_changing_gear();
        self.state.clutch_on = engaged
            && (self.state.clutch_percent <= 0.0
                || (self.state.clutch_on && self.state.shaft_rpm >= engine_idle_rpm));
        self.save_state();
    }

    /// Force at the wheels for the current gear
    pub fn tractive_force(
        &self,
        throttle_percent: f64,
        engine_power: si::Power,
        speed: si::Velocity,
    ) -> si::Force {
        let gear = match self.current_gear() {
            Some(gear) if !self.is_changing_gear() => gear,
            _ => return si::Force::ZERO,
        };
        let throttle = (throttle_percent / 100.0).clamp(0.0, 1.0);
        let speed = speed.abs();
        if speed > gear.max_speed || throttle == 0.0 {
            return -gear.coasting_force;
        }
        let force = gear.max_tractive_force * throttle;
        if speed > 0.1 * uc::MPS {
            force.min(engine_power / speed)
        } else {
            force
        }
    }
}

impl_save_state!(GearBox);

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, HistoryVec)]
pub struct GearBoxState {
    /// iteration counter
    pub i: usize,
    /// engaged gear, `None` in neutral
    pub current_gear: Option<usize>,
    /// selected gear, differs from `current_gear` while changing
    pub next_gear: Option<usize>,
    pub clutch_on: bool,
    /// time spent in the current gear change
    pub change_timer: si::Time,
    /// engine-side shaft RPM implied by vehicle speed
    pub shaft_rpm: f64,
    /// clutch slip relative to engine RPM
    pub clutch_percent: f64,
}

/// Persisted gearbox fields, in save-file order
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GearBoxSnapshot {
    pub current_gear: Option<usize>,
    pub next_gear: Option<usize>,
    pub clutch_on: bool,
    pub change_timer_s: f64,
}

impl SaveRestore for GearBox {
    type Snapshot = GearBoxSnapshot;

    fn snapshot(&self) -> Self::Snapshot {
        GearBoxSnapshot {
            current_gear: self.state.current_gear,
            next_gear: self.state.next_gear,
            clutch_on: self.state.clutch_on,
            change_timer_s: self.state.change_timer.get::<si::second>(),
        }
    }

    fn apply_snapshot(&mut self, snapshot: Self::Snapshot) -> anyhow::Result<()> {
        let n = self.gears.len();
        for g in [snapshot.current_gear, snapshot.next_gear].into_iter().flatten() {
            ensure!(
                g < n,
                format!("{}\nsaved gear {} out of range for {} gears", format_dbg!(), g, n)
            );
        }
        self.state.current_gear = snapshot.current_gear;
        self.state.next_gear = snapshot.next_gear;
        self.state.clutch_on = snapshot.clutch_on;
        self.state.change_timer = snapshot.change_timer_s * uc::S;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn two_speed_gearbox(operation: GearBoxOperation) -> GearBox {
        let mut gb = GearBox {
            gears: vec![
                Gear {
                    ratio: 60.0,
                    max_speed: 10.0 * uc::MPS,
                    max_tractive_force: 60e3 * uc::N,
                    coasting_force: 2e3 * uc::N,
                    up_shift_proportion: 0.9,
                    down_shift_proportion: 0.3,
                },
                Gear {
                    ratio: 25.0,
                    max_speed: 25.0 * uc::MPS,
                    max_tractive_force: 30e3 * uc::N,
                    coasting_force: 1e3 * uc::N,
                    up_shift_proportion: 0.9,
                    down_shift_proportion: 0.3,
                },
            ],
            operation,
            change_delay: 1.0 * uc::S,
            state: Default::default(),
            save_interval: None,
            history: Default::default(),
        };
        gb.init().unwrap();
        gb
    }

    #[test]
    fn test_manual_change_with_delay() {
        let mut gb = two_speed_gearbox(GearBoxOperation::Manual);
        gb.gear_up();
        assert!(gb.is_changing_gear());
        gb.update(0.5 * uc::S, 300.0, 300.0, 600.0, si::Velocity::ZERO, 0.0);
        assert_eq!(gb.state.current_gear, None);
        assert!(!gb.is_clutch_on());
        gb.update(0.5 * uc::S, 300.0, 300.0, 600.0, si::Velocity::ZERO, 0.0);
        assert_eq!(gb.state.current_gear, Some(0));
        assert!(!gb.is_changing_gear());
        gb.gear_up();
        gb.gear_up();
        assert_eq!(gb.state.next_gear, Some(1));
        gb.gear_down();
        gb.gear_down();
        assert_eq!(gb.state.next_gear, None);
    }

    #[test]
    fn test_clutch_percent() {
        let mut gb = two_speed_gearbox(GearBoxOperation::Manual);
        gb.state.current_gear = Some(0);
        gb.state.next_gear = Some(0);
        gb.update(0.1 * uc::S, 400.0, 300.0, 600.0, 2.0 * uc::MPS, 50.0);
        assert!(almost_eq(gb.shaft_rpm(), 120.0, None));
        assert!(almost_eq(gb.clutch_percent(), 70.0, None));
        assert!(!gb.is_clutch_on());
        gb.update(0.1 * uc::S, 400.0, 300.0, 600.0, 7.0 * uc::MPS, 50.0);
        assert!(gb.is_clutch_on());
        gb.update(0.1 * uc::S, 0.0, 300.0, 600.0, 7.0 * uc::MPS, 50.0);
        assert_eq!(gb.clutch_percent(), 100.0);
    }

    #[test]
    fn test_automatic_upshift() {
        let mut gb = two_speed_gearbox(GearBoxOperation::Automatic);
        gb.update(0.1 * uc::S, 300.0, 300.0, 600.0, si::Velocity::ZERO, 50.0);
        assert_eq!(gb.state.next_gear, Some(0));
        for _ in 0..10 {
            gb.update(0.1 * uc::S, 300.0, 300.0, 600.0, si::Velocity::ZERO, 50.0);
        }
        assert_eq!(gb.state.current_gear, Some(0));
        // 9.5 m/s * 60 = 570 rpm > 0.9 * 600
        gb.update(0.1 * uc::S, 570.0, 300.0, 600.0, 9.5 * uc::MPS, 50.0);
        assert_eq!(gb.state.next_gear, Some(1));
    }

    #[test]
    fn test_tractive_force() {
        let mut gb = two_speed_gearbox(GearBoxOperation::Manual);
        assert_eq!(
            gb.tractive_force(100.0, 500.0 * uc::KW, 5.0 * uc::MPS),
            si::Force::ZERO
        );
        gb.state.current_gear = Some(0);
        gb.state.next_gear = Some(0);
        assert_eq!(
            gb.tractive_force(50.0, 500.0 * uc::KW, 1.0 * uc::MPS),
            30e3 * uc::N
        );
        // power limited
        assert!(almost_eq_uom(
            &gb.tractive_force(100.0, 100.0 * uc::KW, 5.0 * uc::MPS),
            &(20e3 * uc::N),
            None
        ));
        assert_eq!(
            gb.tractive_force(0.0, 500.0 * uc::KW, 5.0 * uc::MPS),
            -2e3 * uc::N
        );
    }

    #[test]
    fn test_save_restore() {
        let mut gb = two_speed_gearbox(GearBoxOperation::Manual);
        gb.gear_up();
        gb.update(0.4 * uc::S, 300.0, 300.0, 600.0, si::Velocity::ZERO, 0.0);
        let mut buf = Vec::new();
        gb.save(&mut buf).unwrap();
        let mut restored = two_speed_gearbox(GearBoxOperation::Manual);
        restored.restore(&mut buf.as_slice()).unwrap();
        assert_eq!(restored.snapshot(), gb.snapshot());
    }
}
