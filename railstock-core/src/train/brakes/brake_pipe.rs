use super::*;

/// Train brake pipe linking the vehicles' [VacuumBrake]s, lead vehicle first.
///
/// Pressure differences travel down the train by diffusion between adjacent
/// pipe sections, with [Self::time_factor] setting how quickly each section
/// equalizes with its neighbour.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BrakePipe {
    /// Equalization time constant between adjacent vehicles
    pub time_factor: si::Time,
    #[serde(default)]
    pub state: BrakePipeState,
    /// time step interval between saves. 1 is a good option. If None, no saving occurs.
    #[serde(default)]
    pub save_interval: Option<usize>,
    #[serde(default)]
    pub history: BrakePipeStateHistoryVec,
}

impl Default for BrakePipe {
    fn default() -> Self {
        Self {
            time_factor: 0.1 * uc::S,
            state: Default::default(),
            save_interval: None,
            history: Default::default(),
        }
    }
}

impl Init for BrakePipe {
    fn init(&mut self) -> Result<(), Error> {
        ensure_positive!(self.time_factor.get::<si::second>(), "time_factor");
        Ok(())
    }
}
impl SerdeAPI for BrakePipe {}

impl BrakePipe {
    /// Substeps keeping `substep / time_factor <= 0.5` so that the explicit
    /// diffusion stays stable
    pub fn num_substeps(&self, dt: si::Time) -> usize {
        let ratio = (dt / self.time_factor).get::<si::ratio>().max(0.0);
        (ratio * 2.0 + 1.0) as usize
    }

    /// Drives the lead vehicle's pipe with `controller`, propagates pipe
    /// pressure along `cars`, then updates every vehicle's brake. Returns the
    /// sound cues of each vehicle in train order.
    pub fn update(
        &mut self,
        dt: si::Time,
        controller: &BrakeController,
        env: &Environment,
        cars: &mut [VacuumBrake],
        wheel_skid: &[bool],
    ) -> anyhow::Result<Vec<Vec<BrakeSoundEvent>>> {
        ensure!(
            wheel_skid.is_empty() || wheel_skid.len() == cars.len(),
            format!(
                "{}\n{} wheel skid flags for {} cars",
                format_dbg!(),
                wheel_skid.len(),
                cars.len()
            )
        );
        self.state.i += 1;
        let n_steps = self.num_substeps(dt);
        let dt_sub = dt / n_steps as f64;
        let coeff = (dt_sub / self.time_factor).get::<si::ratio>();
        for _ in 0..n_steps {
            if let Some(lead) = cars.first_mut() {
                lead.drive_pipe(dt_sub, controller, env);
            }
            // flows between sections all come from the pressures at the start
            // of the substep, so a change moves at most one vehicle per substep
            let flows: Vec<f64> = cars
                .windows(2)
                .map(|pair| coeff * (pair[0].state.pipe_psia - pair[1].state.pipe_psia))
                .collect();
            for (idx, dp) in flows.into_iter().enumerate() {
                cars[idx].state.pipe_psia -= dp;
                cars[idx + 1].state.pipe_psia += dp;
            }
        }

        let mut events = Vec::with_capacity(cars.len());
        for (idx, car) in cars.iter_mut().enumerate() {
            let skid = wheel_skid.get(idx).copied().unwrap_or_default();
            events.push(
                car.update(dt, controller, env, skid)
                    .with_context(|| format!("{}\ncar {}", format_dbg!(), idx))?,
            );
        }

        self.state.first_car = cars.first().map(|car| car.status()).unwrap_or_default();
        self.state.last_car = cars.last().map(|car| car.status()).unwrap_or_default();
        self.save_state();
        Ok(events)
    }
}

impl_save_state!(BrakePipe);

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, HistoryVec)]
pub struct BrakePipeState {
    /// iteration counter
    pub i: usize,
    /// lead vehicle gauges
    pub first_car: BrakeStatus,
    /// rear vehicle gauges
    pub last_car: BrakeStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_substeps() {
        let pipe = BrakePipe::default();
        assert_eq!(pipe.num_substeps(0.1 * uc::S), 3);
        assert_eq!(pipe.num_substeps(si::Time::ZERO), 1);
    }

    #[test]
    fn test_propagation_reaches_rear() {
        let mut pipe = BrakePipe::default();
        let env = Environment::default();
        let mut cars = vec![VacuumBrake::default(); 10];
        let controller = BrakeController::auto_full_service();
        let mut rear_moved_at = None;
        for step in 0..3_000 {
            pipe.update(0.1 * uc::S, &controller, &env, &mut cars, &[])
                .unwrap();
            if rear_moved_at.is_none() && pipe.state.last_car.brake_force > si::Force::ZERO {
                rear_moved_at = Some(step);
            }
        }
        // rear car applies after the lead and eventually fully
        assert!(rear_moved_at.unwrap() > 0);
        for car in &cars {
            assert!(almost_eq_uom(&car.brake_force(), &car.max_brake_force, Some(1e-6)));
        }
        assert!(pipe.state.first_car.pipe_vacuum_inhg.abs() < 1e-6);
    }

    #[test]
    fn test_rear_lags_lead() {
        let mut pipe = BrakePipe::default();
        let env = Environment::default();
        let mut cars = vec![VacuumBrake::default(); 10];
        let controller = BrakeController::auto_full_service();
        let lead_before = cars[0].state.pipe_psia;
        let rear_before = cars[9].state.pipe_psia;
        // 3 substeps per tick: the change reaches the fourth vehicle at most
        pipe.update(0.1 * uc::S, &controller, &env, &mut cars, &[])
            .unwrap();
        assert!(cars[0].state.pipe_psia > lead_before);
        assert!(cars[3].state.pipe_psia > rear_before);
        for car in &cars[4..] {
            assert_eq!(car.state.pipe_psia, rear_before);
            assert_eq!(car.brake_force(), si::Force::ZERO);
        }
        assert_eq!(pipe.state.last_car.brake_force, si::Force::ZERO);

        pipe.update(0.1 * uc::S, &controller, &env, &mut cars, &[])
            .unwrap();
        assert!(cars[6].state.pipe_psia > rear_before);
        assert_eq!(cars[9].state.pipe_psia, rear_before);
    }

    #[test]
    fn test_skid_flags_length_checked() {
        let mut pipe = BrakePipe::default();
        let mut cars = vec![VacuumBrake::default(); 3];
        assert!(pipe
            .update(
                0.1 * uc::S,
                &BrakeController::auto_release(),
                &Environment::default(),
                &mut cars,
                &[true],
            )
            .is_err());
    }
}
