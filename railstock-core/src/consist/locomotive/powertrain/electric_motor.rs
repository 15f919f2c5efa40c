use super::*;

/// Traction motor attached to a single [Axle].
///
/// The owner sets the demanded torque each tick; the axle reads
/// [AxleMotor::developed_torque], integrates, and pushes back the resulting
/// shaft speed before calling [AxleMotor::update].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ElectricMotor {
    /// Armature inertia
    pub inertia: si::MomentOfInertia,
    /// Maximum torque (N·m) as a function of shaft speed (rad/s)
    #[serde(default)]
    pub torque_limit: Option<Interpolator>,
    /// Viscous friction torque per unit shaft speed (N·m·s/rad)
    #[serde(default)]
    pub friction_coeff: f64,
    #[serde(default)]
    pub state: ElectricMotorState,
    /// time step interval between saves. 1 is a good option. If None, no saving occurs.
    #[serde(default)]
    pub save_interval: Option<usize>,
    #[serde(default)]
    pub history: ElectricMotorStateHistoryVec,
}

impl Default for ElectricMotor {
    fn default() -> Self {
        Self {
            inertia: 20.0 * uc::KGM2,
            torque_limit: None,
            friction_coeff: 0.5,
            state: Default::default(),
            save_interval: None,
            history: Default::default(),
        }
    }
}

impl Init for ElectricMotor {
    fn init(&mut self) -> Result<(), Error> {
        if !(self.inertia.value > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "{}\nmotor inertia must be positive, got {:?}",
                format_dbg!(),
                self.inertia
            )));
        }
        if let Some(limit) = self.torque_limit.as_mut() {
            limit.init()?;
        }
        Ok(())
    }
}
impl SerdeAPI for ElectricMotor {}

impl ElectricMotor {
    /// Requests `torque` at the shaft; the developed torque is limited by
    /// [Self::torque_limit] and reduced by friction at the current speed.
    pub fn set_demanded_torque(&mut self, torque: si::Torque) {
        self.state.demanded_torque = torque;
        self.refresh_developed_torque();
    }

    fn refresh_developed_torque(&mut self) {
        let omega = self.state.angular_speed.get::<si::radian_per_second>();
        let mut torque = self.state.demanded_torque.get::<si::newton_meter>();
        if let Some(limit) = &self.torque_limit {
            let max = limit.get(omega.abs()).max(0.0);
            torque = torque.clamp(-max, max);
        }
        torque -= self.friction_coeff * omega;
        self.state.developed_torque = si::Torque::new::<si::newton_meter>(torque);
    }
}

impl AxleMotor for ElectricMotor {
    fn developed_torque(&self) -> si::Torque {
        self.state.developed_torque
    }

    fn inertia(&self) -> si::MomentOfInertia {
        self.inertia
    }

    fn set_angular_speed(&mut self, speed: si::AngularVelocity) {
        self.state.angular_speed = speed;
    }

    fn update(&mut self, _dt: si::Time) -> anyhow::Result<()> {
        self.state.i += 1;
        self.refresh_developed_torque();
        let omega = self.state.angular_speed.get::<si::radian_per_second>();
        let torque = self.state.developed_torque.get::<si::newton_meter>();
        self.state.power_out = si::Power::new::<si::watt>(torque * omega);
        self.save_state();
        Ok(())
    }
}

impl_save_state!(ElectricMotor);

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, HistoryVec)]
pub struct ElectricMotorState {
    /// iteration counter
    pub i: usize,
    /// torque requested by the owner
    pub demanded_torque: si::Torque,
    /// torque after limits and friction
    pub developed_torque: si::Torque,
    /// shaft speed pushed in by the axle
    pub angular_speed: si::AngularVelocity,
    /// mechanical power at the shaft
    pub power_out: si::Power,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_torque_limit_and_friction() {
        let mut motor = ElectricMotor {
            torque_limit: Some(
                Interpolator::new(vec![0.0, 100.0], vec![5_000.0, 1_000.0]).unwrap(),
            ),
            friction_coeff: 1.0,
            ..Default::default()
        };
        motor.set_angular_speed(si::AngularVelocity::new::<si::radian_per_second>(50.0));
        motor.set_demanded_torque(si::Torque::new::<si::newton_meter>(10_000.0));
        assert!(almost_eq(
            motor.developed_torque().get::<si::newton_meter>(),
            3_000.0 - 50.0,
            None
        ));
        motor.update(1.0 * uc::S).unwrap();
        assert!(almost_eq(
            motor.state.power_out.get::<si::watt>(),
            2_950.0 * 50.0,
            None
        ));
    }

    #[test]
    fn test_history() {
        let mut motor = ElectricMotor {
            save_interval: Some(1),
            ..Default::default()
        };
        for _ in 0..3 {
            motor.update(0.1 * uc::S).unwrap();
        }
        assert_eq!(motor.history.len(), 3);
        assert_eq!(motor.history.i, vec![1, 2, 3]);
    }

    #[test]
    fn test_invalid_inertia() {
        let mut motor = ElectricMotor {
            inertia: si::MomentOfInertia::ZERO,
            ..Default::default()
        };
        assert!(matches!(motor.init(), Err(Error::InvalidParameter(_))));
    }
}
