//! Wheelset rotational dynamics with Curtius-Kniffler adhesion.
//!
//! The axle integrates its own surface speed (m/s at the wheel tread) from the
//! net of motive force, rail adhesion force and retarding forces. The rail
//! adhesion force follows the slip characteristic of [CurtiusKniffler].

use super::*;

const SQRT_3: f64 = 1.732_050_807_568_877_2;
/// Fraction of `umax` retained at infinite slip
const DEEP_SLIP_FLOOR: f64 = 0.4;
/// `adhesion2` value at which `umax` is not rescaled
const ADHESION2_REF: f64 = 0.331455;
/// Below this train speed, slip percent is not computed relative to speed
const MIN_SPEED_FOR_SLIP_PERCENT_MPS: f64 = 0.01;

/// Curtius-Kniffler empirical adhesion coefficients,
/// `umax = conditions * (A / (v_kph + B) + C)`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurtiusKniffler {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    /// Slip characteristic correction factor; zero is treated as 1
    pub k: f64,
}

impl Default for CurtiusKniffler {
    fn default() -> Self {
        Self {
            a: 7.5,
            b: 44.0,
            c: 0.161,
            k: 0.7,
        }
    }
}

fn effective_k(k: f64) -> f64 {
    if k == 0.0 {
        1.0
    } else {
        k.abs()
    }
}

impl CurtiusKniffler {
    /// Peak adhesion coefficient at train `speed`
    pub fn umax(&self, speed: si::Velocity, conditions: f64, adhesion2: f64) -> f64 {
        let speed_kph = speed.get::<si::kilometer_per_hour>().abs();
        let umax = conditions * (self.a / (speed_kph + self.b) + self.c);
        if adhesion2 > 0.0 {
            umax * adhesion2 / ADHESION2_REF
        } else {
            umax
        }
    }

    /// Signed adhesion coefficient developed at `slip_speed` while the train
    /// moves at `speed`.
    ///
    /// Below `x = √3`, where `x = |slip_kph| * umax / k`, the closed-form
    /// peak curve applies; beyond it the coefficient decays exponentially
    /// toward 40 % of `umax`, joined continuously at `x = √3`.
    pub fn slip_characteristics(
        &self,
        slip_speed: si::Velocity,
        speed: si::Velocity,
        k: f64,
        conditions: f64,
        adhesion2: f64,
    ) -> f64 {
        let k = effective_k(k);
        let umax = self.umax(speed, conditions, adhesion2);
        if umax <= 0.0 {
            return 0.0;
        }
        let slip_kph = slip_speed.get::<si::kilometer_per_hour>();
        let x = slip_kph.abs() * umax / k;
        if x <= SQRT_3 {
            2.0 * k * umax * umax * slip_kph / (umax * umax * slip_kph * slip_kph + k * k)
        } else {
            let decay = ((SQRT_3 - x) / (2.0 * SQRT_3 - 4.0 * DEEP_SLIP_FLOOR)).exp();
            utils::sign(slip_kph)
                * umax
                * ((SQRT_3 / 2.0 - DEEP_SLIP_FLOOR) * decay + DEEP_SLIP_FLOOR)
        }
    }

    /// Slip speed at which [Self::slip_characteristics] peaks (`x = 1`)
    pub fn wheel_slip_threshold(
        &self,
        speed: si::Velocity,
        k: f64,
        conditions: f64,
        adhesion2: f64,
    ) -> si::Velocity {
        let umax = self.umax(speed, conditions, adhesion2).max(f64::EPSILON);
        si::Velocity::new::<si::kilometer_per_hour>(effective_k(k) / umax)
    }
}

/// How motive force reaches the axle
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, IsVariant)]
pub enum AxleDrive {
    /// Trailing axle, only braking and friction act on it
    #[default]
    NotDriven,
    /// Motive force is set directly with [Axle::set_drive_force]
    ForceDriven,
    /// Motive force comes from the torque of an attached motor
    MotorDriven(ElectricMotor),
}

/// One powered or unpowered wheelset.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Axle {
    #[serde(default)]
    pub drive: AxleDrive,
    /// Rotational inertia of the wheelset, excluding any motor
    inertia: si::MomentOfInertia,
    /// Motor revolutions per wheel revolution
    transmission_ratio: f64,
    pub transmission_efficiency: f64,
    /// Wheel diameter
    diameter: si::Length,
    /// Normal force of the wheelset on the rail
    pub axle_weight: si::Force,
    /// Viscous damping on slip speed, N per m/s
    #[serde(default)]
    pub damping: f64,
    /// Constant friction opposing rotation
    #[serde(default)]
    pub friction: si::Force,
    #[serde(default)]
    pub adhesion: CurtiusKniffler,
    /// Weather-dependent adhesion multiplier, typically 0.2 to 1.0
    pub adhesion_conditions: f64,
    /// Secondary adhesion scaling; ignored when not positive
    pub adhesion2: f64,
    /// Percentage of the wheel slip threshold that raises the slip warning
    pub slip_warning_threshold: f64,
    #[serde(default)]
    pub integrator: Integrator,
    #[serde(default)]
    pub slip_rate_filter: IirFilter,
    #[serde(default)]
    pub state: AxleState,
    /// time step interval between saves. 1 is a good option. If None, no saving occurs.
    #[serde(default)]
    pub save_interval: Option<usize>,
    #[serde(default)]
    pub history: AxleStateHistoryVec,
}

impl Default for Axle {
    fn default() -> Self {
        let file_contents = include_str!("axle.default.yaml");
        Self::from_yaml(file_contents, false).unwrap()
    }
}

impl Init for Axle {
    fn init(&mut self) -> Result<(), Error> {
        Self::check_inertia(self.inertia)?;
        Self::check_transmission_ratio(self.transmission_ratio)?;
        Self::check_diameter(self.diameter)?;
        if !(self.transmission_efficiency > 0.0 && self.transmission_efficiency <= 1.0) {
            return Err(Error::InvalidParameter(format!(
                "{}\n`transmission_efficiency` must be in (0, 1], got {}",
                format_dbg!(),
                self.transmission_efficiency
            )));
        }
        if let AxleDrive::MotorDriven(motor) = &mut self.drive {
            motor.init()?;
        }
        self.integrator.init()?;
        self.slip_rate_filter.init()?;
        Ok(())
    }
}
impl SerdeAPI for Axle {}

impl Axle {
    fn check_inertia(inertia: si::MomentOfInertia) -> Result<(), Error> {
        ensure_positive!(inertia.get::<si::kilogram_square_meter>(), "inertia");
        Ok(())
    }

    fn check_transmission_ratio(ratio: f64) -> Result<(), Error> {
        ensure_positive!(ratio, "transmission_ratio");
        Ok(())
    }

    fn check_diameter(diameter: si::Length) -> Result<(), Error> {
        ensure_positive!(diameter.get::<si::meter>(), "diameter");
        Ok(())
    }

    pub fn inertia(&self) -> si::MomentOfInertia {
        self.inertia
    }

    /// Fails with [Error::InvalidParameter] unless `inertia` is positive
    pub fn set_inertia(&mut self, inertia: si::MomentOfInertia) -> Result<(), Error> {
        Self::check_inertia(inertia)?;
        self.inertia = inertia;
        Ok(())
    }

    pub fn transmission_ratio(&self) -> f64 {
        self.transmission_ratio
    }

    /// Fails with [Error::InvalidParameter] unless `ratio` is positive
    pub fn set_transmission_ratio(&mut self, ratio: f64) -> Result<(), Error> {
        Self::check_transmission_ratio(ratio)?;
        self.transmission_ratio = ratio;
        Ok(())
    }

    pub fn diameter(&self) -> si::Length {
        self.diameter
    }

    /// Fails with [Error::InvalidParameter] unless `diameter` is positive
    pub fn set_diameter(&mut self, diameter: si::Length) -> Result<(), Error> {
        Self::check_diameter(diameter)?;
        self.diameter = diameter;
        Ok(())
    }

    fn radius_m(&self) -> f64 {
        self.diameter.get::<si::meter>() / 2.0
    }

    /// Wheelset inertia plus motor inertia reflected through the transmission
    pub fn total_inertia(&self) -> si::MomentOfInertia {
        match &self.drive {
            AxleDrive::MotorDriven(motor) => {
                self.inertia + motor.inertia() * self.transmission_ratio.powi(2)
            }
            _ => self.inertia,
        }
    }

    /// Force at the wheel tread produced by the drive
    pub fn motive_force(&self) -> si::Force {
        match &self.drive {
            AxleDrive::NotDriven => si::Force::ZERO,
            AxleDrive::ForceDriven => self.state.drive_force,
            AxleDrive::MotorDriven(motor) => si::Force::new::<si::newton>(
                motor.developed_torque().get::<si::newton_meter>()
                    * self.transmission_efficiency
                    * self.transmission_ratio
                    / self.radius_m(),
            ),
        }
    }

    pub fn set_drive_force(&mut self, force: si::Force) {
        self.state.drive_force = force;
    }

    pub fn set_brake_retard_force(&mut self, force: si::Force) {
        self.state.brake_retard_force = force;
    }

    pub fn set_train_speed(&mut self, speed: si::Velocity) {
        self.state.train_speed = speed;
    }

    pub fn set_adhesion_conditions(&mut self, conditions: f64) {
        self.adhesion_conditions = conditions;
    }

    pub fn axle_speed(&self) -> si::Velocity {
        self.state.axle_speed
    }

    /// Force transmitted between wheel and rail, averaged over the last update
    pub fn axle_force(&self) -> si::Force {
        self.state.axle_force
    }

    pub fn slip_speed(&self) -> si::Velocity {
        self.state.slip_speed
    }

    pub fn slip_speed_percent(&self) -> f64 {
        self.state.slip_speed_percent
    }

    pub fn slip_speed_rate(&self) -> si::Acceleration {
        self.state.slip_speed_rate
    }

    pub fn filtered_slip_speed_rate(&self) -> si::Acceleration {
        self.state.filtered_slip_speed_rate
    }

    pub fn is_wheel_slip(&self) -> bool {
        self.state.is_wheel_slip
    }

    pub fn is_wheel_slip_warning(&self) -> bool {
        self.state.is_wheel_slip_warning
    }

    /// Signed adhesion coefficient at `slip_speed` for the current train speed
    /// and rail conditions
    pub fn slip_characteristics(&self, slip_speed: si::Velocity) -> f64 {
        self.adhesion.slip_characteristics(
            slip_speed,
            self.state.train_speed,
            self.adhesion.k,
            self.adhesion_conditions,
            self.adhesion2,
        )
    }

    /// Slip speed beyond which the wheelset is considered slipping
    pub fn wheel_slip_threshold(&self) -> si::Velocity {
        self.adhesion.wheel_slip_threshold(
            self.state.train_speed,
            self.adhesion.k,
            self.adhesion_conditions,
            self.adhesion2,
        )
    }

    /// Zeroes axle speed, slip history and filter state
    pub fn reset(&mut self) {
        self.integrator.reset();
        self.slip_rate_filter.reset(0.0);
        self.state.axle_speed = si::Velocity::ZERO;
        self.state.axle_force = si::Force::ZERO;
        self.state.slip_speed = si::Velocity::ZERO;
        self.state.prev_slip_speed = si::Velocity::ZERO;
        self.state.slip_speed_percent = 0.0;
        self.state.prev_slip_speed_percent = 0.0;
        self.state.slip_speed_rate = si::Acceleration::ZERO;
        self.state.filtered_slip_speed_rate = si::Acceleration::ZERO;
    }

    /// Seeds the axle speed without a discontinuity in the slip history
    pub fn reset_to(&mut self, axle_speed: si::Velocity) {
        self.integrator
            .reset_to(axle_speed.get::<si::meter_per_second>());
        self.slip_rate_filter.reset(0.0);
        self.state.axle_speed = axle_speed;
        self.state.slip_speed = axle_speed - self.state.train_speed;
        self.state.prev_slip_speed = self.state.slip_speed;
        self.state.slip_speed_percent = self.slip_percent_of(self.state.slip_speed);
        self.state.prev_slip_speed_percent = self.state.slip_speed_percent;
        self.state.slip_speed_rate = si::Acceleration::ZERO;
        self.state.filtered_slip_speed_rate = si::Acceleration::ZERO;
    }

    fn slip_percent_of(&self, slip: si::Velocity) -> f64 {
        let slip = slip.get::<si::meter_per_second>();
        let train_speed = self.state.train_speed.get::<si::meter_per_second>().abs();
        if train_speed > MIN_SPEED_FOR_SLIP_PERCENT_MPS {
            slip / train_speed * 100.0
        } else {
            utils::sign(slip) * 100.0
        }
    }

    /// Advances the axle by `dt`
    pub fn update(&mut self, dt: si::Time) -> anyhow::Result<()> {
        ensure!(
            dt >= si::Time::ZERO,
            format!("{}\n`dt` must not be negative", format_dbg!(dt))
        );
        self.state.i += 1;
        let dt_s = dt.get::<si::second>();
        let radius = self.radius_m();
        let inertia = self.total_inertia().get::<si::kilogram_square_meter>();
        let motive = self.motive_force().get::<si::newton>();
        let retard = (self.state.brake_retard_force + self.friction)
            .get::<si::newton>()
            .abs();
        let weight = self.axle_weight.get::<si::newton>();
        let damping = self.damping;
        let train_speed = self.state.train_speed;
        let v_train = train_speed.get::<si::meter_per_second>();
        let adhesion = self.adhesion;
        let (conditions, adhesion2) = (self.adhesion_conditions, self.adhesion2);

        let prev_axle_speed = self.integrator.value();
        let axle_speed = self.integrator.integrate(dt_s, |v| {
            let slip = si::Velocity::new::<si::meter_per_second>(v - v_train);
            let axle_force = weight
                * adhesion.slip_characteristics(slip, train_speed, adhesion.k, conditions, adhesion2);
            let direction = if v != 0.0 {
                utils::sign(v)
            } else {
                utils::sign(motive - axle_force)
            };
            let net_force = motive - axle_force - direction * retard - damping * (v - v_train);
            (net_force * radius * radius / inertia, axle_force)
        });
        let axle_force = self.integrator.avg_output();

        if prev_axle_speed * axle_speed < 0.0 {
            log::debug!(
                "{}\naxle speed changed sign ({} -> {} m/s), resetting",
                format_dbg!(),
                prev_axle_speed,
                axle_speed
            );
            self.reset();
        } else {
            self.state.axle_speed = si::Velocity::new::<si::meter_per_second>(axle_speed);
            self.state.axle_force = si::Force::new::<si::newton>(axle_force);
        }

        self.state.prev_slip_speed = self.state.slip_speed;
        self.state.prev_slip_speed_percent = self.state.slip_speed_percent;
        self.state.slip_speed = self.state.axle_speed - train_speed;
        self.state.slip_speed_percent = self.slip_percent_of(self.state.slip_speed);
        let slip_rate = if dt_s > 0.0 {
            (self.state.slip_speed - self.state.prev_slip_speed).get::<si::meter_per_second>()
                / dt_s
        } else {
            0.0
        };
        self.state.slip_speed_rate = slip_rate * uc::MPS2;
        self.state.filtered_slip_speed_rate =
            self.slip_rate_filter.filter(slip_rate, dt_s) * uc::MPS2;

        let threshold = self.wheel_slip_threshold();
        self.state.wheel_slip_threshold = threshold;
        let slip = self.state.slip_speed.abs();
        self.state.is_wheel_slip = slip > threshold;
        self.state.is_wheel_slip_warning = slip > threshold * self.slip_warning_threshold / 100.0;

        let shaft_speed = self.state.axle_speed.get::<si::meter_per_second>() / radius
            * self.transmission_ratio;
        if let AxleDrive::MotorDriven(motor) = &mut self.drive {
            motor.set_angular_speed(si::AngularVelocity::new::<si::radian_per_second>(
                shaft_speed,
            ));
            motor.update(dt).with_context(|| format_dbg!())?;
        }
        self.save_state();
        Ok(())
    }
}

impl_save_state!(Axle);

/// Persisted axle fields, in save-file order
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxleSnapshot {
    pub prev_slip_speed_percent: f64,
    pub prev_slip_speed_mps: f64,
    pub axle_force_n: f64,
    pub axle_speed_mps: f64,
}

impl SaveRestore for Axle {
    type Snapshot = AxleSnapshot;

    fn snapshot(&self) -> Self::Snapshot {
        AxleSnapshot {
            prev_slip_speed_percent: self.state.prev_slip_speed_percent,
            prev_slip_speed_mps: self.state.prev_slip_speed.get::<si::meter_per_second>(),
            axle_force_n: self.state.axle_force.get::<si::newton>(),
            axle_speed_mps: self.state.axle_speed.get::<si::meter_per_second>(),
        }
    }

    fn apply_snapshot(&mut self, snapshot: Self::Snapshot) -> anyhow::Result<()> {
        self.integrator.reset_to(snapshot.axle_speed_mps);
        self.state.axle_speed = snapshot.axle_speed_mps * uc::MPS;
        self.state.axle_force = snapshot.axle_force_n * uc::N;
        self.state.prev_slip_speed = snapshot.prev_slip_speed_mps * uc::MPS;
        self.state.prev_slip_speed_percent = snapshot.prev_slip_speed_percent;
        self.state.slip_speed = self.state.axle_speed - self.state.train_speed;
        self.state.slip_speed_percent = self.slip_percent_of(self.state.slip_speed);
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, HistoryVec)]
pub struct AxleState {
    /// iteration counter
    pub i: usize,
    /// ground speed of the train, set by the owner
    pub train_speed: si::Velocity,
    /// wheel tread speed
    pub axle_speed: si::Velocity,
    /// force requested from a [AxleDrive::ForceDriven] drive
    pub drive_force: si::Force,
    /// braking force at the tread
    pub brake_retard_force: si::Force,
    /// wheel-rail force
    pub axle_force: si::Force,
    pub slip_speed: si::Velocity,
    pub prev_slip_speed: si::Velocity,
    /// slip relative to train speed
    pub slip_speed_percent: f64,
    pub prev_slip_speed_percent: f64,
    pub slip_speed_rate: si::Acceleration,
    pub filtered_slip_speed_rate: si::Acceleration,
    pub wheel_slip_threshold: si::Velocity,
    pub is_wheel_slip: bool,
    pub is_wheel_slip_warning: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kph(v: f64) -> si::Velocity {
        si::Velocity::new::<si::kilometer_per_hour>(v)
    }

    #[test]
    fn test_zero_slip_gives_zero_adhesion() {
        let ck = CurtiusKniffler::default();
        for speed in [0.0, 10.0, 50.0, 120.0, 250.0] {
            for (k, conditions) in [(0.7, 1.0), (0.0, 0.5), (1.2, 0.2)] {
                assert_eq!(
                    ck.slip_characteristics(kph(0.0), kph(speed), k, conditions, 0.331455),
                    0.0
                );
            }
        }
    }

    #[test]
    fn test_adhesion_continuous_at_sqrt3() {
        let ck = CurtiusKniffler::default();
        for speed in [0.0, 30.0, 90.0, 200.0] {
            let k = 0.7;
            let umax = ck.umax(kph(speed), 1.0, 0.0);
            let slip_at_split = SQRT_3 * k / umax;
            let below = ck.slip_characteristics(kph(slip_at_split - 1e-9), kph(speed), k, 1.0, 0.0);
            let above = ck.slip_characteristics(kph(slip_at_split + 1e-9), kph(speed), k, 1.0, 0.0);
            assert!((below - above).abs() < 1e-8);
            assert!(almost_eq(below, SQRT_3 / 2.0 * umax, Some(1e-6)));
        }
    }

    #[test]
    fn test_adhesion_shape() {
        let ck = CurtiusKniffler::default();
        let speed = kph(72.0);
        let umax = ck.umax(speed, 1.0, 0.331455);
        let peak_slip = ck.wheel_slip_threshold(speed, 0.7, 1.0, 0.331455);
        let peak = ck.slip_characteristics(peak_slip, speed, 0.7, 1.0, 0.331455);
        assert!(almost_eq(peak, umax, Some(1e-6)));
        // odd in slip speed
        let neg = ck.slip_characteristics(-peak_slip, speed, 0.7, 1.0, 0.331455);
        assert!(almost_eq(neg, -umax, Some(1e-6)));
        // deep slip floors at 40 % of umax
        let deep = ck.slip_characteristics(kph(1e4), speed, 0.7, 1.0, 0.331455);
        assert!(almost_eq(deep, 0.4 * umax, Some(1e-6)));
    }

    #[test]
    fn test_wheel_slip_threshold_positive() {
        let ck = CurtiusKniffler::default();
        for speed in [0.0, 20.0, 100.0, 300.0] {
            for conditions in [0.2, 0.6, 1.0] {
                for k in [0.0, 0.3, 0.7] {
                    assert!(ck.wheel_slip_threshold(kph(speed), k, conditions, 0.0) > si::Velocity::ZERO);
                }
            }
        }
    }

    #[test]
    fn test_invalid_parameters() {
        let mut axle = Axle::default();
        assert!(matches!(
            axle.set_inertia(si::MomentOfInertia::ZERO),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            axle.set_transmission_ratio(-1.0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            axle.set_diameter(si::Length::ZERO),
            Err(Error::InvalidParameter(_))
        ));
        assert!(axle.set_diameter(0.9 * uc::M).is_ok());
        assert!(Axle::from_yaml(
            include_str!("axle.default.yaml").replace("inertia: 2000.0", "inertia: -1.0"),
            false
        )
        .is_err());
    }

    #[test]
    fn test_drive_force_ramp_causes_wheel_slip() {
        let mut axle = Axle::default();
        axle.set_train_speed(20.0 * uc::MPS);
        axle.reset_to(20.0 * uc::MPS);
        let adhesion_limit =
            axle.adhesion.umax(20.0 * uc::MPS, 1.0, axle.adhesion2) * axle.axle_weight;
        let dt = 0.05 * uc::S;
        let mut force = si::Force::ZERO;
        let mut slip_force = None;
        while force < 2.0 * adhesion_limit {
            force += 500.0 * uc::N;
            axle.set_drive_force(force);
            axle.update(dt).unwrap();
            if force < 0.9 * adhesion_limit {
                assert!(!axle.is_wheel_slip());
            }
            if axle.is_wheel_slip() {
                slip_force = Some(force);
                break;
            }
        }
        let slip_force = slip_force.expect("wheel slip never detected");
        assert!(slip_force > 0.9 * adhesion_limit);
        assert!(axle.slip_speed() > axle.wheel_slip_threshold());
        assert!(axle.is_wheel_slip_warning());
    }

    #[test]
    fn test_steady_drive_reaches_equilibrium_slip() {
        let mut axle = Axle::default();
        axle.set_train_speed(20.0 * uc::MPS);
        axle.reset_to(20.0 * uc::MPS);
        axle.set_drive_force(20e3 * uc::N);
        for _ in 0..200 {
            axle.update(0.05 * uc::S).unwrap();
        }
        assert!(almost_eq_uom(&axle.axle_force(), &(20e3 * uc::N), Some(1e-3)));
        assert!(axle.slip_speed() > si::Velocity::ZERO);
        assert!(!axle.is_wheel_slip());
        assert!(axle.slip_speed_rate().abs() < 1e-3 * uc::MPS2);
    }

    #[test]
    fn test_zero_crossing_resets() {
        let mut axle = Axle::default();
        axle.set_train_speed(si::Velocity::ZERO);
        axle.reset_to(0.05 * uc::MPS);
        axle.set_drive_force(-60e3 * uc::N);
        axle.update(0.1 * uc::S).unwrap();
        assert_eq!(axle.axle_speed(), si::Velocity::ZERO);
        assert_eq!(axle.integrator.value(), 0.0);
        axle.update(0.1 * uc::S).unwrap();
        assert!(axle.axle_speed() < si::Velocity::ZERO);
    }

    #[test]
    fn test_motor_driven_axle() {
        let mut axle = Axle {
            drive: AxleDrive::MotorDriven(ElectricMotor::default()),
            ..Default::default()
        };
        axle.set_train_speed(10.0 * uc::MPS);
        axle.reset_to(10.0 * uc::MPS);
        if let AxleDrive::MotorDriven(motor) = &mut axle.drive {
            motor.set_demanded_torque(si::Torque::new::<si::newton_meter>(2_000.0));
        }
        let motive = axle.motive_force();
        assert!(motive > si::Force::ZERO);
        axle.update(0.1 * uc::S).unwrap();
        assert!(axle.axle_speed() > 10.0 * uc::MPS);
        let expected_omega = axle.axle_speed().get::<si::meter_per_second>() / 0.5 * 4.0;
        match &axle.drive {
            AxleDrive::MotorDriven(motor) => {
                assert!(almost_eq(
                    motor.state.angular_speed.get::<si::radian_per_second>(),
                    expected_omega,
                    None
                ));
                assert_eq!(motor.state.i, 1);
            }
            _ => unreachable!(),
        }
        assert!(axle.total_inertia() > axle.inertia());
    }

    #[test]
    fn test_save_restore() {
        let mut axle = Axle::default();
        axle.set_train_speed(15.0 * uc::MPS);
        axle.reset_to(15.0 * uc::MPS);
        axle.set_drive_force(30e3 * uc::N);
        for _ in 0..5 {
            axle.update(0.1 * uc::S).unwrap();
        }
        let mut buf = Vec::new();
        axle.save(&mut buf).unwrap();

        let mut restored = Axle::default();
        restored.set_train_speed(15.0 * uc::MPS);
        restored.restore(&mut buf.as_slice()).unwrap();
        assert_eq!(restored.snapshot(), axle.snapshot());
        assert_eq!(restored.axle_speed(), axle.axle_speed());

        // version mismatch is rejected
        buf[0] = 99;
        assert!(restored.restore(&mut buf.as_slice()).is_err());
    }

    #[test]
    fn test_history() {
        let mut axle = Axle {
            save_interval: Some(2),
            ..Default::default()
        };
        for _ in 0..4 {
            axle.update(0.1 * uc::S).unwrap();
        }
        // saved at i = 1, 2, 4
        assert_eq!(axle.history.i, vec![1, 2, 4]);
    }
}
