//! Unit constants for building quantities with multiplication syntax,
//! e.g. `20.0 * uc::MPS`. Values are expressed in SI base units.

use crate::si;
use std::marker::PhantomData;

macro_rules! unit_const {
    ($($name:ident: $T:ident = $value:expr),+ $(,)?) => {
        $(
            pub const $name: si::$T = si::$T {
                dimension: PhantomData,
                units: PhantomData,
                value: $value,
            };
        )+
    };
}

unit_const!(
    R: Ratio = 1.0,
    S: Time = 1.0,
    HR: Time = 3600.0,
    M: Length = 1.0,
    MM: Length = 1e-3,
    KG: Mass = 1.0,
    KGM2: MomentOfInertia = 1.0,
    MPS: Velocity = 1.0,
    KPH: Velocity = 1.0 / 3.6,
    MPH: Velocity = 0.44704,
    MPS2: Acceleration = 1.0,
    N: Force = 1.0,
    KN: Force = 1e3,
    LBF: Force = 4.448_221_615_260_5,
    NM: Torque = 1.0,
    W: Power = 1.0,
    KW: Power = 1e3,
    MW: Power = 1e6,
    HP: Power = 745.699_871_582_270_2,
    J: Energy = 1.0,
    PA: Pressure = 1.0,
    KPA: Pressure = 1e3,
    BAR: Pressure = 1e5,
    PSI: Pressure = 6_894.757_293_168_361,
    INHG: Pressure = 3_386.389,
    M3: Volume = 1.0,
    L: Volume = 1e-3,
    LPS: VolumeRate = 1e-3,
    RADPS: AngularVelocity = 1.0,
);

/// Standard sea-level atmospheric pressure
pub const ATM: si::Pressure = si::Pressure {
    dimension: PhantomData,
    units: PhantomData,
    value: 101_325.0,
};

/// Standard gravitational acceleration
pub const ACC_GRAV: si::Acceleration = si::Acceleration {
    dimension: PhantomData,
    units: PhantomData,
    value: 9.80665,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::almost_eq;

    #[test]
    fn test_constants_match_uom_units() {
        assert!(almost_eq((1.0 * KPH).get::<si::kilometer_per_hour>(), 1.0, Some(1e-6)));
        assert!(almost_eq((1.0 * PSI).get::<si::psi>(), 1.0, Some(1e-6)));
        assert!(almost_eq((1.0 * INHG).get::<si::inch_of_mercury>(), 1.0, Some(1e-6)));
        assert!(almost_eq((1.0 * HP).get::<si::horsepower>(), 1.0, Some(1e-6)));
        assert!(almost_eq((1.0 * LPS).get::<si::liter_per_second>(), 1.0, Some(1e-6)));
        assert!(almost_eq((2.0 * HR).get::<si::hour>(), 2.0, Some(1e-6)));
        assert!(almost_eq(ATM.get::<si::bar>(), 1.01325, Some(1e-6)));
    }
}
