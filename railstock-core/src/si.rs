//! Import uom si system and add unit constants
//! Zero values should be created using standard uom syntax ($Quantity::ZERO) after adding "use crate::imports::*"
//! Non-zero values should be created using standard uom syntax ($Quantity::new::<$unit>($value)) or multiplication syntax ($value * $UNIT_CONSTANT)

use uom::si;

pub use si::acceleration::meter_per_second_squared;
pub use si::angular_velocity::{radian_per_second, revolution_per_minute};
pub use si::energy::{joule, kilowatt_hour};
pub use si::f64::{
    Acceleration, AngularVelocity, Energy, Force, Length, Mass, MomentOfInertia, Power, Pressure,
    Ratio, TemperatureInterval, ThermodynamicTemperature, Time, Torque, Velocity, Volume,
    VolumeRate,
};
pub use si::force::{kilonewton, newton, pound_force};
pub use si::length::{foot, meter, millimeter};
pub use si::mass::{kilogram, megagram};
pub use si::moment_of_inertia::kilogram_square_meter;
pub use si::power::{horsepower, kilowatt, megawatt, watt};
pub use si::pressure::{bar, inch_of_mercury, kilopascal, pascal, pound_force_per_square_inch as psi};
pub use si::ratio::{percent, ratio};
pub use si::temperature_interval::kelvin as kelvin_interval;
pub use si::thermodynamic_temperature::{degree_celsius, degree_fahrenheit, kelvin};
pub use si::time::{hour, second};
pub use si::torque::newton_meter;
pub use si::velocity::{kilometer_per_hour, meter_per_second, mile_per_hour};
pub use si::volume::{cubic_meter, liter};
pub use si::volume_rate::liter_per_second;
