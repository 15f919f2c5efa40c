//! Conversions between the unit systems found in rolling-stock data.
//!
//! The named functions cover the conversions used throughout the crate. For
//! conversions selected at runtime (e.g. from a unit written in a config file),
//! parse a [Unit] and call [convert].

use crate::imports::*;
use std::str::FromStr;

pub fn mps_from_mph(mph: f64) -> f64 {
    si::Velocity::new::<si::mile_per_hour>(mph).get::<si::meter_per_second>()
}

pub fn mph_from_mps(mps: f64) -> f64 {
    si::Velocity::new::<si::meter_per_second>(mps).get::<si::mile_per_hour>()
}

pub fn mps_from_kph(kph: f64) -> f64 {
    kph / 3.6
}

pub fn kph_from_mps(mps: f64) -> f64 {
    mps * 3.6
}

pub fn bar_from_psi(psi: f64) -> f64 {
    si::Pressure::new::<si::psi>(psi).get::<si::bar>()
}

pub fn psi_from_bar(bar: f64) -> f64 {
    si::Pressure::new::<si::bar>(bar).get::<si::psi>()
}

pub fn kpa_from_psi(psi: f64) -> f64 {
    si::Pressure::new::<si::psi>(psi).get::<si::kilopascal>()
}

pub fn psi_from_kpa(kpa: f64) -> f64 {
    si::Pressure::new::<si::kilopascal>(kpa).get::<si::psi>()
}

pub fn inhg_from_psi(psi: f64) -> f64 {
    psi * uc::PSI.value / uc::INHG.value
}

pub fn psi_from_inhg(inhg: f64) -> f64 {
    inhg * uc::INHG.value / uc::PSI.value
}

/// Absolute pressure in psi for a vacuum gauge reading in inches of mercury
/// below `atm_psi`
pub fn psia_from_vacuum_inhg(vacuum_inhg: f64, atm_psi: f64) -> f64 {
    atm_psi - psi_from_inhg(vacuum_inhg)
}

/// Vacuum gauge reading in inches of mercury for absolute pressure `psia`
pub fn vacuum_inhg_from_psia(psia: f64, atm_psi: f64) -> f64 {
    inhg_from_psi(atm_psi - psia)
}

pub fn c_from_f(deg_f: f64) -> f64 {
    (deg_f - 32.0) * 5.0 / 9.0
}

pub fn f_from_c(deg_c: f64) -> f64 {
    deg_c * 9.0 / 5.0 + 32.0
}

pub fn w_from_hp(hp: f64) -> f64 {
    si::Power::new::<si::horsepower>(hp).get::<si::watt>()
}

pub fn hp_from_w(w: f64) -> f64 {
    si::Power::new::<si::watt>(w).get::<si::horsepower>()
}

pub fn n_from_lbf(lbf: f64) -> f64 {
    si::Force::new::<si::pound_force>(lbf).get::<si::newton>()
}

pub fn lbf_from_n(n: f64) -> f64 {
    si::Force::new::<si::newton>(n).get::<si::pound_force>()
}

pub fn lps_from_lph(lph: f64) -> f64 {
    lph / 3600.0
}

pub fn rpm_from_radps(radps: f64) -> f64 {
    si::AngularVelocity::new::<si::radian_per_second>(radps).get::<si::revolution_per_minute>()
}

pub fn radps_from_rpm(rpm: f64) -> f64 {
    si::AngularVelocity::new::<si::revolution_per_minute>(rpm).get::<si::radian_per_second>()
}

/// Physical dimension of a [Unit]; conversions only exist within a dimension
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dimension {
    Velocity,
    Pressure,
    Force,
    Power,
    Temperature,
}

/// Units accepted by [convert]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    MetersPerSecond,
    KilometersPerHour,
    MilesPerHour,
    Pascal,
    Kilopascal,
    Bar,
    Psi,
    InchesOfMercury,
    Newton,
    Kilonewton,
    PoundForce,
    Watt,
    Kilowatt,
    Horsepower,
    Celsius,
    Fahrenheit,
    Kelvin,
}

impl Unit {
    pub fn dimension(&self) -> Dimension {
        match self {
            Self::MetersPerSecond | Self::KilometersPerHour | Self::MilesPerHour => {
                Dimension::Velocity
            }
            Self::Pascal | Self::Kilopascal | Self::Bar | Self::Psi | Self::InchesOfMercury => {
                Dimension::Pressure
            }
            Self::Newton | Self::Kilonewton | Self::PoundForce => Dimension::Force,
            Self::Watt | Self::Kilowatt | Self::Horsepower => Dimension::Power,
            Self::Celsius | Self::Fahrenheit | Self::Kelvin => Dimension::Temperature,
        }
    }

    /// Value expressed in the SI base unit of this unit's dimension
    fn to_base(self, value: f64) -> f64 {
        match self {
            Self::MetersPerSecond => value,
            Self::KilometersPerHour => {
                si::Velocity::new::<si::kilometer_per_hour>(value).get::<si::meter_per_second>()
            }
            Self::MilesPerHour => {
                si::Velocity::new::<si::mile_per_hour>(value).get::<si::meter_per_second>()
            }
            Self::Pascal => value,
            Self::Kilopascal => si::Pressure::new::<si::kilopascal>(value).get::<si::pascal>(),
            Self::Bar => si::Pressure::new::<si::bar>(value).get::<si::pascal>(),
            Self::Psi => si::Pressure::new::<si::psi>(value).get::<si::pascal>(),
            Self::InchesOfMercury => value * uc::INHG.value,
            Self::Newton => value,
            Self::Kilonewton => si::Force::new::<si::kilonewton>(value).get::<si::newton>(),
            Self::PoundForce => si::Force::new::<si::pound_force>(value).get::<si::newton>(),
            Self::Watt => value,
            Self::Kilowatt => si::Power::new::<si::kilowatt>(value).get::<si::watt>(),
            Self::Horsepower => si::Power::new::<si::horsepower>(value).get::<si::watt>(),
            Self::Celsius => value + 273.15,
            Self::Fahrenheit => c_from_f(value) + 273.15,
            Self::Kelvin => value,
        }
    }

    fn from_base(self, value: f64) -> f64 {
        match self {
            Self::MetersPerSecond => value,
            Self::KilometersPerHour => {
                si::Velocity::new::<si::meter_per_second>(value).get::<si::kilometer_per_hour>()
            }
            Self::MilesPerHour => {
                si::Velocity::new::<si::meter_per_second>(value).get::<si::mile_per_hour>()
            }
            Self::Pascal => value,
            Self::Kilopascal => si::Pressure::new::<si::pascal>(value).get::<si::kilopascal>(),
            Self::Bar => si::Pressure::new::<si::pascal>(value).get::<si::bar>(),
            Self::Psi => si::Pressure::new::<si::pascal>(value).get::<si::psi>(),
            Self::InchesOfMercury => value / uc::INHG.value,
            Self::Newton => value,
            Self::Kilonewton => si::Force::new::<si::newton>(value).get::<si::kilonewton>(),
            Self::PoundForce => si::Force::new::<si::newton>(value).get::<si::pound_force>(),
            Self::Watt => value,
            Self::Kilowatt => si::Power::new::<si::watt>(value).get::<si::kilowatt>(),
            Self::Horsepower => si::Power::new::<si::watt>(value).get::<si::horsepower>(),
            Self::Celsius => value - 273.15,
            Self::Fahrenheit => f_from_c(value - 273.15),
            Self::Kelvin => value,
        }
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "m/s" | "mps" => Self::MetersPerSecond,
            "km/h" | "kph" | "kmh" => Self::KilometersPerHour,
            "mph" => Self::MilesPerHour,
            "pa" => Self::Pascal,
            "kpa" => Self::Kilopascal,
            "bar" => Self::Bar,
            "psi" => Self::Psi,
            "inhg" => Self::InchesOfMercury,
            "n" => Self::Newton,
            "kn" => Self::Kilonewton,
            "lbf" => Self::PoundForce,
            "w" => Self::Watt,
            "kw" => Self::Kilowatt,
            "hp" => Self::Horsepower,
            "c" | "degc" => Self::Celsius,
            "f" | "degf" => Self::Fahrenheit,
            "k" => Self::Kelvin,
            _ => {
                return Err(Error::UnsupportedUnit(format!(
                    "{}\nunrecognized unit {:?}",
                    format_dbg!(),
                    s
                )))
            }
        })
    }
}

/// Converts `value` from unit `from` to unit `to`.
///
/// Fails with [Error::UnsupportedUnit] if the units measure different
/// dimensions.
pub fn convert(value: f64, from: Unit, to: Unit) -> Result<f64, Error> {
    if from.dimension() != to.dimension() {
        return Err(Error::UnsupportedUnit(format!(
            "{}\ncannot convert {:?} to {:?}",
            format_dbg!(),
            from,
            to
        )));
    }
    if from == to {
        return Ok(value);
    }
    Ok(to.from_base(from.to_base(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_conversions() {
        assert!(almost_eq(mps_from_mph(60.0), 26.8224, None));
        assert!(almost_eq(mph_from_mps(mps_from_mph(37.0)), 37.0, None));
        assert!(almost_eq(kph_from_mps(10.0), 36.0, None));
        assert!(almost_eq(psi_from_bar(1.0), 14.503_773_773, Some(1e-6)));
        assert!(almost_eq(bar_from_psi(psi_from_bar(5.0)), 5.0, None));
        assert!(almost_eq(c_from_f(212.0), 100.0, None));
        assert!(almost_eq(f_from_c(-40.0), -40.0, None));
        assert!(almost_eq(hp_from_w(745.699_871_582_270_2), 1.0, Some(1e-6)));
        assert!(almost_eq(n_from_lbf(1.0), 4.448_221_615_260_5, Some(1e-6)));
        assert!(almost_eq(rpm_from_radps(radps_from_rpm(600.0)), 600.0, None));
    }

    #[test]
    fn test_vacuum_gauge() {
        let atm = 14.696;
        assert!(almost_eq(psia_from_vacuum_inhg(0.0, atm), atm, None));
        assert!(almost_eq(
            vacuum_inhg_from_psia(psia_from_vacuum_inhg(21.0, atm), atm),
            21.0,
            None
        ));
    }

    #[test]
    fn test_convert() {
        let kph = convert(20.0, Unit::MetersPerSecond, Unit::KilometersPerHour).unwrap();
        assert!(almost_eq(kph, 72.0, None));
        let f = convert(100.0, "c".parse().unwrap(), "F".parse().unwrap()).unwrap();
        assert!(almost_eq(f, 212.0, None));
        let kw = convert(1_000.0, Unit::Horsepower, Unit::Kilowatt).unwrap();
        assert!(almost_eq(kw, 745.699_871_582_270_2, Some(1e-6)));
    }

    #[test]
    fn test_convert_is_deterministic() {
        let a = convert(12.345, Unit::Psi, Unit::InchesOfMercury).unwrap();
        let b = convert(12.345, Unit::Psi, Unit::InchesOfMercury).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_unsupported_units() {
        assert!(matches!(
            "furlong/fortnight".parse::<Unit>(),
            Err(Error::UnsupportedUnit(_))
        ));
        assert!(matches!(
            convert(1.0, Unit::Psi, Unit::Newton),
            Err(Error::UnsupportedUnit(_))
        ));
    }
}
