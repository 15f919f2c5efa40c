use crate::imports::*;

/// Molar mass of dry air, kg/mol
const MOLAR_MASS_AIR: f64 = 0.0289644;
/// Universal gas constant, J/(mol·K)
const GAS_CONSTANT: f64 = 8.31446;
/// Standard sea-level temperature, K
const SEA_LEVEL_TEMP_K: f64 = 288.15;

/// Ambient conditions seen by one vehicle.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Environment {
    /// Height above sea level
    pub altitude: si::Length,
    pub ambient_temp_deg_c: f64,
    /// Rail adhesion multiplier, 1 for dry rail, ~0.2 for leaves or ice
    pub adhesion_conditions: f64,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            altitude: si::Length::ZERO,
            ambient_temp_deg_c: 15.0,
            adhesion_conditions: 1.0,
        }
    }
}

impl Init for Environment {
    fn init(&mut self) -> Result<(), Error> {
        if !(self.adhesion_conditions > 0.0) {
            return Err(Error::InitError(format!(
                "{}\n`adhesion_conditions` must be positive",
                format_dbg!(self.adhesion_conditions)
            )));
        }
        Ok(())
    }
}
impl SerdeAPI for Environment {}

impl Environment {
    /// Atmospheric pressure at [Self::altitude] from the isothermal barometric
    /// formula `P0 * exp(-M * g * h / (R * T0))`
    pub fn atmospheric_pressure(&self) -> si::Pressure {
        let h = self.altitude.get::<si::meter>();
        let g = uc::ACC_GRAV.get::<si::meter_per_second_squared>();
        uc::ATM * (-MOLAR_MASS_AIR * g * h / (GAS_CONSTANT * SEA_LEVEL_TEMP_K)).exp()
    }

    /// [Self::atmospheric_pressure] in psia
    pub fn atmospheric_psia(&self) -> f64 {
        self.atmospheric_pressure().get::<si::psi>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sea_level_is_standard_atmosphere() {
        let env = Environment::default();
        assert!(almost_eq_uom(&env.atmospheric_pressure(), &uc::ATM, None));
        assert!(almost_eq(env.atmospheric_psia(), 14.695_948_8, Some(1e-6)));
    }

    #[test]
    fn test_pressure_drops_with_altitude() {
        let high = Environment {
            altitude: 1_000.0 * uc::M,
            ..Default::default()
        };
        // ~90.0 kPa at 1 km for the isothermal model
        assert!(almost_eq(
            high.atmospheric_pressure().get::<si::kilopascal>(),
            90.0,
            Some(1e-3)
        ));
        assert!(high.atmospheric_pressure() < uc::ATM);
    }
}
