//! Signal smoothing used by the axle slip-rate estimate.

use crate::imports::*;
use std::f64::consts::{PI, SQRT_2};

/// Second-order Butterworth low-pass filter discretized with the bilinear
/// transform. Coefficients are recomputed whenever the time step changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IirFilter {
    /// Cutoff frequency in Hz
    pub cutoff_hz: f64,
    /// Previous inputs, most recent first
    #[serde(skip)]
    x_prev: [f64; 2],
    /// Previous outputs, most recent first
    #[serde(skip)]
    y_prev: [f64; 2],
    #[serde(skip)]
    coeffs: Option<Coefficients>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Coefficients {
    dt: f64,
    b: [f64; 3],
    a: [f64; 2],
}

impl Coefficients {
    fn new(cutoff_hz: f64, dt: f64) -> Self {
        let k = (PI * cutoff_hz * dt).tan();
        let k2 = k * k;
        let norm = 1.0 / (1.0 + SQRT_2 * k + k2);
        let b0 = k2 * norm;
        Self {
            dt,
            b: [b0, 2.0 * b0, b0],
            a: [2.0 * (k2 - 1.0) * norm, (1.0 - SQRT_2 * k + k2) * norm],
        }
    }
}

impl Default for IirFilter {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Init for IirFilter {
    fn init(&mut self) -> Result<(), Error> {
        if !(self.cutoff_hz > 0.0 && self.cutoff_hz.is_finite()) {
            return Err(Error::InitError(format!(
                "{}\n`cutoff_hz` must be positive, got {}",
                format_dbg!(),
                self.cutoff_hz
            )));
        }
        self.coeffs = None;
        Ok(())
    }
}
impl SerdeAPI for IirFilter {}

impl IirFilter {
    pub fn new(cutoff_hz: f64) -> Self {
        Self {
            cutoff_hz,
            x_prev: [0.0; 2],
            y_prev: [0.0; 2],
            coeffs: None,
        }
    }

    /// Filters one sample taken `dt` seconds after the previous one
    pub fn filter(&mut self, x: f64, dt: f64) -> f64 {
        // at or above Nyquist the prewarp diverges, so pass through
        if dt <= 0.0 || self.cutoff_hz * dt >= 0.49 {
            self.push(x, x);
            return x;
        }
        let c = match self.coeffs {
            Some(c) if c.dt == dt => c,
            _ => {
                let c = Coefficients::new(self.cutoff_hz, dt);
                self.coeffs = Some(c);
                c
            }
        };
        let y = c.b[0] * x + c.b[1] * self.x_prev[0] + c.b[2] * self.x_prev[1]
            - c.a[0] * self.y_prev[0]
            - c.a[1] * self.y_prev[1];
        self.push(x, y);
        y
    }

    fn push(&mut self, x: f64, y: f64) {
        self.x_prev = [x, self.x_prev[0]];
        self.y_prev = [y, self.y_prev[0]];
    }

    /// Most recent output
    pub fn last(&self) -> f64 {
        self.y_prev[0]
    }

    /// Fills the history with `value`, i.e. the filter is at steady state
    pub fn reset(&mut self, value: f64) {
        self.x_prev = [value; 2];
        self.y_prev = [value; 2];
    }
}
