//! Scalar ODE stepping with automatic substepping.

use crate::imports::*;

/// Default upper bound on substeps per [Integrator::integrate] call
pub const MAX_SUBSTEPS_DEFAULT: usize = 50;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, IsVariant)]
pub enum IntegratorMethod {
    /// First-order explicit Euler
    EulerBackward,
    /// Heun's method
    EulerModified,
    /// Midpoint method
    RungeKutta2,
    #[default]
    RungeKutta4,
    /// Adams-Bashforth predictor with Adams-Moulton corrector, bootstrapped
    /// with [IntegratorMethod::RungeKutta4] until enough history exists
    AdamsMoulton,
}

/// Integrates a single scalar state variable `y` with `dy/dt = f(y)`.
///
/// Each call to [Integrator::integrate] estimates the local stiffness of `f`
/// and splits the time step into as many equal substeps as needed to keep
/// `|df/dy|·h ≤ 1`, up to `max_substeps`. The state is clamped to
/// `[min, max]` after every substep.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Integrator {
    pub method: IntegratorMethod,
    /// Lower clamp applied after each substep
    pub min: Option<f64>,
    /// Upper clamp applied after each substep
    pub max: Option<f64>,
    pub max_substeps: usize,
    #[serde(skip)]
    value: f64,
    /// Previous derivatives, most recent first
    #[serde(skip)]
    prev_derivs: [f64; 4],
    #[serde(skip)]
    n_prev_derivs: usize,
    #[serde(skip)]
    prev_h: f64,
    #[serde(skip)]
    substeps: usize,
    #[serde(skip)]
    avg_output: f64,
}

impl Default for Integrator {
    fn default() -> Self {
        Self {
            method: Default::default(),
            min: None,
            max: None,
            max_substeps: MAX_SUBSTEPS_DEFAULT,
            value: 0.0,
            prev_derivs: [0.0; 4],
            n_prev_derivs: 0,
            prev_h: 0.0,
            substeps: 0,
            avg_output: 0.0,
        }
    }
}

impl Init for Integrator {
    fn init(&mut self) -> Result<(), Error> {
        if self.max_substeps == 0 {
            return Err(Error::InitError(format!(
                "{}\n`max_substeps` must be at least 1",
                format_dbg!()
            )));
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(Error::InitError(format!(
                    "{}\n`min` ({}) exceeds `max` ({})",
                    format_dbg!(),
                    min,
                    max
                )));
            }
        }
        Ok(())
    }
}
impl SerdeAPI for Integrator {}

impl Integrator {
    pub fn new(method: IntegratorMethod) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Current state value
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Number of substeps used by the most recent integration
    pub fn substeps(&self) -> usize {
        self.substeps
    }

    /// Average over all substeps of the secondary output returned by the
    /// derivative function during the most recent integration
    pub fn avg_output(&self) -> f64 {
        self.avg_output
    }

    /// Zeroes the state and forgets derivative history
    pub fn reset(&mut self) {
        self.reset_to(0.0);
    }

    /// Seeds the state with `value` and forgets derivative history
    pub fn reset_to(&mut self, value: f64) {
        self.value = self.clamp(value);
        self.prev_derivs = [0.0; 4];
        self.n_prev_derivs = 0;
        self.prev_h = 0.0;
    }

    fn clamp(&self, y: f64) -> f64 {
        let y = match self.min {
            Some(min) if y < min => min,
            _ => y,
        };
        match self.max {
            Some(max) if y > max => max,
            _ => y,
        }
    }

    fn push_deriv(&mut self, deriv: f64) {
        self.prev_derivs.rotate_right(1);
        self.prev_derivs[0] = deriv;
        self.n_prev_derivs = (self.n_prev_derivs + 1).min(self.prev_derivs.len());
    }

    /// Number of substeps such that `|J|·h ≤ 1` for the estimated Jacobian `J`
    fn estimate_substeps<F>(&self, dt: f64, k0: f64, f: &mut F) -> usize
    where
        F: FnMut(f64) -> (f64, f64),
    {
        let delta = (self.value.abs() * 1e-6).max(1e-6);
        let (k_delta, _) = f(self.value + delta);
        let jacobian = (k_delta - k0) / delta;
        let n = (jacobian.abs() * dt).ceil();
        if n.is_finite() {
            (n as usize).clamp(1, self.max_substeps.max(1))
        } else {
            self.max_substeps.max(1)
        }
    }

    /// Advances the state by `dt` seconds with derivative function `f`, which
    /// returns `(dy/dt, output)` for a candidate state. Returns the new state.
    pub fn integrate<F>(&mut self, dt: f64, mut f: F) -> f64
    where
        F: FnMut(f64) -> (f64, f64),
    {
        let (k0, out0) = f(self.value);
        if dt <= 0.0 {
            self.substeps = 0;
            self.avg_output = out0;
            return self.value;
        }
        let n = self.estimate_substeps(dt, k0, &mut f);
        let h = dt / n as f64;
        if self.prev_h != h {
            // multistep history is only valid for a fixed step size
            self.n_prev_derivs = 0;
            self.prev_h = h;
        }

        let mut output_sum = 0.0;
        for i in 0..n {
            let y = self.value;
            let (k1, out) = if i == 0 { (k0, out0) } else { f(y) };
            output_sum += out;
            let y_next = match self.method {
                IntegratorMethod::EulerBackward => y + h * k1,
                IntegratorMethod::EulerModified => {
                    let k2 = f(y + h * k1).0;
                    y + h / 2.0 * (k1 + k2)
                }
                IntegratorMethod::RungeKutta2 => {
                    let k2 = f(y + h / 2.0 * k1).0;
                    y + h * k2
                }
                IntegratorMethod::RungeKutta4 => Self::rk4(y, h, k1, &mut f),
                IntegratorMethod::AdamsMoulton => {
                    if self.n_prev_derivs < 3 {
                        self.push_deriv(k1);
                        Self::rk4(y, h, k1, &mut f)
                    } else {
                        let [f1, f2, f3, _] = self.prev_derivs;
                        let predicted =
                            y + h / 24.0 * (55.0 * k1 - 59.0 * f1 + 37.0 * f2 - 9.0 * f3);
                        let k_pred = f(predicted).0;
                        self.push_deriv(k1);
                        y + h / 24.0 * (9.0 * k_pred + 19.0 * k1 - 5.0 * f1 + f2)
                    }
                }
            };
            self.value = self.clamp(y_next);
        }
        self.substeps = n;
        self.avg_output = output_sum / n as f64;
        self.value
    }

    fn rk4<F>(y: f64, h: f64, k1: f64, f: &mut F) -> f64
    where
        F: FnMut(f64) -> (f64, f64),
    {
        let k2 = f(y + h / 2.0 * k1).0;
        let k3 = f(y + h / 2.0 * k2).0;
        let k4 = f(y + h * k3).0;
        y + h / 6.0 * (k1 + 2.0 * k2 + 2.0 * k3 + k4)
    }

    /// Advances the state by `dt` with a constant derivative
    pub fn integrate_value(&mut self, dt: f64, derivative: f64) -> f64 {
        self.integrate(dt, |_| (derivative, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decay(method: IntegratorMethod, steps: usize, dt: f64) -> f64 {
        let mut integrator = Integrator::new(method);
        integrator.reset_to(1.0);
        for _ in 0..steps {
            integrator.integrate(dt, |y| (-y, 0.0));
        }
        integrator.value()
    }

    #[test]
    fn test_exponential_decay_accuracy() {
        let exact = (-1.0f64).exp();
        assert!((decay(IntegratorMethod::RungeKutta4, 10, 0.1) - exact).abs() < 1e-5);
        assert!((decay(IntegratorMethod::AdamsMoulton, 100, 0.01) - exact).abs() < 1e-6);
        assert!((decay(IntegratorMethod::EulerModified, 100, 0.01) - exact).abs() < 1e-4);
        assert!((decay(IntegratorMethod::RungeKutta2, 100, 0.01) - exact).abs() < 1e-4);
        assert!((decay(IntegratorMethod::EulerBackward, 100, 0.01) - exact).abs() < 1e-2);
    }

    #[test]
    fn test_stiff_problem_is_substepped() {
        let mut integrator = Integrator::default();
        integrator.reset_to(1.0);
        integrator.integrate(0.1, |y| (-1_000.0 * y, 0.0));
        assert_eq!(integrator.substeps(), MAX_SUBSTEPS_DEFAULT);
        assert!(integrator.value() >= 0.0);
        assert!(integrator.value() < 1e-3);

        integrator.reset_to(1.0);
        integrator.integrate(0.1, |y| (-y, 0.0));
        assert_eq!(integrator.substeps(), 1);
    }

    #[test]
    fn test_clamping() {
        let mut integrator = Integrator::default().with_bounds(Some(-1.0), Some(2.0));
        integrator.integrate_value(10.0, 1.0);
        assert_eq!(integrator.value(), 2.0);
        integrator.integrate_value(10.0, -1.0);
        assert_eq!(integrator.value(), -1.0);
        integrator.reset_to(5.0);
        assert_eq!(integrator.value(), 2.0);
    }

    #[test]
    fn test_avg_output() {
        let mut integrator = Integrator::default();
        integrator.integrate(1.0, |y| (0.0, 3.0 + y));
        assert_eq!(integrator.avg_output(), 3.0);
        // zero time step leaves state untouched but still reports output
        integrator.reset_to(1.0);
        assert_eq!(integrator.integrate(0.0, |y| (1.0, 2.0 * y)), 1.0);
        assert_eq!(integrator.avg_output(), 2.0);
    }

    #[test]
    fn test_reset() {
        let mut integrator = Integrator::new(IntegratorMethod::AdamsMoulton);
        integrator.integrate_value(1.0, 4.0);
        assert!(almost_eq(integrator.value(), 4.0, None));
        integrator.reset();
        assert_eq!(integrator.value(), 0.0);
    }

    #[test]
    fn test_init_rejects_inverted_bounds() {
        let mut integrator = Integrator::default().with_bounds(Some(1.0), Some(0.0));
        assert!(integrator.init().is_err());
    }
}
