//! Piecewise-linear lookup tables used for engine curves and brake characteristics.

use crate::imports::*;

/// 1D piecewise-linear table.
///
/// Lookups outside the sampled range extrapolate along the nearest edge
/// segment. The interval found by the previous lookup is cached so that slowly
/// varying arguments (e.g. once-per-tick RPM) usually skip the binary search.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Interpolator {
    /// Sample abscissae, strictly increasing
    x: Vec<f64>,
    /// Sample values
    y: Vec<f64>,
    #[serde(skip)]
    prev_idx: Cell<usize>,
}

impl PartialEq for Interpolator {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl Init for Interpolator {
    fn init(&mut self) -> Result<(), Error> {
        Self::validate(&self.x, &self.y)
    }
}
impl SerdeAPI for Interpolator {}

impl Interpolator {
    /// Builds a table from paired samples.
    ///
    /// Fails with [Error::InvalidTable] if the lengths differ, fewer than two
    /// samples are given, or `x` is not strictly increasing.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, Error> {
        Self::validate(&x, &y)?;
        Ok(Self {
            x,
            y,
            prev_idx: Cell::new(0),
        })
    }

    fn validate(x: &[f64], y: &[f64]) -> Result<(), Error> {
        if x.len() != y.len() {
            return Err(Error::InvalidTable(format!(
                "{}\nx has {} samples but y has {}",
                format_dbg!(),
                x.len(),
                y.len()
            )));
        }
        if x.len() < 2 {
            return Err(Error::InvalidTable(format!(
                "{}\nat least two samples are required, got {}",
                format_dbg!(),
                x.len()
            )));
        }
        if let Some(i) = x.windows(2).position(|w| w[1] <= w[0]) {
            return Err(Error::InvalidTable(format!(
                "{}\nx must be strictly increasing, but x[{}] = {} >= x[{}] = {}",
                format_dbg!(),
                i,
                x[i],
                i + 1,
                x[i + 1]
            )));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(Error::InvalidTable(format!(
                "{}\nsamples must be finite",
                format_dbg!()
            )));
        }
        Ok(())
    }

    /// Linearly interpolated (or edge-extrapolated) value at `x`.
    ///
    /// A table deserialized without [Init] may hold fewer than two samples; it
    /// then reads as its only sample, or 0 when empty.
    pub fn get(&self, x: f64) -> f64 {
        if self.x.len() < 2 || self.y.len() != self.x.len() {
            return self.y.first().copied().unwrap_or_default();
        }
        let i = self.x.calc_idx(x, self.prev_idx.get());
        self.prev_idx.set(i);
        let (x0, x1) = (self.x[i], self.x[i + 1]);
        let d = x1 - x0;
        let a = (x1 - x) / d;
        let b = (x - x0) / d;
        a * self.y[i] + b * self.y[i + 1]
    }

    /// Returns a new table with x and y swapped.
    ///
    /// The inverse is only well defined when `y` is itself strictly
    /// increasing; otherwise [Error::InvalidTable] is returned rather than an
    /// ambiguous table.
    /// [Self::check_for_consistent_increase] can repair such data first.
    pub fn inverse(&self) -> Result<Self, Error> {
        Self::new(self.y.clone(), self.x.clone())
    }

    /// Multiplies all abscissae by `factor`, which must be positive to keep
    /// the ordering intact.
    pub fn scale_x(&mut self, factor: f64) -> Result<(), Error> {
        if !(factor > 0.0 && factor.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "{}\nx scale factor must be positive, got {}",
                format_dbg!(),
                factor
            )));
        }
        self.x.iter_mut().for_each(|x| *x *= factor);
        Ok(())
    }

    /// Multiplies all values by `factor`
    pub fn scale_y(&mut self, factor: f64) {
        self.y.iter_mut().for_each(|y| *y *= factor);
    }

    /// Forces `y` to be strictly increasing by lifting every non-increasing
    /// sample to `step` above its predecessor. Returns whether anything changed.
    pub fn check_for_consistent_increase(&mut self, step: f64) -> bool {
        let mut changed = false;
        for i in 1..self.y.len() {
            if self.y[i] <= self.y[i - 1] {
                self.y[i] = self.y[i - 1] + step;
                changed = true;
            }
        }
        changed
    }

    pub fn size(&self) -> usize {
        self.x.len()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn max_y(&self) -> f64 {
        self.y.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min_y(&self) -> f64 {
        self.y.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn has_negative_value(&self) -> bool {
        self.y.iter().any(|y| *y < 0.0)
    }
}

/// Table of 1D tables: rows are selected and blended by the outer `x`, each
/// row is evaluated at `y`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Interpolator2D {
    x: Vec<f64>,
    rows: Vec<Interpolator>,
    #[serde(skip)]
    prev_idx: Cell<usize>,
}

impl PartialEq for Interpolator2D {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.rows == other.rows
    }
}

impl Init for Interpolator2D {
    fn init(&mut self) -> Result<(), Error> {
        self.rows.init()?;
        Self::validate(&self.x, &self.rows)
    }
}
impl SerdeAPI for Interpolator2D {}

impl Interpolator2D {
    pub fn new(x: Vec<f64>, rows: Vec<Interpolator>) -> Result<Self, Error> {
        Self::validate(&x, &rows)?;
        Ok(Self {
            x,
            rows,
            prev_idx: Cell::new(0),
        })
    }

    fn validate(x: &[f64], rows: &[Interpolator]) -> Result<(), Error> {
        if x.len() != rows.len() || x.is_empty() {
            return Err(Error::InvalidTable(format!(
                "{}\n{} row keys for {} rows",
                format_dbg!(),
                x.len(),
                rows.len()
            )));
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::InvalidTable(format!(
                "{}\nrow keys must be strictly increasing",
                format_dbg!()
            )));
        }
        Ok(())
    }

    pub fn get(&self, x: f64, y: f64) -> f64 {
        if self.rows.len() < 2 || self.x.len() != self.rows.len() {
            return self.rows.first().map(|row| row.get(y)).unwrap_or_default();
        }
        let i = self.x.calc_idx(x, self.prev_idx.get());
        self.prev_idx.set(i);
        let (x0, x1) = (self.x[i], self.x[i + 1]);
        let b = (x - x0) / (x1 - x0);
        let (y0, y1) = (self.rows[i].get(y), self.rows[i + 1].get(y));
        y0 + (y1 - y0) * b
    }

    pub fn scale_y(&mut self, factor: f64) {
        self.rows.iter_mut().for_each(|r| r.scale_y(factor));
    }

    pub fn size(&self) -> usize {
        self.x.len()
    }
}
