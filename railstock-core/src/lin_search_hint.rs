//! Interval lookup with a cached starting index.

/// Contains method to calculate the index of the interval containing `x` given the previously
/// calculated index `idx`.
pub trait SearchHint {
    /// Returns `i` such that `self[i] <= x <= self[i + 1]`, clamped to the first and last
    /// intervals when `x` is out of range. `self` must be sorted ascending with at least two
    /// elements.
    ///
    /// # Arguments
    /// - `x`: value to locate
    /// - `idx`: interval index from the previous lookup, tried first
    fn calc_idx(&self, x: f64, idx: usize) -> usize;
}

impl SearchHint for [f64] {
    fn calc_idx(&self, x: f64, idx: usize) -> usize {
        let last_interval = self.len().saturating_sub(2);
        let idx = idx.min(last_interval);
        // fast path: same interval as last time, then its right-hand neighbour
        if self[idx] <= x && x <= self[idx + 1] {
            return idx;
        }
        if idx < last_interval && self[idx + 1] <= x && x <= self[idx + 2] {
            return idx + 1;
        }
        if x < self[1] {
            return 0;
        }
        if x > self[last_interval] {
            return last_interval;
        }
        // binary search on the interior
        let mut lo = 0;
        let mut hi = self.len() - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self[mid] > x {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        lo
    }
}
