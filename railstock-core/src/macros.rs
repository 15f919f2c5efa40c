/// Generates a String similar to output of `dbg` but without printing
#[macro_export]
macro_rules! format_dbg {
    ($dbg_expr:expr) => {
        format!(
            "[{}:{}] {}: {:?}",
            file!(),
            line!(),
            stringify!($dbg_expr),
            $dbg_expr
        )
    };
    () => {
        format!("[{}:{}]", file!(), line!())
    };
}

/// Fails with [crate::error::Error::InvalidParameter] unless `$value` is
/// strictly positive and finite.
#[macro_export]
macro_rules! ensure_positive {
    ($value:expr, $name:expr) => {
        if !($value > 0.0 && f64::is_finite($value)) {
            return Err($crate::error::Error::InvalidParameter(format!(
                "{}\n`{}` must be positive and finite, got {}",
                $crate::format_dbg!(),
                $name,
                $value
            ))
            .into());
        }
    };
}

/// Implements [crate::traits::SaveState] for structs with `state.i`, `save_interval` and
/// `history` fields
#[macro_export]
macro_rules! impl_save_state {
    ($t:ty) => {
        impl $crate::traits::SaveState for $t {
            fn save_state(&mut self) {
                if let Some(interval) = self.save_interval {
                    if interval > 0 && (self.state.i % interval == 0 || self.state.i == 1) {
                        self.history.push(self.state.clone());
                    }
                }
            }
        }
    };
}
