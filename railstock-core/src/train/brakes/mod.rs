//! Vacuum brakes: per-vehicle cylinder and reservoir model, train-level brake
//! pipe propagation, and brake sound cues.
//!
//! Pressures are carried internally as absolute psi (psia) so that the
//! vacuum gauge reading is `atmospheric - pressure`.

use crate::conversions;
use crate::imports::*;
pub(crate) use crate::train::environment::Environment;

pub mod brake_pipe;
pub mod sound_trigger;
pub mod vacuum_brake;

pub use brake_pipe::*;
pub use sound_trigger::*;
pub use vacuum_brake::*;

#[cfg(test)]
mod tests;
