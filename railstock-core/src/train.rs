//! Train-level systems shared between vehicles

pub mod brakes;
pub mod environment;

pub use brakes::*;
pub use environment::*;
