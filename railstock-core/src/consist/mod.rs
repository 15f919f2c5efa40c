//! Powered rolling stock

pub mod locomotive;

pub use locomotive::*;
