//! Custom error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A physical parameter makes the model undefined, e.g. non-positive inertia.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Unit could not be parsed or cannot be converted to the requested unit.
    #[error("unsupported unit: {0}")]
    UnsupportedUnit(String),
    /// Lookup table constructed from inconsistent data.
    #[error("invalid table: {0}")]
    InvalidTable(String),
    #[error("`Init::init` failed: {0}")]
    InitError(String),
    #[error("`SerdeAPI` failed: {0}")]
    SerdeError(String),
    #[error("{0}")]
    SimulationError(String),
    #[error("{0}")]
    Other(String),
}
