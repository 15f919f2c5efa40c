use crate::imports::*;
pub(crate) use crate::train::brakes::{
    BrakeController, BrakeSoundEvent, VacuumBrake, VacuumBrakeSnapshot,
};
pub(crate) use crate::train::environment::Environment;

pub mod locomotive_model;
pub mod powertrain;

pub use locomotive_model::*;
pub use powertrain::*;
