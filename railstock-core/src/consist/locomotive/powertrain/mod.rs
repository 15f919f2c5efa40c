use crate::imports::*;

pub mod axle;
pub mod diesel_engine;
pub mod diesel_engines;
pub mod electric_motor;
pub mod gearbox;
pub mod powertrain_traits;

pub use axle::*;
pub use diesel_engine::*;
pub use diesel_engines::*;
pub use electric_motor::*;
pub use gearbox::*;
pub use powertrain_traits::*;
