//! Rolling-stock dynamics core: per-axle adhesion and slip dynamics, diesel
//! prime movers with gearboxes, and vacuum brake pipe propagation.
//!
//! Every component advances by one synchronous `update`/`step` call per
//! simulation tick and never spawns threads or performs blocking I/O.
//!
//! ```
//! use railstock_core::prelude::*;
//! use railstock_core::uc;
//!
//! let mut axle = Axle::default();
//! axle.set_train_speed(20.0 * uc::MPS);
//! axle.reset_to(20.0 * uc::MPS);
//! axle.set_drive_force(10e3 * uc::N);
//! axle.update(0.1 * uc::S).unwrap();
//! assert!(!axle.is_wheel_slip());
//! ```

#[macro_use]
pub mod macros;

pub mod consist;
pub mod conversions;
pub mod error;
pub mod filter;
pub mod imports;
pub mod integrator;
pub mod interp;
pub mod lin_search_hint;
pub mod prelude;
pub mod si;
pub mod traits;
pub mod train;
pub mod uc;
pub mod utils;
