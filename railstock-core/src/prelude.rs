pub use crate::consist::locomotive::powertrain::axle::{
    Axle, AxleDrive, AxleSnapshot, AxleState, AxleStateHistoryVec, CurtiusKniffler,
};
pub use crate::consist::locomotive::powertrain::diesel_engine::{
    CoolingMode, DieselEngine, DieselEngineConfig, DieselEngineSnapshot, DieselEngineState,
    DieselEngineStateHistoryVec, EngineEvent, EngineInputs, EngineStatus, Exhaust,
    LocoEngineDefaults,
};
pub use crate::consist::locomotive::powertrain::diesel_engines::DieselEngines;
pub use crate::consist::locomotive::powertrain::electric_motor::{
    ElectricMotor, ElectricMotorState, ElectricMotorStateHistoryVec,
};
pub use crate::consist::locomotive::powertrain::gearbox::{
    Gear, GearBox, GearBoxOperation, GearBoxSnapshot, GearBoxState, GearBoxStateHistoryVec,
};
pub use crate::consist::locomotive::powertrain::powertrain_traits::*;
pub use crate::consist::locomotive::{
    DieselLocomotive, DieselLocomotiveSnapshot, DieselLocomotiveState,
    DieselLocomotiveStateHistoryVec, LocoInputs,
};
pub use crate::conversions::{convert, Unit};
pub use crate::error::Error;
pub use crate::filter::IirFilter;
pub use crate::integrator::{Integrator, IntegratorMethod};
pub use crate::interp::{Interpolator, Interpolator2D};
pub use crate::traits::{Init, SaveRestore, SaveState, SerdeAPI};
pub use crate::train::brakes::{
    BrakeController, BrakePipe, BrakeRegime, BrakeSoundEvent, BrakeStatus, BrakeSystemKind,
    PressureTrend, StraightBrakeState, VacuumBrake, VacuumBrakeSnapshot, VacuumBrakeState,
};
pub use crate::train::environment::Environment;
