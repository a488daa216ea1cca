// Tachometer motor control.
//
// Provides:
// - The single-motor closed-loop handle and its command grammar
// - Setpoint override bundles applied ahead of commands
// - Lock-step collections of motors

mod options;
mod set;
mod tacho;

pub use options::MotorOptions;
pub use set::MotorSet;
pub use tacho::{
    MotorCommand, MotorKind, MotorSpec, MotorState, Polarity, StateFlag, StopAction, TachoMotor,
    WAIT_RUNNING_TIMEOUT_MS,
};

pub(crate) use tacho::{brake_action, canonical_rel_target};
