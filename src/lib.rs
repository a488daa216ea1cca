// Motion control for Linux robotics bricks whose devices live in a
// pseudo-filesystem tree of text-valued attribute files.
//
// Provides:
// - The attribute-file protocol and device matching
// - Closed-loop tachometer motors, singly and in lock-step sets
// - Tank, steering, joystick, and differential driving, with encoder
//   odometry and goal-directed motion in a world frame
// - Speed/distance unit algebras and wheel geometry
// - Minimal sensor, LED, and battery wrappers

pub mod config;
pub mod device;
pub mod drive;
pub mod error;
pub mod led;
pub mod motor;
pub mod power;
pub mod sensor;
pub mod units;
pub mod wheel;

pub use config::{InputPort, OutputPort, Platform};
pub use drive::{MoveDifferential, MoveJoystick, MoveSteering, MoveTank, Pose};
pub use error::{DriveError, Result};
pub use motor::{MotorKind, MotorOptions, MotorSet, TachoMotor};
pub use units::{DistanceValue, SpeedValue};
pub use wheel::Wheel;
