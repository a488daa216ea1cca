// Coordinated multi-motor driving.
//
// Provides:
// - Tank drive: a left/right pair with ratio-scaled distance moves
// - Steering and joystick frontends deriving tank pairs
// - Differential drive with encoder odometry and goal-directed motion

mod differential;
mod joystick;
mod odometry;
mod steering;
mod tank;

pub use differential::MoveDifferential;
pub use joystick::MoveJoystick;
pub use odometry::{ODOMETRY_TICK, Pose};
pub use steering::MoveSteering;
pub use tank::{LineFollowConfig, MoveTank};
