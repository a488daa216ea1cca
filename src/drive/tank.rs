// Two-motor tank drive.
//
// A pair of independently-speeded motors. Distance-bounded drives scale
// the inner motor's travel by the speed ratio so both motors finish at the
// same instant; both motors have every setpoint written before either run
// command is issued, keeping the start skew down to two attribute writes.

use std::time::Duration;

use tracing::debug;

use crate::config::{OutputPort, Platform};
use crate::error::{DriveError, Result};
use crate::motor::{
    MotorCommand, MotorKind, MotorOptions, StateFlag, TachoMotor, WAIT_RUNNING_TIMEOUT_MS,
    brake_action, canonical_rel_target,
};
use crate::sensor::ColorSensor;
use crate::units::SpeedValue;

/// Scale a distance-bounded drive across a speed pair.
///
/// The motor with the larger speed magnitude is on the outside of the turn
/// and travels the full `degrees`; the inner motor's travel shrinks by the
/// magnitude ratio so both arrive together. Equal-zero speeds and zero
/// degrees pass through unscaled.
pub(crate) fn scaled_pair_degrees(left_native: f32, right_native: f32, degrees: f32) -> (f32, f32) {
    if degrees == 0.0 || (left_native == 0.0 && right_native == 0.0) {
        (degrees, degrees)
    } else if left_native.abs() > right_native.abs() {
        (degrees, (right_native / left_native).abs() * degrees)
    } else {
        ((left_native / right_native).abs() * degrees, degrees)
    }
}

/// PID parameters and thresholds for the line follower
#[derive(Debug, Clone, Copy)]
pub struct LineFollowConfig {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Base forward speed the turn differential modulates around
    pub speed: SpeedValue,
    /// Reflected-light reading for the edge being followed
    pub target_light_intensity: i32,
    /// Follow the left edge of the line (turn differential sign)
    pub follow_left_edge: bool,
    /// Readings at or above this are "off the line"
    pub white: i32,
    /// Consecutive off-line samples tolerated before giving up
    pub off_line_count_max: u32,
    /// Delay between samples
    pub sleep_time: Duration,
}

impl Default for LineFollowConfig {
    fn default() -> Self {
        Self {
            kp: 11.3,
            ki: 0.05,
            kd: 3.2,
            speed: SpeedValue::Percent(30.0),
            target_light_intensity: 15,
            follow_left_edge: true,
            white: 60,
            off_line_count_max: 20,
            sleep_time: Duration::from_millis(10),
        }
    }
}

/// A pair of motors driven as the left and right side of a vehicle
pub struct MoveTank {
    left: TachoMotor,
    right: TachoMotor,
    /// Rated maximum shared by the pair, taken from the left motor
    max_speed: i32,
}

impl MoveTank {
    pub fn new(
        platform: &Platform,
        left_port: OutputPort,
        right_port: OutputPort,
        kind: MotorKind,
    ) -> Result<Self> {
        let mut left = TachoMotor::new(platform, left_port, kind)?;
        let mut right = TachoMotor::new(platform, right_port, kind)?;
        left.reset()?;
        right.reset()?;

        let max_speed = left.spec().max_speed;
        Ok(Self { left, right, max_speed })
    }

    pub fn left(&mut self) -> &mut TachoMotor {
        &mut self.left
    }

    pub fn right(&mut self) -> &mut TachoMotor {
        &mut self.right
    }

    pub fn max_speed(&self) -> i32 {
        self.max_speed
    }

    fn native_pair(
        &self,
        left_speed: impl Into<SpeedValue>,
        right_speed: impl Into<SpeedValue>,
    ) -> Result<(f32, f32)> {
        Ok((
            left_speed.into().to_native(self.left.spec())?,
            right_speed.into().to_native(self.right.spec())?,
        ))
    }

    /// Issue `command` to both motors back-to-back, after `left_options`
    /// and `right_options` have been fully written
    fn command_pair(
        &mut self,
        command: MotorCommand,
        left_options: &MotorOptions,
        right_options: &MotorOptions,
    ) -> Result<()> {
        self.left.apply_options(left_options)?;
        self.right.apply_options(right_options)?;
        self.left.command(command, &MotorOptions::new())?;
        self.right.command(command, &MotorOptions::new())
    }

    fn block(&mut self) -> Result<()> {
        let running_timeout = Some(Duration::from_millis(WAIT_RUNNING_TIMEOUT_MS));
        self.left.wait_until(StateFlag::Running, running_timeout)?;
        self.right.wait_until(StateFlag::Running, running_timeout)?;
        self.left.wait_until_not_moving(None)?;
        self.right.wait_until_not_moving(None)?;
        Ok(())
    }

    /// Drive both motors for `degrees` of the outer (faster) motor's
    /// travel; the inner motor's distance scales by the speed ratio so
    /// both stop simultaneously.
    pub fn on_for_degrees(
        &mut self,
        left_speed: impl Into<SpeedValue>,
        right_speed: impl Into<SpeedValue>,
        degrees: f32,
        brake: bool,
        block: bool,
    ) -> Result<()> {
        let (left_native, right_native) = self.native_pair(left_speed, right_speed)?;
        let (left_degrees, right_degrees) = scaled_pair_degrees(left_native, right_native, degrees);

        debug!(
            "tank on_for_degrees: {} deg -> left {} deg at {}, right {} deg at {}",
            degrees, left_degrees, left_native, right_degrees, right_native
        );

        let (left_position, left_speed_sp) =
            canonical_rel_target(left_degrees, left_native, self.left.spec().count_per_rot);
        let (right_position, right_speed_sp) =
            canonical_rel_target(right_degrees, right_native, self.right.spec().count_per_rot);

        let stop_action = brake_action(brake);
        let left_options = MotorOptions::new()
            .stop_action(stop_action)
            .speed_sp(left_speed_sp)
            .position_sp(left_position);
        let right_options = MotorOptions::new()
            .stop_action(stop_action)
            .speed_sp(right_speed_sp)
            .position_sp(right_position);
        self.command_pair(MotorCommand::RunToRelPos, &left_options, &right_options)?;

        if block {
            self.block()?;
        }
        Ok(())
    }

    /// `on_for_degrees` in units of full rotations of the outer motor
    pub fn on_for_rotations(
        &mut self,
        left_speed: impl Into<SpeedValue>,
        right_speed: impl Into<SpeedValue>,
        rotations: f32,
        brake: bool,
        block: bool,
    ) -> Result<()> {
        self.on_for_degrees(left_speed, right_speed, rotations * 360.0, brake, block)
    }

    /// Drive both motors for the same `seconds`; no ratio scaling
    pub fn on_for_seconds(
        &mut self,
        left_speed: impl Into<SpeedValue>,
        right_speed: impl Into<SpeedValue>,
        seconds: f32,
        brake: bool,
        block: bool,
    ) -> Result<()> {
        if seconds < 0.0 {
            return Err(DriveError::precondition(format!("seconds is negative ({seconds})")));
        }

        let (left_native, right_native) = self.native_pair(left_speed, right_speed)?;
        let time_ms = (seconds * 1000.0).round() as i32;

        let stop_action = brake_action(brake);
        let left_options = MotorOptions::new()
            .stop_action(stop_action)
            .speed_sp(left_native.round() as i32)
            .time_sp(time_ms);
        let right_options = MotorOptions::new()
            .stop_action(stop_action)
            .speed_sp(right_native.round() as i32)
            .time_sp(time_ms);
        self.command_pair(MotorCommand::RunTimed, &left_options, &right_options)?;

        if block {
            self.block()?;
        }
        Ok(())
    }

    /// Start both motors and return
    pub fn on(
        &mut self,
        left_speed: impl Into<SpeedValue>,
        right_speed: impl Into<SpeedValue>,
    ) -> Result<()> {
        let (left_native, right_native) = self.native_pair(left_speed, right_speed)?;
        let left_options = MotorOptions::new().speed_sp(left_native.round() as i32);
        let right_options = MotorOptions::new().speed_sp(right_native.round() as i32);
        self.command_pair(MotorCommand::RunForever, &left_options, &right_options)
    }

    /// Stop both motors, holding position if `brake` is set
    pub fn off(&mut self, brake: bool) -> Result<()> {
        let stop_action = brake_action(brake);
        self.left.set_stop_action(stop_action)?;
        self.right.set_stop_action(stop_action)?;
        self.left.stop(&MotorOptions::new())?;
        self.right.stop(&MotorOptions::new())
    }

    /// Follow the edge of a line by PID on reflected-light intensity.
    ///
    /// Runs until `keep_following` returns false, then stops the motors.
    /// Fails with `LineFollowLost` after more than
    /// `cfg.off_line_count_max` consecutive samples at or above
    /// `cfg.white`.
    pub fn follow_line<F>(
        &mut self,
        cfg: &LineFollowConfig,
        sensor: &mut ColorSensor,
        mut keep_following: F,
    ) -> Result<()>
    where
        F: FnMut() -> bool,
    {
        let base_speed = cfg.speed.to_native(self.left.spec())?;
        let max = self.max_speed as f32;

        let mut integral = 0.0f32;
        let mut last_error = 0.0f32;
        let mut off_line_count = 0u32;

        while keep_following() {
            let reflected = sensor.reflected_light_intensity()?;

            if reflected >= cfg.white {
                off_line_count += 1;
                if off_line_count > cfg.off_line_count_max {
                    self.off(true)?;
                    return Err(DriveError::LineFollowLost { samples: off_line_count });
                }
            } else {
                off_line_count = 0;
            }

            let error = (cfg.target_light_intensity - reflected) as f32;
            integral += error;
            let derivative = error - last_error;
            last_error = error;

            let mut turn = cfg.kp * error + cfg.ki * integral + cfg.kd * derivative;
            if !cfg.follow_left_edge {
                turn = -turn;
            }

            // The PID output can overshoot the rating near sharp turns
            let left = (base_speed + turn).clamp(-max, max);
            let right = (base_speed - turn).clamp(-max, max);
            self.on(SpeedValue::NativeUnits(left), SpeedValue::NativeUnits(right))?;

            std::thread::sleep(cfg.sleep_time);
        }

        self.off(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outer_motor_travels_full_distance() {
        // Equal |inner/outer| ratio shrinks the inner travel
        let (left, right) = scaled_pair_degrees(525.0, 262.5, 100.0);
        assert_eq!(left, 100.0);
        assert_eq!(right, 50.0);

        let (left, right) = scaled_pair_degrees(262.5, 525.0, 100.0);
        assert_eq!(left, 50.0);
        assert_eq!(right, 100.0);
    }

    #[test]
    fn test_ratio_uses_magnitudes() {
        // A pivot pair keeps both distances at the full value
        let (left, right) = scaled_pair_degrees(500.0, -500.0, 720.0);
        assert_eq!(left, 720.0);
        assert_eq!(right, 720.0);

        let (left, right) = scaled_pair_degrees(-400.0, 200.0, 100.0);
        assert_eq!(left, 100.0);
        assert_eq!(right, 50.0);
    }

    #[test]
    fn test_zero_cases_pass_through() {
        assert_eq!(scaled_pair_degrees(0.0, 0.0, 90.0), (90.0, 90.0));
        assert_eq!(scaled_pair_degrees(300.0, 150.0, 0.0), (0.0, 0.0));
        // One-sided zero: the moving motor is the outer one
        assert_eq!(scaled_pair_degrees(300.0, 0.0, 90.0), (90.0, 0.0));
    }
}
