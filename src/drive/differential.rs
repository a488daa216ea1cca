// Differential drive: a tank pair with wheel geometry and a wheelbase.
//
// Adds straight-line, arc, and pivot primitives measured in physical
// units, and -- with odometry running -- goal-directed driving to world
// coordinates and absolute headings.

use std::f32::consts::PI;

use tracing::debug;

use crate::config::{OutputPort, Platform};
use crate::error::{DriveError, Result};
use crate::motor::MotorKind;
use crate::units::SpeedValue;
use crate::wheel::Wheel;

use super::odometry::{OdometryInputs, OdometryTask, Pose, shortest_rotation};
use super::tank::MoveTank;

/// A two-wheeled differential-drive vehicle
pub struct MoveDifferential {
    tank: MoveTank,
    wheel: Wheel,
    /// Distance between the two wheels' contact-patch centers, mm
    wheelbase_mm: f32,
    /// Circumference of the circle swept when pivoting in place
    pivot_circumference_mm: f32,
    /// Arcs tighter than this would need a wheel to reverse
    min_arc_radius_mm: f32,
    odometry: Option<OdometryTask>,
}

impl MoveDifferential {
    pub fn new(
        platform: &Platform,
        left_port: OutputPort,
        right_port: OutputPort,
        kind: MotorKind,
        wheel: Wheel,
        wheelbase_mm: f32,
    ) -> Result<Self> {
        let tank = MoveTank::new(platform, left_port, right_port, kind)?;
        Ok(Self {
            tank,
            wheel,
            wheelbase_mm,
            pivot_circumference_mm: wheelbase_mm * PI,
            min_arc_radius_mm: wheelbase_mm / 2.0,
            odometry: None,
        })
    }

    pub fn tank(&mut self) -> &mut MoveTank {
        &mut self.tank
    }

    pub fn wheel(&self) -> &Wheel {
        &self.wheel
    }

    pub fn wheelbase_mm(&self) -> f32 {
        self.wheelbase_mm
    }

    /// Drive straight for `distance_mm`; direction follows the speed's sign
    pub fn on_for_distance(
        &mut self,
        speed: impl Into<SpeedValue>,
        distance_mm: f32,
        brake: bool,
        block: bool,
    ) -> Result<()> {
        let speed = speed.into();
        let rotations = distance_mm / self.wheel.circumference_mm;
        debug!("on_for_distance: {} mm -> {} wheel rotations", distance_mm, rotations);
        self.tank.on_for_rotations(speed, speed, rotations, brake, block)
    }

    fn on_arc(
        &mut self,
        speed: impl Into<SpeedValue>,
        radius_mm: f32,
        arc_length_mm: f32,
        brake: bool,
        block: bool,
        arc_right: bool,
    ) -> Result<()> {
        if radius_mm < self.min_arc_radius_mm {
            return Err(DriveError::precondition(format!(
                "arc radius {radius_mm} mm is less than half the wheelbase ({} mm)",
                self.min_arc_radius_mm
            )));
        }

        // The circle traced midway between the wheels is the one that must
        // have the requested radius; the wheels ride concentric circles
        // half a wheelbase inside and outside it.
        let outer_radius = radius_mm + self.wheelbase_mm / 2.0;
        let inner_radius = radius_mm - self.wheelbase_mm / 2.0;

        let native = speed.into().to_native(self.tank.left().spec())?;
        let outer_speed = native;
        let inner_speed = native * inner_radius / outer_radius;

        let (left_speed, right_speed) = if arc_right {
            (outer_speed, inner_speed)
        } else {
            (inner_speed, outer_speed)
        };

        // Outer wheel travel for the mid circle to cover arc_length_mm
        let outer_arc_mm = arc_length_mm * outer_radius / radius_mm;
        let outer_degrees = outer_arc_mm / self.wheel.circumference_mm * 360.0;

        debug!(
            "arc {}: radius {} mm, length {} mm -> outer {} deg, speeds ({}, {})",
            if arc_right { "right" } else { "left" },
            radius_mm,
            arc_length_mm,
            outer_degrees,
            left_speed,
            right_speed
        );

        self.tank.on_for_degrees(
            SpeedValue::NativeUnits(left_speed),
            SpeedValue::NativeUnits(right_speed),
            outer_degrees,
            brake,
            block,
        )
    }

    /// Drive clockwise along a circle of `radius_mm` for `arc_length_mm`
    /// measured along the robot's center line
    pub fn on_arc_right(
        &mut self,
        speed: impl Into<SpeedValue>,
        radius_mm: f32,
        arc_length_mm: f32,
        brake: bool,
        block: bool,
    ) -> Result<()> {
        self.on_arc(speed, radius_mm, arc_length_mm, brake, block, true)
    }

    /// Drive counter-clockwise along a circle of `radius_mm` for
    /// `arc_length_mm` measured along the robot's center line
    pub fn on_arc_left(
        &mut self,
        speed: impl Into<SpeedValue>,
        radius_mm: f32,
        arc_length_mm: f32,
        brake: bool,
        block: bool,
    ) -> Result<()> {
        self.on_arc(speed, radius_mm, arc_length_mm, brake, block, false)
    }

    fn turn(
        &mut self,
        speed: impl Into<SpeedValue>,
        signed_degrees: f32,
        brake: bool,
        block: bool,
    ) -> Result<()> {
        // Travel each wheel needs along the pivot circle
        let distance_mm = signed_degrees.abs() / 360.0 * self.pivot_circumference_mm;
        let rotations = distance_mm / self.wheel.circumference_mm;
        let native = speed.into().to_native(self.tank.left().spec())?;

        debug!("pivot {} deg -> {} wheel rotations each", signed_degrees, rotations);

        // Positive degrees pivot clockwise: left forward, right back
        let (left, right) = if signed_degrees > 0.0 {
            (native, -native)
        } else {
            (-native, native)
        };
        self.tank.on_for_rotations(
            SpeedValue::NativeUnits(left),
            SpeedValue::NativeUnits(right),
            rotations,
            brake,
            block,
        )
    }

    /// Pivot clockwise in place by `degrees`
    pub fn turn_right(
        &mut self,
        speed: impl Into<SpeedValue>,
        degrees: f32,
        brake: bool,
        block: bool,
    ) -> Result<()> {
        self.turn(speed, degrees.abs(), brake, block)
    }

    /// Pivot counter-clockwise in place by `degrees`
    pub fn turn_left(
        &mut self,
        speed: impl Into<SpeedValue>,
        degrees: f32,
        brake: bool,
        block: bool,
    ) -> Result<()> {
        self.turn(speed, -degrees.abs(), brake, block)
    }

    /// Stop both motors, holding position if `brake` is set
    pub fn off(&mut self, brake: bool) -> Result<()> {
        self.tank.off(brake)
    }

    // === odometry ===

    /// Pin the world frame at the current pose and start integrating.
    ///
    /// Reads both encoders once for the zero reference, then spawns the
    /// sampling thread. Starting twice is a precondition error.
    pub fn odometry_start(&mut self) -> Result<()> {
        if self.odometry.is_some() {
            return Err(DriveError::precondition("odometry is already running"));
        }

        let mm_per_count_left =
            self.wheel.circumference_mm / self.tank.left().spec().count_per_rot as f32;
        let mm_per_count_right =
            self.wheel.circumference_mm / self.tank.right().spec().count_per_rot as f32;

        let initial_left = self.tank.left().position()?;
        let initial_right = self.tank.right().position()?;

        // The thread gets its own attribute handles so the motor handles
        // stay free for commands on the application thread
        let left_position = self.tank.left().device().open_attribute("position")?;
        let right_position = self.tank.right().device().open_attribute("position")?;

        self.odometry = Some(OdometryTask::spawn(OdometryInputs {
            left_position,
            right_position,
            initial_left,
            initial_right,
            mm_per_count_left,
            mm_per_count_right,
            wheelbase_mm: self.wheelbase_mm,
        }));
        debug!("odometry started at ({initial_left}, {initial_right}) counts");
        Ok(())
    }

    /// Stop the integrator thread at its next tick boundary
    pub fn odometry_stop(&mut self) {
        if let Some(task) = self.odometry.take() {
            task.stop();
        }
    }

    pub fn odometry_running(&self) -> bool {
        self.odometry.is_some()
    }

    /// Snapshot the current pose. Fails if odometry is not running, or
    /// with the stored error if the integrator died.
    pub fn pose(&self) -> Result<Pose> {
        match &self.odometry {
            Some(task) => task.pose(),
            None => Err(DriveError::precondition("odometry is not running")),
        }
    }

    /// Pivot to the absolute heading `target_deg` by the shortest rotation
    pub fn turn_to_angle(
        &mut self,
        speed: impl Into<SpeedValue>,
        target_deg: f32,
        brake: bool,
        block: bool,
    ) -> Result<()> {
        let pose = self.pose()?;
        let delta = shortest_rotation(pose.theta_deg, target_deg);
        debug!("turn_to_angle: {} -> {} is {} deg", pose.theta_deg, target_deg, delta);

        if delta >= 0.0 {
            self.turn_left(speed, delta, brake, block)
        } else {
            self.turn_right(speed, -delta, brake, block)
        }
    }

    /// Turn toward and drive to the world point `(x_mm, y_mm)`
    pub fn on_to_coordinates(
        &mut self,
        speed: impl Into<SpeedValue>,
        x_mm: f32,
        y_mm: f32,
        brake: bool,
        block: bool,
    ) -> Result<()> {
        let speed = speed.into();
        let pose = self.pose()?;
        let bearing = pose.bearing_to(x_mm, y_mm);
        let distance = pose.distance_to(x_mm, y_mm);
        debug!(
            "on_to_coordinates: ({}, {}) is bearing {} deg, {} mm away",
            x_mm, y_mm, bearing, distance
        );

        self.turn_to_angle(speed, bearing, brake, true)?;
        self.on_for_distance(speed, distance, brake, block)
    }
}

impl Drop for MoveDifferential {
    fn drop(&mut self) {
        self.odometry_stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arc_wheel_degrees() {
        // Arc of radius 182.88 mm for 287.27 mm with wheelbase 130.4 and a
        // 56 mm wheel: outer wheel ~797 deg, inner ~378 deg of rotation
        let wheel = Wheel::education_tire();
        let wheelbase = 130.4f32;
        let radius = 182.88f32;
        let arc_length = 287.27f32;

        let outer_radius = radius + wheelbase / 2.0;
        let inner_radius = radius - wheelbase / 2.0;
        assert!((outer_radius - 248.08).abs() < 0.01);
        assert!((inner_radius - 117.68).abs() < 0.01);

        let speed_ratio = inner_radius / outer_radius;
        assert!((speed_ratio - 0.474).abs() < 0.001);

        let outer_degrees = arc_length * outer_radius / radius / wheel.circumference_mm * 360.0;
        assert!((outer_degrees - 797.0).abs() < 1.0, "outer = {outer_degrees}");

        // The tank layer scales the inner travel by the speed ratio
        let inner_degrees = outer_degrees * speed_ratio;
        assert!((inner_degrees - 378.0).abs() < 1.0, "inner = {inner_degrees}");
    }

    #[test]
    fn test_pivot_wheel_travel() {
        // 90-degree pivot with wheelbase 130.4: each wheel travels a
        // quarter of the pivot circle
        let wheelbase = 130.4f32;
        let distance = 90.0 / 360.0 * (wheelbase * PI);
        assert!((distance - 102.39).abs() < 0.01);
    }
}
