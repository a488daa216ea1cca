// Joystick ("arcade") drive: one polar input vector drives the pair.
//
// Full forward goes straight, full sideways pivots on the spot, and
// positions in between control how fast the vehicle moves and how sharply
// it turns.

use crate::error::Result;
use crate::units::SpeedValue;

use super::tank::MoveTank;

/// Per-motor power fractions for a joystick angle.
///
/// The eight cardinal points are fixed at
/// 0 deg (1, -1), 45 (1, 0), 90 (1, 1), 135 (0, 1), 180 (-1, 1),
/// 225 (-1, 0), 270 (-1, -1), 315 (0, -1), wrapping back to (1, -1);
/// between them the fractions interpolate linearly. In the 180-225 and
/// 315-360 segments one motor swings a full two units, crossing zero at
/// the 22.5 deg midpoint, so those interpolate in two stages.
pub(crate) fn angle_to_speed_fraction(angle: f32) -> (f32, f32) {
    if (0.0..=45.0).contains(&angle) {
        // right motor transitions from -1 to 0
        (1.0, -1.0 + angle / 45.0)
    } else if angle <= 90.0 {
        // right motor transitions from 0 to 1
        (1.0, (angle - 45.0) / 45.0)
    } else if angle <= 135.0 {
        // left motor transitions from 1 to 0
        (1.0 - (angle - 90.0) / 45.0, 1.0)
    } else if angle <= 180.0 {
        // left motor transitions from 0 to -1
        (-(angle - 135.0) / 45.0, 1.0)
    } else if angle <= 225.0 {
        // left motor transitions from -1 to 0; the right motor crosses
        // from 1 through zero at 202.5 down to -1
        let left = -1.0 + (angle - 180.0) / 45.0;
        let right = if angle < 202.5 {
            1.0 - (angle - 180.0) / 22.5
        } else {
            -((angle - 202.5) / 22.5)
        };
        (left, right)
    } else if angle <= 270.0 {
        // left motor transitions from 0 to -1
        (-(angle - 225.0) / 45.0, -1.0)
    } else if angle <= 315.0 {
        // right motor transitions from -1 to 0
        (-1.0, -1.0 + (angle - 270.0) / 45.0)
    } else {
        // left motor crosses from -1 through zero at 337.5 up to 1
        let left = if angle < 337.5 {
            -(1.0 - (angle - 315.0) / 22.5)
        } else {
            (angle - 337.5) / 22.5
        };
        (left, -((angle - 315.0) / 45.0))
    }
}

/// A tank pair driven from a joystick vector
pub struct MoveJoystick {
    tank: MoveTank,
}

impl MoveJoystick {
    pub fn new(tank: MoveTank) -> Self {
        Self { tank }
    }

    pub fn tank(&mut self) -> &mut MoveTank {
        &mut self.tank
    }

    pub fn into_tank(self) -> MoveTank {
        self.tank
    }

    /// Drive from joystick coordinates `(x, y)` within a circle of
    /// `radius`; `(0, 0)` stops the pair. `max_speed` is the speed at the
    /// rim of the circle.
    pub fn on(
        &mut self,
        x: f32,
        y: f32,
        max_speed: impl Into<SpeedValue>,
        radius: f32,
    ) -> Result<()> {
        if x == 0.0 && y == 0.0 {
            return self.tank.off(true);
        }

        // Clamp the vector to the rim; callers at the edge of a physical
        // stick overshoot by a hair of floating-point error
        let length = (x * x + y * y).sqrt().min(radius);
        let mut angle = y.atan2(x).to_degrees();
        if angle < 0.0 {
            angle += 360.0;
        }

        let (left_fraction, right_fraction) = angle_to_speed_fraction(angle);
        let scale = length / radius;
        let native_max = max_speed.into().to_native(self.tank.left().spec())?;

        self.tank.on(
            SpeedValue::NativeUnits(left_fraction * scale * native_max),
            SpeedValue::NativeUnits(right_fraction * scale * native_max),
        )
    }

    pub fn off(&mut self, brake: bool) -> Result<()> {
        self.tank.off(brake)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_pair(angle: f32, expected: (f32, f32)) {
        let (left, right) = angle_to_speed_fraction(angle);
        assert!(
            (left - expected.0).abs() < 1e-5 && (right - expected.1).abs() < 1e-5,
            "at {angle} deg expected {expected:?}, got ({left}, {right})"
        );
    }

    #[test]
    fn test_cardinal_points() {
        assert_pair(0.0, (1.0, -1.0));
        assert_pair(45.0, (1.0, 0.0));
        assert_pair(90.0, (1.0, 1.0));
        assert_pair(135.0, (0.0, 1.0));
        assert_pair(180.0, (-1.0, 1.0));
        assert_pair(225.0, (-1.0, 0.0));
        assert_pair(270.0, (-1.0, -1.0));
        assert_pair(315.0, (0.0, -1.0));
        assert_pair(360.0, (1.0, -1.0));
    }

    #[test]
    fn test_linear_interpolation_between_cardinals() {
        // 11.25 is a quarter of the way from 0 to 45, so the right motor
        // is a quarter of the way from -1 to 0
        assert_pair(11.25, (1.0, -0.75));
        assert_pair(67.5, (1.0, 0.5));
        assert_pair(112.5, (0.5, 1.0));
        assert_pair(247.5, (-0.5, -1.0));
    }

    #[test]
    fn test_two_stage_segments_cross_zero_at_midpoint() {
        assert_pair(202.5, (-0.5, 0.0));
        assert_pair(191.25, (-0.75, 0.5));
        assert_pair(213.75, (-0.25, -0.5));

        assert_pair(337.5, (0.0, -0.5));
        assert_pair(326.25, (-0.5, -0.25));
        assert_pair(348.75, (0.5, -0.75));
    }
}
