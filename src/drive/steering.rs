// Steering drive: one signed scalar picks the turn, one speed drives it.
//
// steering in [-100, 100]:
//   -100  turn left on the spot (right motor full forward, left full back)
//      0  drive straight
//    100  turn right on the spot

use crate::error::{DriveError, Result};
use crate::units::SpeedValue;

use super::tank::MoveTank;

/// Derive the (left, right) native speed pair for a steering value.
///
/// `native_speed` applies to the outer motor; the inner motor scales by
/// `(50 - |steering|) / 50`, passing through zero at 50 and reversing
/// fully at 100.
pub(crate) fn steering_pair(steering: f32, native_speed: f32) -> Result<(f32, f32)> {
    if !(-100.0..=100.0).contains(&steering) {
        return Err(DriveError::precondition(format!(
            "{steering} is an invalid steering, must be between -100 and 100 (inclusive)"
        )));
    }

    let speed_factor = (50.0 - steering.abs()) / 50.0;
    if steering >= 0.0 {
        Ok((native_speed, native_speed * speed_factor))
    } else {
        Ok((native_speed * speed_factor, native_speed))
    }
}

/// A tank pair driven through a single steering scalar and speed
pub struct MoveSteering {
    tank: MoveTank,
}

impl MoveSteering {
    pub fn new(tank: MoveTank) -> Self {
        Self { tank }
    }

    /// The underlying tank pair
    pub fn tank(&mut self) -> &mut MoveTank {
        &mut self.tank
    }

    pub fn into_tank(self) -> MoveTank {
        self.tank
    }

    /// Compute the per-motor native speeds for `steering` without moving.
    /// The left motor's rating is assumed to hold for the pair.
    pub fn get_speed_steering(
        &mut self,
        steering: f32,
        speed: impl Into<SpeedValue>,
    ) -> Result<(f32, f32)> {
        let native = speed.into().to_native(self.tank.left().spec())?;
        steering_pair(steering, native)
    }

    pub fn on_for_rotations(
        &mut self,
        steering: f32,
        speed: impl Into<SpeedValue>,
        rotations: f32,
        brake: bool,
        block: bool,
    ) -> Result<()> {
        let (left, right) = self.get_speed_steering(steering, speed)?;
        self.tank.on_for_rotations(
            SpeedValue::NativeUnits(left),
            SpeedValue::NativeUnits(right),
            rotations,
            brake,
            block,
        )
    }

    pub fn on_for_degrees(
        &mut self,
        steering: f32,
        speed: impl Into<SpeedValue>,
        degrees: f32,
        brake: bool,
        block: bool,
    ) -> Result<()> {
        let (left, right) = self.get_speed_steering(steering, speed)?;
        self.tank.on_for_degrees(
            SpeedValue::NativeUnits(left),
            SpeedValue::NativeUnits(right),
            degrees,
            brake,
            block,
        )
    }

    pub fn on_for_seconds(
        &mut self,
        steering: f32,
        speed: impl Into<SpeedValue>,
        seconds: f32,
        brake: bool,
        block: bool,
    ) -> Result<()> {
        let (left, right) = self.get_speed_steering(steering, speed)?;
        self.tank.on_for_seconds(
            SpeedValue::NativeUnits(left),
            SpeedValue::NativeUnits(right),
            seconds,
            brake,
            block,
        )
    }

    pub fn on(&mut self, steering: f32, speed: impl Into<SpeedValue>) -> Result<()> {
        let (left, right) = self.get_speed_steering(steering, speed)?;
        self.tank
            .on(SpeedValue::NativeUnits(left), SpeedValue::NativeUnits(right))
    }

    pub fn off(&mut self, brake: bool) -> Result<()> {
        self.tank.off(brake)
    }
}
