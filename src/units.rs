// Speed and distance value types.
//
// A speed can be declared in whatever unit is convenient (percent of rated
// maximum, native tacho counts/sec, rotations or degrees per second or
// minute) and is reduced to native units against a specific motor's rating.
// Distances reduce to millimeters.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DriveError, Result};
use crate::motor::MotorSpec;

const CENTIMETER_MM: f32 = 10.0;
const DECIMETER_MM: f32 = 100.0;
const METER_MM: f32 = 1000.0;
const INCH_MM: f32 = 25.4;
const FOOT_MM: f32 = 304.8;
const YARD_MM: f32 = 914.4;
/// The classic brick construction unit
pub const STUD_MM: f32 = 8.0;

/// A speed magnitude tagged with its unit.
///
/// Raw numbers coerce to `Percent` via `From`, so APIs accepting
/// `impl Into<SpeedValue>` take both `50` and `SpeedValue::rpm(40.0)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpeedValue {
    /// Percent of the motor's rated maximum, -100..=100
    Percent(f32),
    /// Native tacho counts per second
    NativeUnits(f32),
    RotationsPerSec(f32),
    RotationsPerMin(f32),
    DegreesPerSec(f32),
    DegreesPerMin(f32),
}

impl SpeedValue {
    /// Percent of rated maximum; rejects magnitudes above 100 up front
    pub fn percent(percent: f32) -> Result<Self> {
        if !(-100.0..=100.0).contains(&percent) {
            return Err(DriveError::precondition(format!(
                "{percent} is an invalid percentage, must be between -100 and 100 (inclusive)"
            )));
        }
        Ok(SpeedValue::Percent(percent))
    }

    pub fn native(counts_per_sec: f32) -> Self {
        SpeedValue::NativeUnits(counts_per_sec)
    }

    pub fn rps(rotations_per_sec: f32) -> Self {
        SpeedValue::RotationsPerSec(rotations_per_sec)
    }

    pub fn rpm(rotations_per_min: f32) -> Self {
        SpeedValue::RotationsPerMin(rotations_per_min)
    }

    pub fn dps(degrees_per_sec: f32) -> Self {
        SpeedValue::DegreesPerSec(degrees_per_sec)
    }

    pub fn dpm(degrees_per_min: f32) -> Self {
        SpeedValue::DegreesPerMin(degrees_per_min)
    }

    /// Reduce to native counts/sec against `spec`.
    ///
    /// A magnitude that exceeds the motor's rating in the declared unit is
    /// a precondition failure, not a clamped value.
    pub fn to_native(self, spec: &MotorSpec) -> Result<f32> {
        let max_speed = spec.max_speed as f32;
        match self {
            SpeedValue::Percent(p) => {
                if p.abs() > 100.0 {
                    Err(DriveError::precondition(format!(
                        "{p} is an invalid percentage, must be between -100 and 100 (inclusive)"
                    )))
                } else {
                    Ok(p / 100.0 * max_speed)
                }
            }
            SpeedValue::NativeUnits(n) => Ok(n),
            SpeedValue::RotationsPerSec(r) => {
                if r.abs() > spec.max_rps() {
                    Err(DriveError::precondition(format!(
                        "invalid rotations-per-second: max RPS is {}, {} was requested",
                        spec.max_rps(),
                        r
                    )))
                } else {
                    Ok(r / spec.max_rps() * max_speed)
                }
            }
            SpeedValue::RotationsPerMin(r) => {
                if r.abs() > spec.max_rpm() {
                    Err(DriveError::precondition(format!(
                        "invalid rotations-per-minute: max RPM is {}, {} was requested",
                        spec.max_rpm(),
                        r
                    )))
                } else {
                    Ok(r / spec.max_rpm() * max_speed)
                }
            }
            SpeedValue::DegreesPerSec(d) => {
                if d.abs() > spec.max_dps() {
                    Err(DriveError::precondition(format!(
                        "invalid degrees-per-second: max DPS is {}, {} was requested",
                        spec.max_dps(),
                        d
                    )))
                } else {
                    Ok(d / spec.max_dps() * max_speed)
                }
            }
            SpeedValue::DegreesPerMin(d) => {
                if d.abs() > spec.max_dpm() {
                    Err(DriveError::precondition(format!(
                        "invalid degrees-per-minute: max DPM is {}, {} was requested",
                        spec.max_dpm(),
                        d
                    )))
                } else {
                    Ok(d / spec.max_dpm() * max_speed)
                }
            }
        }
    }
}

impl From<f32> for SpeedValue {
    fn from(percent: f32) -> Self {
        SpeedValue::Percent(percent)
    }
}

impl From<i32> for SpeedValue {
    fn from(percent: i32) -> Self {
        SpeedValue::Percent(percent as f32)
    }
}

impl fmt::Display for SpeedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeedValue::Percent(v) => write!(f, "{v}%"),
            SpeedValue::NativeUnits(v) => write!(f, "{v} counts/sec"),
            SpeedValue::RotationsPerSec(v) => write!(f, "{v} rot/sec"),
            SpeedValue::RotationsPerMin(v) => write!(f, "{v} rot/min"),
            SpeedValue::DegreesPerSec(v) => write!(f, "{v} deg/sec"),
            SpeedValue::DegreesPerMin(v) => write!(f, "{v} deg/min"),
        }
    }
}

/// A physical distance, reducible to millimeters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DistanceValue {
    Millimeters(f32),
    Centimeters(f32),
    Decimeters(f32),
    Meters(f32),
    Inches(f32),
    Feet(f32),
    Yards(f32),
    Studs(f32),
}

impl DistanceValue {
    pub fn mm(self) -> f32 {
        match self {
            DistanceValue::Millimeters(v) => v,
            DistanceValue::Centimeters(v) => v * CENTIMETER_MM,
            DistanceValue::Decimeters(v) => v * DECIMETER_MM,
            DistanceValue::Meters(v) => v * METER_MM,
            DistanceValue::Inches(v) => v * INCH_MM,
            DistanceValue::Feet(v) => v * FOOT_MM,
            DistanceValue::Yards(v) => v * YARD_MM,
            DistanceValue::Studs(v) => v * STUD_MM,
        }
    }
}

impl From<f32> for DistanceValue {
    fn from(millimeters: f32) -> Self {
        DistanceValue::Millimeters(millimeters)
    }
}

impl fmt::Display for DistanceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceValue::Millimeters(v) => write!(f, "{v}mm"),
            DistanceValue::Centimeters(v) => write!(f, "{v}cm"),
            DistanceValue::Decimeters(v) => write!(f, "{v}dm"),
            DistanceValue::Meters(v) => write!(f, "{v}m"),
            DistanceValue::Inches(v) => write!(f, "{v}in"),
            DistanceValue::Feet(v) => write!(f, "{v}ft"),
            DistanceValue::Yards(v) => write!(f, "{v}yd"),
            DistanceValue::Studs(v) => write!(f, "{v}stud"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> MotorSpec {
        MotorSpec {
            address: "outA".to_string(),
            driver_name: "lego-ev3-l-motor".to_string(),
            count_per_rot: 360,
            max_speed: 1050,
        }
    }

    #[test]
    fn test_percent_to_native() {
        let m = spec();
        assert_eq!(SpeedValue::Percent(100.0).to_native(&m).unwrap(), 1050.0);
        assert_eq!(SpeedValue::Percent(-100.0).to_native(&m).unwrap(), -1050.0);
        assert_eq!(SpeedValue::Percent(75.0).to_native(&m).unwrap(), 787.5);
        assert_eq!(SpeedValue::Percent(0.0).to_native(&m).unwrap(), 0.0);
    }

    #[test]
    fn test_percent_rejected_at_construction() {
        assert!(SpeedValue::percent(150.0).is_err());
        assert!(SpeedValue::percent(-100.5).is_err());
        assert!(SpeedValue::percent(100.0).is_ok());
    }

    #[test]
    fn test_coerced_percent_rejected_at_conversion() {
        // The unchecked From path is validated when reduced
        let m = spec();
        let v: SpeedValue = 150.0.into();
        assert!(v.to_native(&m).is_err());
    }

    #[test]
    fn test_native_passthrough() {
        let m = spec();
        assert_eq!(SpeedValue::NativeUnits(123.0).to_native(&m).unwrap(), 123.0);
        assert_eq!(SpeedValue::NativeUnits(-2000.0).to_native(&m).unwrap(), -2000.0);
    }

    #[test]
    fn test_rotation_and_degree_units() {
        let m = spec();
        // count_per_rot = 360, so 1 rot/sec = 360 counts/sec
        assert_eq!(SpeedValue::rps(1.0).to_native(&m).unwrap(), 360.0);
        assert_eq!(SpeedValue::rpm(60.0).to_native(&m).unwrap(), 360.0);
        assert_eq!(SpeedValue::dps(360.0).to_native(&m).unwrap(), 360.0);
        assert_eq!(SpeedValue::dpm(21600.0).to_native(&m).unwrap(), 360.0);
        assert_eq!(SpeedValue::rps(-2.0).to_native(&m).unwrap(), -720.0);
    }

    #[test]
    fn test_over_rating_rejected() {
        let m = spec();
        // max_rps = 1050/360 ~= 2.9167
        assert!(SpeedValue::rps(2.9).to_native(&m).is_ok());
        assert!(SpeedValue::rps(3.0).to_native(&m).is_err());
        assert!(SpeedValue::rpm(200.0).to_native(&m).is_err());
        assert!(SpeedValue::dps(1100.0).to_native(&m).is_err());
    }

    #[test]
    fn test_distance_to_mm() {
        assert_eq!(DistanceValue::Millimeters(25.0).mm(), 25.0);
        assert_eq!(DistanceValue::Centimeters(2.5).mm(), 25.0);
        assert_eq!(DistanceValue::Decimeters(1.0).mm(), 100.0);
        assert_eq!(DistanceValue::Meters(1.5).mm(), 1500.0);
        assert_eq!(DistanceValue::Inches(1.0).mm(), 25.4);
        assert_eq!(DistanceValue::Feet(1.0).mm(), 304.8);
        assert_eq!(DistanceValue::Yards(1.0).mm(), 914.4);
        assert_eq!(DistanceValue::Studs(16.0).mm(), 128.0);
    }
}
