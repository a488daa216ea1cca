// Wheel geometry.
//
// The drive layers only need the circumference to convert between linear
// travel and wheel rotation; width is kept for rub checks when building.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

/// A circular wheel, all dimensions in mm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wheel {
    pub diameter_mm: f32,
    pub width_mm: f32,
    pub radius_mm: f32,
    pub circumference_mm: f32,
}

impl Wheel {
    pub fn new(diameter_mm: f32, width_mm: f32) -> Self {
        Self {
            diameter_mm,
            width_mm,
            radius_mm: diameter_mm / 2.0,
            circumference_mm: diameter_mm * PI,
        }
    }

    /// Stock 43.2 x 22 tire shipped with the retail kit
    pub fn stock_tire() -> Self {
        Self::new(43.2, 21.0)
    }

    /// 56 x 28 balloon tire shipped with the education kit
    pub fn education_tire() -> Self {
        Self::new(56.0, 28.0)
    }

    /// Bare 30 x 20 rim, for rubber-band tank treads
    pub fn stock_rim() -> Self {
        Self::new(30.0, 20.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_geometry() {
        let wheel = Wheel::education_tire();
        assert_eq!(wheel.radius_mm, 28.0);
        assert!((wheel.circumference_mm - 175.929).abs() < 0.01);
    }
}
