// Battery readout.
//
// The power-supply device reports microvolts and microamps; the helpers
// scale to volts and amps.

use crate::config::{CLASS_POWER_SUPPLY, Platform};
use crate::device::Device;
use crate::error::Result;

pub struct PowerSupply {
    device: Device,
}

impl PowerSupply {
    /// Bind the battery device; the brick names it with this fragment
    pub fn new(platform: &Platform) -> Result<Self> {
        Self::with_name(platform, "battery")
    }

    /// Bind a power supply whose device name contains `fragment`
    pub fn with_name(platform: &Platform, fragment: &str) -> Result<Self> {
        let device = Device::find_by_name(platform, CLASS_POWER_SUPPLY, &[fragment])?;
        Ok(Self { device })
    }

    /// Battery voltage in microvolts
    pub fn voltage_uv(&mut self) -> Result<i32> {
        self.device.get_attr_int("voltage_now")
    }

    /// Battery voltage in volts
    pub fn voltage(&mut self) -> Result<f32> {
        Ok(self.voltage_uv()? as f32 / 1_000_000.0)
    }

    /// Battery current in microamps
    pub fn current_ua(&mut self) -> Result<i32> {
        self.device.get_attr_int("current_now")
    }

    /// Battery current in amps
    pub fn current(&mut self) -> Result<f32> {
        Ok(self.current_ua()? as f32 / 1_000_000.0)
    }

    /// Battery chemistry, e.g. `Li-ion`
    pub fn technology(&mut self) -> Result<String> {
        self.device.get_attr_string("technology")
    }
}
