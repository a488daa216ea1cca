// Status LEDs.
//
// Each LED is a device exposing `brightness` (0..max_brightness) and a
// `trigger` selector. The brick pairs a green and a red element per side,
// so amber comes from driving both.

use crate::config::{CLASS_LEDS, Platform};
use crate::device::Device;
use crate::error::Result;

/// One LED element
pub struct Led {
    device: Device,
    max_brightness: i32,
}

impl Led {
    /// Bind the LED whose device name contains every fragment, e.g.
    /// `["left", "green"]`
    pub fn new(platform: &Platform, fragments: &[&str]) -> Result<Self> {
        let mut device = Device::find_by_name(platform, CLASS_LEDS, fragments)?;
        let max_brightness = device.get_attr_int("max_brightness")?;
        Ok(Self { device, max_brightness })
    }

    pub fn max_brightness(&self) -> i32 {
        self.max_brightness
    }

    pub fn brightness(&mut self) -> Result<i32> {
        self.device.get_attr_int("brightness")
    }

    pub fn set_brightness(&mut self, value: i32) -> Result<()> {
        self.device.set_attr_int("brightness", value.clamp(0, self.max_brightness))
    }

    /// Brightness as a 0.0..=1.0 fraction of the maximum
    pub fn set_brightness_pct(&mut self, fraction: f32) -> Result<()> {
        let value = (fraction.clamp(0.0, 1.0) * self.max_brightness as f32).round() as i32;
        self.set_brightness(value)
    }

    /// Kernel triggers advertised for this LED
    pub fn triggers(&mut self) -> Result<Vec<String>> {
        self.device.get_attr_set("trigger")
    }

    /// The currently selected trigger
    pub fn trigger(&mut self) -> Result<String> {
        self.device.get_attr_selected("trigger")
    }

    pub fn set_trigger(&mut self, trigger: &str) -> Result<()> {
        self.device.set_attr_string("trigger", trigger)
    }
}

/// The brick's status LED pairs, looked up through the platform record
pub struct Leds {
    leds: Vec<(String, String, Led)>,
}

impl Leds {
    pub fn new(platform: &Platform) -> Result<Self> {
        let mut leds = Vec::new();
        for (position, color) in &platform.led_names {
            let led = Led::new(platform, &[position.as_str(), color.as_str()])?;
            leds.push((position.clone(), color.clone(), led));
        }
        Ok(Self { leds })
    }

    pub fn led(&mut self, position: &str, color: &str) -> Option<&mut Led> {
        self.leds
            .iter_mut()
            .find(|(p, c, _)| p == position && c == color)
            .map(|(_, _, led)| led)
    }

    /// Drive every element off
    pub fn all_off(&mut self) -> Result<()> {
        for (_, _, led) in &mut self.leds {
            led.set_brightness(0)?;
        }
        Ok(())
    }
}
