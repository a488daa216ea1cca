// Minimal sensor contract: a mode selector and scalar value channels.
//
// Only the surface the motion layer consumes is modeled here. The line
// follower reads the color sensor's reflected-light mode; the gyro and
// touch wrappers exist for calibration scripts and demos.

use tracing::debug;

use crate::config::{CLASS_LEGO_SENSOR, InputPort, Platform};
use crate::device::Device;
use crate::error::Result;

const VALUE_ATTRS: [&str; 8] = [
    "value0", "value1", "value2", "value3", "value4", "value5", "value6", "value7",
];

/// Handle to one sensor device
pub struct Sensor {
    device: Device,
    address: String,
    driver_name: String,
    /// Last mode written, to skip redundant mode switches
    current_mode: Option<String>,
}

impl Sensor {
    /// Bind the sensor plugged into `port`, requiring one of `drivers`
    /// (empty accepts any).
    pub fn new(platform: &Platform, port: InputPort, drivers: &[&str]) -> Result<Self> {
        let address = platform.input_address(port);
        let mut device = Device::find(platform, CLASS_LEGO_SENSOR, address, drivers)?;

        let address = device.get_attr_string("address")?;
        let driver_name = device.get_attr_string("driver_name")?;
        debug!("bound {} at {}", driver_name, address);

        Ok(Self {
            device,
            address,
            driver_name,
            current_mode: None,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    /// Modes advertised by the driver
    pub fn modes(&mut self) -> Result<Vec<String>> {
        self.device.get_attr_set("modes")
    }

    pub fn mode(&mut self) -> Result<String> {
        self.device.get_attr_string("mode")
    }

    pub fn set_mode(&mut self, mode: &'static str) -> Result<()> {
        self.device.set_attr_string("mode", mode)?;
        self.current_mode = Some(mode.to_string());
        Ok(())
    }

    /// Switch modes only when not already there; mode switches cost many
    /// milliseconds on most sensors
    pub fn ensure_mode(&mut self, mode: &'static str) -> Result<()> {
        if self.current_mode.as_deref() == Some(mode) {
            return Ok(());
        }
        self.set_mode(mode)
    }

    /// Number of value channels in the current mode
    pub fn num_values(&mut self) -> Result<i32> {
        self.device.get_attr_int("num_values")
    }

    /// Raw reading of value channel `index` (0..num_values)
    pub fn value(&mut self, index: usize) -> Result<i32> {
        let Some(&attr) = VALUE_ATTRS.get(index) else {
            return Err(crate::error::DriveError::precondition(format!(
                "value index {index} out of range, sensors expose at most {} channels",
                VALUE_ATTRS.len()
            )));
        };
        self.device.get_attr_int(attr)
    }

    /// Decimal places to scale raw values by in the current mode
    pub fn decimals(&mut self) -> Result<i32> {
        self.device.get_attr_int("decimals")
    }

    /// Channel `index` scaled by the mode's decimal places
    pub fn value_scaled(&mut self, index: usize) -> Result<f32> {
        let raw = self.value(index)? as f32;
        let decimals = self.decimals()?;
        Ok(raw / 10f32.powi(decimals))
    }
}

/// Color sensor with reflected-light, ambient-light, and color modes
pub struct ColorSensor {
    sensor: Sensor,
}

impl ColorSensor {
    pub const MODE_COL_REFLECT: &'static str = "COL-REFLECT";
    pub const MODE_COL_AMBIENT: &'static str = "COL-AMBIENT";
    pub const MODE_COL_COLOR: &'static str = "COL-COLOR";

    pub fn new(platform: &Platform, port: InputPort) -> Result<Self> {
        let sensor = Sensor::new(platform, port, &["lego-ev3-color", "lego-nxt-color"])?;
        Ok(Self { sensor })
    }

    pub fn sensor(&mut self) -> &mut Sensor {
        &mut self.sensor
    }

    /// Reflected light intensity, 0..100, red LED on
    pub fn reflected_light_intensity(&mut self) -> Result<i32> {
        self.sensor.ensure_mode(Self::MODE_COL_REFLECT)?;
        self.sensor.value(0)
    }

    /// Ambient light intensity, 0..100
    pub fn ambient_light_intensity(&mut self) -> Result<i32> {
        self.sensor.ensure_mode(Self::MODE_COL_AMBIENT)?;
        self.sensor.value(0)
    }

    /// Detected color index, 0 = none through 7 = brown
    pub fn color(&mut self) -> Result<i32> {
        self.sensor.ensure_mode(Self::MODE_COL_COLOR)?;
        self.sensor.value(0)
    }
}

/// Gyro sensor; the motion layer only ever consumes the angle mode
pub struct GyroSensor {
    sensor: Sensor,
}

impl GyroSensor {
    pub const MODE_GYRO_ANG: &'static str = "GYRO-ANG";
    pub const MODE_GYRO_RATE: &'static str = "GYRO-RATE";

    pub fn new(platform: &Platform, port: InputPort) -> Result<Self> {
        let sensor = Sensor::new(platform, port, &["lego-ev3-gyro"])?;
        Ok(Self { sensor })
    }

    pub fn sensor(&mut self) -> &mut Sensor {
        &mut self.sensor
    }

    /// Accumulated rotation in degrees since mode entry; clockwise is
    /// positive
    pub fn angle(&mut self) -> Result<i32> {
        self.sensor.ensure_mode(Self::MODE_GYRO_ANG)?;
        self.sensor.value(0)
    }

    /// Rotation rate in degrees per second
    pub fn rate(&mut self) -> Result<i32> {
        self.sensor.ensure_mode(Self::MODE_GYRO_RATE)?;
        self.sensor.value(0)
    }
}

/// Touch sensor
pub struct TouchSensor {
    sensor: Sensor,
}

impl TouchSensor {
    pub const MODE_TOUCH: &'static str = "TOUCH";

    pub fn new(platform: &Platform, port: InputPort) -> Result<Self> {
        let sensor = Sensor::new(platform, port, &["lego-ev3-touch", "lego-nxt-touch"])?;
        Ok(Self { sensor })
    }

    pub fn is_pressed(&mut self) -> Result<bool> {
        self.sensor.ensure_mode(Self::MODE_TOUCH)?;
        Ok(self.sensor.value(0)? != 0)
    }
}
