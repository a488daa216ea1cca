// Platform description: device-tree root and port addresses.
//
// Firmware images differ in where the device tree lives and in what the
// port addresses are called, so instead of baking the constants in at build
// time the crate takes a `Platform` record at construction. The default
// matches the standard brick; deployments on carrier boards load a JSON
// file with their own addresses.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Device class names used by the constructors
pub const CLASS_TACHO_MOTOR: &str = "tacho-motor";
pub const CLASS_LEGO_SENSOR: &str = "lego-sensor";
pub const CLASS_LEDS: &str = "leds";
pub const CLASS_POWER_SUPPLY: &str = "power_supply";

/// One of the four motor output ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OutputPort {
    A,
    B,
    C,
    D,
}

impl OutputPort {
    pub const ALL: [OutputPort; 4] = [OutputPort::A, OutputPort::B, OutputPort::C, OutputPort::D];

    fn index(self) -> usize {
        match self {
            OutputPort::A => 0,
            OutputPort::B => 1,
            OutputPort::C => 2,
            OutputPort::D => 3,
        }
    }
}

/// One of the four sensor input ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InputPort {
    One,
    Two,
    Three,
    Four,
}

impl InputPort {
    fn index(self) -> usize {
        match self {
            InputPort::One => 0,
            InputPort::Two => 1,
            InputPort::Three => 2,
            InputPort::Four => 3,
        }
    }
}

/// Where the device tree lives and what the ports are called there.
///
/// Resolved once by the application and borrowed by every device
/// constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    /// Root of the per-class device directories, normally `/sys/class`
    pub device_root: PathBuf,
    /// Addresses behind output ports A..D
    pub outputs: [String; 4],
    /// Addresses behind input ports 1..4
    pub inputs: [String; 4],
    /// Status LED device names, `(position, color)` pairs
    pub led_names: Vec<(String, String)>,
}

impl Default for Platform {
    fn default() -> Self {
        Self {
            device_root: PathBuf::from("/sys/class"),
            outputs: ["outA", "outB", "outC", "outD"].map(String::from),
            inputs: ["in1", "in2", "in3", "in4"].map(String::from),
            led_names: vec![
                ("left".to_string(), "green".to_string()),
                ("left".to_string(), "red".to_string()),
                ("right".to_string(), "green".to_string()),
                ("right".to_string(), "red".to_string()),
            ],
        }
    }
}

impl Platform {
    /// Load a platform description from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let platform = serde_json::from_str(&text)
            .map_err(|e| crate::error::DriveError::precondition(format!("bad platform file: {e}")))?;
        Ok(platform)
    }

    /// Platform rooted somewhere other than `/sys/class`, with standard
    /// port names. Used by the integration tests and by chrooted setups.
    pub fn with_device_root(device_root: impl Into<PathBuf>) -> Self {
        Self {
            device_root: device_root.into(),
            ..Self::default()
        }
    }

    /// Address string behind an output port, e.g. `"outA"`
    pub fn output_address(&self, port: OutputPort) -> &str {
        &self.outputs[port.index()]
    }

    /// Address string behind an input port, e.g. `"in1"`
    pub fn input_address(&self, port: InputPort) -> &str {
        &self.inputs[port.index()]
    }

    /// Directory holding every device of `class`
    pub fn class_dir(&self, class: &str) -> PathBuf {
        self.device_root.join(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_addresses() {
        let platform = Platform::default();
        assert_eq!(platform.output_address(OutputPort::A), "outA");
        assert_eq!(platform.output_address(OutputPort::D), "outD");
        assert_eq!(platform.input_address(InputPort::One), "in1");
        assert_eq!(
            platform.class_dir("tacho-motor").to_str().unwrap(),
            "/sys/class/tacho-motor"
        );
    }

    #[test]
    fn test_roundtrip_json() {
        let platform = Platform::with_device_root("/tmp/fake-sys");
        let text = serde_json::to_string(&platform).unwrap();
        let back: Platform = serde_json::from_str(&text).unwrap();
        assert_eq!(back.device_root, platform.device_root);
        assert_eq!(back.outputs, platform.outputs);
    }
}
