// Fake device arena for integration tests.
//
// Builds a device tree of plain files inside a tempdir so the full
// attribute protocol can be exercised without hardware. State files start
// empty, so blocking drives fall through their wait-for-running timeout
// and complete immediately.

use std::fs;
use std::path::{Path, PathBuf};

use tachodrive::Platform;
use tempfile::TempDir;

pub struct Arena {
    tmp: TempDir,
}

impl Arena {
    pub fn new() -> Self {
        Self {
            tmp: TempDir::new().expect("tempdir"),
        }
    }

    pub fn platform(&self) -> Platform {
        Platform::with_device_root(self.tmp.path())
    }

    /// Create a tacho-motor device with factory-fresh attribute values:
    /// 360 counts/rot, 1050 counts/sec rating, everything else zeroed.
    pub fn add_motor(&self, index: u32, address: &str, driver: &str) -> PathBuf {
        let dir = self.tmp.path().join("tacho-motor").join(format!("motor{index}"));
        fs::create_dir_all(dir.join("hold_pid")).unwrap();
        fs::create_dir_all(dir.join("speed_pid")).unwrap();

        let attrs: &[(&str, &str)] = &[
            ("address", address),
            ("driver_name", driver),
            (
                "commands",
                "run-forever run-to-abs-pos run-to-rel-pos run-timed run-direct stop reset",
            ),
            ("count_per_rot", "360"),
            ("max_speed", "1050"),
            ("position", "0"),
            ("position_sp", "0"),
            ("speed", "0"),
            ("speed_sp", "0"),
            ("duty_cycle", "0"),
            ("duty_cycle_sp", "0"),
            ("time_sp", "0"),
            ("ramp_up_sp", "0"),
            ("ramp_down_sp", "0"),
            ("polarity", "normal"),
            ("stop_action", "coast"),
            ("stop_actions", "[coast] brake hold"),
            ("state", ""),
            ("command", ""),
            ("hold_pid/Kp", "0"),
            ("hold_pid/Ki", "0"),
            ("hold_pid/Kd", "0"),
            ("speed_pid/Kp", "1000"),
            ("speed_pid/Ki", "60"),
            ("speed_pid/Kd", "0"),
        ];
        for (attr, value) in attrs {
            fs::write(dir.join(attr), format!("{value}\n")).unwrap();
        }
        dir
    }

    /// Create a sensor device reporting one value channel
    pub fn add_sensor(&self, index: u32, address: &str, driver: &str, value0: i32) -> PathBuf {
        let dir = self.tmp.path().join("lego-sensor").join(format!("sensor{index}"));
        fs::create_dir_all(&dir).unwrap();

        let value0 = value0.to_string();
        let attrs: &[(&str, &str)] = &[
            ("address", address),
            ("driver_name", driver),
            ("mode", "COL-REFLECT"),
            ("modes", "COL-REFLECT COL-AMBIENT COL-COLOR REF-RAW RGB-RAW"),
            ("num_values", "1"),
            ("decimals", "0"),
            ("value0", &value0),
        ];
        for (attr, value) in attrs {
            fs::write(dir.join(attr), format!("{value}\n")).unwrap();
        }
        dir
    }
}

/// Read an attribute file back, trimmed
pub fn read_attr(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name))
        .unwrap_or_else(|e| panic!("read {name}: {e}"))
        .trim_end()
        .to_string()
}

pub fn read_attr_int(dir: &Path, name: &str) -> i32 {
    read_attr(dir, name).parse().expect("integer attribute")
}

/// Overwrite an attribute file, simulating the driver updating state
pub fn write_attr(dir: &Path, name: &str, value: &str) {
    fs::write(dir.join(name), format!("{value}\n")).unwrap();
}
