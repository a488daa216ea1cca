// Error types shared across the crate.
//
// Attribute writes against the device tree can fail with EINVAL (a setpoint
// outside the driver's accepted domain) or ENODEV/ENOENT (the device
// vanished); `Attribute` translates those into the typed variants here so
// callers never have to match on raw errno values.

use std::io;

/// Error types for device access and motion control
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    /// No connected device matched the requested address/driver. Raised at
    /// construction, or later by any attribute operation that discovers the
    /// device has been unplugged.
    #[error("no device matching {class}/{address} was found")]
    DeviceNotFound { class: String, address: String },

    /// A setpoint was outside the attribute's accepted domain. No state
    /// change occurred; the caller may retry with a clamped value.
    #[error("{attribute} value {value} is out of range ({min}..={max})")]
    OutOfRange {
        attribute: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },

    /// A structurally invalid argument: negative duration, over-limit speed
    /// unit, steering outside +/-100, arc radius inside the wheelbase.
    #[error("invalid argument: {0}")]
    Precondition(String),

    /// The line follower saw off-line readings for too many consecutive
    /// samples.
    #[error("lost the line after {samples} consecutive off-line samples")]
    LineFollowLost { samples: u32 },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, DriveError>;

impl DriveError {
    pub(crate) fn precondition(msg: impl Into<String>) -> Self {
        DriveError::Precondition(msg.into())
    }
}
