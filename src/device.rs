// Attribute-file protocol for the device tree.
//
// Every device is a directory under `<device_root>/<class>/` holding one
// text file per attribute. Reading a file returns current state, writing
// one triggers a hardware command. The driver signals state changes by
// raising a priority-data event on the `state` attribute, which is what
// the motor waits block on.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use std::collections::HashMap;

use tracing::debug;

use crate::config::Platform;
use crate::error::{DriveError, Result};

/// One open attribute file. Reads seek back to the start so the same
/// handle can be sampled repeatedly.
#[derive(Debug)]
pub struct Attribute {
    path: PathBuf,
    file: File,
}

impl Attribute {
    /// Open `<device_dir>/<name>` with the widest access its permission
    /// bits allow.
    pub fn open(device_dir: &Path, name: &str) -> Result<Self> {
        let path = device_dir.join(name);
        let mode = std::fs::metadata(&path).map_err(map_missing(&path))?.permissions().mode();
        let readable = mode & 0o444 != 0;
        let writable = mode & 0o222 != 0;

        let file = OpenOptions::new()
            .read(readable)
            .write(writable)
            .open(&path)
            .map_err(map_missing(&path))?;

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the attribute's current value, stripped of trailing whitespace
    pub fn read_raw(&mut self) -> Result<String> {
        self.file.seek(SeekFrom::Start(0)).map_err(map_missing(&self.path))?;
        let mut text = String::new();
        self.file.read_to_string(&mut text).map_err(map_missing(&self.path))?;
        Ok(text.trim_end().to_string())
    }

    pub fn read_int(&mut self) -> Result<i32> {
        let text = self.read_raw()?;
        text.parse().map_err(|_| {
            DriveError::precondition(format!("{}: expected integer, read {:?}", self.path.display(), text))
        })
    }

    /// Read a whitespace-separated flag set, e.g. `running ramping`
    pub fn read_set(&mut self) -> Result<Vec<String>> {
        let text = self.read_raw()?;
        Ok(text.split_whitespace().map(|t| t.trim_matches(['[', ']']).to_string()).collect())
    }

    /// Read the `[bracketed]` entry of a selection attribute
    pub fn read_selected(&mut self) -> Result<String> {
        let text = self.read_raw()?;
        for token in text.split_whitespace() {
            if let Some(inner) = token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
                return Ok(inner.to_string());
            }
        }
        // Single-valued attributes report the selection bare
        Ok(text)
    }

    pub fn write_raw(&mut self, value: &str) -> Result<()> {
        // Truncate like a shell `>` redirection would; a shorter value
        // must not leave a tail of the previous one behind
        self.file.set_len(0).map_err(map_missing(&self.path))?;
        self.file.seek(SeekFrom::Start(0)).map_err(map_missing(&self.path))?;
        self.file.write_all(value.as_bytes()).map_err(map_missing(&self.path))?;
        self.file.flush().map_err(map_missing(&self.path))?;
        Ok(())
    }

    pub fn write_int(&mut self, value: i32) -> Result<()> {
        self.write_raw(&value.to_string())
    }

    /// Block until the driver raises a priority-data event on this
    /// attribute or `timeout` expires. `None` waits indefinitely.
    ///
    /// Returns true if an event arrived, false on timeout.
    pub fn wait_ready(&self, timeout: Option<Duration>) -> Result<bool> {
        let mut fds = libc::pollfd {
            fd: self.file.as_raw_fd(),
            events: libc::POLLPRI | libc::POLLERR,
            revents: 0,
        };
        let timeout_ms = match timeout {
            Some(t) => t.as_millis().min(i32::MAX as u128) as i32,
            None => -1,
        };

        let rc = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
        if rc < 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        Ok(rc > 0)
    }
}

/// Translate a vanished attribute file into a device-not-found error;
/// everything else stays an IO error.
fn map_missing(path: &Path) -> impl FnOnce(std::io::Error) -> DriveError + '_ {
    move |e| match e.raw_os_error() {
        Some(code) if code == libc::ENOENT || code == libc::ENODEV => {
            let (class, address) = split_device_path(path);
            DriveError::DeviceNotFound { class, address }
        }
        _ => DriveError::Io(e),
    }
}

fn split_device_path(path: &Path) -> (String, String) {
    let mut parts = path.components().rev().skip(1).map(|c| c.as_os_str().to_string_lossy().into_owned());
    let device = parts.next().unwrap_or_default();
    let class = parts.next().unwrap_or_default();
    (class, device)
}

/// Handle to one device directory, with a cache of open attribute files
#[derive(Debug)]
pub struct Device {
    path: PathBuf,
    class: &'static str,
    attributes: HashMap<&'static str, Attribute>,
}

impl Device {
    /// Find the device of `class` plugged into `address`.
    ///
    /// Scans the class directory for an entry whose `address` attribute
    /// matches and whose `driver_name` is one of `drivers` (an empty list
    /// accepts any driver). No match fails with `DeviceNotFound`.
    pub fn find(platform: &Platform, class: &'static str, address: &str, drivers: &[&str]) -> Result<Self> {
        let class_dir = platform.class_dir(class);
        let not_found = || DriveError::DeviceNotFound {
            class: class.to_string(),
            address: address.to_string(),
        };

        let entries = std::fs::read_dir(&class_dir).map_err(|_| not_found())?;
        for entry in entries.flatten() {
            let dir = entry.path();
            if read_attr_file(&dir.join("address")).as_deref() != Some(address) {
                continue;
            }
            if !drivers.is_empty() {
                match read_attr_file(&dir.join("driver_name")) {
                    Some(driver) if drivers.contains(&driver.as_str()) => {}
                    _ => continue,
                }
            }
            debug!("matched {} at {}", class, dir.display());
            return Ok(Self {
                path: dir,
                class,
                attributes: HashMap::new(),
            });
        }

        Err(not_found())
    }

    /// Find the device of `class` whose directory name contains every one
    /// of `fragments`. Used for classes that address devices by name
    /// rather than by an `address` attribute (LEDs, power supplies).
    pub fn find_by_name(platform: &Platform, class: &'static str, fragments: &[&str]) -> Result<Self> {
        let class_dir = platform.class_dir(class);
        let not_found = || DriveError::DeviceNotFound {
            class: class.to_string(),
            address: fragments.join(":"),
        };

        let entries = std::fs::read_dir(&class_dir).map_err(|_| not_found())?;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if fragments.iter().all(|f| name.contains(f)) {
                debug!("matched {} at {}", class, entry.path().display());
                return Ok(Self {
                    path: entry.path(),
                    class,
                    attributes: HashMap::new(),
                });
            }
        }

        Err(not_found())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn class(&self) -> &'static str {
        self.class
    }

    /// Open a fresh, uncached handle for one attribute. Used by the
    /// odometry task to sample encoders without sharing the motor handle.
    pub fn open_attribute(&self, name: &str) -> Result<Attribute> {
        Attribute::open(&self.path, name)
    }

    fn attr(&mut self, name: &'static str) -> Result<&mut Attribute> {
        if !self.attributes.contains_key(name) {
            let attribute = Attribute::open(&self.path, name)?;
            self.attributes.insert(name, attribute);
        }
        Ok(self.attributes.get_mut(name).expect("just inserted"))
    }

    pub fn get_attr_string(&mut self, name: &'static str) -> Result<String> {
        self.attr(name)?.read_raw()
    }

    pub fn get_attr_int(&mut self, name: &'static str) -> Result<i32> {
        self.attr(name)?.read_int()
    }

    pub fn get_attr_set(&mut self, name: &'static str) -> Result<Vec<String>> {
        self.attr(name)?.read_set()
    }

    pub fn get_attr_selected(&mut self, name: &'static str) -> Result<String> {
        self.attr(name)?.read_selected()
    }

    pub fn set_attr_string(&mut self, name: &'static str, value: &str) -> Result<()> {
        self.attr(name)?.write_raw(value)
    }

    pub fn set_attr_int(&mut self, name: &'static str, value: i32) -> Result<()> {
        self.attr(name)?.write_int(value)
    }

    /// Wait for a priority-data event on `name` (see `Attribute::wait_ready`)
    pub fn wait_attr_ready(&mut self, name: &'static str, timeout: Option<Duration>) -> Result<bool> {
        self.attr(name)?.wait_ready(timeout)
    }
}

fn read_attr_file(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok().map(|t| t.trim_end().to_string())
}
