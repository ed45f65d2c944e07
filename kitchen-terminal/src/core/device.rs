//! Device identity
//!
//! The terminal's device number comes from a small text file next to the
//! binary, read once at startup:
//!
//! ```text
//! Device_number = T07
//! ```
//!
//! The first line mentioning `Device_number` wins.

use super::error::ConfigError;
use std::fmt;
use std::path::Path;

const DEVICE_KEY: &str = "Device_number";

/// Terminal device identifier, prefix of every order uid
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    /// Validate a device id: non-empty, no whitespace, no `.` (the uid separator)
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into();
        if value.is_empty() || value.contains('.') || value.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidDeviceId(value));
        }
        Ok(Self(value))
    }

    /// Read the device config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::DeviceFileMissing(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let device = Self::parse(&contents)
            .ok_or_else(|| ConfigError::DeviceIdMissing(path.to_path_buf()))??;
        tracing::info!(device = %device, path = %path.display(), "Device identity loaded");
        Ok(device)
    }

    /// `None` when no non-empty `Device_number` entry exists
    fn parse(contents: &str) -> Option<Result<Self, ConfigError>> {
        let line = contents.lines().find(|l| l.contains(DEVICE_KEY))?;
        let (_, value) = line.split_once('=')?;
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        Some(Self::new(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
