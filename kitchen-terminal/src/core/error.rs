use std::path::PathBuf;
use thiserror::Error;

/// Startup configuration errors
///
/// All of these are fatal: the terminal refuses to start rather than take
/// orders under a wrong device id or store.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Device config file not found: {}", .0.display())]
    DeviceFileMissing(PathBuf),

    #[error("Device number not found in {}", .0.display())]
    DeviceIdMissing(PathBuf),

    #[error("Invalid device number {0:?}")]
    InvalidDeviceId(String),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: String, value: String },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
