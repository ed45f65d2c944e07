//! Core - configuration, device identity and startup errors

pub mod config;
pub mod device;
pub mod error;

pub use config::Config;
pub use device::DeviceId;
pub use error::ConfigError;
