//! Order uid - human-readable order label
//!
//! `<device>.<YYYYMMDDHHMMSS>`. Second resolution, so two orders from the
//! same terminal within one second share a uid; the store's `order_id` is the
//! real identifier.

use crate::core::DeviceId;
use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Build the uid for `device` at time `at`
pub fn generate<Tz>(device: &DeviceId, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("{}.{}", device.as_str(), at.format(TIMESTAMP_FORMAT))
}

/// Build the uid for `device` from the local wall clock
pub fn generate_now(device: &DeviceId) -> String {
    generate(device, &Local::now())
}
