//! Shared types for the kitchen terminal
//!
//! Domain types used by every crate that reads or writes the kitchen store:
//! catalog items, persisted order rows and the money conversions between the
//! in-memory `Decimal` amounts and the store's floating point columns.

pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
