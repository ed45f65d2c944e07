//! Data models
//!
//! Plain data shared between the terminal and anything that consumes the
//! kitchen store (kitchen display, reporting).

pub mod catalog;
pub mod order;

pub use catalog::{CatalogItem, ItemTier};
pub use order::{LineKind, OrderHeader, OrderLineRow, OrderStatus, StoredOrder};
