//! Repository Module
//!
//! Query functions take a bare `&mut SqliteConnection`; each one also has a
//! [`StoreOperation`](crate::resilience::StoreOperation) wrapper so it can be
//! run through the resilient store.

pub mod catalog;
pub mod order;

pub use catalog::{LoadCatalog, SeedItem, UpsertCatalog, load_catalog, upsert_items};
pub use order::{
    CommitError, CommitOrder, CommitStep, FetchOrder, OrderDefaults, commit_order, fetch_order,
};
