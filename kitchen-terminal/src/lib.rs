//! Kitchen Terminal - order entry for the kitchen display pipeline
//!
//! # Overview
//!
//! An operator builds an order from the catalog (products plus their extras)
//! and commits it to the shared kitchen store, where the fulfillment side
//! picks it up.
//!
//! - **Cart** (`cart`): in-memory order, parent lines with attached extras
//! - **Order uid** (`order_uid`): `<device>.<YYYYMMDDHHMMSS>` label
//! - **Repository** (`db::repository`): catalog reads, transactional commit
//! - **Resilience** (`resilience`): bounded retry with reconnect
//! - **Session** (`session`): ties the above together for one terminal
//!
//! # Module layout
//!
//! ```text
//! kitchen-terminal/src/
//! ├── core/          # config, device identity, startup errors
//! ├── cart/          # cart model
//! ├── db/            # connector, repositories
//! ├── utils/         # logging
//! ├── catalog.rs     # sku lookup
//! ├── order_uid.rs   # order label
//! ├── receipt.rs     # receipt rendering
//! ├── resilience.rs  # retry wrapper
//! ├── session.rs     # terminal session
//! └── cli.rs         # item spec parsing for the binary
//! ```

pub mod cart;
pub mod catalog;
pub mod cli;
pub mod core;
pub mod db;
pub mod order_uid;
pub mod receipt;
pub mod resilience;
pub mod session;
pub mod utils;

pub use cart::{Cart, CartError, CartSnapshot, ExtraSelection, LineId, LineItem};
pub use catalog::Catalog;
pub use core::{Config, ConfigError, DeviceId};
pub use db::SqliteConnector;
pub use db::repository::{CommitError, OrderDefaults};
pub use receipt::{ReceiptRenderer, TextReceiptRenderer};
pub use resilience::{ResilientStore, RetryPolicy};
pub use session::{CheckoutOutcome, TerminalSession};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
