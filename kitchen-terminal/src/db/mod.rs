//! Database layer - the shared kitchen store
//!
//! SQLite through sqlx. The terminal holds exactly one connection (no pool);
//! [`crate::resilience::ResilientStore`] owns it and replaces it after a
//! connectivity fault.
//!
//! - [`connector`] - opens connections, applies the embedded schema
//! - [`repository`] - catalog reads and the order commit protocol

pub mod connector;
pub mod repository;

pub use connector::SqliteConnector;

use crate::resilience::Retryable;
use sqlx::migrate::{MigrateError, Migrator};
use thiserror::Error;

/// Embedded schema migrations (`kitchen-terminal/migrations`)
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite primary result codes treated as connectivity faults
const SQLITE_IOERR: i32 = 10;
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;
const SQLITE_CANTOPEN: i32 = 14;

/// Whether an sqlx error means "the store could not be reached right now"
///
/// Transport failures and lock contention are transient. Constraint
/// violations, SQL errors and decode errors are not: retrying them on a new
/// connection gives the same answer.
pub fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db_err) => db_err
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| {
                // Extended result codes carry the primary code in the low byte
                matches!(
                    code & 0xff,
                    SQLITE_BUSY | SQLITE_LOCKED | SQLITE_IOERR | SQLITE_CANTOPEN
                )
            }),
        _ => false,
    }
}

/// Failure to (re)establish the store connection
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Failed to connect to kitchen store: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("Failed to apply kitchen store schema: {0}")]
    Migrate(#[from] MigrateError),
}

impl Retryable for ConnectError {
    fn is_transient(&self) -> bool {
        match self {
            ConnectError::Connect(e) => is_transient(e),
            ConnectError::Migrate(MigrateError::Execute(e))
            | ConnectError::Migrate(MigrateError::ExecuteMigration(e, _)) => is_transient(e),
            ConnectError::Migrate(_) => false,
        }
    }
}

/// Error for plain store operations (catalog reads, order lookups)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Kitchen store connectivity fault: {0}")]
    Connectivity(#[source] sqlx::Error),

    #[error("Kitchen store query failed: {0}")]
    Query(#[source] sqlx::Error),

    #[error("Invalid row in {table}: {reason}")]
    InvalidRow { table: &'static str, reason: String },
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if is_transient(&e) {
            StoreError::Connectivity(e)
        } else {
            StoreError::Query(e)
        }
    }
}

impl Retryable for StoreError {
    fn is_transient(&self) -> bool {
        match self {
            StoreError::Connect(e) => e.is_transient(),
            StoreError::Connectivity(_) => true,
            StoreError::Query(_) | StoreError::InvalidRow { .. } => false,
        }
    }
}
