//! SQLite connection factory

use super::{ConnectError, MIGRATOR};
use crate::resilience::Connector;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqliteSynchronous};
use sqlx::Connection;
use std::str::FromStr;
use std::time::Duration;

/// Opens kitchen store connections from a fixed set of options
///
/// Every call to [`Connector::connect`] yields a brand new connection; this is
/// the reconnect factory handed to the resilience wrapper.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    options: SqliteConnectOptions,
    run_migrations: bool,
}

impl SqliteConnector {
    pub fn new(options: SqliteConnectOptions) -> Self {
        Self {
            options,
            run_migrations: true,
        }
    }

    /// Parse a `sqlite://` URL; the file is created if missing
    ///
    /// WAL with normal sync, foreign keys enforced.
    pub fn from_url(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");
        Ok(Self::new(options))
    }

    /// Private in-memory store, fresh on every connect
    pub fn in_memory() -> Self {
        Self::new(SqliteConnectOptions::new().filename(":memory:"))
    }

    pub fn with_migrations(mut self, run_migrations: bool) -> Self {
        self.run_migrations = run_migrations;
        self
    }

    /// How long a statement waits on a locked database before failing busy
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.busy_timeout(timeout);
        self
    }
}

#[async_trait]
impl Connector for SqliteConnector {
    type Connection = SqliteConnection;

    async fn connect(&self) -> Result<SqliteConnection, ConnectError> {
        let mut conn = SqliteConnection::connect_with(&self.options).await?;
        if self.run_migrations {
            MIGRATOR.run_direct(&mut conn).await?;
        }
        tracing::debug!(migrated = self.run_migrations, "Kitchen store connection opened");
        Ok(conn)
    }

    async fn close(&self, conn: SqliteConnection) {
        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "Closing stale kitchen store connection failed");
        }
    }
}
