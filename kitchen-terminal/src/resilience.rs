//! Resilience - bounded retry with reconnect around store operations
//!
//! [`ResilientStore`] owns the terminal's single store connection. An
//! operation that fails with a transient fault is retried from scratch on a
//! fresh connection after a fixed backoff; anything else is returned as-is.
//!
//! The retry boundary is the whole [`StoreOperation`]. Operations that open a
//! transaction therefore always start it over on the new connection and never
//! resume a half-written one.

use crate::db::ConnectError;
use async_trait::async_trait;
use std::fmt::Display;
use std::time::Duration;

/// Default attempts per operation
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default backoff between attempts
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

/// Retry classification for operation errors
pub trait Retryable {
    /// `true` if the same operation may succeed on a new connection
    fn is_transient(&self) -> bool;
}

/// Reconnect factory
#[async_trait]
pub trait Connector: Send + Sync {
    type Connection: Send;

    /// Open a brand new connection
    async fn connect(&self) -> Result<Self::Connection, ConnectError>;

    /// Dispose of a connection that is being replaced
    async fn close(&self, conn: Self::Connection) {
        drop(conn);
    }
}

/// A unit of work that is retried as a whole
#[async_trait]
pub trait StoreOperation<C: Send>: Send {
    type Output: Send;
    type Error: Retryable + From<ConnectError> + Display + Send;

    /// Name for logs
    fn name(&self) -> &'static str;

    async fn run(&mut self, conn: &mut C) -> Result<Self::Output, Self::Error>;
}

/// Retry policy: fixed backoff, bounded attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first, at least 1
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

/// The session's store connection plus the means to replace it
///
/// `run` takes `&mut self`, so nothing else can be using the connection when
/// it is swapped out.
pub struct ResilientStore<C: Connector> {
    connector: C,
    conn: Option<C::Connection>,
    policy: RetryPolicy,
    reconnects: u64,
}

impl<C: Connector> ResilientStore<C> {
    /// Open the first connection; failure here is a startup failure
    pub async fn connect(connector: C, policy: RetryPolicy) -> Result<Self, ConnectError> {
        let conn = connector.connect().await?;
        Ok(Self {
            connector,
            conn: Some(conn),
            policy,
            reconnects: 0,
        })
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Connections opened to replace a failed one
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    /// Run an operation, retrying transient faults on a fresh connection
    ///
    /// The error of the final attempt is returned unmodified.
    pub async fn run<O>(&mut self, op: &mut O) -> Result<O::Output, O::Error>
    where
        O: StoreOperation<C::Connection>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = match self.connection().await {
                Ok(conn) => op.run(conn).await,
                Err(e) => Err(O::Error::from(e)),
            };

            match result {
                Ok(output) => {
                    if attempt > 1 {
                        tracing::info!(operation = op.name(), attempt, "Store operation recovered");
                    }
                    return Ok(output);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    tracing::warn!(
                        operation = op.name(),
                        attempt,
                        max_attempts,
                        error = %e,
                        "Store connection lost, reconnecting"
                    );
                    tokio::time::sleep(self.policy.backoff).await;
                    self.discard().await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        tracing::error!(
                            operation = op.name(),
                            attempts = attempt,
                            error = %e,
                            "Store operation failed, retries exhausted"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Close the connection at session end
    pub async fn close(mut self) {
        if let Some(conn) = self.conn.take() {
            self.connector.close(conn).await;
        }
    }

    async fn connection(&mut self) -> Result<&mut C::Connection, ConnectError> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => {
                let conn = self.connector.connect().await?;
                self.reconnects += 1;
                tracing::info!(reconnects = self.reconnects, "Store connection re-established");
                conn
            }
        };
        Ok(self.conn.insert(conn))
    }

    async fn discard(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.connector.close(conn).await;
        }
    }
}
