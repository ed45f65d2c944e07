//! Order Repository - the commit protocol
//!
//! A cart snapshot becomes one `kitchen_orders` header plus one
//! `kitchen_order_lines` row per cart line, inside a single transaction:
//!
//! 1. insert the header with the uid, the store assigns `order_id`
//! 2. fill in the header fields derived from the snapshot
//! 3. insert lines in cart order; each parent's new `order_line_id` is
//!    recorded so its extras can reference it
//! 4. mark the header `Placed` with the server clock
//! 5. commit
//!
//! Any failure rolls the whole transaction back. Readers only ever see
//! `Placed` headers with all of their lines.

use crate::cart::{CartSnapshot, LineId};
use crate::db::{ConnectError, StoreError, is_transient};
use crate::resilience::{Retryable, StoreOperation};
use async_trait::async_trait;
use shared::models::{OrderHeader, OrderLineRow, StoredOrder};
use shared::util::to_storage;
use sqlx::{Connection, SqliteConnection};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Header fields fixed per terminal class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDefaults {
    pub customer_mobile: String,
    pub customer_name: String,
    pub store_code: i64,
    /// Order type marker
    pub order_type: String,
    /// Payment marker
    pub payment_method: String,
}

impl Default for OrderDefaults {
    fn default() -> Self {
        Self {
            customer_mobile: "09999990001".to_string(),
            customer_name: "Default RR Customer".to_string(),
            store_code: 42,
            order_type: "Desktop".to_string(),
            payment_method: "C".to_string(),
        }
    }
}

/// Commit protocol step, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStep {
    Begin,
    InsertHeader,
    UpdateHeader,
    InsertLines,
    MarkPlaced,
    Commit,
}

impl fmt::Display for CommitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommitStep::Begin => "begin",
            CommitStep::InsertHeader => "insert header",
            CommitStep::UpdateHeader => "update header",
            CommitStep::InsertLines => "insert lines",
            CommitStep::MarkPlaced => "mark placed",
            CommitStep::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// Commit failure
///
/// Everything except [`CommitError::is_indeterminate`] means nothing was
/// written.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Order header insert returned no order id")]
    HeaderInsertFailed,

    #[error("Extra line {line} references parent {parent} which was not written before it")]
    UnresolvedParent { line: LineId, parent: LineId },

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Kitchen store unreachable during {step}: {source}")]
    Connectivity {
        step: CommitStep,
        #[source]
        source: sqlx::Error,
    },

    #[error("Kitchen store rejected {step}: {source}")]
    Constraint {
        step: CommitStep,
        #[source]
        source: sqlx::Error,
    },
}

impl CommitError {
    /// Classify a store error raised at `step`
    pub fn store(step: CommitStep, source: sqlx::Error) -> Self {
        if is_transient(&source) {
            CommitError::Connectivity { step, source }
        } else {
            CommitError::Constraint { step, source }
        }
    }

    /// The connection failed while COMMIT was in flight: the order may or
    /// may not be in the store
    pub fn is_indeterminate(&self) -> bool {
        matches!(
            self,
            CommitError::Connectivity {
                step: CommitStep::Commit,
                ..
            }
        )
    }

    pub fn nothing_written(&self) -> bool {
        !self.is_indeterminate()
    }

    pub fn step(&self) -> Option<CommitStep> {
        match self {
            CommitError::Connectivity { step, .. } | CommitError::Constraint { step, .. } => {
                Some(*step)
            }
            _ => None,
        }
    }
}

impl Retryable for CommitError {
    fn is_transient(&self) -> bool {
        match self {
            CommitError::Connect(e) => e.is_transient(),
            // Retrying an indeterminate commit could place the order twice
            CommitError::Connectivity { step, .. } => *step != CommitStep::Commit,
            _ => false,
        }
    }
}

/// Write a cart snapshot as a placed order, returns the new `order_id`
pub async fn commit_order(
    conn: &mut SqliteConnection,
    snapshot: &CartSnapshot,
    uid: &str,
    defaults: &OrderDefaults,
) -> Result<i64, CommitError> {
    if snapshot.is_empty() {
        return Err(CommitError::EmptyCart);
    }

    let mut tx = conn
        .begin()
        .await
        .map_err(|e| CommitError::store(CommitStep::Begin, e))?;

    let order_id = match write_order(&mut *tx, snapshot, uid, defaults).await {
        Ok(order_id) => order_id,
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(uid, error = %rollback_err, "Order rollback failed");
            }
            tracing::warn!(uid, error = %e, "Order commit aborted");
            return Err(e);
        }
    };

    tx.commit()
        .await
        .map_err(|e| CommitError::store(CommitStep::Commit, e))?;

    tracing::info!(
        order_id,
        uid,
        lines = snapshot.len(),
        total = %snapshot.total(),
        "Order placed"
    );
    Ok(order_id)
}

/// Steps 1-4, on an open transaction
async fn write_order(
    conn: &mut SqliteConnection,
    snapshot: &CartSnapshot,
    uid: &str,
    defaults: &OrderDefaults,
) -> Result<i64, CommitError> {
    let order_id: i64 =
        sqlx::query_scalar("INSERT INTO kitchen_orders (uid) VALUES (?) RETURNING order_id")
            .bind(uid)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| CommitError::store(CommitStep::InsertHeader, e))?
            .ok_or(CommitError::HeaderInsertFailed)?;

    sqlx::query(
        r#"
        UPDATE kitchen_orders
        SET customer_mobile = ?, customer_name = ?, store_code = ?,
            order_type = ?, payment_method = ?,
            order_lines = ?, order_total = ?
        WHERE order_id = ?
        "#,
    )
    .bind(&defaults.customer_mobile)
    .bind(&defaults.customer_name)
    .bind(defaults.store_code)
    .bind(&defaults.order_type)
    .bind(&defaults.payment_method)
    .bind(snapshot.len() as i64)
    .bind(to_storage(snapshot.total()))
    .bind(order_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| CommitError::store(CommitStep::UpdateHeader, e))?;

    insert_lines(conn, order_id, snapshot).await?;

    sqlx::query(
        "UPDATE kitchen_orders SET status = 'Placed', placed_time = CURRENT_TIMESTAMP WHERE order_id = ?",
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| CommitError::store(CommitStep::MarkPlaced, e))?;

    Ok(order_id)
}

async fn insert_lines(
    conn: &mut SqliteConnection,
    order_id: i64,
    snapshot: &CartSnapshot,
) -> Result<(), CommitError> {
    // cart line token -> order_line_id, filled as parents are written
    let mut written: HashMap<LineId, i64> = HashMap::new();

    for line in snapshot.lines() {
        let parent_ref = match line.parent_id {
            None => 0,
            Some(parent) => {
                *written
                    .get(&parent)
                    .ok_or(CommitError::UnresolvedParent {
                        line: line.id,
                        parent,
                    })?
            }
        };

        let line_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO kitchen_order_lines
                (order_id, item_code, qty, price, item_type, parent_line_number)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING order_line_id
            "#,
        )
        .bind(order_id)
        .bind(&line.sku)
        .bind(i64::from(line.quantity))
        .bind(to_storage(line.unit_price))
        .bind(line.kind().as_str())
        .bind(parent_ref)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| CommitError::store(CommitStep::InsertLines, e))?;

        if line.is_parent() {
            written.insert(line.id, line_id);
        }
    }

    Ok(())
}

/// Read back a placed order with its lines in cart order
pub async fn fetch_order(
    conn: &mut SqliteConnection,
    order_id: i64,
) -> Result<Option<StoredOrder>, StoreError> {
    let header: Option<OrderHeader> = sqlx::query_as(
        r#"
        SELECT order_id, uid, status, customer_mobile, customer_name, store_code,
               order_type, payment_method, order_lines AS line_count, order_total,
               placed_time
        FROM kitchen_orders
        WHERE order_id = ?
        "#,
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(header) = header else {
        return Ok(None);
    };

    let lines: Vec<OrderLineRow> = sqlx::query_as(
        r#"
        SELECT order_line_id, order_id, item_code AS sku, qty, price,
               item_type AS kind, parent_line_number AS parent_line_ref
        FROM kitchen_order_lines
        WHERE order_id = ?
        ORDER BY order_line_id
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(StoredOrder { header, lines }))
}

/// Commit as a retryable operation; every attempt starts a new transaction
pub struct CommitOrder<'a> {
    snapshot: &'a CartSnapshot,
    uid: &'a str,
    defaults: &'a OrderDefaults,
}

impl<'a> CommitOrder<'a> {
    pub fn new(snapshot: &'a CartSnapshot, uid: &'a str, defaults: &'a OrderDefaults) -> Self {
        Self {
            snapshot,
            uid,
            defaults,
        }
    }
}

#[async_trait]
impl StoreOperation<SqliteConnection> for CommitOrder<'_> {
    type Output = i64;
    type Error = CommitError;

    fn name(&self) -> &'static str {
        "commit_order"
    }

    async fn run(&mut self, conn: &mut SqliteConnection) -> Result<i64, CommitError> {
        commit_order(conn, self.snapshot, self.uid, self.defaults).await
    }
}

/// Order readback as a retryable operation
#[derive(Debug, Clone, Copy)]
pub struct FetchOrder {
    pub order_id: i64,
}

#[async_trait]
impl StoreOperation<SqliteConnection> for FetchOrder {
    type Output = Option<StoredOrder>;
    type Error = StoreError;

    fn name(&self) -> &'static str {
        "fetch_order"
    }

    async fn run(&mut self, conn: &mut SqliteConnection) -> Result<Option<StoredOrder>, StoreError> {
        fetch_order(conn, self.order_id).await
    }
}
