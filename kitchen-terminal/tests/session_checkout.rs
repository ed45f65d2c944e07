//! Checkout through the terminal session: cart lifecycle, receipts, retries

use async_trait::async_trait;
use kitchen_terminal::db::StoreError;
use kitchen_terminal::db::repository::{CommitOrder, CommitStep};
use kitchen_terminal::receipt::{Receipt, ReceiptError};
use kitchen_terminal::resilience::{Connector, StoreOperation};
use kitchen_terminal::{
    Cart, CartSnapshot, Catalog, CommitError, DeviceId, ExtraSelection, OrderDefaults,
    ReceiptRenderer, ResilientStore, RetryPolicy, SqliteConnector, TerminalSession,
};
use rust_decimal::Decimal;
use shared::models::CatalogItem;
use sqlx::{Connection, SqliteConnection};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn menu() -> Catalog {
    Catalog::new([
        CatalogItem::product("PZ1", "Margherita", Decimal::from(100)),
        CatalogItem::product("DR1", "Cola", Decimal::new(250, 2)),
        CatalogItem::extra("EX1", "Extra cheese", Decimal::from(10)),
    ])
}

fn fast_retry(max_attempts: u32, backoff_ms: u64) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        backoff: Duration::from_millis(backoff_ms),
    }
}

async fn session_on(connector: SqliteConnector, policy: RetryPolicy) -> TerminalSession {
    let store = ResilientStore::connect(connector, policy).await.unwrap();
    TerminalSession::new(DeviceId::new("T07").unwrap(), store, OrderDefaults::default())
        .with_catalog(menu())
}

async fn memory_session() -> TerminalSession {
    session_on(SqliteConnector::in_memory(), fast_retry(3, 1)).await
}

/// Ad-hoc SQL as a store operation
struct Exec(&'static str);

#[async_trait]
impl StoreOperation<SqliteConnection> for Exec {
    type Output = ();
    type Error = StoreError;

    fn name(&self) -> &'static str {
        "exec"
    }

    async fn run(&mut self, conn: &mut SqliteConnection) -> Result<(), StoreError> {
        sqlx::query(self.0).execute(conn).await?;
        Ok(())
    }
}

/// Commits an order, but the first attempt loses the connection after the
/// header and the first parent line are written
struct DropsAfterParent<'a> {
    snapshot: &'a CartSnapshot,
    defaults: OrderDefaults,
    attempts: u32,
}

#[async_trait]
impl StoreOperation<SqliteConnection> for DropsAfterParent<'_> {
    type Output = i64;
    type Error = CommitError;

    fn name(&self) -> &'static str {
        "commit_order"
    }

    async fn run(&mut self, conn: &mut SqliteConnection) -> Result<i64, CommitError> {
        self.attempts += 1;
        if self.attempts > 1 {
            return CommitOrder::new(self.snapshot, "T07.1", &self.defaults)
                .run(conn)
                .await;
        }

        let mut tx = conn
            .begin()
            .await
            .map_err(|e| CommitError::store(CommitStep::Begin, e))?;
        let order_id: i64 =
            sqlx::query_scalar("INSERT INTO kitchen_orders (uid) VALUES ('T07.1') RETURNING order_id")
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| CommitError::store(CommitStep::InsertHeader, e))?;
        let parent = &self.snapshot.lines()[0];
        sqlx::query(
            "INSERT INTO kitchen_order_lines (order_id, item_code, qty, price, item_type) \
             VALUES (?, ?, ?, 1.0, 'Parent')",
        )
        .bind(order_id)
        .bind(&parent.sku)
        .bind(i64::from(parent.quantity))
        .execute(&mut *tx)
        .await
        .map_err(|e| CommitError::store(CommitStep::InsertLines, e))?;

        Err(CommitError::store(
            CommitStep::InsertLines,
            sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "store went away",
            )),
        ))
    }
}

#[derive(Default)]
struct RecordingRenderer {
    seen: Mutex<Vec<Receipt>>,
}

impl ReceiptRenderer for RecordingRenderer {
    fn render(&self, receipt: &Receipt) -> Result<(), ReceiptError> {
        self.seen.lock().unwrap().push(receipt.clone());
        Ok(())
    }
}

struct BrokenPrinter;

impl ReceiptRenderer for BrokenPrinter {
    fn render(&self, _receipt: &Receipt) -> Result<(), ReceiptError> {
        Err(ReceiptError::Unavailable("out of paper".into()))
    }
}

#[tokio::test]
async fn checkout_places_order_and_clears_cart() {
    let mut session = memory_session().await;
    let pizza = session.add_parent("PZ1", 1).unwrap();
    session
        .add_extras(pizza, &[ExtraSelection::new("EX1", 1)])
        .unwrap();

    let outcome = session.checkout().await.unwrap();

    assert!(session.cart().is_empty());
    assert_eq!(outcome.total, Decimal::from(110));
    assert!(outcome.uid.starts_with("T07."));
    assert_eq!(outcome.snapshot.len(), 2);
    assert!(outcome.receipt.is_none());

    let order = session.fetch_order(outcome.order_id).await.unwrap().unwrap();
    assert_eq!(order.header.uid, outcome.uid);
    assert_eq!(order.header.order_total, 110.0);
    assert_eq!(order.lines.len(), 2);
}

#[tokio::test]
async fn empty_cart_is_refused() {
    let mut session = memory_session().await;
    let err = session.checkout().await.unwrap_err();
    assert!(matches!(err, CommitError::EmptyCart));
}

#[tokio::test]
async fn failed_checkout_keeps_cart() {
    let mut session = memory_session().await;
    session
        .store_mut()
        .run(&mut Exec(
            "CREATE TRIGGER reject_orders BEFORE INSERT ON kitchen_order_lines \
             BEGIN SELECT RAISE(ABORT, 'kitchen closed'); END",
        ))
        .await
        .unwrap();

    let pizza = session.add_parent("PZ1", 2).unwrap();
    session
        .add_extras(pizza, &[ExtraSelection::new("EX1", 2)])
        .unwrap();
    let before = session.cart().snapshot();

    let err = session.checkout().await.unwrap_err();

    assert!(matches!(err, CommitError::Constraint { .. }));
    assert_eq!(session.cart().snapshot(), before);
    // A permanent failure is not retried
    assert_eq!(session.store_mut().reconnects(), 0);
}

#[tokio::test]
async fn receipt_renders_committed_snapshot() {
    let renderer = Arc::new(RecordingRenderer::default());
    let mut session = memory_session().await.with_renderer(renderer.clone());

    session.add_parent("PZ1", 1).unwrap();
    let outcome = session.checkout().await.unwrap();

    // The next order starts while the receipt may still be rendering
    session.add_parent("DR1", 4).unwrap();
    outcome.receipt.unwrap().await.unwrap();

    let seen = renderer.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].order_id, outcome.order_id);
    assert_eq!(seen[0].uid, outcome.uid);
    let skus: Vec<&str> = seen[0].snapshot.lines().iter().map(|l| l.sku.as_str()).collect();
    assert_eq!(skus, ["PZ1"]);
}

#[tokio::test]
async fn receipt_failure_does_not_undo_order() {
    let mut session = memory_session().await.with_renderer(Arc::new(BrokenPrinter));
    session.add_parent("DR1", 1).unwrap();

    let outcome = session.checkout().await.unwrap();
    outcome.receipt.unwrap().await.unwrap();

    assert!(session.cart().is_empty());
    assert!(session.fetch_order(outcome.order_id).await.unwrap().is_some());
}

#[tokio::test]
async fn busy_store_is_retried_on_new_connection() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}/kitchen.db", dir.path().display());
    let connector = SqliteConnector::from_url(&url)
        .unwrap()
        .with_busy_timeout(Duration::ZERO);

    let mut session = session_on(connector.clone(), fast_retry(3, 300)).await;
    session.add_parent("PZ1", 1).unwrap();

    // Another writer holds the store for a moment
    let mut holder = connector.connect().await.unwrap();
    sqlx::query("BEGIN EXCLUSIVE").execute(&mut holder).await.unwrap();
    let release = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        sqlx::query("ROLLBACK").execute(&mut holder).await.unwrap();
        holder
    });

    let outcome = session.checkout().await.unwrap();
    release.await.unwrap();

    assert_eq!(session.store_mut().reconnects(), 1);
    assert!(session.cart().is_empty());
    let order = session.fetch_order(outcome.order_id).await.unwrap().unwrap();
    assert_eq!(order.lines.len(), 1);
}

#[tokio::test]
async fn exhausted_retries_keep_cart() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}/kitchen.db", dir.path().display());
    let connector = SqliteConnector::from_url(&url)
        .unwrap()
        .with_busy_timeout(Duration::ZERO);

    let mut session = session_on(connector.clone(), fast_retry(2, 10)).await;
    session.add_parent("PZ1", 1).unwrap();

    let mut holder = connector.connect().await.unwrap();
    sqlx::query("BEGIN EXCLUSIVE").execute(&mut holder).await.unwrap();

    let err = session.checkout().await.unwrap_err();

    assert!(err.nothing_written());
    assert!(matches!(err, CommitError::Connectivity { .. } | CommitError::Connect(_)));
    assert_eq!(session.cart().len(), 1);

    sqlx::query("ROLLBACK").execute(&mut holder).await.unwrap();
}

#[tokio::test]
async fn retry_after_partial_write_starts_over() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}/kitchen.db", dir.path().display());
    let connector = SqliteConnector::from_url(&url).unwrap();

    let catalog = menu();
    let mut cart = Cart::new();
    let pizza = cart.add_parent(&catalog, "PZ1", 2).unwrap();
    cart.add_extras(&catalog, pizza, &[ExtraSelection::new("EX1", 2)])
        .unwrap();
    cart.add_parent(&catalog, "DR1", 1).unwrap();
    let snapshot = cart.snapshot();

    let mut store = ResilientStore::connect(connector.clone(), fast_retry(3, 1))
        .await
        .unwrap();
    let mut op = DropsAfterParent {
        snapshot: &snapshot,
        defaults: OrderDefaults::default(),
        attempts: 0,
    };
    let order_id = store.run(&mut op).await.unwrap();

    assert_eq!(op.attempts, 2);
    assert_eq!(store.reconnects(), 1);
    store.close().await;

    let mut reader = connector.connect().await.unwrap();
    let headers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kitchen_orders")
        .fetch_one(&mut reader)
        .await
        .unwrap();
    let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kitchen_order_lines")
        .fetch_one(&mut reader)
        .await
        .unwrap();
    assert_eq!(headers, 1);
    assert_eq!(lines, 3);

    let order = kitchen_terminal::db::repository::fetch_order(&mut reader, order_id)
        .await
        .unwrap()
        .unwrap();
    let persisted: Vec<(&str, i64)> = order.lines.iter().map(|l| (l.sku.as_str(), l.qty)).collect();
    assert_eq!(persisted, [("PZ1", 2), ("EX1", 2), ("DR1", 1)]);
    assert_eq!(order.lines[1].parent_line_ref, order.lines[0].order_line_id);
    assert_eq!(order.header.order_total, 222.5);
}
