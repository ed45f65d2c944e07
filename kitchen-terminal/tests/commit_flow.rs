//! Commit protocol against a real SQLite store
//!
//! Each test gets a private in-memory store with the schema applied.

use chrono::NaiveDate;
use kitchen_terminal::db::repository::{
    CommitError, CommitStep, OrderDefaults, commit_order, fetch_order, load_catalog, upsert_items,
};
use kitchen_terminal::resilience::Connector;
use kitchen_terminal::{Cart, Catalog, DeviceId, ExtraSelection, SqliteConnector, order_uid};
use rust_decimal::Decimal;
use shared::models::{CatalogItem, LineKind, OrderStatus};
use sqlx::SqliteConnection;

async fn store() -> SqliteConnection {
    SqliteConnector::in_memory().connect().await.unwrap()
}

async fn count(conn: &mut SqliteConnection, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(conn)
        .await
        .unwrap()
}

fn menu() -> Catalog {
    Catalog::new([
        CatalogItem::product("PZ1", "Margherita", Decimal::from(100)),
        CatalogItem::product("PZ2", "Pepperoni", Decimal::from(120)),
        CatalogItem::product("DR1", "Cola", Decimal::new(250, 2)),
        CatalogItem::extra("EX1", "Extra cheese", Decimal::from(10)),
        CatalogItem::extra("EX2", "Olives", Decimal::new(75, 1)),
    ])
}

#[tokio::test]
async fn pizza_with_cheese_totals_110() {
    let catalog = menu();
    let mut cart = Cart::new();
    let pizza = cart.add_parent(&catalog, "PZ1", 1).unwrap();
    cart.add_extras(&catalog, pizza, &[ExtraSelection::new("EX1", 1)])
        .unwrap();

    let mut conn = store().await;
    let order_id = commit_order(&mut conn, &cart.snapshot(), "T07.20240309070501", &OrderDefaults::default())
        .await
        .unwrap();

    let order = fetch_order(&mut conn, order_id).await.unwrap().unwrap();
    assert_eq!(order.header.order_total, 110.0);
    assert_eq!(order.header.line_count, 2);
    assert_eq!(order.header.status, OrderStatus::Placed);
    assert_eq!(order.header.uid, "T07.20240309070501");
    assert_eq!(order.header.customer_name.as_deref(), Some("Default RR Customer"));
    assert_eq!(order.header.payment_method.as_deref(), Some("C"));

    assert_eq!(order.lines.len(), 2);
    let parent = &order.lines[0];
    let extra = &order.lines[1];
    assert_eq!((parent.sku.as_str(), parent.kind, parent.parent_line_ref), ("PZ1", LineKind::Parent, 0));
    assert_eq!(parent.price, 100.0);
    assert_eq!(extra.sku, "EX1");
    assert_eq!(extra.kind, LineKind::Extra);
    assert_eq!(extra.parent_line_ref, parent.order_line_id);
    assert_eq!(order.extras_of(parent.order_line_id).count(), 1);
}

#[tokio::test]
async fn lines_keep_cart_order() {
    let catalog = menu();
    let mut cart = Cart::new();
    let first = cart.add_parent(&catalog, "PZ1", 1).unwrap();
    let second = cart.add_parent(&catalog, "PZ2", 2).unwrap();
    cart.add_extras(&catalog, second, &[ExtraSelection::new("EX2", 2)])
        .unwrap();
    // Extras for the first pizza are added after the second pizza
    cart.add_extras(&catalog, first, &[ExtraSelection::new("EX1", 1), ExtraSelection::new("EX2", 1)])
        .unwrap();
    cart.add_parent(&catalog, "DR1", 3).unwrap();
    cart.increment(second).unwrap();

    let snapshot = cart.snapshot();
    let mut conn = store().await;
    let order_id = commit_order(&mut conn, &snapshot, "T07.1", &OrderDefaults::default())
        .await
        .unwrap();
    let order = fetch_order(&mut conn, order_id).await.unwrap().unwrap();

    let persisted: Vec<(&str, i64)> = order.lines.iter().map(|l| (l.sku.as_str(), l.qty)).collect();
    let expected: Vec<(&str, i64)> = snapshot
        .lines()
        .iter()
        .map(|l| (l.sku.as_str(), i64::from(l.quantity)))
        .collect();
    assert_eq!(persisted, expected);
    assert!(order.lines.windows(2).all(|w| w[0].order_line_id < w[1].order_line_id));

    // Every extra points at its own parent's row
    let first_row = order.lines[0].order_line_id;
    let second_row = order.lines[1].order_line_id;
    let refs: Vec<i64> = order
        .lines
        .iter()
        .filter(|l| l.kind == LineKind::Extra)
        .map(|l| l.parent_line_ref)
        .collect();
    assert_eq!(refs, [second_row, first_row, first_row]);

    let stored_total = Decimal::try_from(order.header.order_total).unwrap();
    assert_eq!(stored_total, snapshot.total());
}

#[tokio::test]
async fn failure_after_parent_insert_leaves_no_rows() {
    let mut conn = store().await;
    sqlx::query(
        r#"
        CREATE TRIGGER fail_extra_lines BEFORE INSERT ON kitchen_order_lines
        WHEN NEW.item_type = 'Extra'
        BEGIN
            SELECT RAISE(ABORT, 'injected failure');
        END
        "#,
    )
    .execute(&mut conn)
    .await
    .unwrap();

    let catalog = menu();
    let mut cart = Cart::new();
    let pizza = cart.add_parent(&catalog, "PZ1", 1).unwrap();
    cart.add_extras(&catalog, pizza, &[ExtraSelection::new("EX1", 1)])
        .unwrap();

    let err = commit_order(&mut conn, &cart.snapshot(), "T07.1", &OrderDefaults::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CommitError::Constraint {
            step: CommitStep::InsertLines,
            ..
        }
    ));
    assert!(err.nothing_written());
    assert_eq!(count(&mut conn, "kitchen_orders").await, 0);
    assert_eq!(count(&mut conn, "kitchen_order_lines").await, 0);

    // The store is still usable afterwards
    let mut plain = Cart::new();
    plain.add_parent(&catalog, "DR1", 1).unwrap();
    commit_order(&mut conn, &plain.snapshot(), "T07.2", &OrderDefaults::default())
        .await
        .unwrap();
    assert_eq!(count(&mut conn, "kitchen_orders").await, 1);
}

#[tokio::test]
async fn same_second_orders_share_uid_not_order_id() {
    let device = DeviceId::new("T07").unwrap();
    let at = NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_opt(7, 5, 1)
        .unwrap()
        .and_utc();

    let catalog = menu();
    let mut cart = Cart::new();
    cart.add_parent(&catalog, "PZ1", 1).unwrap();
    let snapshot = cart.snapshot();

    let mut conn = store().await;
    let first_uid = order_uid::generate(&device, &at);
    let second_uid = order_uid::generate(&device, &at);
    let first = commit_order(&mut conn, &snapshot, &first_uid, &OrderDefaults::default())
        .await
        .unwrap();
    let second = commit_order(&mut conn, &snapshot, &second_uid, &OrderDefaults::default())
        .await
        .unwrap();

    assert_eq!(first_uid, second_uid);
    assert_ne!(first, second);

    let sharing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kitchen_orders WHERE uid = ?")
        .bind(&first_uid)
        .fetch_one(&mut conn)
        .await
        .unwrap();
    assert_eq!(sharing, 2);
}

#[tokio::test]
async fn custom_defaults_land_in_header() {
    let defaults = OrderDefaults {
        customer_mobile: "0123".into(),
        customer_name: "Walk-in".into(),
        store_code: 7,
        order_type: "Kiosk".into(),
        payment_method: "K".into(),
    };
    let catalog = menu();
    let mut cart = Cart::new();
    cart.add_parent(&catalog, "DR1", 2).unwrap();

    let mut conn = store().await;
    let order_id = commit_order(&mut conn, &cart.snapshot(), "K01.1", &defaults)
        .await
        .unwrap();
    let header = fetch_order(&mut conn, order_id).await.unwrap().unwrap().header;

    assert_eq!(header.customer_mobile.as_deref(), Some("0123"));
    assert_eq!(header.customer_name.as_deref(), Some("Walk-in"));
    assert_eq!(header.store_code, Some(7));
    assert_eq!(header.order_type.as_deref(), Some("Kiosk"));
    assert_eq!(header.order_total, 5.0);
}

#[tokio::test]
async fn seeded_catalog_feeds_the_cart() {
    let mut conn = store().await;
    upsert_items(
        &mut conn,
        &[
            CatalogItem::product("PZ1", "Margherita", Decimal::from(100)),
            CatalogItem::extra("EX1", "Extra cheese", Decimal::from(10)),
        ],
    )
    .await
    .unwrap();

    let catalog = load_catalog(&mut conn).await.unwrap();
    let mut cart = Cart::new();
    let pizza = cart.add_parent(&catalog, "PZ1", 2).unwrap();
    cart.add_extras(&catalog, pizza, &[ExtraSelection::new("EX1", 2)])
        .unwrap();

    assert_eq!(cart.total(), Decimal::from(220));
    assert!(cart.add_parent(&catalog, "EX1", 1).is_err());
}
