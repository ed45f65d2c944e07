//! Catalog Repository
//!
//! `kitchen_items` is maintained by the back office; the terminal reads it
//! once at startup. [`upsert_items`] exists for seeding a store.

use crate::catalog::Catalog;
use crate::db::StoreError;
use crate::resilience::StoreOperation;
use async_trait::async_trait;
use serde::Deserialize;
use shared::models::{CatalogItem, ItemTier};
use shared::util::{from_storage, to_storage};
use sqlx::{Connection, FromRow, SqliteConnection};

/// Raw `kitchen_items` row
#[derive(Debug, Clone, FromRow)]
struct KitchenItemRow {
    item_code: String,
    description: String,
    price: f64,
    item_type: String,
}

impl TryFrom<KitchenItemRow> for CatalogItem {
    type Error = StoreError;

    fn try_from(row: KitchenItemRow) -> Result<Self, Self::Error> {
        let unit_price = from_storage(row.price).ok_or_else(|| StoreError::InvalidRow {
            table: "kitchen_items",
            reason: format!("{}: price {} is not a number", row.item_code, row.price),
        })?;
        Ok(CatalogItem {
            sku: row.item_code,
            display_name: row.description,
            unit_price,
            tier: ItemTier::from_item_type(&row.item_type),
        })
    }
}

/// Load the full catalog in table order
pub async fn load_catalog(conn: &mut SqliteConnection) -> Result<Catalog, StoreError> {
    let rows: Vec<KitchenItemRow> = sqlx::query_as(
        "SELECT item_code, description, price, item_type FROM kitchen_items ORDER BY rowid",
    )
    .fetch_all(&mut *conn)
    .await?;

    let items = rows
        .into_iter()
        .map(CatalogItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let catalog = Catalog::new(items);

    tracing::info!(
        items = catalog.len(),
        products = catalog.products().count(),
        extras = catalog.extras().count(),
        "Catalog loaded"
    );
    Ok(catalog)
}

/// Insert or replace catalog items, all or nothing
pub async fn upsert_items(
    conn: &mut SqliteConnection,
    items: &[CatalogItem],
) -> Result<usize, StoreError> {
    let mut tx = conn.begin().await?;

    for item in items {
        sqlx::query(
            r#"
            INSERT INTO kitchen_items (item_code, description, price, item_type)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (item_code)
            DO UPDATE SET
                description = excluded.description,
                price = excluded.price,
                item_type = excluded.item_type
            "#,
        )
        .bind(&item.sku)
        .bind(&item.display_name)
        .bind(to_storage(item.unit_price))
        .bind(item.tier.as_item_type())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!(count = items.len(), "Catalog items upserted");
    Ok(items.len())
}

/// Catalog load as a retryable operation
#[derive(Debug, Default)]
pub struct LoadCatalog;

#[async_trait]
impl StoreOperation<SqliteConnection> for LoadCatalog {
    type Output = Catalog;
    type Error = StoreError;

    fn name(&self) -> &'static str {
        "load_catalog"
    }

    async fn run(&mut self, conn: &mut SqliteConnection) -> Result<Catalog, StoreError> {
        load_catalog(conn).await
    }
}

/// Seed file entry
#[derive(Debug, Clone, Deserialize)]
pub struct SeedItem {
    pub sku: String,
    pub description: String,
    pub price: rust_decimal::Decimal,
    #[serde(default)]
    pub extra: bool,
}

impl From<SeedItem> for CatalogItem {
    fn from(seed: SeedItem) -> Self {
        if seed.extra {
            CatalogItem::extra(seed.sku, seed.description, seed.price)
        } else {
            CatalogItem::product(seed.sku, seed.description, seed.price)
        }
    }
}

/// Catalog upsert as a retryable operation
#[derive(Debug)]
pub struct UpsertCatalog {
    items: Vec<CatalogItem>,
}

impl UpsertCatalog {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl StoreOperation<SqliteConnection> for UpsertCatalog {
    type Output = usize;
    type Error = StoreError;

    fn name(&self) -> &'static str {
        "upsert_catalog"
    }

    async fn run(&mut self, conn: &mut SqliteConnection) -> Result<usize, StoreError> {
        upsert_items(conn, &self.items).await
    }
}
