//! Terminal session - one operator, one cart, one store connection
//!
//! Everything the order flow needs is owned here and passed in explicitly;
//! several sessions can live side by side in one process.

use crate::cart::{Cart, CartError, CartSnapshot, ExtraSelection, LineId};
use crate::catalog::Catalog;
use crate::core::DeviceId;
use crate::db::SqliteConnector;
use crate::db::StoreError;
use crate::db::repository::{CommitError, CommitOrder, FetchOrder, LoadCatalog, OrderDefaults};
use crate::order_uid;
use crate::receipt::{Receipt, ReceiptRenderer};
use crate::resilience::{Connector, ResilientStore};
use chrono::Local;
use rust_decimal::Decimal;
use shared::models::StoredOrder;
use sqlx::SqliteConnection;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Result of a successful checkout
#[derive(Debug)]
pub struct CheckoutOutcome {
    /// Store-assigned order id
    pub order_id: i64,
    pub uid: String,
    pub total: Decimal,
    /// What was committed; the cart itself is already empty
    pub snapshot: Arc<CartSnapshot>,
    /// Receipt task, `None` without a renderer
    pub receipt: Option<JoinHandle<()>>,
}

pub struct TerminalSession<C = SqliteConnector>
where
    C: Connector<Connection = SqliteConnection>,
{
    device: DeviceId,
    catalog: Catalog,
    cart: Cart,
    store: ResilientStore<C>,
    defaults: OrderDefaults,
    renderer: Option<Arc<dyn ReceiptRenderer>>,
}

impl<C> TerminalSession<C>
where
    C: Connector<Connection = SqliteConnection>,
{
    pub fn new(device: DeviceId, store: ResilientStore<C>, defaults: OrderDefaults) -> Self {
        Self {
            device,
            catalog: Catalog::default(),
            cart: Cart::new(),
            store,
            defaults,
            renderer: None,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ReceiptRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn store_mut(&mut self) -> &mut ResilientStore<C> {
        &mut self.store
    }

    /// (Re)load the catalog from the store
    pub async fn load_catalog(&mut self) -> Result<&Catalog, StoreError> {
        self.catalog = self.store.run(&mut LoadCatalog).await?;
        Ok(&self.catalog)
    }

    // ========== Cart ==========

    pub fn add_parent(&mut self, sku: &str, quantity: u32) -> Result<LineId, CartError> {
        self.cart.add_parent(&self.catalog, sku, quantity)
    }

    pub fn add_extras(
        &mut self,
        parent_id: LineId,
        extras: &[ExtraSelection],
    ) -> Result<Vec<LineId>, CartError> {
        self.cart.add_extras(&self.catalog, parent_id, extras)
    }

    pub fn increment(&mut self, parent_id: LineId) -> Result<u32, CartError> {
        self.cart.increment(parent_id)
    }

    pub fn decrement(&mut self, parent_id: LineId) -> Result<u32, CartError> {
        self.cart.decrement(parent_id)
    }

    pub fn remove(&mut self, line_id: LineId) -> Result<usize, CartError> {
        self.cart.remove(line_id)
    }

    pub fn clear_cart(&mut self) {
        self.cart.clear();
    }

    // ========== Orders ==========

    /// Commit the cart as a placed order
    ///
    /// On success the cart is cleared and the receipt is rendered in the
    /// background from the committed snapshot. On failure the cart is left
    /// exactly as it was.
    pub async fn checkout(&mut self) -> Result<CheckoutOutcome, CommitError> {
        if self.cart.is_empty() {
            return Err(CommitError::EmptyCart);
        }

        let snapshot = Arc::new(self.cart.snapshot());
        let uid = order_uid::generate_now(&self.device);

        let mut op = CommitOrder::new(&snapshot, &uid, &self.defaults);
        let order_id = match self.store.run(&mut op).await {
            Ok(order_id) => order_id,
            Err(e) => {
                tracing::error!(
                    uid = %uid,
                    lines = snapshot.len(),
                    indeterminate = e.is_indeterminate(),
                    error = %e,
                    "Checkout failed, cart kept"
                );
                return Err(e);
            }
        };

        self.cart.clear();

        let receipt = self.renderer.as_ref().map(|renderer| {
            let renderer = Arc::clone(renderer);
            let receipt = Receipt {
                order_id,
                uid: uid.clone(),
                snapshot: Arc::clone(&snapshot),
                placed_at: Local::now(),
            };
            tokio::task::spawn_blocking(move || {
                if let Err(e) = renderer.render(&receipt) {
                    tracing::warn!(order_id, error = %e, "Receipt rendering failed");
                }
            })
        });

        Ok(CheckoutOutcome {
            order_id,
            uid,
            total: snapshot.total(),
            snapshot,
            receipt,
        })
    }

    pub async fn fetch_order(&mut self, order_id: i64) -> Result<Option<StoredOrder>, StoreError> {
        self.store.run(&mut FetchOrder { order_id }).await
    }

    /// Close the store connection
    pub async fn shutdown(self) {
        if !self.cart.is_empty() {
            tracing::warn!(lines = self.cart.len(), "Session closed with items in cart");
        }
        self.store.close().await;
    }
}
