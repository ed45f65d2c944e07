//! Catalog - read-only sku lookup for the cart
//!
//! Loaded once at startup from `kitchen_items` (see
//! [`crate::db::repository::catalog`]); the cart copies name and price out of
//! it when a line is added, so later catalog changes never touch a cart.

use crate::cart::{CartError, ExtraSelection};
use rust_decimal::Decimal;
use std::collections::HashMap;

pub use shared::models::{CatalogItem, ItemTier};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<CatalogItem>,
    by_sku: HashMap<String, usize>,
}

impl Catalog {
    /// Build from items in display order; a repeated sku keeps its first entry
    pub fn new(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        let mut catalog = Self::default();
        for item in items {
            if catalog.by_sku.contains_key(&item.sku) {
                tracing::warn!(sku = %item.sku, "Duplicate catalog sku ignored");
                continue;
            }
            catalog.by_sku.insert(item.sku.clone(), catalog.items.len());
            catalog.items.push(item);
        }
        catalog
    }

    pub fn get(&self, sku: &str) -> Option<&CatalogItem> {
        self.by_sku.get(sku).map(|&idx| &self.items[idx])
    }

    /// Orderable products
    pub fn products(&self) -> impl Iterator<Item = &CatalogItem> {
        self.items.iter().filter(|i| !i.is_extra())
    }

    /// Modifier-only items
    pub fn extras(&self) -> impl Iterator<Item = &CatalogItem> {
        self.items.iter().filter(|i| i.is_extra())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Price of a pending extras-menu selection: one product plus its extras
    pub fn selection_price(
        &self,
        product_sku: &str,
        extras: &[ExtraSelection],
    ) -> Result<Decimal, CartError> {
        let product = self
            .get(product_sku)
            .ok_or_else(|| CartError::UnknownSku(product_sku.to_string()))?;
        let mut total = product.unit_price;
        for selection in extras {
            let extra = self
                .get(&selection.sku)
                .ok_or_else(|| CartError::UnknownSku(selection.sku.clone()))?;
            total += extra.unit_price * Decimal::from(selection.quantity);
        }
        Ok(total)
    }
}
