//! Catalog Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Catalog tier: orderable product or modifier-only extra
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemTier {
    /// Orderable on its own (stored as any `item_type` other than `Extra`)
    Product,
    /// Modifier, only orderable attached to a product
    Extra,
}

impl ItemTier {
    /// Value written to `kitchen_items.item_type`
    pub fn as_item_type(&self) -> &'static str {
        match self {
            ItemTier::Product => "Parent",
            ItemTier::Extra => "Extra",
        }
    }

    /// Classify a stored `item_type`; anything that is not `Extra` is orderable
    pub fn from_item_type(item_type: &str) -> Self {
        if item_type.trim().eq_ignore_ascii_case("extra") {
            ItemTier::Extra
        } else {
            ItemTier::Product
        }
    }
}

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Barcode / item code
    pub sku: String,
    pub display_name: String,
    /// Price in currency unit
    pub unit_price: Decimal,
    pub tier: ItemTier,
}

impl CatalogItem {
    pub fn product(sku: impl Into<String>, name: impl Into<String>, unit_price: Decimal) -> Self {
        Self {
            sku: sku.into(),
            display_name: name.into(),
            unit_price,
            tier: ItemTier::Product,
        }
    }

    pub fn extra(sku: impl Into<String>, name: impl Into<String>, unit_price: Decimal) -> Self {
        Self {
            sku: sku.into(),
            display_name: name.into(),
            unit_price,
            tier: ItemTier::Extra,
        }
    }

    pub fn is_extra(&self) -> bool {
        self.tier == ItemTier::Extra
    }
}
