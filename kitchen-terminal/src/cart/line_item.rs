//! Cart line items

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{CatalogItem, LineKind};
use std::fmt;
use uuid::Uuid;

/// Client-side line token, assigned when the line enters the cart
///
/// Never persisted; the store assigns its own line ids at commit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineId(Uuid);

impl LineId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One cart line
///
/// A line is an extra iff it has a `parent_id`, so kind and parent reference
/// cannot disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineId,
    pub parent_id: Option<LineId>,
    pub sku: String,
    pub display_name: String,
    /// Price in currency unit, copied from the catalog at add-time
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl LineItem {
    pub(crate) fn parent(item: &CatalogItem, quantity: u32) -> Self {
        Self {
            id: LineId::new(),
            parent_id: None,
            sku: item.sku.clone(),
            display_name: item.display_name.clone(),
            unit_price: item.unit_price,
            quantity,
        }
    }

    pub(crate) fn extra(item: &CatalogItem, parent_id: LineId, quantity: u32) -> Self {
        Self {
            id: LineId::new(),
            parent_id: Some(parent_id),
            sku: item.sku.clone(),
            display_name: item.display_name.clone(),
            unit_price: item.unit_price,
            quantity,
        }
    }

    pub fn kind(&self) -> LineKind {
        match self.parent_id {
            Some(_) => LineKind::Extra,
            None => LineKind::Parent,
        }
    }

    pub fn is_parent(&self) -> bool {
        self.parent_id.is_none()
    }

    /// `quantity × unit_price`
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Σ(quantity × unit_price)
pub(crate) fn sum_lines(lines: &[LineItem]) -> Decimal {
    lines.iter().map(LineItem::line_total).sum()
}
