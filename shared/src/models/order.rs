//! Order Model
//!
//! Rows of `kitchen_orders` / `kitchen_order_lines` as the kitchen reads them.

use serde::{Deserialize, Serialize};

/// Line kind, stored in `kitchen_order_lines.item_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
pub enum LineKind {
    Parent,
    Extra,
}

impl LineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineKind::Parent => "Parent",
            LineKind::Extra => "Extra",
        }
    }
}

/// Order header status
///
/// A header is `Pending` only inside the commit transaction; readers never
/// observe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
pub enum OrderStatus {
    #[default]
    Pending,
    Placed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Placed => "Placed",
        }
    }
}

/// Order header row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderHeader {
    /// Store-assigned authoritative id
    pub order_id: i64,
    /// Device + timestamp label, not unique
    pub uid: String,
    pub status: OrderStatus,
    pub customer_mobile: Option<String>,
    pub customer_name: Option<String>,
    pub store_code: Option<i64>,
    pub order_type: Option<String>,
    pub payment_method: Option<String>,
    pub line_count: i64,
    /// Total in currency unit
    pub order_total: f64,
    /// Server-side placement time (`YYYY-MM-DD HH:MM:SS`, UTC)
    pub placed_time: Option<String>,
}

/// Order line row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderLineRow {
    /// Store-assigned line id, ascending in cart order
    pub order_line_id: i64,
    pub order_id: i64,
    pub sku: String,
    pub qty: i64,
    /// Unit price in currency unit
    pub price: f64,
    pub kind: LineKind,
    /// `order_line_id` of the parent line, 0 for parent lines
    pub parent_line_ref: i64,
}

/// Header plus its lines in cart order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredOrder {
    pub header: OrderHeader,
    pub lines: Vec<OrderLineRow>,
}

impl StoredOrder {
    /// Extras attached to the given parent line
    pub fn extras_of(&self, parent_line_id: i64) -> impl Iterator<Item = &OrderLineRow> {
        self.lines
            .iter()
            .filter(move |l| l.kind == LineKind::Extra && l.parent_line_ref == parent_line_id)
    }
}
