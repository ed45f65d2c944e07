//! Cart - the order being built on this terminal
//!
//! Lines are kept in one flat vector in insertion order. That order is the
//! receipt order and the order lines are written to the store in, so the
//! parent/extra relationship is a back-reference (`LineItem::parent_id`) rather
//! than nesting. [`Cart::parents`] and [`Cart::extras_of`] give the two-level
//! view on top of it.
//!
//! # Invariants
//!
//! - an extra only ever references a parent line that is in the cart
//! - increment/decrement set every extra of a parent to the parent's quantity
//! - removing a parent removes its extras, so there are no orphans
//! - [`Cart::total`] is always recomputed from the lines

mod line_item;

pub use line_item::{LineId, LineItem};

use crate::catalog::Catalog;
use rust_decimal::Decimal;
use shared::models::ItemTier;
use thiserror::Error;

/// Maximum allowed quantity per line
pub const MAX_QUANTITY: u32 = 9999;

/// Cart errors
///
/// None of these leave the cart modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Unknown sku: {0}")]
    UnknownSku(String),

    #[error("Sku {sku} is not a {expected:?} item")]
    WrongTier { sku: String, expected: ItemTier },

    #[error("Cart line not found: {0}")]
    LineNotFound(LineId),

    #[error("Line {0} is an extra, not a parent")]
    NotAParent(LineId),

    #[error("Quantity must be between 1 and {MAX_QUANTITY}, got {0}")]
    InvalidQuantity(u32),
}

/// An extra picked in the extras menu, before it is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraSelection {
    pub sku: String,
    pub quantity: u32,
}

impl ExtraSelection {
    pub fn new(sku: impl Into<String>, quantity: u32) -> Self {
        Self {
            sku: sku.into(),
            quantity,
        }
    }
}

/// In-memory cart
#[derive(Debug, Clone, Default)]
pub struct Cart {
    lines: Vec<LineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parent line for a product, returns its id
    ///
    /// The same product added twice gives two independent lines.
    pub fn add_parent(
        &mut self,
        catalog: &Catalog,
        sku: &str,
        quantity: u32,
    ) -> Result<LineId, CartError> {
        validate_quantity(quantity)?;
        let item = lookup(catalog, sku, ItemTier::Product)?;
        let line = LineItem::parent(item, quantity);
        let id = line.id;
        tracing::debug!(line_id = %id, sku, quantity, "Parent line added");
        self.lines.push(line);
        Ok(id)
    }

    /// Attach extras to a parent line
    ///
    /// Selections with quantity 0 are dropped. Every selection is validated
    /// before anything is appended; returns the ids of the new lines.
    pub fn add_extras(
        &mut self,
        catalog: &Catalog,
        parent_id: LineId,
        extras: &[ExtraSelection],
    ) -> Result<Vec<LineId>, CartError> {
        self.parent_index(parent_id)?;

        let mut staged = Vec::with_capacity(extras.len());
        for selection in extras.iter().filter(|s| s.quantity > 0) {
            validate_quantity(selection.quantity)?;
            let item = lookup(catalog, &selection.sku, ItemTier::Extra)?;
            staged.push(LineItem::extra(item, parent_id, selection.quantity));
        }

        let ids: Vec<LineId> = staged.iter().map(|l| l.id).collect();
        tracing::debug!(parent_id = %parent_id, count = ids.len(), "Extras attached");
        self.lines.extend(staged);
        Ok(ids)
    }

    /// Increase a parent's quantity by one, extras follow; returns the new quantity
    pub fn increment(&mut self, parent_id: LineId) -> Result<u32, CartError> {
        let idx = self.parent_index(parent_id)?;
        let next = self.lines[idx].quantity + 1;
        validate_quantity(next)?;
        self.set_group_quantity(idx, next);
        Ok(next)
    }

    /// Decrease a parent's quantity by one, extras follow; returns the new quantity
    ///
    /// No-op at quantity 1: a line only disappears through [`Cart::remove`].
    pub fn decrement(&mut self, parent_id: LineId) -> Result<u32, CartError> {
        let idx = self.parent_index(parent_id)?;
        let current = self.lines[idx].quantity;
        if current <= 1 {
            return Ok(current);
        }
        self.set_group_quantity(idx, current - 1);
        Ok(current - 1)
    }

    /// Remove a line; removing a parent also removes all of its extras
    ///
    /// Returns the number of lines removed.
    pub fn remove(&mut self, line_id: LineId) -> Result<usize, CartError> {
        if !self.lines.iter().any(|l| l.id == line_id) {
            return Err(CartError::LineNotFound(line_id));
        }
        let before = self.lines.len();
        self.lines
            .retain(|l| l.id != line_id && l.parent_id != Some(line_id));
        let removed = before - self.lines.len();
        tracing::debug!(line_id = %line_id, removed, "Cart line removed");
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Σ(quantity × unit_price) over all lines
    pub fn total(&self) -> Decimal {
        line_item::sum_lines(&self.lines)
    }

    /// All lines in insertion order
    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, line_id: LineId) -> Option<&LineItem> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    /// Parent lines in insertion order
    pub fn parents(&self) -> impl Iterator<Item = &LineItem> {
        self.lines.iter().filter(|l| l.is_parent())
    }

    /// Extras attached to a parent, in insertion order
    pub fn extras_of(&self, parent_id: LineId) -> impl Iterator<Item = &LineItem> {
        self.lines
            .iter()
            .filter(move |l| l.parent_id == Some(parent_id))
    }

    /// Immutable copy for commit and receipt rendering
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            lines: self.lines.clone(),
        }
    }

    fn parent_index(&self, parent_id: LineId) -> Result<usize, CartError> {
        let idx = self
            .lines
            .iter()
            .position(|l| l.id == parent_id)
            .ok_or(CartError::LineNotFound(parent_id))?;
        if !self.lines[idx].is_parent() {
            return Err(CartError::NotAParent(parent_id));
        }
        Ok(idx)
    }

    fn set_group_quantity(&mut self, parent_idx: usize, quantity: u32) {
        let parent_id = self.lines[parent_idx].id;
        for line in &mut self.lines {
            if line.id == parent_id || line.parent_id == Some(parent_id) {
                line.quantity = quantity;
            }
        }
        tracing::debug!(parent_id = %parent_id, quantity, "Line quantity changed");
    }
}

/// Frozen cart contents
///
/// Taken at checkout; the live cart can be cleared and rebuilt while a
/// snapshot is still being written or printed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CartSnapshot {
    lines: Vec<LineItem>,
}

impl CartSnapshot {
    /// Build a snapshot from raw lines, bypassing cart validation
    #[cfg(test)]
    pub(crate) fn from_lines(lines: Vec<LineItem>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn total(&self) -> Decimal {
        line_item::sum_lines(&self.lines)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

fn validate_quantity(quantity: u32) -> Result<(), CartError> {
    if quantity == 0 || quantity > MAX_QUANTITY {
        return Err(CartError::InvalidQuantity(quantity));
    }
    Ok(())
}

fn lookup<'c>(
    catalog: &'c Catalog,
    sku: &str,
    expected: ItemTier,
) -> Result<&'c crate::catalog::CatalogItem, CartError> {
    let item = catalog
        .get(sku)
        .ok_or_else(|| CartError::UnknownSku(sku.to_string()))?;
    if item.tier != expected {
        return Err(CartError::WrongTier {
            sku: sku.to_string(),
            expected,
        });
    }
    Ok(item)
}
