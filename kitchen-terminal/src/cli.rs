//! Command-line item specs
//!
//! `SKU[+EXTRA[*QTY]...][@QTY]`, e.g. `PZ1+EX1*2+EX2@3` is three PZ1 with two
//! EX1 and one EX2 attached. `+`, `*` and `@` cannot appear in a sku.

use crate::cart::ExtraSelection;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemSpecError {
    #[error("Empty item spec")]
    Empty,

    #[error("Missing sku in '{0}'")]
    MissingSku(String),

    #[error("Bad quantity '{0}'")]
    BadQuantity(String),
}

/// One `--item` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSpec {
    pub sku: String,
    pub quantity: u32,
    pub extras: Vec<ExtraSelection>,
}

impl FromStr for ItemSpec {
    type Err = ItemSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ItemSpecError::Empty);
        }

        let (body, quantity) = match s.rsplit_once('@') {
            Some((body, qty)) => (body, parse_quantity(qty)?),
            None => (s, 1),
        };

        let mut parts = body.split('+');
        let sku = parts.next().unwrap_or_default().trim();
        if sku.is_empty() {
            return Err(ItemSpecError::MissingSku(s.to_string()));
        }

        let extras = parts
            .map(|part| {
                let part = part.trim();
                let (extra_sku, qty) = match part.rsplit_once('*') {
                    Some((extra_sku, qty)) => (extra_sku.trim(), parse_quantity(qty)?),
                    None => (part, 1),
                };
                if extra_sku.is_empty() {
                    return Err(ItemSpecError::MissingSku(s.to_string()));
                }
                Ok(ExtraSelection::new(extra_sku, qty))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            sku: sku.to_string(),
            quantity,
            extras,
        })
    }
}

fn parse_quantity(s: &str) -> Result<u32, ItemSpecError> {
    s.trim()
        .parse()
        .map_err(|_| ItemSpecError::BadQuantity(s.to_string()))
}
