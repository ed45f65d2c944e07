//! Receipt - post-commit rendering of a placed order
//!
//! Rendering runs after the order is committed and works on the frozen
//! snapshot, never the live cart. A failing renderer never affects the order.

use crate::cart::{CartSnapshot, LineItem};
use chrono::{DateTime, Local};
use shared::util::format_money;
use std::io::Write;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Receipt rendering errors
#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Receipt sink unavailable: {0}")]
    Unavailable(String),
}

/// What a renderer gets for a placed order
#[derive(Debug, Clone)]
pub struct Receipt {
    pub order_id: i64,
    pub uid: String,
    pub snapshot: Arc<CartSnapshot>,
    pub placed_at: DateTime<Local>,
}

/// Anything that turns a placed order into an artifact
pub trait ReceiptRenderer: Send + Sync {
    fn render(&self, receipt: &Receipt) -> Result<(), ReceiptError>;
}

/// Kitchen QR text: `"{qty}*{sku}\r"` per line, in cart order
pub fn kitchen_qr_payload(snapshot: &CartSnapshot) -> String {
    snapshot
        .lines()
        .iter()
        .map(|line| format!("{}*{}\r", line.quantity, line.sku))
        .collect()
}

/// Fixed-width text layout
struct TextBuilder {
    buf: String,
    width: usize,
}

impl TextBuilder {
    fn new(width: usize) -> Self {
        Self {
            buf: String::with_capacity(width * 16),
            width,
        }
    }

    fn line(&mut self, s: &str) -> &mut Self {
        self.buf.push_str(s);
        self.buf.push('\n');
        self
    }

    fn center(&mut self, s: &str) -> &mut Self {
        let pad = self.width.saturating_sub(s.chars().count()) / 2;
        let padded = format!("{}{}", " ".repeat(pad), s);
        self.line(&padded)
    }

    fn sep_double(&mut self) -> &mut Self {
        let sep = "=".repeat(self.width);
        self.line(&sep)
    }

    fn sep_single(&mut self) -> &mut Self {
        let sep = "-".repeat(self.width);
        self.line(&sep)
    }

    /// Left and right text on one line, space-filled
    fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let used = left.chars().count() + right.chars().count();
        if used >= self.width {
            let joined = format!("{left} {right}");
            self.line(&joined)
        } else {
            let joined = format!("{left}{}{right}", " ".repeat(self.width - used));
            self.line(&joined)
        }
    }

    fn build(self) -> String {
        self.buf
    }
}

fn line_label(line: &LineItem) -> String {
    if line.is_parent() {
        format!("{} x {}", line.quantity, line.display_name)
    } else {
        format!("   + {} x {}", line.quantity, line.display_name)
    }
}

/// Plain-text receipt, extras indented under their parent
pub fn render_text(receipt: &Receipt, width: usize) -> String {
    let mut b = TextBuilder::new(width);
    b.sep_double()
        .center(&format!("ORDER #{}", receipt.order_id))
        .center(&receipt.uid)
        .center(&receipt.placed_at.format("%Y-%m-%d %H:%M:%S").to_string())
        .sep_single();

    for line in receipt.snapshot.lines() {
        b.line_lr(&line_label(line), &format_money(line.line_total()));
    }

    b.sep_single()
        .line_lr("TOTAL", &format_money(receipt.snapshot.total()))
        .sep_double();
    b.build()
}

/// Writes text receipts to any `Write` sink
pub struct TextReceiptRenderer<W: Write + Send> {
    sink: Mutex<W>,
    width: usize,
}

impl<W: Write + Send> TextReceiptRenderer<W> {
    pub fn new(sink: W, width: usize) -> Self {
        Self {
            sink: Mutex::new(sink),
            width,
        }
    }

    /// Give back the sink
    pub fn into_inner(self) -> Result<W, ReceiptError> {
        self.sink
            .into_inner()
            .map_err(|_| ReceiptError::Unavailable("receipt sink poisoned".into()))
    }
}

impl<W: Write + Send> ReceiptRenderer for TextReceiptRenderer<W> {
    fn render(&self, receipt: &Receipt) -> Result<(), ReceiptError> {
        let text = render_text(receipt, self.width);
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| ReceiptError::Unavailable("receipt sink poisoned".into()))?;
        sink.write_all(text.as_bytes())?;
        sink.flush()?;
        tracing::debug!(order_id = receipt.order_id, "Receipt rendered");
        Ok(())
    }
}
