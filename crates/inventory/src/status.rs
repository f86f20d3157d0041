use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Availability tier of an ingredient, always derived from quantity vs threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }

    /// Low or out of stock.
    pub fn needs_reorder(self) -> bool {
        !matches!(self, StockStatus::InStock)
    }
}

impl core::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `q <= 0` is out of stock, `0 < q <= threshold` is low, anything above is in stock.
pub fn compute_status(quantity: Decimal, reorder_threshold: Decimal) -> StockStatus {
    if quantity <= Decimal::ZERO {
        StockStatus::OutOfStock
    } else if quantity <= reorder_threshold {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    }
}
