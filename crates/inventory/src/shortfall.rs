use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use larder_core::DomainError;

use crate::ingredient::IngredientId;

/// Gap between what an order needs and what one ingredient row holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub ingredient_id: IngredientId,
    pub required: Decimal,
    pub available: Decimal,
}

impl Shortfall {
    pub fn missing(&self) -> Decimal {
        self.required - self.available
    }
}

/// Error type of the ingredient aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(
        "insufficient stock for {}: requested {}, available {}",
        .0.ingredient_id, .0.required, .0.available
    )]
    Insufficient(Shortfall),
}
