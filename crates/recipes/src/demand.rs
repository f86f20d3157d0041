use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use larder_inventory::IngredientId;

/// A running total left the representable `Decimal` range.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
#[error("demand for ingredient {0} overflows")]
pub struct DemandOverflow(pub IngredientId);

/// Total quantity an order needs from each ingredient.
///
/// Keys iterate in ascending id order, which is the order the ledger locks
/// rows in. Zero amounts are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DemandVector(BTreeMap<IngredientId, Decimal>);

impl DemandVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect `(ingredient, amount)` pairs, summing repeats.
    pub fn from_amounts(
        amounts: impl IntoIterator<Item = (IngredientId, Decimal)>,
    ) -> Result<Self, DemandOverflow> {
        let mut demand = DemandVector::new();
        for (id, amount) in amounts {
            demand.add(id, amount)?;
        }
        Ok(demand)
    }

    /// Add `amount` to the running total of `ingredient_id`.
    ///
    /// On overflow the total is left as it was.
    pub fn add(&mut self, ingredient_id: IngredientId, amount: Decimal) -> Result<(), DemandOverflow> {
        if amount.is_zero() {
            return Ok(());
        }
        let current = self.get(&ingredient_id).unwrap_or(Decimal::ZERO);
        let total = current
            .checked_add(amount)
            .ok_or(DemandOverflow(ingredient_id))?;
        self.0.insert(ingredient_id, total);
        Ok(())
    }

    pub fn get(&self, ingredient_id: &IngredientId) -> Option<Decimal> {
        self.0.get(ingredient_id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (IngredientId, Decimal)> + '_ {
        self.0.iter().map(|(id, amount)| (*id, *amount))
    }

    pub fn ingredient_ids(&self) -> Vec<IngredientId> {
        self.0.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<IngredientId, Decimal> {
        &self.0
    }
}
