//! Status notifier: read-side views and change notifications.
//!
//! Holds no state of its own. Every view is computed from the ledger, and
//! notifications are sent only for changes the store already accepted.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;
use uuid::Uuid;

use larder_events::{Event, EventBus, EventEnvelope};
use larder_inventory::{IngredientId, IngredientSnapshot, InventoryQuery, StockStatus};

use crate::ledger::{CommittedChange, IngredientLedger, LedgerError};
use crate::stock_store::StockStore;

pub const AGGREGATE_TYPE: &str = "inventory.ingredient";

/// Counts per status tier plus the stock's value at cost.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryStats {
    pub total_items: usize,
    pub in_stock: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    /// Σ quantity × cost per unit. Rows without a cost count as zero.
    /// Saturates at `Decimal::MAX`.
    pub total_value: Decimal,
}

impl InventoryStats {
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a IngredientSnapshot>) -> Self {
        let mut stats = InventoryStats::default();
        for row in rows {
            stats.total_items += 1;
            match row.status {
                StockStatus::InStock => stats.in_stock += 1,
                StockStatus::LowStock => stats.low_stock += 1,
                StockStatus::OutOfStock => stats.out_of_stock += 1,
            }
            let value = row
                .quantity
                .saturating_mul(row.cost_per_unit.unwrap_or(Decimal::ZERO));
            stats.total_value = stats.total_value.saturating_add(value);
        }
        stats
    }
}

pub struct StatusNotifier<S: StockStore + ?Sized, B> {
    ledger: Arc<IngredientLedger<S>>,
    bus: B,
}

impl<S, B> StatusNotifier<S, B>
where
    S: StockStore + ?Sized,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(ledger: Arc<IngredientLedger<S>>, bus: B) -> Self {
        Self { ledger, bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Current committed record for each id. Unknown ids are skipped.
    pub async fn snapshot(&self, ids: &[IngredientId]) -> Result<Vec<IngredientSnapshot>, LedgerError> {
        self.ledger.snapshot(ids).await
    }

    /// Wrap each committed event in an envelope and publish it.
    ///
    /// The sequence number of an envelope is the row version right after its
    /// event. Publish failures are logged; the write they describe stays
    /// committed. Returns how many envelopes were published.
    pub fn publish(&self, changes: &[CommittedChange]) -> usize {
        let mut published = 0;
        for change in changes {
            let count = change.events.len() as u64;
            let first_sequence = (change.snapshot.version + 1).saturating_sub(count);

            for (offset, event) in change.events.iter().enumerate() {
                let payload = match serde_json::to_value(event) {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!(ingredient_id = %change.ingredient_id(), error = %err, "failed to serialize event");
                        continue;
                    }
                };
                let envelope = EventEnvelope::new(
                    Uuid::now_v7(),
                    change.ingredient_id().0,
                    AGGREGATE_TYPE,
                    event.event_type(),
                    first_sequence + offset as u64,
                    payload,
                );
                match self.bus.publish(envelope) {
                    Ok(()) => published += 1,
                    Err(err) => warn!(
                        ingredient_id = %change.ingredient_id(),
                        event_type = event.event_type(),
                        error = ?err,
                        "failed to publish stock event"
                    ),
                }
            }
        }
        published
    }

    /// Rows at or below their reorder threshold, lowest quantity first.
    pub async fn low_stock(&self) -> Result<Vec<IngredientSnapshot>, LedgerError> {
        let mut rows: Vec<IngredientSnapshot> = self
            .ledger
            .list()
            .await?
            .into_iter()
            .filter(|row| row.status.needs_reorder())
            .collect();
        rows.sort_by(|a, b| a.quantity.cmp(&b.quantity).then_with(|| a.name.cmp(&b.name)));
        Ok(rows)
    }

    /// Rows matching `query`, ordered by name.
    pub async fn list(&self, query: &InventoryQuery) -> Result<Vec<IngredientSnapshot>, LedgerError> {
        self.ledger.list_filtered(query).await
    }

    /// Tier counts and value over the rows matching `query`.
    ///
    /// The status condition is ignored here so every tier is still counted.
    pub async fn stats(&self, query: &InventoryQuery) -> Result<InventoryStats, LedgerError> {
        let rows = self.ledger.list_filtered(&query.without_status()).await?;
        Ok(InventoryStats::from_rows(&rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_inventory::IngredientCategory;

    fn row(quantity: i64, threshold: i64, cost: Option<Decimal>) -> IngredientSnapshot {
        IngredientSnapshot {
            id: IngredientId::generate(),
            name: "Row".to_string(),
            category: IngredientCategory::Other,
            quantity: Decimal::from(quantity),
            unit: "kg".to_string(),
            reorder_threshold: Decimal::from(threshold),
            supplier: None,
            cost_per_unit: cost,
            status: larder_inventory::compute_status(Decimal::from(quantity), Decimal::from(threshold)),
            last_restocked_at: None,
            version: 1,
        }
    }

    #[test]
    fn stats_count_tiers_and_value_rows_without_cost_as_zero() {
        let rows = vec![
            row(10, 5, Some(Decimal::new(150, 2))),
            row(3, 5, Some(Decimal::from(2))),
            row(0, 5, Some(Decimal::from(9))),
            row(7, 5, None),
        ];
        let stats = InventoryStats::from_rows(&rows);
        assert_eq!(stats.total_items, 4);
        assert_eq!(stats.in_stock, 2);
        assert_eq!(stats.low_stock, 1);
        assert_eq!(stats.out_of_stock, 1);
        assert_eq!(stats.total_value, Decimal::from(21));
    }

    #[test]
    fn total_value_saturates_instead_of_overflowing() {
        let mut huge = row(1, 0, Some(Decimal::MAX));
        huge.quantity = Decimal::MAX;
        let stats = InventoryStats::from_rows(&[huge.clone(), huge]);
        assert_eq!(stats.total_value, Decimal::MAX);
        assert_eq!(stats.total_items, 2);
    }

    #[test]
    fn empty_inventory_has_zero_stats() {
        assert_eq!(InventoryStats::from_rows(&[]), InventoryStats::default());
    }
}
