//! Order fulfillment: resolve, check and deduct, then notify.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{info, instrument, warn};

use larder_core::DomainError;
use larder_events::{EventBus, EventEnvelope};
use larder_inventory::{IngredientEvent, IngredientId, IngredientSnapshot, Shortfall};
use larder_recipes::{MenuItemId, OrderLine, RecipeCatalog, RecipeResolver, ResolveError};

use crate::ledger::{CommittedChange, IngredientLedger, LedgerError};
use crate::notifier::StatusNotifier;
use crate::stock_store::{StockStore, StoreError};

/// Outcome of one order. A rejection is an expected business result, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FulfillmentResult {
    Fulfilled {
        deducted: BTreeMap<IngredientId, Decimal>,
        updated: Vec<IngredientSnapshot>,
    },
    Rejected {
        shortfalls: Vec<Shortfall>,
    },
}

impl FulfillmentResult {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, FulfillmentResult::Fulfilled { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FulfillmentError {
    #[error("unknown menu item: {0}")]
    UnknownMenuItem(MenuItemId),

    #[error("recipe references unknown ingredient(s): {0:?}")]
    UnknownIngredient(Vec<IngredientId>),

    #[error("timed out after {0:?} waiting for ingredient locks")]
    Timeout(Duration),

    #[error("conflicting concurrent writes after {attempts} attempt(s)")]
    ConcurrencyConflict { attempts: u32 },

    #[error(transparent)]
    Invalid(DomainError),

    #[error(transparent)]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl FulfillmentError {
    /// Safe to resubmit the same order unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FulfillmentError::Timeout(_) | FulfillmentError::ConcurrencyConflict { .. }
        )
    }
}

impl From<ResolveError> for FulfillmentError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::UnknownMenuItem(id) => FulfillmentError::UnknownMenuItem(id),
            ResolveError::DemandOverflow(id) => FulfillmentError::Invalid(DomainError::validation(
                format!("order demand for ingredient {id} is too large"),
            )),
        }
    }
}

impl From<LedgerError> for FulfillmentError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UnknownIngredient(ids) => FulfillmentError::UnknownIngredient(ids),
            LedgerError::LockTimeout(after) => FulfillmentError::Timeout(after),
            LedgerError::ConcurrencyConflict { attempts } => {
                FulfillmentError::ConcurrencyConflict { attempts }
            }
            LedgerError::Validation(e) => FulfillmentError::Invalid(e),
            LedgerError::Store(e) => FulfillmentError::Store(e),
            LedgerError::AlreadyExists(id) => {
                FulfillmentError::Invalid(DomainError::conflict(format!("ingredient {id} already exists")))
            }
            LedgerError::InsufficientStock(_) => {
                FulfillmentError::Internal("shortfall escaped rejection handling".to_string())
            }
            LedgerError::Internal(msg) => FulfillmentError::Internal(msg),
        }
    }
}

/// Entry point for orders and for manual stock movements that should notify.
pub struct FulfillmentCoordinator<S: StockStore + ?Sized, C, B> {
    ledger: Arc<IngredientLedger<S>>,
    catalog: C,
    notifier: StatusNotifier<S, B>,
}

impl<S, C, B> FulfillmentCoordinator<S, C, B>
where
    S: StockStore + ?Sized,
    C: RecipeCatalog,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(ledger: Arc<IngredientLedger<S>>, catalog: C, bus: B) -> Self {
        let notifier = StatusNotifier::new(Arc::clone(&ledger), bus);
        Self {
            ledger,
            catalog,
            notifier,
        }
    }

    pub fn ledger(&self) -> &Arc<IngredientLedger<S>> {
        &self.ledger
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn notifier(&self) -> &StatusNotifier<S, B> {
        &self.notifier
    }

    /// Check and deduct an order's full ingredient demand, all or nothing.
    ///
    /// Insufficient stock yields `Ok(Rejected)` naming every short
    /// ingredient. Nothing is deducted unless everything is.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn submit_order(&self, lines: &[OrderLine]) -> Result<FulfillmentResult, FulfillmentError> {
        let demand = RecipeResolver::new(&self.catalog).expand(lines)?;
        if demand.is_empty() {
            info!("order has no stock-tracked ingredients");
            return Ok(FulfillmentResult::Fulfilled {
                deducted: BTreeMap::new(),
                updated: vec![],
            });
        }

        let changes = match self.ledger.deduct_many(&demand).await {
            Ok(changes) => changes,
            Err(LedgerError::InsufficientStock(shortfalls)) => {
                warn!(short = shortfalls.len(), "order rejected for insufficient stock");
                return Ok(FulfillmentResult::Rejected { shortfalls });
            }
            Err(err) => {
                warn!(error = %err, "order failed");
                return Err(err.into());
            }
        };

        self.notifier.publish(&changes);

        let deducted = changes
            .iter()
            .flat_map(|change| change.events.iter())
            .filter_map(|event| match event {
                IngredientEvent::StockDeducted(e) => Some((e.ingredient_id, e.amount)),
                _ => None,
            })
            .collect();
        let updated = changes.into_iter().map(|change| change.snapshot).collect();

        info!(ingredients = demand.len(), "order fulfilled");
        Ok(FulfillmentResult::Fulfilled { deducted, updated })
    }

    /// Restock one ingredient and notify.
    pub async fn restock(&self, id: IngredientId, amount: Decimal) -> Result<IngredientSnapshot, LedgerError> {
        let change = self.ledger.add(id, amount).await?;
        Ok(self.notified(change))
    }

    /// Manual correction of one ingredient, then notify.
    pub async fn adjust(&self, id: IngredientId, change: Decimal) -> Result<IngredientSnapshot, LedgerError> {
        let change = self.ledger.adjust(id, change).await?;
        Ok(self.notified(change))
    }

    fn notified(&self, change: CommittedChange) -> IngredientSnapshot {
        self.notifier.publish(std::slice::from_ref(&change));
        change.snapshot
    }
}
