//! Ingredient ledger: the only writer of stock quantities.
//!
//! Each row sits behind its own async mutex. Every operation that touches
//! more than one row takes those mutexes in ascending [`IngredientId`] order,
//! and the whole acquisition is bounded by [`LedgerConfig::lock_timeout`].
//!
//! A write happens in two phases:
//!
//! 1. **Stage** (cancellable): commands are executed against clones of the
//!    locked rows. Any shortfall or validation failure ends the operation
//!    here and nothing is written.
//! 2. **Commit** (detached): the staged rows are written to the
//!    [`StockStore`] as one versioned batch and, on success, copied back into
//!    the locked rows. This phase runs in its own task that owns the guards,
//!    so dropping the caller's future cannot leave the store and memory
//!    disagreeing.
//!
//! A store version conflict reloads the locked rows from the store and
//! stages again, up to [`LedgerConfig::max_conflict_retries`] times.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

use larder_core::{AggregateRoot, DomainError, ExpectedVersion};
use larder_events::execute;
use larder_inventory::{
    DeductStock, IngredientCommand, IngredientEvent, IngredientId, IngredientSnapshot,
    IngredientStock, InventoryQuery, RegisterIngredient, RestockIngredient, Shortfall, StockError,
    UpdateIngredientDetails,
};
use larder_recipes::DemandVector;

use crate::config::LedgerConfig;
use crate::stock_store::{StockStore, StockWrite, StoreError};

type RowHandle = Arc<Mutex<IngredientStock>>;
type RowIndex = Arc<RwLock<BTreeMap<IngredientId, RowHandle>>>;
type RowGuard = OwnedMutexGuard<IngredientStock>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient stock: {}", describe_shortfalls(.0))]
    InsufficientStock(Vec<Shortfall>),

    #[error("unknown ingredient(s): {}", join_ids(.0))]
    UnknownIngredient(Vec<IngredientId>),

    #[error(transparent)]
    Validation(DomainError),

    #[error("ingredient already exists: {0}")]
    AlreadyExists(IngredientId),

    #[error("timed out after {0:?} waiting for ingredient locks")]
    LockTimeout(Duration),

    #[error("store kept reporting conflicting writes after {attempts} attempt(s)")]
    ConcurrencyConflict { attempts: u32 },

    #[error(transparent)]
    Store(StoreError),

    #[error("internal ledger error: {0}")]
    Internal(String),
}

fn join_ids(ids: &[IngredientId]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

fn describe_shortfalls(shortfalls: &[Shortfall]) -> String {
    shortfalls
        .iter()
        .map(|s| format!("{} (requested {}, available {})", s.ingredient_id, s.required, s.available))
        .collect::<Vec<_>>()
        .join("; ")
}

impl LedgerError {
    fn from_stock(id: IngredientId, err: StockError) -> Self {
        match err {
            StockError::Insufficient(shortfall) => LedgerError::InsufficientStock(vec![shortfall]),
            StockError::Domain(DomainError::NotFound) => LedgerError::UnknownIngredient(vec![id]),
            StockError::Domain(DomainError::Conflict(_)) => LedgerError::AlreadyExists(id),
            StockError::Domain(other) => LedgerError::Validation(other),
        }
    }

    fn index_poisoned() -> Self {
        LedgerError::Internal("ingredient index lock poisoned".to_string())
    }
}

/// A row write that reached the store, with the events that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedChange {
    pub snapshot: IngredientSnapshot,
    pub events: Vec<IngredientEvent>,
}

impl CommittedChange {
    pub fn ingredient_id(&self) -> IngredientId {
        self.snapshot.id
    }

    /// Quantity right after the write.
    pub fn quantity(&self) -> Decimal {
        self.snapshot.quantity
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Missing {
    Reject,
    Skip,
}

pub struct IngredientLedger<S: StockStore + ?Sized = dyn StockStore> {
    rows: RowIndex,
    store: Arc<S>,
    config: LedgerConfig,
}

impl<S: StockStore + ?Sized> std::fmt::Debug for IngredientLedger<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngredientLedger")
            .field("rows", &self.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S> IngredientLedger<S>
where
    S: StockStore + ?Sized,
{
    /// Load every persisted row and start serving.
    pub async fn open(store: Arc<S>, config: LedgerConfig) -> Result<Self, LedgerError> {
        let snapshots = store.load_all().await.map_err(LedgerError::Store)?;
        let rows: BTreeMap<IngredientId, RowHandle> = snapshots
            .into_iter()
            .map(|s| (s.id, Arc::new(Mutex::new(IngredientStock::restore(s)))))
            .collect();

        info!(rows = rows.len(), "ingredient ledger opened");
        Ok(Self {
            rows: Arc::new(RwLock::new(rows)),
            store,
            config,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: IngredientId) -> bool {
        self.rows.read().map(|rows| rows.contains_key(&id)).unwrap_or(false)
    }

    /// Create a new row. Status is derived and `last_restocked_at` stamped.
    #[instrument(skip(self, cmd), fields(ingredient_id = %cmd.ingredient_id))]
    pub async fn register(&self, cmd: RegisterIngredient) -> Result<CommittedChange, LedgerError> {
        let id = cmd.ingredient_id;
        if self.contains(id) {
            return Err(LedgerError::AlreadyExists(id));
        }

        let mut row = IngredientStock::empty(id);
        let events = execute(&mut row, &IngredientCommand::Register(cmd))
            .map_err(|e| LedgerError::from_stock(id, e))?;
        let snapshot = row.snapshot();

        let write = StockWrite::new(snapshot.clone(), ExpectedVersion::NoRow);
        let store = Arc::clone(&self.store);
        let index = Arc::clone(&self.rows);
        let committed = tokio::spawn(async move {
            store.commit(vec![write]).await?;
            Ok::<_, StoreError>(insert_row(&index, row))
        })
        .await
        .map_err(|e| LedgerError::Internal(format!("register task failed: {e}")))?;

        match committed {
            Ok(true) => {}
            Ok(false) => return Err(LedgerError::index_poisoned()),
            Err(StoreError::Concurrency(_)) => return Err(LedgerError::AlreadyExists(id)),
            Err(other) => return Err(LedgerError::Store(other)),
        }

        info!(name = %snapshot.name, status = %snapshot.status, "ingredient registered");
        Ok(CommittedChange { snapshot, events })
    }

    /// Change descriptive fields and the reorder threshold. Quantity is untouched.
    #[instrument(skip(self, cmd), fields(ingredient_id = %cmd.ingredient_id))]
    pub async fn update_details(
        &self,
        cmd: UpdateIngredientDetails,
    ) -> Result<CommittedChange, LedgerError> {
        let id = cmd.ingredient_id;
        self.write_one(id, IngredientCommand::UpdateDetails(cmd)).await
    }

    /// Deduct `amount` from one row, or fail with its shortfall.
    pub async fn try_deduct(
        &self,
        id: IngredientId,
        amount: Decimal,
    ) -> Result<CommittedChange, LedgerError> {
        let cmd = IngredientCommand::Deduct(DeductStock {
            ingredient_id: id,
            amount,
            occurred_at: Utc::now(),
        });
        self.write_one(id, cmd).await
    }

    /// Restock one row and stamp `last_restocked_at`.
    pub async fn add(&self, id: IngredientId, amount: Decimal) -> Result<CommittedChange, LedgerError> {
        let cmd = IngredientCommand::Restock(RestockIngredient {
            ingredient_id: id,
            amount,
            occurred_at: Utc::now(),
        });
        self.write_one(id, cmd).await
    }

    /// Manual correction: positive adds, negative deducts without clamping.
    pub async fn adjust(&self, id: IngredientId, change: Decimal) -> Result<CommittedChange, LedgerError> {
        if change.is_zero() {
            return Err(LedgerError::Validation(DomainError::validation(
                "adjustment cannot be zero",
            )));
        }
        if change.is_sign_positive() {
            self.add(id, change).await
        } else {
            self.try_deduct(id, -change).await
        }
    }

    /// Delete a row. Returns its last committed state.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: IngredientId) -> Result<IngredientSnapshot, LedgerError> {
        let mut guards = self.lock_rows(&[id], Missing::Reject).await?;
        let guard = guards
            .pop()
            .ok_or_else(|| LedgerError::Internal("lost row guard".to_string()))?;
        let snapshot = guard.snapshot();
        let expected = ExpectedVersion::Exact(guard.version());

        let store = Arc::clone(&self.store);
        let index = Arc::clone(&self.rows);
        let (guard, removed) = tokio::spawn(async move {
            let result = store.remove(id, expected).await;
            if matches!(result, Ok(()) | Err(StoreError::NotFound(_))) {
                remove_row(&index, id);
            }
            (guard, result)
        })
        .await
        .map_err(|e| LedgerError::Internal(format!("remove task failed: {e}")))?;

        match removed {
            Ok(()) => {
                info!(name = %snapshot.name, "ingredient removed");
                Ok(snapshot)
            }
            Err(StoreError::NotFound(_)) => Err(LedgerError::UnknownIngredient(vec![id])),
            Err(StoreError::Concurrency(reason)) => {
                warn!(%reason, "remove lost a version race, reloading row");
                self.reload(&mut [guard]).await?;
                Err(LedgerError::ConcurrencyConflict { attempts: 1 })
            }
            Err(other) => Err(LedgerError::Store(other)),
        }
    }

    pub async fn get(&self, id: IngredientId) -> Result<IngredientSnapshot, LedgerError> {
        let guards = self.lock_rows(&[id], Missing::Reject).await?;
        guards
            .first()
            .map(|g| g.snapshot())
            .ok_or(LedgerError::UnknownIngredient(vec![id]))
    }

    /// Committed records for `ids`, in ascending id order. Unknown ids are skipped.
    ///
    /// All requested rows are locked together, so the result is one
    /// consistent cut across them.
    pub async fn snapshot(&self, ids: &[IngredientId]) -> Result<Vec<IngredientSnapshot>, LedgerError> {
        let guards = self.lock_rows(ids, Missing::Skip).await?;
        Ok(guards.iter().map(|g| g.snapshot()).collect())
    }

    /// Every row, ordered by name.
    pub async fn list(&self) -> Result<Vec<IngredientSnapshot>, LedgerError> {
        let ids = self.known_ids()?;
        let mut all = self.snapshot(&ids).await?;
        all.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    /// Rows matching `query`, ordered by name.
    pub async fn list_filtered(&self, query: &InventoryQuery) -> Result<Vec<IngredientSnapshot>, LedgerError> {
        let mut rows = self.list().await?;
        rows.retain(|row| query.matches(row));
        Ok(rows)
    }

    /// Deduct every amount in `demand`, or none of them.
    ///
    /// On shortfall the error lists every insufficient ingredient, not just
    /// the first one found.
    #[instrument(skip(self, demand), fields(ingredients = demand.len()))]
    pub async fn deduct_many(&self, demand: &DemandVector) -> Result<Vec<CommittedChange>, LedgerError> {
        if demand.is_empty() {
            return Ok(vec![]);
        }

        let occurred_at = Utc::now();
        let commands: BTreeMap<IngredientId, IngredientCommand> = demand
            .iter()
            .map(|(id, amount)| {
                let cmd = IngredientCommand::Deduct(DeductStock {
                    ingredient_id: id,
                    amount,
                    occurred_at,
                });
                (id, cmd)
            })
            .collect();

        let ids = demand.ingredient_ids();
        let guards = self.lock_rows(&ids, Missing::Reject).await?;
        self.commit_locked(guards, &commands).await
    }

    async fn write_one(
        &self,
        id: IngredientId,
        command: IngredientCommand,
    ) -> Result<CommittedChange, LedgerError> {
        let guards = self.lock_rows(&[id], Missing::Reject).await?;
        let commands = BTreeMap::from([(id, command)]);
        self.commit_locked(guards, &commands)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LedgerError::Internal("write produced no change".to_string()))
    }

    fn known_ids(&self) -> Result<Vec<IngredientId>, LedgerError> {
        let rows = self.rows.read().map_err(|_| LedgerError::index_poisoned())?;
        Ok(rows.keys().copied().collect())
    }

    fn handles(
        &self,
        ids: &[IngredientId],
        missing: Missing,
    ) -> Result<Vec<(IngredientId, RowHandle)>, LedgerError> {
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();

        let rows = self.rows.read().map_err(|_| LedgerError::index_poisoned())?;
        let mut handles = Vec::with_capacity(ids.len());
        let mut unknown = Vec::new();
        for id in ids {
            match rows.get(&id) {
                Some(handle) => handles.push((id, Arc::clone(handle))),
                None => unknown.push(id),
            }
        }

        if missing == Missing::Reject && !unknown.is_empty() {
            return Err(LedgerError::UnknownIngredient(unknown));
        }
        Ok(handles)
    }

    /// Ids whose handle was replaced or removed from the index.
    fn evicted(&self, handles: &[(IngredientId, RowHandle)]) -> Result<Vec<IngredientId>, LedgerError> {
        let rows = self.rows.read().map_err(|_| LedgerError::index_poisoned())?;
        Ok(handles
            .iter()
            .filter(|(id, handle)| !rows.get(id).is_some_and(|current| Arc::ptr_eq(current, handle)))
            .map(|(id, _)| *id)
            .collect())
    }

    /// Lock `ids` in ascending order within the configured timeout.
    ///
    /// On timeout every guard taken so far is dropped with the inner future.
    async fn lock_rows(&self, ids: &[IngredientId], missing: Missing) -> Result<Vec<RowGuard>, LedgerError> {
        let handles = self.handles(ids, missing)?;
        let started = Instant::now();

        let acquire = async {
            let mut guards = Vec::with_capacity(handles.len());
            for (_, handle) in &handles {
                guards.push(Arc::clone(handle).lock_owned().await);
            }
            guards
        };

        let guards = match tokio::time::timeout(self.config.lock_timeout, acquire).await {
            Ok(guards) => guards,
            Err(_) => {
                warn!(
                    rows = handles.len(),
                    timeout_ms = self.config.lock_timeout.as_millis() as u64,
                    "timed out acquiring ingredient locks"
                );
                return Err(LedgerError::LockTimeout(self.config.lock_timeout));
            }
        };
        debug!(
            rows = guards.len(),
            waited_us = started.elapsed().as_micros() as u64,
            "acquired ingredient locks"
        );

        // A row removed while we queued for it is gone for good.
        let evicted = self.evicted(&handles)?;
        if evicted.is_empty() {
            return Ok(guards);
        }
        if missing == Missing::Reject {
            return Err(LedgerError::UnknownIngredient(evicted));
        }
        Ok(guards
            .into_iter()
            .filter(|g| !evicted.contains(&g.id_typed()))
            .collect())
    }

    async fn commit_locked(
        &self,
        mut guards: Vec<RowGuard>,
        commands: &BTreeMap<IngredientId, IngredientCommand>,
    ) -> Result<Vec<CommittedChange>, LedgerError> {
        let max_attempts = self.config.max_conflict_retries.saturating_add(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let staged = stage(&guards, commands)?;
            let writes: Vec<StockWrite> = guards
                .iter()
                .zip(&staged)
                .map(|(guard, (row, _))| {
                    StockWrite::new(row.snapshot(), ExpectedVersion::Exact(guard.version()))
                })
                .collect();

            let store = Arc::clone(&self.store);
            let outcome = tokio::spawn(async move {
                match store.commit(writes).await {
                    Ok(()) => {
                        let mut changes = Vec::with_capacity(staged.len());
                        for (guard, (row, events)) in guards.iter_mut().zip(staged) {
                            changes.push(CommittedChange {
                                snapshot: row.snapshot(),
                                events,
                            });
                            **guard = row;
                        }
                        Ok(changes)
                    }
                    Err(err) => Err((guards, err)),
                }
            })
            .await
            .map_err(|e| LedgerError::Internal(format!("commit task failed: {e}")))?;

            match outcome {
                Ok(changes) => return Ok(changes),
                Err((returned, StoreError::Concurrency(reason))) => {
                    if attempt >= max_attempts {
                        warn!(attempts = attempt, %reason, "giving up after repeated store conflicts");
                        return Err(LedgerError::ConcurrencyConflict { attempts: attempt });
                    }
                    warn!(attempt, %reason, "store version conflict, reloading locked rows");
                    guards = returned;
                    self.reload(&mut guards).await?;
                }
                Err((_, StoreError::NotFound(id))) => {
                    return Err(LedgerError::UnknownIngredient(vec![id]));
                }
                Err((_, other)) => return Err(LedgerError::Store(other)),
            }
        }
    }

    /// Replace locked rows with the store's current state.
    async fn reload(&self, guards: &mut [RowGuard]) -> Result<(), LedgerError> {
        let ids: Vec<IngredientId> = guards.iter().map(|g| g.id_typed()).collect();
        let mut fresh: HashMap<IngredientId, IngredientSnapshot> = self
            .store
            .load(&ids)
            .await
            .map_err(LedgerError::Store)?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let mut missing = Vec::new();
        for guard in guards.iter_mut() {
            match fresh.remove(&guard.id_typed()) {
                Some(snapshot) => **guard = IngredientStock::restore(snapshot),
                None => missing.push(guard.id_typed()),
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::UnknownIngredient(missing))
        }
    }
}

/// Run every command against a clone of its row. Collects all shortfalls.
fn stage(
    guards: &[RowGuard],
    commands: &BTreeMap<IngredientId, IngredientCommand>,
) -> Result<Vec<(IngredientStock, Vec<IngredientEvent>)>, LedgerError> {
    let mut staged = Vec::with_capacity(guards.len());
    let mut shortfalls = Vec::new();

    for guard in guards {
        let id = guard.id_typed();
        let command = commands
            .get(&id)
            .ok_or_else(|| LedgerError::Internal(format!("no command staged for {id}")))?;

        let mut row = (**guard).clone();
        match execute(&mut row, command) {
            Ok(events) => staged.push((row, events)),
            Err(StockError::Insufficient(shortfall)) => shortfalls.push(shortfall),
            Err(err) => return Err(LedgerError::from_stock(id, err)),
        }
    }

    if !shortfalls.is_empty() {
        return Err(LedgerError::InsufficientStock(shortfalls));
    }
    Ok(staged)
}

/// Returns `false` only when the index lock is poisoned.
fn insert_row(index: &RowIndex, row: IngredientStock) -> bool {
    match index.write() {
        Ok(mut rows) => {
            rows.insert(row.id_typed(), Arc::new(Mutex::new(row)));
            true
        }
        Err(_) => false,
    }
}

fn remove_row(index: &RowIndex, id: IngredientId) {
    if let Ok(mut rows) = index.write() {
        rows.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stock_store::InMemoryStockStore;
    use larder_inventory::{IngredientCategory, StockStatus};

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn register_cmd(name: &str, quantity: i64, threshold: i64) -> RegisterIngredient {
        RegisterIngredient {
            ingredient_id: IngredientId::generate(),
            name: name.to_string(),
            category: IngredientCategory::Other,
            quantity: d(quantity),
            unit: "kg".to_string(),
            reorder_threshold: d(threshold),
            supplier: None,
            cost_per_unit: None,
            occurred_at: Utc::now(),
        }
    }

    async fn ledger() -> IngredientLedger<InMemoryStockStore> {
        IngredientLedger::open(Arc::new(InMemoryStockStore::new()), LedgerConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn register_writes_through_to_store() {
        let ledger = ledger().await;
        let change = ledger.register(register_cmd("Rice", 10, 5)).await.unwrap();

        assert_eq!(change.snapshot.status, StockStatus::InStock);
        assert_eq!(change.events.len(), 1);
        let stored = ledger.store().load(&[change.ingredient_id()]).await.unwrap();
        assert_eq!(stored, vec![change.snapshot.clone()]);
    }

    #[tokio::test]
    async fn register_same_id_twice_is_already_exists() {
        let ledger = ledger().await;
        let cmd = register_cmd("Rice", 1, 0);
        ledger.register(cmd.clone()).await.unwrap();
        let err = ledger.register(cmd.clone()).await.unwrap_err();
        assert_eq!(err, LedgerError::AlreadyExists(cmd.ingredient_id));
    }

    #[tokio::test]
    async fn invalid_registration_is_a_validation_error() {
        let ledger = ledger().await;
        let err = ledger.register(register_cmd("", 1, 0)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(DomainError::Validation(_))));
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn try_deduct_reports_available_and_requested() {
        let ledger = ledger().await;
        let id = ledger.register(register_cmd("Oil", 4, 5)).await.unwrap().ingredient_id();

        let err = ledger.try_deduct(id, d(5)).await.unwrap_err();
        match err {
            LedgerError::InsufficientStock(shortfalls) => {
                assert_eq!(shortfalls.len(), 1);
                assert_eq!(shortfalls[0].available, d(4));
                assert_eq!(shortfalls[0].required, d(5));
            }
            other => panic!("expected shortfall, got {other:?}"),
        }
        assert_eq!(ledger.get(id).await.unwrap().quantity, d(4));
    }

    #[tokio::test]
    async fn adjust_routes_by_sign() {
        let ledger = ledger().await;
        let id = ledger.register(register_cmd("Salt", 3, 1)).await.unwrap().ingredient_id();

        assert_eq!(ledger.adjust(id, d(2)).await.unwrap().quantity(), d(5));
        assert_eq!(ledger.adjust(id, d(-5)).await.unwrap().quantity(), Decimal::ZERO);
        assert!(matches!(
            ledger.adjust(id, d(-1)).await.unwrap_err(),
            LedgerError::InsufficientStock(_)
        ));
        assert!(matches!(
            ledger.adjust(id, Decimal::ZERO).await.unwrap_err(),
            LedgerError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn update_details_keeps_quantity_and_recomputes_status() {
        let ledger = ledger().await;
        let change = ledger.register(register_cmd("Eggs", 8, 5)).await.unwrap();
        let id = change.ingredient_id();

        let updated = ledger
            .update_details(UpdateIngredientDetails {
                ingredient_id: id,
                name: "Free-range eggs".to_string(),
                category: IngredientCategory::Dairy,
                unit: "pcs".to_string(),
                reorder_threshold: d(12),
                supplier: Some("Hill Farm".to_string()),
                cost_per_unit: Some(Decimal::new(35, 2)),
                occurred_at: Utc::now(),
            })
            .await
            .unwrap();

        assert_eq!(updated.quantity(), d(8));
        assert_eq!(updated.snapshot.status, StockStatus::LowStock);
        assert_eq!(updated.snapshot.version, change.snapshot.version + 1);
    }

    #[tokio::test]
    async fn remove_drops_row_everywhere() {
        let ledger = ledger().await;
        let id = ledger.register(register_cmd("Mint", 1, 0)).await.unwrap().ingredient_id();

        ledger.remove(id).await.unwrap();
        assert!(!ledger.contains(id));
        assert!(ledger.store().load(&[id]).await.unwrap().is_empty());
        assert_eq!(
            ledger.get(id).await.unwrap_err(),
            LedgerError::UnknownIngredient(vec![id])
        );
    }

    #[tokio::test]
    async fn open_restores_rows_from_store() {
        let store = Arc::new(InMemoryStockStore::new());
        let first = IngredientLedger::open(Arc::clone(&store), LedgerConfig::default())
            .await
            .unwrap();
        let id = first.register(register_cmd("Basil", 2, 5)).await.unwrap().ingredient_id();
        first.try_deduct(id, d(1)).await.unwrap();

        let second = IngredientLedger::open(store, LedgerConfig::default()).await.unwrap();
        let row = second.get(id).await.unwrap();
        assert_eq!(row.quantity, d(1));
        assert_eq!(row.status, StockStatus::LowStock);
        assert_eq!(row.version, 2);
    }

    #[tokio::test]
    async fn list_is_sorted_by_name_and_snapshot_skips_unknown() {
        let ledger = ledger().await;
        let b = ledger.register(register_cmd("Butter", 1, 0)).await.unwrap().ingredient_id();
        let a = ledger.register(register_cmd("Anchovy", 1, 0)).await.unwrap().ingredient_id();

        let names: Vec<String> = ledger.list().await.unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Anchovy", "Butter"]);

        let snap = ledger.snapshot(&[b, IngredientId::generate(), a]).await.unwrap();
        assert_eq!(snap.len(), 2);
    }

    #[tokio::test]
    async fn restock_past_decimal_range_is_rejected_and_nothing_is_written() {
        let ledger = ledger().await;
        let change = ledger.register(register_cmd("Salt", 3, 1)).await.unwrap();
        let id = change.ingredient_id();

        let err = ledger.add(id, Decimal::MAX).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(DomainError::Validation(_))));

        let row = ledger.get(id).await.unwrap();
        assert_eq!(row, change.snapshot);
        assert_eq!(ledger.store().load(&[id]).await.unwrap(), vec![change.snapshot]);
    }

    #[tokio::test]
    async fn remove_conflict_refreshes_the_held_row() {
        let ledger = ledger().await;
        let change = ledger.register(register_cmd("Capers", 6, 2)).await.unwrap();
        let id = change.ingredient_id();

        let mut external = change.snapshot.clone();
        external.quantity = d(1);
        external.version += 1;
        ledger
            .store()
            .commit(vec![StockWrite::new(external, ExpectedVersion::Exact(change.snapshot.version))])
            .await
            .unwrap();

        assert_eq!(
            ledger.remove(id).await.unwrap_err(),
            LedgerError::ConcurrencyConflict { attempts: 1 }
        );
        let row = ledger.get(id).await.unwrap();
        assert_eq!(row.quantity, d(1));
        assert_eq!(row.status, StockStatus::LowStock);
        assert_eq!(row.version, change.snapshot.version + 1);

        ledger.remove(id).await.unwrap();
        assert!(!ledger.contains(id));
        assert!(ledger.store().is_empty());
    }

    #[tokio::test]
    async fn list_filtered_applies_category_status_and_search() {
        let ledger = ledger().await;
        let register = |name: &str, category: IngredientCategory, quantity: i64| RegisterIngredient {
            category,
            ..register_cmd(name, quantity, 5)
        };
        ledger.register(register("Olive Oil", IngredientCategory::Oil, 2)).await.unwrap();
        ledger.register(register("Sesame Oil", IngredientCategory::Oil, 9)).await.unwrap();
        ledger.register(register("Oregano", IngredientCategory::Spices, 0)).await.unwrap();

        let names = |rows: Vec<IngredientSnapshot>| rows.into_iter().map(|r| r.name).collect::<Vec<_>>();

        let oils = ledger
            .list_filtered(&InventoryQuery::all().with_category(IngredientCategory::Oil))
            .await
            .unwrap();
        assert_eq!(names(oils), vec!["Olive Oil", "Sesame Oil"]);

        let low_oils = ledger
            .list_filtered(
                &InventoryQuery::all()
                    .with_category(IngredientCategory::Oil)
                    .with_status(StockStatus::LowStock),
            )
            .await
            .unwrap();
        assert_eq!(names(low_oils), vec!["Olive Oil"]);

        let searched = ledger
            .list_filtered(&InventoryQuery::all().with_search("OIL"))
            .await
            .unwrap();
        assert_eq!(names(searched), vec!["Olive Oil", "Sesame Oil"]);

        let everything = ledger.list_filtered(&InventoryQuery::all()).await.unwrap();
        assert_eq!(everything.len(), 3);
    }

    #[test]
    fn shortfall_error_names_each_ingredient() {
        let id = IngredientId::generate();
        let err = LedgerError::InsufficientStock(vec![Shortfall {
            ingredient_id: id,
            required: d(3),
            available: d(1),
        }]);
        let msg = err.to_string();
        assert!(msg.contains(&id.to_string()), "{msg}");
        assert!(msg.contains("requested 3"), "{msg}");
    }
}
