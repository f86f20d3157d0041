use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use larder_core::ExpectedVersion;
use larder_inventory::{IngredientId, IngredientSnapshot};

use super::r#trait::{StockStore, StockWrite, StoreError};

/// In-memory stock store.
///
/// Intended for tests/dev. Batches are validated in full before any row is
/// touched, so a failed commit changes nothing.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    rows: RwLock<HashMap<IngredientId, IngredientSnapshot>>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

fn check_version(
    id: IngredientId,
    expected: ExpectedVersion,
    actual: Option<u64>,
) -> Result<(), StoreError> {
    if expected.matches(actual) {
        return Ok(());
    }
    match (expected, actual) {
        (ExpectedVersion::Exact(_), None) => Err(StoreError::NotFound(id)),
        _ => Err(StoreError::Concurrency(format!(
            "ingredient {id}: expected {expected:?}, found {actual:?}"
        ))),
    }
}

#[async_trait]
impl StockStore for InMemoryStockStore {
    async fn load_all(&self) -> Result<Vec<IngredientSnapshot>, StoreError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.values().cloned().collect())
    }

    async fn load(&self, ids: &[IngredientId]) -> Result<Vec<IngredientSnapshot>, StoreError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }

    async fn commit(&self, writes: Vec<StockWrite>) -> Result<(), StoreError> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut rows = self.rows.write().map_err(|_| poisoned())?;

        let mut seen = HashSet::with_capacity(writes.len());
        for w in &writes {
            let id = w.ingredient_id();
            if !seen.insert(id) {
                return Err(StoreError::Backend(format!(
                    "batch writes ingredient {id} more than once"
                )));
            }
            check_version(id, w.expected, rows.get(&id).map(|r| r.version))?;
        }

        for w in writes {
            rows.insert(w.snapshot.id, w.snapshot);
        }
        Ok(())
    }

    async fn remove(&self, id: IngredientId, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        match rows.get(&id) {
            None => Err(StoreError::NotFound(id)),
            Some(row) => {
                check_version(id, expected, Some(row.version))?;
                rows.remove(&id);
                Ok(())
            }
        }
    }
}
