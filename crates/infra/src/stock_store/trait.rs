use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use larder_core::ExpectedVersion;
use larder_inventory::{IngredientId, IngredientSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Another writer changed a row since it was read.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    #[error("ingredient not found in store: {0}")]
    NotFound(IngredientId),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// One row write inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockWrite {
    pub snapshot: IngredientSnapshot,
    /// Version the row must be at before this write. `NoRow` for inserts.
    pub expected: ExpectedVersion,
}

impl StockWrite {
    pub fn new(snapshot: IngredientSnapshot, expected: ExpectedVersion) -> Self {
        Self { snapshot, expected }
    }

    pub fn ingredient_id(&self) -> IngredientId {
        self.snapshot.id
    }
}

/// Current-state store for ingredient rows.
///
/// Implementations must:
/// - apply a `commit` batch atomically (every write lands or none does)
/// - check each write's `expected` version against the stored row
/// - report a missing row written with `Exact` as `NotFound`
/// - report any other version mismatch as `Concurrency`
#[async_trait]
pub trait StockStore: Send + Sync + 'static {
    async fn load_all(&self) -> Result<Vec<IngredientSnapshot>, StoreError>;

    /// Rows for `ids`. Missing ids are left out of the result.
    async fn load(&self, ids: &[IngredientId]) -> Result<Vec<IngredientSnapshot>, StoreError>;

    async fn commit(&self, writes: Vec<StockWrite>) -> Result<(), StoreError>;

    async fn remove(&self, id: IngredientId, expected: ExpectedVersion) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> StockStore for Arc<S>
where
    S: StockStore + ?Sized,
{
    async fn load_all(&self) -> Result<Vec<IngredientSnapshot>, StoreError> {
        (**self).load_all().await
    }

    async fn load(&self, ids: &[IngredientId]) -> Result<Vec<IngredientSnapshot>, StoreError> {
        (**self).load(ids).await
    }

    async fn commit(&self, writes: Vec<StockWrite>) -> Result<(), StoreError> {
        (**self).commit(writes).await
    }

    async fn remove(&self, id: IngredientId, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).remove(id, expected).await
    }
}
