//! Persistence boundary for current stock rows.
//!
//! The ledger keeps every row in memory and writes through to a
//! [`StockStore`]. The store is the arbiter between processes: every write
//! carries the version the writer last saw, and a mismatch fails the whole
//! batch.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

use std::sync::Arc;

pub use in_memory::InMemoryStockStore;
pub use postgres::PostgresStockStore;
pub use r#trait::{StockStore, StockWrite, StoreError};

use crate::config::StoreConfig;

/// Build the store selected by configuration.
pub async fn connect_store(config: &StoreConfig) -> Result<Arc<dyn StockStore>, StoreError> {
    match config {
        StoreConfig::InMemory => {
            tracing::info!("using in-memory stock store");
            Ok(Arc::new(InMemoryStockStore::new()))
        }
        StoreConfig::Postgres { database_url } => {
            let store = PostgresStockStore::connect(database_url).await?;
            store.migrate().await?;
            tracing::info!("using postgres stock store");
            Ok(Arc::new(store))
        }
    }
}
