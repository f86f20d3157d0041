//! Infrastructure layer: the ingredient ledger service, stock stores, the
//! recipe book, order fulfillment and status notification.
//!
//! Domain rules live in `larder-inventory` and `larder-recipes`; this crate
//! owns locking, persistence and wiring.

pub mod config;
pub mod fulfillment;
pub mod ledger;
pub mod notifier;
pub mod recipe_book;
pub mod stock_store;


pub use config::{ConfigError, LarderConfig, LedgerConfig, StoreConfig};
pub use fulfillment::{FulfillmentCoordinator, FulfillmentError, FulfillmentResult};
pub use ledger::{CommittedChange, IngredientLedger, LedgerError};
pub use notifier::{InventoryStats, StatusNotifier};
pub use recipe_book::InMemoryRecipeBook;
pub use stock_store::{
    InMemoryStockStore, PostgresStockStore, StockStore, StockWrite, StoreError, connect_store,
};
