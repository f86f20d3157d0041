//! Ingredient inventory domain.
//!
//! Pure business rules for stock rows: quantities, reorder thresholds and the
//! derived status tier. No IO, no locking; the ledger in `larder-infra` owns
//! concurrency and persistence.

pub mod category;
pub mod ingredient;
pub mod query;
pub mod shortfall;
pub mod status;

pub use category::IngredientCategory;
pub use ingredient::{
    DeductStock, IngredientCommand, IngredientDetailsUpdated, IngredientEvent, IngredientId,
    IngredientRegistered, IngredientSnapshot, IngredientStock, RegisterIngredient,
    RestockIngredient, StockDeducted, StockRestocked, UpdateIngredientDetails,
};
pub use query::InventoryQuery;
pub use shortfall::{Shortfall, StockError};
pub use status::{StockStatus, compute_status};
