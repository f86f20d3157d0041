use chrono::{DateTime, Utc};

/// A fact that already happened. Never mutated after creation.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable name, e.g. `"inventory.ingredient.stock_deducted"`.
    fn event_type(&self) -> &'static str;

    /// Schema version of the payload.
    fn version(&self) -> u32;

    fn occurred_at(&self) -> DateTime<Utc>;
}
