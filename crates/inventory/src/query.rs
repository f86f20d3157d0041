use serde::{Deserialize, Serialize};

use crate::category::IngredientCategory;
use crate::ingredient::IngredientSnapshot;
use crate::status::StockStatus;

/// Filter over ingredient rows. Every `None` field matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryQuery {
    pub category: Option<IngredientCategory>,
    pub status: Option<StockStatus>,
    /// Case-insensitive substring of the name. Blank means no filter.
    pub search: Option<String>,
}

impl InventoryQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: IngredientCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_status(mut self, status: StockStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Same filter with the status condition dropped.
    ///
    /// Tier counts use this so that filtering by one status still reports
    /// all three tiers.
    pub fn without_status(&self) -> Self {
        Self {
            status: None,
            ..self.clone()
        }
    }

    pub fn matches(&self, row: &IngredientSnapshot) -> bool {
        if self.category.is_some_and(|c| c != row.category) {
            return false;
        }
        if self.status.is_some_and(|s| s != row.status) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                row.name.to_lowercase().contains(&needle.to_lowercase())
            }
            _ => true,
        }
    }
}
