use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use larder_core::{DomainError, ValueObject};
use larder_inventory::IngredientId;

use crate::menu::MenuItemId;

/// Join row between a menu item and one of its ingredients.
///
/// Neither side owns the other; the link carries the per-portion quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeLink {
    pub menu_item_id: MenuItemId,
    pub ingredient_id: IngredientId,
    pub quantity_per_unit: Decimal,
}

impl RecipeLink {
    pub fn new(
        menu_item_id: MenuItemId,
        ingredient_id: IngredientId,
        quantity_per_unit: Decimal,
    ) -> Result<Self, DomainError> {
        if quantity_per_unit.is_sign_negative() {
            return Err(DomainError::validation("quantity required cannot be negative"));
        }
        Ok(Self {
            menu_item_id,
            ingredient_id,
            quantity_per_unit,
        })
    }
}

impl ValueObject for RecipeLink {}

/// Read access to menu items and their links.
///
/// Implementations must answer `contains_menu_item` and `links_for` from the
/// same state; the resolver calls both for every order line.
pub trait RecipeCatalog: Send + Sync {
    fn contains_menu_item(&self, id: &MenuItemId) -> bool;

    /// Links of one menu item. Empty for items whose sales aren't stock-tracked.
    fn links_for(&self, id: &MenuItemId) -> Vec<RecipeLink>;
}

impl<C> RecipeCatalog for std::sync::Arc<C>
where
    C: RecipeCatalog + ?Sized,
{
    fn contains_menu_item(&self, id: &MenuItemId) -> bool {
        (**self).contains_menu_item(id)
    }

    fn links_for(&self, id: &MenuItemId) -> Vec<RecipeLink> {
        (**self).links_for(id)
    }
}
