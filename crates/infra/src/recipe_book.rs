//! In-memory recipe catalog: menu items and their ingredient links.
//!
//! Follows the same shape as the other in-memory stores: one `RwLock` around
//! plain maps, writes validated before anything is inserted.

use std::collections::BTreeMap;
use std::sync::RwLock;

use rust_decimal::Decimal;

use larder_core::DomainError;
use larder_inventory::IngredientId;
use larder_recipes::{MenuItem, MenuItemId, RecipeCatalog, RecipeLink};

#[derive(Debug, Default)]
struct Book {
    menu_items: BTreeMap<MenuItemId, MenuItem>,
    links: BTreeMap<MenuItemId, BTreeMap<IngredientId, Decimal>>,
}

#[derive(Debug, Default)]
pub struct InMemoryRecipeBook {
    inner: RwLock<Book>,
}

fn poisoned() -> DomainError {
    DomainError::invariant("recipe book lock poisoned")
}

impl InMemoryRecipeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_menu_item(&self, item: MenuItem) -> Result<(), DomainError> {
        let mut book = self.inner.write().map_err(|_| poisoned())?;
        if book.menu_items.contains_key(&item.id) {
            return Err(DomainError::conflict(format!("menu item {} already exists", item.id)));
        }
        book.menu_items.insert(item.id, item);
        Ok(())
    }

    /// Remove a menu item together with all of its links.
    pub fn remove_menu_item(&self, id: &MenuItemId) -> Result<MenuItem, DomainError> {
        let mut book = self.inner.write().map_err(|_| poisoned())?;
        let item = book.menu_items.remove(id).ok_or(DomainError::NotFound)?;
        book.links.remove(id);
        Ok(item)
    }

    pub fn menu_item(&self, id: &MenuItemId) -> Option<MenuItem> {
        self.inner.read().ok()?.menu_items.get(id).cloned()
    }

    pub fn menu_items(&self) -> Vec<MenuItem> {
        self.inner
            .read()
            .map(|book| book.menu_items.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Link an ingredient to a menu item. Linking the same pair again
    /// replaces the quantity.
    pub fn link(
        &self,
        menu_item_id: MenuItemId,
        ingredient_id: IngredientId,
        quantity_per_unit: Decimal,
    ) -> Result<RecipeLink, DomainError> {
        let link = RecipeLink::new(menu_item_id, ingredient_id, quantity_per_unit)?;

        let mut book = self.inner.write().map_err(|_| poisoned())?;
        if !book.menu_items.contains_key(&menu_item_id) {
            return Err(DomainError::NotFound);
        }
        book.links
            .entry(menu_item_id)
            .or_default()
            .insert(ingredient_id, quantity_per_unit);
        Ok(link)
    }

    /// Returns whether a link existed.
    pub fn unlink(&self, menu_item_id: &MenuItemId, ingredient_id: &IngredientId) -> bool {
        let Ok(mut book) = self.inner.write() else {
            return false;
        };
        let Some(links) = book.links.get_mut(menu_item_id) else {
            return false;
        };
        let removed = links.remove(ingredient_id).is_some();
        if links.is_empty() {
            book.links.remove(menu_item_id);
        }
        removed
    }

    /// Menu items whose recipe uses `ingredient_id`, ordered by name.
    pub fn menu_items_using(&self, ingredient_id: &IngredientId) -> Vec<MenuItem> {
        let Ok(book) = self.inner.read() else {
            return vec![];
        };
        let mut items: Vec<MenuItem> = book
            .links
            .iter()
            .filter(|(_, links)| links.contains_key(ingredient_id))
            .filter_map(|(menu_item_id, _)| book.menu_items.get(menu_item_id).cloned())
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        items
    }
}

impl RecipeCatalog for InMemoryRecipeBook {
    fn contains_menu_item(&self, id: &MenuItemId) -> bool {
        self.inner
            .read()
            .map(|book| book.menu_items.contains_key(id))
            .unwrap_or(false)
    }

    fn links_for(&self, id: &MenuItemId) -> Vec<RecipeLink> {
        let Ok(book) = self.inner.read() else {
            return vec![];
        };
        book.links
            .get(id)
            .map(|links| {
                links
                    .iter()
                    .map(|(ingredient_id, quantity)| RecipeLink {
                        menu_item_id: *id,
                        ingredient_id: *ingredient_id,
                        quantity_per_unit: *quantity,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
