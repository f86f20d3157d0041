use rust_decimal::Decimal;
use thiserror::Error;

use larder_inventory::IngredientId;

use crate::demand::{DemandOverflow, DemandVector};
use crate::menu::MenuItemId;
use crate::order::OrderLine;
use crate::recipe::RecipeCatalog;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("unknown menu item: {0}")]
    UnknownMenuItem(MenuItemId),

    #[error("demand for ingredient {0} exceeds the representable quantity")]
    DemandOverflow(IngredientId),
}

impl From<DemandOverflow> for ResolveError {
    fn from(DemandOverflow(id): DemandOverflow) -> Self {
        ResolveError::DemandOverflow(id)
    }
}

/// Expands order lines into one consolidated [`DemandVector`].
#[derive(Debug)]
pub struct RecipeResolver<'a, C: ?Sized> {
    catalog: &'a C,
}

impl<'a, C> RecipeResolver<'a, C>
where
    C: RecipeCatalog + ?Sized,
{
    pub fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    /// Sum `quantity_per_unit * line.quantity` per ingredient across all lines.
    ///
    /// A menu item with no links adds nothing. A menu item the catalog doesn't
    /// know at all fails the whole expansion, as does a total too large for
    /// `Decimal`.
    pub fn expand(&self, lines: &[OrderLine]) -> Result<DemandVector, ResolveError> {
        let mut demand = DemandVector::new();
        for line in lines {
            let menu_item_id = line.menu_item_id();
            if !self.catalog.contains_menu_item(&menu_item_id) {
                return Err(ResolveError::UnknownMenuItem(menu_item_id));
            }
            let portions = Decimal::from(line.quantity());
            for link in self.catalog.links_for(&menu_item_id) {
                let amount = link
                    .quantity_per_unit
                    .checked_mul(portions)
                    .ok_or(ResolveError::DemandOverflow(link.ingredient_id))?;
                demand.add(link.ingredient_id, amount)?;
            }
        }
        Ok(demand)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::recipe::RecipeLink;
    use proptest::prelude::*;

    #[derive(Default)]
    struct TestCatalog {
        items: HashMap<MenuItemId, Vec<RecipeLink>>,
    }

    impl TestCatalog {
        fn with_item(mut self, id: MenuItemId, links: &[(IngredientId, Decimal)]) -> Self {
            let links = links
                .iter()
                .map(|(ing, q)| RecipeLink::new(id, *ing, *q).unwrap())
                .collect();
            self.items.insert(id, links);
            self
        }
    }

    impl RecipeCatalog for TestCatalog {
        fn contains_menu_item(&self, id: &MenuItemId) -> bool {
            self.items.contains_key(id)
        }

        fn links_for(&self, id: &MenuItemId) -> Vec<RecipeLink> {
            self.items.get(id).cloned().unwrap_or_default()
        }
    }

    fn line(id: MenuItemId, qty: u32) -> OrderLine {
        OrderLine::new(id, qty, Decimal::ONE).unwrap()
    }

    #[test]
    fn shared_ingredient_is_summed_across_menu_items() {
        let cheese = IngredientId::generate();
        let bread = IngredientId::generate();
        let pizza = MenuItemId::generate();
        let toast = MenuItemId::generate();
        let catalog = TestCatalog::default()
            .with_item(pizza, &[(cheese, Decimal::new(2, 1))])
            .with_item(toast, &[(cheese, Decimal::new(5, 2)), (bread, Decimal::from(2))]);

        let demand = RecipeResolver::new(&catalog)
            .expand(&[line(pizza, 3), line(toast, 2)])
            .unwrap();

        assert_eq!(demand.get(&cheese), Some(Decimal::new(70, 2)));
        assert_eq!(demand.get(&bread), Some(Decimal::from(4)));
        assert_eq!(demand.len(), 2);
    }

    #[test]
    fn untracked_menu_item_contributes_nothing() {
        let water = MenuItemId::generate();
        let catalog = TestCatalog::default().with_item(water, &[]);

        let demand = RecipeResolver::new(&catalog).expand(&[line(water, 5)]).unwrap();
        assert!(demand.is_empty());
    }

    #[test]
    fn unknown_menu_item_fails_expansion() {
        let known = MenuItemId::generate();
        let unknown = MenuItemId::generate();
        let catalog = TestCatalog::default().with_item(known, &[(IngredientId::generate(), Decimal::ONE)]);

        let err = RecipeResolver::new(&catalog)
            .expand(&[line(known, 1), line(unknown, 1)])
            .unwrap_err();
        assert_eq!(err, ResolveError::UnknownMenuItem(unknown));
    }

    #[test]
    fn oversized_line_fails_instead_of_overflowing() {
        let saffron = IngredientId::generate();
        let paella = MenuItemId::generate();
        let per_portion = Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0);
        let catalog = TestCatalog::default().with_item(paella, &[(saffron, per_portion)]);

        let err = RecipeResolver::new(&catalog)
            .expand(&[line(paella, u32::MAX)])
            .unwrap_err();
        assert_eq!(err, ResolveError::DemandOverflow(saffron));
    }

    #[test]
    fn summed_lines_that_overflow_fail_expansion() {
        let flour = IngredientId::generate();
        let bread = MenuItemId::generate();
        let catalog = TestCatalog::default().with_item(bread, &[(flour, Decimal::MAX)]);

        let err = RecipeResolver::new(&catalog)
            .expand(&[line(bread, 1), line(bread, 1)])
            .unwrap_err();
        assert_eq!(err, ResolveError::DemandOverflow(flour));
    }

    #[test]
    fn line_order_does_not_matter() {
        let oil = IngredientId::generate();
        let a = MenuItemId::generate();
        let b = MenuItemId::generate();
        let catalog = TestCatalog::default()
            .with_item(a, &[(oil, Decimal::new(1, 1))])
            .with_item(b, &[(oil, Decimal::new(3, 1))]);
        let resolver = RecipeResolver::new(&catalog);

        let forward = resolver.expand(&[line(a, 2), line(b, 1)]).unwrap();
        let backward = resolver.expand(&[line(b, 1), line(a, 2)]).unwrap();
        assert_eq!(forward, backward);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: one shared ingredient's demand equals the hand-computed sum.
        #[test]
        fn demand_equals_sum_of_line_contributions(
            lines in prop::collection::vec((0usize..4, 1u32..20), 1..12),
            per_unit in prop::collection::vec(1i64..500, 4)
        ) {
            let shared = IngredientId::generate();
            let items: Vec<MenuItemId> = (0..4).map(|_| MenuItemId::generate()).collect();
            let mut catalog = TestCatalog::default();
            for (idx, item) in items.iter().enumerate() {
                catalog = catalog.with_item(*item, &[(shared, Decimal::new(per_unit[idx], 2))]);
            }

            let order: Vec<OrderLine> = lines.iter().map(|(idx, qty)| line(items[*idx], *qty)).collect();
            let expected: Decimal = lines
                .iter()
                .map(|(idx, qty)| Decimal::new(per_unit[*idx], 2) * Decimal::from(*qty))
                .sum();

            let demand = RecipeResolver::new(&catalog).expand(&order).unwrap();
            prop_assert_eq!(demand.get(&shared), Some(expected));
            prop_assert_eq!(demand.len(), 1);
        }
    }
}
