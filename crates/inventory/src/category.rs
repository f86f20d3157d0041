use core::str::FromStr;

use serde::{Deserialize, Serialize};

use larder_core::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngredientCategory {
    Vegetables,
    Meat,
    Dairy,
    Beverages,
    Spices,
    Bakery,
    Oil,
    Sauces,
    Dessert,
    Fruits,
    Other,
}

impl IngredientCategory {
    pub const ALL: [IngredientCategory; 11] = [
        IngredientCategory::Vegetables,
        IngredientCategory::Meat,
        IngredientCategory::Dairy,
        IngredientCategory::Beverages,
        IngredientCategory::Spices,
        IngredientCategory::Bakery,
        IngredientCategory::Oil,
        IngredientCategory::Sauces,
        IngredientCategory::Dessert,
        IngredientCategory::Fruits,
        IngredientCategory::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IngredientCategory::Vegetables => "vegetables",
            IngredientCategory::Meat => "meat",
            IngredientCategory::Dairy => "dairy",
            IngredientCategory::Beverages => "beverages",
            IngredientCategory::Spices => "spices",
            IngredientCategory::Bakery => "bakery",
            IngredientCategory::Oil => "oil",
            IngredientCategory::Sauces => "sauces",
            IngredientCategory::Dessert => "dessert",
            IngredientCategory::Fruits => "fruits",
            IngredientCategory::Other => "other",
        }
    }
}

impl core::fmt::Display for IngredientCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IngredientCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| DomainError::validation(format!("unknown ingredient category: {s}")))
    }
}
