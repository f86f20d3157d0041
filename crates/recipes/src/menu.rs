use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use larder_core::{AggregateId, DomainError, Entity};

/// Menu item identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuItemId(pub AggregateId);

impl MenuItemId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn generate() -> Self {
        Self(AggregateId::new())
    }
}

impl core::fmt::Display for MenuItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A sellable dish. Only identity matters to fulfillment; price is carried for
/// callers that snapshot it onto order lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub name: String,
    pub price: Decimal,
}

impl MenuItem {
    pub fn new(id: MenuItemId, name: impl Into<String>, price: Decimal) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("menu item name cannot be empty"));
        }
        if price.is_sign_negative() {
            return Err(DomainError::validation("menu item price cannot be negative"));
        }
        Ok(Self { id, name, price })
    }
}

impl Entity for MenuItem {
    type Id = MenuItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
