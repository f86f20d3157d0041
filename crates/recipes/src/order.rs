use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use larder_core::{DomainError, ValueObject};

use crate::menu::MenuItemId;

/// One line of an incoming order, validated on construction and on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawOrderLine")]
pub struct OrderLine {
    menu_item_id: MenuItemId,
    quantity: u32,
    unit_price: Decimal,
}

impl OrderLine {
    pub fn new(menu_item_id: MenuItemId, quantity: u32, unit_price: Decimal) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if unit_price.is_sign_negative() {
            return Err(DomainError::validation("unit_price cannot be negative"));
        }
        Ok(Self {
            menu_item_id,
            quantity,
            unit_price,
        })
    }

    pub fn menu_item_id(&self) -> MenuItemId {
        self.menu_item_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    /// `None` when the total doesn't fit in a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

impl ValueObject for OrderLine {}

/// Unvalidated wire shape.
#[derive(Deserialize)]
struct RawOrderLine {
    menu_item_id: MenuItemId,
    quantity: u32,
    unit_price: Decimal,
}

impl TryFrom<RawOrderLine> for OrderLine {
    type Error = DomainError;

    fn try_from(raw: RawOrderLine) -> Result<Self, Self::Error> {
        OrderLine::new(raw.menu_item_id, raw.quantity, raw.unit_price)
    }
}
