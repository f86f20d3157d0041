use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use larder_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use larder_events::Event;

use crate::category::IngredientCategory;
use crate::shortfall::{Shortfall, StockError};
use crate::status::{StockStatus, compute_status};

/// Ingredient identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IngredientId(pub AggregateId);

impl IngredientId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn generate() -> Self {
        Self(AggregateId::new())
    }
}

impl core::fmt::Display for IngredientId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: one stock-tracked ingredient row.
///
/// `status` has no setter. Every event that touches quantity or threshold
/// recomputes it in [`IngredientStock::apply`], so it can't drift from the
/// quantity it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientStock {
    id: IngredientId,
    name: String,
    category: IngredientCategory,
    quantity: Decimal,
    unit: String,
    reorder_threshold: Decimal,
    supplier: Option<String>,
    cost_per_unit: Option<Decimal>,
    status: StockStatus,
    last_restocked_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl IngredientStock {
    /// Not-yet-registered row, the starting point for `RegisterIngredient`.
    pub fn empty(id: IngredientId) -> Self {
        Self {
            id,
            name: String::new(),
            category: IngredientCategory::Other,
            quantity: Decimal::ZERO,
            unit: String::new(),
            reorder_threshold: Decimal::ZERO,
            supplier: None,
            cost_per_unit: None,
            status: StockStatus::OutOfStock,
            last_restocked_at: None,
            version: 0,
            created: false,
        }
    }

    /// Rebuild a row from persisted state. The stored status is ignored and recomputed.
    pub fn restore(snapshot: IngredientSnapshot) -> Self {
        let mut row = Self {
            id: snapshot.id,
            name: snapshot.name,
            category: snapshot.category,
            quantity: snapshot.quantity,
            unit: snapshot.unit,
            reorder_threshold: snapshot.reorder_threshold,
            supplier: snapshot.supplier,
            cost_per_unit: snapshot.cost_per_unit,
            status: StockStatus::OutOfStock,
            last_restocked_at: snapshot.last_restocked_at,
            version: snapshot.version,
            created: true,
        };
        row.refresh_status();
        row
    }

    pub fn snapshot(&self) -> IngredientSnapshot {
        IngredientSnapshot {
            id: self.id,
            name: self.name.clone(),
            category: self.category,
            quantity: self.quantity,
            unit: self.unit.clone(),
            reorder_threshold: self.reorder_threshold,
            supplier: self.supplier.clone(),
            cost_per_unit: self.cost_per_unit,
            status: self.status,
            last_restocked_at: self.last_restocked_at,
            version: self.version,
        }
    }

    pub fn id_typed(&self) -> IngredientId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> IngredientCategory {
        self.category
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn reorder_threshold(&self) -> Decimal {
        self.reorder_threshold
    }

    pub fn supplier(&self) -> Option<&str> {
        self.supplier.as_deref()
    }

    pub fn cost_per_unit(&self) -> Option<Decimal> {
        self.cost_per_unit
    }

    pub fn status(&self) -> StockStatus {
        self.status
    }

    pub fn last_restocked_at(&self) -> Option<DateTime<Utc>> {
        self.last_restocked_at
    }

    pub fn is_registered(&self) -> bool {
        self.created
    }

    /// `Some(shortfall)` when `amount` can't be covered by the current quantity.
    pub fn shortfall_for(&self, amount: Decimal) -> Option<Shortfall> {
        (amount > self.quantity).then(|| Shortfall {
            ingredient_id: self.id,
            required: amount,
            available: self.quantity,
        })
    }

    fn refresh_status(&mut self) {
        self.status = compute_status(self.quantity, self.reorder_threshold);
    }
}

impl AggregateRoot for IngredientStock {
    type Id = IngredientId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Serializable view of a row, used for persistence and for read snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientSnapshot {
    pub id: IngredientId,
    pub name: String,
    pub category: IngredientCategory,
    pub quantity: Decimal,
    pub unit: String,
    pub reorder_threshold: Decimal,
    pub supplier: Option<String>,
    pub cost_per_unit: Option<Decimal>,
    pub status: StockStatus,
    pub last_restocked_at: Option<DateTime<Utc>>,
    pub version: u64,
}

/// Command: RegisterIngredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterIngredient {
    pub ingredient_id: IngredientId,
    pub name: String,
    pub category: IngredientCategory,
    pub quantity: Decimal,
    pub unit: String,
    pub reorder_threshold: Decimal,
    pub supplier: Option<String>,
    pub cost_per_unit: Option<Decimal>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateIngredientDetails. Quantity is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateIngredientDetails {
    pub ingredient_id: IngredientId,
    pub name: String,
    pub category: IngredientCategory,
    pub unit: String,
    pub reorder_threshold: Decimal,
    pub supplier: Option<String>,
    pub cost_per_unit: Option<Decimal>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeductStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductStock {
    pub ingredient_id: IngredientId,
    pub amount: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RestockIngredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockIngredient {
    pub ingredient_id: IngredientId,
    pub amount: Decimal,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngredientCommand {
    Register(RegisterIngredient),
    UpdateDetails(UpdateIngredientDetails),
    Deduct(DeductStock),
    Restock(RestockIngredient),
}

impl IngredientCommand {
    pub fn ingredient_id(&self) -> IngredientId {
        match self {
            IngredientCommand::Register(c) => c.ingredient_id,
            IngredientCommand::UpdateDetails(c) => c.ingredient_id,
            IngredientCommand::Deduct(c) => c.ingredient_id,
            IngredientCommand::Restock(c) => c.ingredient_id,
        }
    }
}

/// Event: IngredientRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientRegistered {
    pub ingredient_id: IngredientId,
    pub name: String,
    pub category: IngredientCategory,
    pub quantity: Decimal,
    pub unit: String,
    pub reorder_threshold: Decimal,
    pub supplier: Option<String>,
    pub cost_per_unit: Option<Decimal>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: IngredientDetailsUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientDetailsUpdated {
    pub ingredient_id: IngredientId,
    pub name: String,
    pub category: IngredientCategory,
    pub unit: String,
    pub reorder_threshold: Decimal,
    pub supplier: Option<String>,
    pub cost_per_unit: Option<Decimal>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockDeducted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDeducted {
    pub ingredient_id: IngredientId,
    pub amount: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockRestocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRestocked {
    pub ingredient_id: IngredientId,
    pub amount: Decimal,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngredientEvent {
    Registered(IngredientRegistered),
    DetailsUpdated(IngredientDetailsUpdated),
    StockDeducted(StockDeducted),
    StockRestocked(StockRestocked),
}

impl IngredientEvent {
    pub fn ingredient_id(&self) -> IngredientId {
        match self {
            IngredientEvent::Registered(e) => e.ingredient_id,
            IngredientEvent::DetailsUpdated(e) => e.ingredient_id,
            IngredientEvent::StockDeducted(e) => e.ingredient_id,
            IngredientEvent::StockRestocked(e) => e.ingredient_id,
        }
    }
}

impl Event for IngredientEvent {
    fn event_type(&self) -> &'static str {
        match self {
            IngredientEvent::Registered(_) => "inventory.ingredient.registered",
            IngredientEvent::DetailsUpdated(_) => "inventory.ingredient.details_updated",
            IngredientEvent::StockDeducted(_) => "inventory.ingredient.stock_deducted",
            IngredientEvent::StockRestocked(_) => "inventory.ingredient.stock_restocked",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            IngredientEvent::Registered(e) => e.occurred_at,
            IngredientEvent::DetailsUpdated(e) => e.occurred_at,
            IngredientEvent::StockDeducted(e) => e.occurred_at,
            IngredientEvent::StockRestocked(e) => e.occurred_at,
        }
    }
}

impl Aggregate for IngredientStock {
    type Command = IngredientCommand;
    type Event = IngredientEvent;
    type Error = StockError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            IngredientEvent::Registered(e) => {
                self.id = e.ingredient_id;
                self.name = e.name.clone();
                self.category = e.category;
                self.quantity = e.quantity;
                self.unit = e.unit.clone();
                self.reorder_threshold = e.reorder_threshold;
                self.supplier = e.supplier.clone();
                self.cost_per_unit = e.cost_per_unit;
                self.last_restocked_at = Some(e.occurred_at);
                self.created = true;
            }
            IngredientEvent::DetailsUpdated(e) => {
                self.name = e.name.clone();
                self.category = e.category;
                self.unit = e.unit.clone();
                self.reorder_threshold = e.reorder_threshold;
                self.supplier = e.supplier.clone();
                self.cost_per_unit = e.cost_per_unit;
            }
            IngredientEvent::StockDeducted(e) => {
                self.quantity = self.quantity.saturating_sub(e.amount);
            }
            IngredientEvent::StockRestocked(e) => {
                // handle_restock already refused totals that would overflow.
                self.quantity = self.quantity.saturating_add(e.amount);
                self.last_restocked_at = Some(e.occurred_at);
            }
        }

        self.refresh_status();
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            IngredientCommand::Register(cmd) => self.handle_register(cmd),
            IngredientCommand::UpdateDetails(cmd) => self.handle_update(cmd),
            IngredientCommand::Deduct(cmd) => self.handle_deduct(cmd),
            IngredientCommand::Restock(cmd) => self.handle_restock(cmd),
        }
    }
}

pub const MAX_NAME_CHARS: usize = 255;
pub const MAX_UNIT_CHARS: usize = 50;
pub const MAX_SUPPLIER_CHARS: usize = 255;

fn validate_details(
    name: &str,
    unit: &str,
    reorder_threshold: Decimal,
    supplier: Option<&str>,
    cost_per_unit: Option<Decimal>,
) -> Result<(), DomainError> {
    let name = name.trim();
    let unit = unit.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(DomainError::validation(format!(
            "name cannot exceed {MAX_NAME_CHARS} characters"
        )));
    }
    if unit.is_empty() {
        return Err(DomainError::validation("unit cannot be empty"));
    }
    if unit.chars().count() > MAX_UNIT_CHARS {
        return Err(DomainError::validation(format!(
            "unit cannot exceed {MAX_UNIT_CHARS} characters"
        )));
    }
    if supplier.is_some_and(|s| s.chars().count() > MAX_SUPPLIER_CHARS) {
        return Err(DomainError::validation(format!(
            "supplier cannot exceed {MAX_SUPPLIER_CHARS} characters"
        )));
    }
    if reorder_threshold.is_sign_negative() {
        return Err(DomainError::validation("reorder threshold cannot be negative"));
    }
    if cost_per_unit.is_some_and(|c| c.is_sign_negative()) {
        return Err(DomainError::validation("cost per unit cannot be negative"));
    }
    Ok(())
}

fn ensure_positive(amount: Decimal) -> Result<(), DomainError> {
    if amount <= Decimal::ZERO {
        return Err(DomainError::validation("amount must be positive"));
    }
    Ok(())
}

impl IngredientStock {
    fn ensure_existing(&self, ingredient_id: IngredientId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != ingredient_id {
            return Err(DomainError::invariant("ingredient_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterIngredient) -> Result<Vec<IngredientEvent>, StockError> {
        if self.created {
            return Err(DomainError::conflict("ingredient already exists").into());
        }
        validate_details(
            &cmd.name,
            &cmd.unit,
            cmd.reorder_threshold,
            cmd.supplier.as_deref(),
            cmd.cost_per_unit,
        )?;
        if cmd.quantity.is_sign_negative() {
            return Err(DomainError::validation("quantity cannot be negative").into());
        }

        Ok(vec![IngredientEvent::Registered(IngredientRegistered {
            ingredient_id: cmd.ingredient_id,
            name: cmd.name.trim().to_string(),
            category: cmd.category,
            quantity: cmd.quantity,
            unit: cmd.unit.trim().to_string(),
            reorder_threshold: cmd.reorder_threshold,
            supplier: cmd.supplier.clone(),
            cost_per_unit: cmd.cost_per_unit,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(
        &self,
        cmd: &UpdateIngredientDetails,
    ) -> Result<Vec<IngredientEvent>, StockError> {
        self.ensure_existing(cmd.ingredient_id)?;
        validate_details(
            &cmd.name,
            &cmd.unit,
            cmd.reorder_threshold,
            cmd.supplier.as_deref(),
            cmd.cost_per_unit,
        )?;

        Ok(vec![IngredientEvent::DetailsUpdated(IngredientDetailsUpdated {
            ingredient_id: cmd.ingredient_id,
            name: cmd.name.trim().to_string(),
            category: cmd.category,
            unit: cmd.unit.trim().to_string(),
            reorder_threshold: cmd.reorder_threshold,
            supplier: cmd.supplier.clone(),
            cost_per_unit: cmd.cost_per_unit,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deduct(&self, cmd: &DeductStock) -> Result<Vec<IngredientEvent>, StockError> {
        self.ensure_existing(cmd.ingredient_id)?;
        ensure_positive(cmd.amount)?;

        if let Some(shortfall) = self.shortfall_for(cmd.amount) {
            return Err(StockError::Insufficient(shortfall));
        }

        Ok(vec![IngredientEvent::StockDeducted(StockDeducted {
            ingredient_id: cmd.ingredient_id,
            amount: cmd.amount,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_restock(&self, cmd: &RestockIngredient) -> Result<Vec<IngredientEvent>, StockError> {
        self.ensure_existing(cmd.ingredient_id)?;
        ensure_positive(cmd.amount)?;
        if self.quantity.checked_add(cmd.amount).is_none() {
            return Err(DomainError::validation("restock would overflow the stored quantity").into());
        }

        Ok(vec![IngredientEvent::StockRestocked(StockRestocked {
            ingredient_id: cmd.ingredient_id,
            amount: cmd.amount,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_events::execute;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn registered(quantity: i64, threshold: i64) -> IngredientStock {
        let id = IngredientId::generate();
        let mut row = IngredientStock::empty(id);
        let cmd = RegisterIngredient {
            ingredient_id: id,
            name: "Tomato".to_string(),
            category: IngredientCategory::Vegetables,
            quantity: d(quantity),
            unit: "kg".to_string(),
            reorder_threshold: d(threshold),
            supplier: Some("Green Farms".to_string()),
            cost_per_unit: Some(Decimal::new(250, 2)),
            occurred_at: test_time(),
        };
        execute(&mut row, &IngredientCommand::Register(cmd)).unwrap();
        row
    }

    fn deduct(row: &mut IngredientStock, amount: i64) -> Result<Vec<IngredientEvent>, StockError> {
        let cmd = DeductStock {
            ingredient_id: row.id_typed(),
            amount: d(amount),
            occurred_at: test_time(),
        };
        execute(row, &IngredientCommand::Deduct(cmd))
    }

    fn restock(row: &mut IngredientStock, amount: i64) -> Result<Vec<IngredientEvent>, StockError> {
        let cmd = RestockIngredient {
            ingredient_id: row.id_typed(),
            amount: d(amount),
            occurred_at: test_time(),
        };
        execute(row, &IngredientCommand::Restock(cmd))
    }

    #[test]
    fn register_derives_status_and_stamps_restock_time() {
        let row = registered(10, 5);
        assert!(row.is_registered());
        assert_eq!(row.status(), StockStatus::InStock);
        assert!(row.last_restocked_at().is_some());
        assert_eq!(row.version(), 1);
    }

    #[test]
    fn register_rejects_blank_name() {
        let id = IngredientId::generate();
        let row = IngredientStock::empty(id);
        let cmd = RegisterIngredient {
            ingredient_id: id,
            name: "   ".to_string(),
            category: IngredientCategory::Other,
            quantity: d(1),
            unit: "kg".to_string(),
            reorder_threshold: d(0),
            supplier: None,
            cost_per_unit: None,
            occurred_at: test_time(),
        };
        let err = row.handle(&IngredientCommand::Register(cmd)).unwrap_err();
        assert!(matches!(err, StockError::Domain(DomainError::Validation(_))));
    }

    #[test]
    fn register_rejects_negative_quantity() {
        let id = IngredientId::generate();
        let row = IngredientStock::empty(id);
        let cmd = RegisterIngredient {
            ingredient_id: id,
            name: "Milk".to_string(),
            category: IngredientCategory::Dairy,
            quantity: d(-1),
            unit: "l".to_string(),
            reorder_threshold: d(2),
            supplier: None,
            cost_per_unit: None,
            occurred_at: test_time(),
        };
        let err = row.handle(&IngredientCommand::Register(cmd)).unwrap_err();
        match err {
            StockError::Domain(DomainError::Validation(msg)) if msg.contains("quantity") => {}
            other => panic!("expected quantity validation error, got {other:?}"),
        }
    }

    #[test]
    fn register_twice_conflicts() {
        let row = registered(1, 1);
        let cmd = RegisterIngredient {
            ingredient_id: row.id_typed(),
            name: "Again".to_string(),
            category: IngredientCategory::Other,
            quantity: d(1),
            unit: "pcs".to_string(),
            reorder_threshold: d(0),
            supplier: None,
            cost_per_unit: None,
            occurred_at: test_time(),
        };
        let err = row.handle(&IngredientCommand::Register(cmd)).unwrap_err();
        assert!(matches!(err, StockError::Domain(DomainError::Conflict(_))));
    }

    #[test]
    fn deduct_to_in_stock_then_low_stock() {
        let mut row = registered(10, 5);

        deduct(&mut row, 3).unwrap();
        assert_eq!(row.quantity(), d(7));
        assert_eq!(row.status(), StockStatus::InStock);

        deduct(&mut row, 3).unwrap();
        assert_eq!(row.quantity(), d(4));
        assert_eq!(row.status(), StockStatus::LowStock);
    }

    #[test]
    fn deduct_more_than_available_reports_shortfall_and_keeps_quantity() {
        let mut row = registered(4, 5);
        let err = deduct(&mut row, 5).unwrap_err();
        match err {
            StockError::Insufficient(s) => {
                assert_eq!(s.available, d(4));
                assert_eq!(s.required, d(5));
                assert_eq!(s.missing(), d(1));
            }
            other => panic!("expected shortfall, got {other:?}"),
        }
        assert_eq!(row.quantity(), d(4));
        assert_eq!(row.version(), 1);
    }

    #[test]
    fn deduct_to_zero_then_restock() {
        let mut row = registered(4, 5);
        let before = row.last_restocked_at();

        deduct(&mut row, 4).unwrap();
        assert_eq!(row.quantity(), Decimal::ZERO);
        assert_eq!(row.status(), StockStatus::OutOfStock);

        restock(&mut row, 5).unwrap();
        assert_eq!(row.quantity(), d(5));
        assert_eq!(row.status(), StockStatus::LowStock);
        assert!(row.last_restocked_at() >= before);
    }

    #[test]
    fn restock_past_decimal_range_is_rejected_without_events() {
        let mut row = registered(4, 5);
        let cmd = RestockIngredient {
            ingredient_id: row.id_typed(),
            amount: Decimal::MAX,
            occurred_at: test_time(),
        };
        let err = execute(&mut row, &IngredientCommand::Restock(cmd)).unwrap_err();
        assert!(matches!(err, StockError::Domain(DomainError::Validation(_))));
        assert_eq!(row.quantity(), d(4));
        assert_eq!(row.version(), 1);
    }

    #[test]
    fn name_unit_and_supplier_lengths_are_bounded() {
        let id = IngredientId::generate();
        let row = IngredientStock::empty(id);
        let base = RegisterIngredient {
            ingredient_id: id,
            name: "n".repeat(MAX_NAME_CHARS),
            category: IngredientCategory::Spices,
            quantity: d(1),
            unit: "u".repeat(MAX_UNIT_CHARS),
            reorder_threshold: d(0),
            supplier: Some("s".repeat(MAX_SUPPLIER_CHARS)),
            cost_per_unit: None,
            occurred_at: test_time(),
        };
        assert!(row.handle(&IngredientCommand::Register(base.clone())).is_ok());

        let too_long = [
            RegisterIngredient { name: "n".repeat(MAX_NAME_CHARS + 1), ..base.clone() },
            RegisterIngredient { unit: "u".repeat(MAX_UNIT_CHARS + 1), ..base.clone() },
            RegisterIngredient { supplier: Some("s".repeat(MAX_SUPPLIER_CHARS + 1)), ..base.clone() },
        ];
        for cmd in too_long {
            let err = row.handle(&IngredientCommand::Register(cmd)).unwrap_err();
            assert!(matches!(err, StockError::Domain(DomainError::Validation(_))));
        }
    }

    #[test]
    fn length_limits_count_characters_not_bytes() {
        let id = IngredientId::generate();
        let row = IngredientStock::empty(id);
        let cmd = RegisterIngredient {
            ingredient_id: id,
            name: "é".repeat(MAX_NAME_CHARS),
            category: IngredientCategory::Dessert,
            quantity: d(1),
            unit: "kg".to_string(),
            reorder_threshold: d(0),
            supplier: None,
            cost_per_unit: None,
            occurred_at: test_time(),
        };
        assert!(row.handle(&IngredientCommand::Register(cmd)).is_ok());
    }

    #[test]
    fn deduct_rejects_non_positive_amount() {
        let mut row = registered(4, 5);
        let err = deduct(&mut row, 0).unwrap_err();
        assert!(matches!(err, StockError::Domain(DomainError::Validation(_))));
    }

    #[test]
    fn deduct_on_unregistered_row_is_not_found() {
        let mut row = IngredientStock::empty(IngredientId::generate());
        let err = deduct(&mut row, 1).unwrap_err();
        assert_eq!(err, StockError::Domain(DomainError::NotFound));
    }

    #[test]
    fn threshold_change_recomputes_status() {
        let mut row = registered(8, 5);
        assert_eq!(row.status(), StockStatus::InStock);

        let cmd = UpdateIngredientDetails {
            ingredient_id: row.id_typed(),
            name: row.name().to_string(),
            category: row.category(),
            unit: row.unit().to_string(),
            reorder_threshold: d(10),
            supplier: None,
            cost_per_unit: None,
            occurred_at: test_time(),
        };
        execute(&mut row, &IngredientCommand::UpdateDetails(cmd)).unwrap();
        assert_eq!(row.status(), StockStatus::LowStock);
        assert_eq!(row.quantity(), d(8));
    }

    #[test]
    fn restore_ignores_stored_status() {
        let row = registered(10, 5);
        let mut snapshot = row.snapshot();
        snapshot.status = StockStatus::OutOfStock;

        let restored = IngredientStock::restore(snapshot);
        assert_eq!(restored.status(), StockStatus::InStock);
        assert_eq!(restored.version(), row.version());
        assert_eq!(restored, row);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let row = registered(10, 5);
        let before = row.clone();
        let cmd = IngredientCommand::Deduct(DeductStock {
            ingredient_id: row.id_typed(),
            amount: d(2),
            occurred_at: test_time(),
        });
        let e1 = row.handle(&cmd).unwrap();
        let e2 = row.handle(&cmd).unwrap();
        assert_eq!(row, before);
        assert_eq!(e1, e2);
    }

    #[test]
    fn event_types_are_namespaced() {
        let mut row = registered(10, 5);
        let events = deduct(&mut row, 1).unwrap();
        assert_eq!(events[0].event_type(), "inventory.ingredient.stock_deducted");
        assert_eq!(events[0].ingredient_id(), row.id_typed());
    }
}
