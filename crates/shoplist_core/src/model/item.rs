//! Item domain model.
//!
//! # Responsibility
//! - Define the single shopping-list record and its defaults.
//! - Provide validation shared by every write path.
//!
//! # Invariants
//! - `id == 0` means "not yet persisted"; the store assigns real ids.
//! - An assigned `id` is never reused for another item.
//! - `name` is never blank and `quantity` is never negative.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned row identifier.
pub type ItemId = i64;

/// Validation errors for item invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    /// `name` is empty or whitespace-only.
    EmptyName,
    /// `quantity` is below zero.
    NegativeQuantity(i64),
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "item name cannot be empty"),
            Self::NegativeQuantity(value) => {
                write!(f, "item quantity cannot be negative, got {value}")
            }
        }
    }
}

impl Error for ItemValidationError {}

/// One entry on the shopping list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Row id; `0` until the store assigns one on insert.
    #[serde(default)]
    pub id: ItemId,
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub purchased: bool,
}

impl Item {
    /// Placeholder id carried by items that were never persisted.
    pub const UNASSIGNED_ID: ItemId = 0;

    /// Default quantity for newly added items.
    pub const DEFAULT_QUANTITY: i64 = 1;

    /// Creates a transient item with quantity 1 and `purchased = false`.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_quantity(name, Self::DEFAULT_QUANTITY)
    }

    /// Creates a transient item with an explicit quantity.
    pub fn with_quantity(name: impl Into<String>, quantity: i64) -> Self {
        Self {
            id: Self::UNASSIGNED_ID,
            name: name.into(),
            quantity,
            purchased: false,
        }
    }

    /// Returns whether the store has assigned an id to this item.
    pub fn is_persisted(&self) -> bool {
        self.id != Self::UNASSIGNED_ID
    }

    /// Validates field invariants before persistence.
    ///
    /// # Errors
    /// - `EmptyName` when `name` is blank after trimming.
    /// - `NegativeQuantity` when `quantity < 0`.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if self.name.trim().is_empty() {
            return Err(ItemValidationError::EmptyName);
        }
        if self.quantity < 0 {
            return Err(ItemValidationError::NegativeQuantity(self.quantity));
        }
        Ok(())
    }
}

fn default_quantity() -> i64 {
    Item::DEFAULT_QUANTITY
}
