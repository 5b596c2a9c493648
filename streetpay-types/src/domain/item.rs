//! Item catalog domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::money::Money;
use crate::error::DomainError;

/// Unique identifier for an Item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A sellable item (e.g. one issue of the street paper).
///
/// A zero-priced item is a free-amount line: order entries referencing it
/// carry their amount in the quantity field (in cents). Tips work this way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    /// Unit price; zero for free-amount items
    pub price: Money,
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Creates a new catalog item.
    pub fn new(name: String, price: Money) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Item name cannot be empty".into(),
            ));
        }

        Ok(Self {
            id: ItemId::new(),
            name,
            price,
            created_at: Utc::now(),
        })
    }

    /// Creates an item with all fields specified (for database reconstruction).
    pub fn from_parts(id: ItemId, name: String, price: Money, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            price,
            created_at,
        }
    }

    /// Returns true if order entries for this item carry their own amount.
    pub fn is_free_amount(&self) -> bool {
        self.price.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Currency;

    #[test]
    fn test_item_creation() {
        let price = Money::new(350, Currency::EUR).unwrap();
        let item = Item::new("Paper".to_string(), price).unwrap();
        assert_eq!(item.price.amount(), 350);
        assert!(!item.is_free_amount());
    }

    #[test]
    fn test_tip_item_is_free_amount() {
        let item = Item::new("Tip".to_string(), Money::zero(Currency::EUR)).unwrap();
        assert!(item.is_free_amount());
    }
}
