//! Pending order domain model.
//!
//! A pending order is the retained context of a checkout order between
//! creation and settlement. It is keyed by the PSP-issued order code and
//! leaves no ledger trace if the buyer abandons checkout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::account::AccountId;
use super::item::ItemId;
use super::money::Money;
use crate::error::DomainError;

/// PSP-issued identifier correlating order creation with later verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct OrderCode(i64);

impl OrderCode {
    pub fn new(code: i64) -> Self {
        Self(code)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for OrderCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for OrderCode {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Unique identifier for a pending order row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
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

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One priced line of a pending order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub item: ItemId,
    pub quantity: i64,
    /// Unit price captured at order time; zero for free-amount lines
    pub unit_price: Money,
}

impl OrderLine {
    /// Returns the line total.
    ///
    /// Free-amount lines (zero unit price) carry their amount in the
    /// quantity field, in cents.
    pub fn amount(&self) -> Result<Money, DomainError> {
        if self.unit_price.is_zero() {
            Money::new(self.quantity, self.unit_price.currency())
        } else {
            self.unit_price.checked_mul(self.quantity)
        }
    }

    /// Returns true if this line is a free-amount (tip) line.
    pub fn is_free_amount(&self) -> bool {
        self.unit_price.is_zero()
    }
}

/// A checkout order awaiting verification and settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOrder {
    pub id: OrderId,
    /// PSP-issued correlation key, unique per order
    pub order_code: OrderCode,
    /// Vendor account receiving the purchase
    pub vendor: AccountId,
    /// Buyer account; None for anonymous orders
    pub buyer: Option<AccountId>,
    /// Total authorized amount
    pub amount: Money,
    pub entries: Vec<OrderLine>,
    /// True once a payment batch has been written for this order
    pub settled: bool,
    /// PSP transaction id, set at settlement
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PendingOrder {
    /// Creates a new pending order from priced lines.
    ///
    /// # Validation
    /// - At least one entry
    /// - Every quantity positive
    /// - Total amount positive
    pub fn new(
        order_code: OrderCode,
        vendor: AccountId,
        buyer: Option<AccountId>,
        entries: Vec<OrderLine>,
    ) -> Result<Self, DomainError> {
        if entries.is_empty() {
            return Err(DomainError::EmptyOrder);
        }

        let mut total: Option<Money> = None;
        for line in &entries {
            if line.quantity <= 0 {
                return Err(DomainError::ValidationError(
                    "Order entry quantity must be positive".into(),
                ));
            }
            let line_amount = line.amount()?;
            total = Some(match total {
                Some(sum) => sum.checked_add(line_amount)?,
                None => line_amount,
            });
        }

        let amount = total.expect("entries checked non-empty");
        if amount.is_zero() {
            return Err(DomainError::ValidationError(
                "Order amount must be positive".into(),
            ));
        }

        Ok(Self {
            id: OrderId::new(),
            order_code,
            vendor,
            buyer,
            amount,
            entries,
            settled: false,
            transaction_id: None,
            created_at: Utc::now(),
        })
    }

    /// Reconstructs a pending order from database fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: OrderId,
        order_code: OrderCode,
        vendor: AccountId,
        buyer: Option<AccountId>,
        amount: Money,
        entries: Vec<OrderLine>,
        settled: bool,
        transaction_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_code,
            vendor,
            buyer,
            amount,
            entries,
            settled,
            transaction_id,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Currency;

    fn line(price: i64, quantity: i64) -> OrderLine {
        OrderLine {
            item: ItemId::new(),
            quantity,
            unit_price: Money::new(price, Currency::EUR).unwrap(),
        }
    }

    #[test]
    fn test_order_total_from_priced_lines() {
        let order = PendingOrder::new(
            OrderCode::new(1234567890),
            AccountId::new(),
            None,
            vec![line(350, 2), line(100, 1)],
        )
        .unwrap();

        assert_eq!(order.amount.amount(), 800);
        assert!(!order.settled);
    }

    #[test]
    fn test_free_amount_line_uses_quantity_as_cents() {
        let order = PendingOrder::new(
            OrderCode::new(1),
            AccountId::new(),
            None,
            vec![line(350, 1), line(0, 150)],
        )
        .unwrap();

        assert_eq!(order.amount.amount(), 500);
    }

    #[test]
    fn test_empty_order_fails() {
        let result = PendingOrder::new(OrderCode::new(1), AccountId::new(), None, vec![]);
        assert!(matches!(result, Err(DomainError::EmptyOrder)));
    }

    #[test]
    fn test_non_positive_quantity_fails() {
        let result =
            PendingOrder::new(OrderCode::new(1), AccountId::new(), None, vec![line(350, 0)]);
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[test]
    fn test_order_code_parse() {
        let code: OrderCode = "9876543210".parse().unwrap();
        assert_eq!(code.value(), 9876543210);
    }
}
