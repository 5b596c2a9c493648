//! Payment ledger domain model.
//!
//! Payment entries are created only as part of a settlement batch and are
//! immutable thereafter. Corrections are new offsetting entries, never edits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::account::AccountId;
use super::item::ItemId;
use super::money::Money;
use super::order::{OrderCode, PendingOrder};
use crate::error::DomainError;

/// Unique identifier for a PaymentEntry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct PaymentId(Uuid);

impl PaymentId {
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

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of a payment entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    /// Buyer pays the vendor for an item
    Purchase,
    /// Buyer pays the organization
    Fee,
    /// Buyer tips the vendor
    Tip,
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentType::Purchase => write!(f, "PURCHASE"),
            PaymentType::Fee => write!(f, "FEE"),
            PaymentType::Tip => write!(f, "TIP"),
        }
    }
}

/// One immutable row of the payment ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEntry {
    pub id: PaymentId,
    /// Order this entry settles; manual corrections carry no order code
    pub order_code: Option<OrderCode>,
    /// Paying account; None for anonymous buyers
    pub sender: Option<AccountId>,
    /// Receiving account
    pub receiver: AccountId,
    pub entry_type: PaymentType,
    pub amount: Money,
    /// Item the entry pays for, if any
    pub item: Option<ItemId>,
    /// Who authorized the entry (PSP transaction id, or "manual")
    pub authorized_by: String,
    pub created_at: DateTime<Utc>,
}

impl PaymentEntry {
    /// Creates a new ledger entry.
    pub fn new(
        order_code: Option<OrderCode>,
        sender: Option<AccountId>,
        receiver: AccountId,
        entry_type: PaymentType,
        amount: Money,
        item: Option<ItemId>,
        authorized_by: String,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            order_code,
            sender,
            receiver,
            entry_type,
            amount,
            item,
            authorized_by,
            created_at: Utc::now(),
        }
    }

    /// Reconstructs an entry from database fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: PaymentId,
        order_code: Option<OrderCode>,
        sender: Option<AccountId>,
        receiver: AccountId,
        entry_type: PaymentType,
        amount: Money,
        item: Option<ItemId>,
        authorized_by: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_code,
            sender,
            receiver,
            entry_type,
            amount,
            item,
            authorized_by,
            created_at,
        }
    }
}

/// An ordered set of payment entries sharing one order code, written as a
/// single durable unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentBatch {
    pub order_code: OrderCode,
    pub entries: Vec<PaymentEntry>,
}

impl PaymentBatch {
    /// Computes the settlement batch for a verified order.
    ///
    /// One entry per order line (sender = buyer or None, receiver =
    /// vendor; free-amount lines become tips). The batch total must equal
    /// the PSP-confirmed amount or the computation fails closed.
    pub fn compute(
        order: &PendingOrder,
        confirmed: Money,
        authorized_by: &str,
    ) -> Result<Self, DomainError> {
        let mut entries = Vec::with_capacity(order.entries.len());
        let mut total = Money::zero(confirmed.currency());

        for line in &order.entries {
            let amount = line.amount()?;
            total = total.checked_add(amount)?;

            let entry_type = if line.is_free_amount() {
                PaymentType::Tip
            } else {
                PaymentType::Purchase
            };

            entries.push(PaymentEntry::new(
                Some(order.order_code),
                order.buyer,
                order.vendor,
                entry_type,
                amount,
                Some(line.item),
                authorized_by.to_string(),
            ));
        }

        if total != confirmed {
            return Err(DomainError::AmountMismatch {
                confirmed: confirmed.amount(),
                computed: total.amount(),
            });
        }

        Ok(Self {
            order_code: order.order_code,
            entries,
        })
    }

    /// Returns the batch total.
    pub fn total(&self) -> Result<Money, DomainError> {
        let mut sum = Money::zero(
            self.entries
                .first()
                .map(|e| e.amount.currency())
                .unwrap_or(crate::domain::Currency::EUR),
        );
        for entry in &self.entries {
            sum = sum.checked_add(entry.amount)?;
        }
        Ok(sum)
    }
}

/// Result of an atomic settlement write.
#[derive(Debug, Clone)]
pub enum SettleOutcome {
    /// The batch was written by this call.
    Settled(PaymentBatch),
    /// A batch already existed for the order code; nothing was written.
    AlreadySettled(PaymentBatch),
}

impl SettleOutcome {
    /// Returns the batch regardless of which side wrote it.
    pub fn into_batch(self) -> PaymentBatch {
        match self {
            SettleOutcome::Settled(batch) | SettleOutcome::AlreadySettled(batch) => batch,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, SettleOutcome::AlreadySettled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Currency, OrderLine};

    fn order_with_lines(lines: Vec<(i64, i64)>) -> PendingOrder {
        let entries = lines
            .into_iter()
            .map(|(price, quantity)| OrderLine {
                item: ItemId::new(),
                quantity,
                unit_price: Money::new(price, Currency::EUR).unwrap(),
            })
            .collect();
        PendingOrder::new(OrderCode::new(42), AccountId::new(), None, entries).unwrap()
    }

    #[test]
    fn test_compute_matches_confirmed_amount() {
        let order = order_with_lines(vec![(350, 1)]);
        let confirmed = Money::new(350, Currency::EUR).unwrap();

        let batch = PaymentBatch::compute(&order, confirmed, "tx-1").unwrap();

        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].entry_type, PaymentType::Purchase);
        assert_eq!(batch.entries[0].receiver, order.vendor);
        assert_eq!(batch.total().unwrap().amount(), 350);
    }

    #[test]
    fn test_compute_fails_closed_on_mismatch() {
        let order = order_with_lines(vec![(350, 1)]);
        let confirmed = Money::new(300, Currency::EUR).unwrap();

        let result = PaymentBatch::compute(&order, confirmed, "tx-1");

        assert!(matches!(
            result,
            Err(DomainError::AmountMismatch {
                confirmed: 300,
                computed: 350
            })
        ));
    }

    #[test]
    fn test_free_amount_line_becomes_tip() {
        let order = order_with_lines(vec![(350, 1), (0, 150)]);
        let confirmed = Money::new(500, Currency::EUR).unwrap();

        let batch = PaymentBatch::compute(&order, confirmed, "tx-2").unwrap();

        assert_eq!(batch.entries.len(), 2);
        assert_eq!(batch.entries[1].entry_type, PaymentType::Tip);
        assert_eq!(batch.entries[1].amount.amount(), 150);
    }

    #[test]
    fn test_anonymous_order_has_no_sender() {
        let order = order_with_lines(vec![(350, 1)]);
        let confirmed = Money::new(350, Currency::EUR).unwrap();

        let batch = PaymentBatch::compute(&order, confirmed, "tx-3").unwrap();

        assert!(batch.entries[0].sender.is_none());
    }
}
