//! Domain models for the settlement engine.

pub mod account;
pub mod api_key;
pub mod item;
pub mod money;
pub mod order;
pub mod payment;

pub use account::{Account, AccountId};
pub use api_key::{ApiKey, ApiKeyId};
pub use item::{Item, ItemId};
pub use money::{Currency, Money};
pub use order::{OrderCode, OrderId, OrderLine, PendingOrder};
pub use payment::{PaymentBatch, PaymentEntry, PaymentId, PaymentType, SettleOutcome};
