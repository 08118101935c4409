//! Pure domain types: value objects, the Account aggregate, ledger entries
//! and domain events.

pub mod account;
pub mod event;
pub mod money;
pub mod transaction;

pub use account::{
    Account, AccountId, AccountNumber, AccountPolicy, AccountType, CustomerId, WithdrawalPolicy,
    WithdrawalWindow,
};
pub use event::{DomainEvent, OutboxMessage};
pub use money::{Currency, Money};
pub use transaction::{Transaction, TransactionId, TransactionKind};
