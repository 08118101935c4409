//! # Ledger Types
//!
//! Domain types and port traits for the core banking ledger.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, Account, Transaction, events)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto` - Data Transfer Objects for the service boundary
//! - `error` - Domain, repository and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    Account, AccountId, AccountNumber, AccountPolicy, AccountType, Currency, CustomerId,
    DomainEvent, Money, OutboxMessage, Transaction, TransactionId, TransactionKind,
    WithdrawalPolicy, WithdrawalWindow,
};
pub use dto::*;
pub use error::{AppError, DomainError, RepoError};
pub use ports::{
    BalanceHistory, ChannelError, Clock, EventSender, LedgerRepository, SystemClock,
};
