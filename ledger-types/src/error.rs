//! Error types for the ledger service.

use crate::domain::{AccountId, Currency};

/// Domain-level errors (validation failures and business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Amount cannot be negative")]
    NegativeAmount,

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: Currency, got: Currency },

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("Invalid account number: {0:?}")]
    InvalidAccountNumber(String),

    #[error("Initial deposit {requested} outside allowed range 0..={cap}")]
    InitialDepositOutOfRange { requested: i64, cap: i64 },

    #[error("Account {0} is inactive or deleted")]
    AccountInactive(AccountId),

    #[error("Cannot transfer to the same account")]
    SameAccountTransfer,

    #[error("Withdrawal limit of {limit} reached for savings account")]
    WithdrawalLimitReached { limit: u32 },

    #[error("Account balance must be zero to close, found {balance}")]
    BalanceNotZero { balance: i64 },
}

impl DomainError {
    /// Malformed input, rejected before any mutation; never retried.
    /// Everything else is a business rule violation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DomainError::NegativeAmount
                | DomainError::InvalidAmount
                | DomainError::CurrencyMismatch { .. }
                | DomainError::InvalidAccountNumber(_)
                | DomainError::InitialDepositOutOfRange { .. }
        )
    }
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Concurrency conflict on account {0}")]
    Concurrency(AccountId),
}

/// Application-level errors surfaced to callers of the service layer.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        if err.is_validation() {
            AppError::Validation(err.to_string())
        } else {
            AppError::BusinessRule(err.to_string())
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => e.into(),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Concurrency(id) => AppError::Conflict(format!(
                "Stale version for account {id}; re-fetch and retry the operation"
            )),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Transaction(e) => AppError::Internal(e),
        }
    }
}
