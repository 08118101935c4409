//! Database row structs and conversions to domain types.
//!
//! SQLite stores UUIDs and timestamps as TEXT (RFC 3339), so every row
//! struct carries strings that get parsed on the way back into the domain.

use sqlx::FromRow;

use ledger_types::{
    Account, AccountId, AccountNumber, AccountType, Currency, CustomerId, Money, OutboxMessage,
    RepoError, Transaction, TransactionId, TransactionKind,
};

// ─────────────────────────────────────────────────────────────────────────────
// Row structs
// ─────────────────────────────────────────────────────────────────────────────

/// Account row from database.
#[derive(FromRow)]
pub struct DbAccount {
    pub id: String,
    pub account_number: String,
    pub account_type: String,
    pub customer_id: String,
    pub balance: i64,
    pub currency: String,
    pub active: i64,
    pub deleted: i64,
    pub deleted_at: Option<String>,
    pub deleted_by: Option<String>,
    pub delete_reason: Option<String>,
    pub version: i64,
    pub created_at: String,
}

/// Transaction row from database.
#[derive(FromRow)]
pub struct DbTransaction {
    pub id: String,
    pub account_id: String,
    pub kind: String,
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub reference: Option<String>,
    pub created_at: String,
}

/// Outbox row from database.
#[derive(FromRow)]
pub struct DbOutboxMessage {
    pub id: String,
    pub event_type: String,
    pub payload: String,
    pub occurred_at: String,
    pub processed_at: Option<String>,
    pub attempts: i32,
    pub last_error: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_uuid(s: &str) -> Result<uuid::Uuid, RepoError> {
    uuid::Uuid::parse_str(s).map_err(|e| RepoError::Database(e.to_string()))
}

pub fn parse_datetime(s: &str) -> Result<chrono::DateTime<chrono::Utc>, RepoError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| RepoError::Database(e.to_string()))
}

pub fn parse_currency(s: &str) -> Result<Currency, RepoError> {
    match s {
        "NGN" => Ok(Currency::NGN),
        "USD" => Ok(Currency::USD),
        "GBP" => Ok(Currency::GBP),
        _ => Err(RepoError::Database(format!("Unknown currency: {}", s))),
    }
}

pub fn parse_account_type(s: &str) -> Result<AccountType, RepoError> {
    match s {
        "CHECKING" => Ok(AccountType::Checking),
        "SAVINGS" => Ok(AccountType::Savings),
        "FIXED_DEPOSIT" => Ok(AccountType::FixedDeposit),
        _ => Err(RepoError::Database(format!("Unknown account type: {}", s))),
    }
}

pub fn parse_transaction_kind(s: &str) -> Result<TransactionKind, RepoError> {
    match s {
        "DEPOSIT" => Ok(TransactionKind::Deposit),
        "WITHDRAWAL" => Ok(TransactionKind::Withdrawal),
        "TRANSFER_IN" => Ok(TransactionKind::TransferIn),
        "TRANSFER_OUT" => Ok(TransactionKind::TransferOut),
        "INTEREST_CREDIT" => Ok(TransactionKind::InterestCredit),
        _ => Err(RepoError::Database(format!(
            "Unknown transaction kind: {}",
            s
        ))),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion
// ─────────────────────────────────────────────────────────────────────────────

impl DbAccount {
    /// Rehydrates the aggregate with its owned transaction list.
    pub fn into_domain(self, transactions: Vec<Transaction>) -> Result<Account, RepoError> {
        let currency = parse_currency(&self.currency)?;
        let balance = Money::new(self.balance, currency).map_err(RepoError::Domain)?;
        let account_number =
            AccountNumber::new(self.account_number).map_err(RepoError::Domain)?;
        let deleted_at = self.deleted_at.as_deref().map(parse_datetime).transpose()?;

        Ok(Account::from_storage(
            AccountId::from_uuid(parse_uuid(&self.id)?),
            account_number,
            parse_account_type(&self.account_type)?,
            balance,
            CustomerId::from_uuid(parse_uuid(&self.customer_id)?),
            self.active != 0,
            self.deleted != 0,
            deleted_at,
            self.deleted_by,
            self.delete_reason,
            self.version,
            parse_datetime(&self.created_at)?,
            transactions,
        ))
    }
}

impl DbTransaction {
    /// Converts a database row to a domain Transaction.
    pub fn into_domain(self) -> Result<Transaction, RepoError> {
        let currency = parse_currency(&self.currency)?;
        let amount = Money::new(self.amount, currency).map_err(RepoError::Domain)?;

        Ok(Transaction::from_parts(
            TransactionId::from_uuid(parse_uuid(&self.id)?),
            AccountId::from_uuid(parse_uuid(&self.account_id)?),
            parse_transaction_kind(&self.kind)?,
            amount,
            self.description,
            self.reference,
            parse_datetime(&self.created_at)?,
        ))
    }
}

impl DbOutboxMessage {
    /// Converts a database row to a domain OutboxMessage.
    pub fn into_domain(self) -> Result<OutboxMessage, RepoError> {
        let payload: serde_json::Value = serde_json::from_str(&self.payload)
            .map_err(|e| RepoError::Database(e.to_string()))?;
        let processed_at = self
            .processed_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?;

        Ok(OutboxMessage {
            id: parse_uuid(&self.id)?,
            event_type: self.event_type,
            payload,
            occurred_at: parse_datetime(&self.occurred_at)?,
            processed_at,
            attempts: self.attempts,
            last_error: self.last_error,
        })
    }
}
