//! Transaction domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::AccountId;
use super::money::Money;

/// Unique identifier for a Transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Creates a new random TransactionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a TransactionId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The kind of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Money coming into an account from outside the ledger
    Deposit,
    /// Money leaving an account to outside the ledger
    Withdrawal,
    /// Incoming leg of an internal transfer
    TransferIn,
    /// Outgoing leg of an internal transfer
    TransferOut,
    /// Interest posted by the batch engine
    InterestCredit,
}

impl TransactionKind {
    /// Returns true for kinds that decrease the balance.
    pub fn is_debit(&self) -> bool {
        matches!(
            self,
            TransactionKind::Withdrawal | TransactionKind::TransferOut
        )
    }

    /// Returns true for kinds that increase the balance.
    pub fn is_credit(&self) -> bool {
        !self.is_debit()
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Deposit => write!(f, "DEPOSIT"),
            TransactionKind::Withdrawal => write!(f, "WITHDRAWAL"),
            TransactionKind::TransferIn => write!(f, "TRANSFER_IN"),
            TransactionKind::TransferOut => write!(f, "TRANSFER_OUT"),
            TransactionKind::InterestCredit => write!(f, "INTEREST_CREDIT"),
        }
    }
}

/// A recorded ledger entry.
///
/// Transactions are immutable once created - they represent
/// a historical record of what happened to an account's balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier
    pub id: TransactionId,
    /// Account whose balance this entry touched
    pub account_id: AccountId,
    /// Kind of entry
    pub kind: TransactionKind,
    /// Amount moved
    pub amount: Money,
    /// Human-readable description
    pub description: String,
    /// External reference (e.g., invoice number)
    pub reference: Option<String>,
    /// When the entry was created
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Creates a new ledger entry.
    pub fn new(
        account_id: AccountId,
        kind: TransactionKind,
        amount: Money,
        description: &str,
        reference: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            account_id,
            kind,
            amount,
            description: description.to_string(),
            reference,
            created_at,
        }
    }

    /// Reconstructs a transaction from database fields.
    pub fn from_parts(
        id: TransactionId,
        account_id: AccountId,
        kind: TransactionKind,
        amount: Money,
        description: String,
        reference: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            account_id,
            kind,
            amount,
            description,
            reference,
            created_at,
        }
    }
}
