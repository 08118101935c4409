//! Data Transfer Objects for service requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Account, AccountId, AccountNumber, AccountType, Currency, CustomerId, TransactionId,
};

// ─────────────────────────────────────────────────────────────────────────────
// Account DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to open a new account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAccountRequest {
    pub customer_id: CustomerId,
    pub account_type: AccountType,
    /// Opening deposit in smallest currency unit
    pub initial_deposit: i64,
    pub currency: Currency,
}

/// Response after opening (or fetching) an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: AccountId,
    pub account_number: AccountNumber,
    pub account_type: AccountType,
    /// Current balance in smallest currency unit
    pub balance: i64,
    pub currency: Currency,
    pub active: bool,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id(),
            account_number: account.account_number().clone(),
            account_type: account.account_type(),
            balance: account.balance().amount(),
            currency: account.balance().currency(),
            active: account.is_active(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transaction DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to deposit money into an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRequest {
    pub account_number: AccountNumber,
    /// Amount in smallest currency unit
    pub amount: i64,
    pub currency: Currency,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Request to withdraw money from an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub account_number: AccountNumber,
    /// Amount in smallest currency unit
    pub amount: i64,
    pub currency: Currency,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Request to transfer money between two accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub source_account_number: AccountNumber,
    pub destination_account_number: AccountNumber,
    /// Amount in smallest currency unit
    pub amount: i64,
    pub currency: Currency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub description: String,
}

/// Response after a successful transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResponse {
    /// Id of the outgoing (source-side) ledger entry
    pub transaction_id: TransactionId,
    pub source_account_number: AccountNumber,
    pub destination_account_number: AccountNumber,
    pub amount: i64,
    pub currency: Currency,
    pub source_balance: i64,
    pub destination_balance: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// History DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Date-range + page query for transaction history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
    /// 1-based page index
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    50
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl HistoryQuery {
    /// Row offset for the requested page.
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
}
