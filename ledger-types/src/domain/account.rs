//! Account aggregate and its identifier value objects.
//!
//! The aggregate owns its transaction list and buffers the domain events its
//! own mutations produce. The persistence adapter writes balance, new
//! transaction rows and one outbox row per buffered event in a single storage
//! transaction, then calls [`Account::mark_committed`] to drain the buffers.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::DomainEvent;
use super::money::Money;
use super::transaction::{Transaction, TransactionKind};
use crate::error::DomainError;

/// Unique identifier for an Account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Creates a new random AccountId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an AccountId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Unique identifier for a Customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(Uuid);

impl CustomerId {
    /// Creates a new random CustomerId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a CustomerId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CustomerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CustomerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A validated 10-digit account number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Validates and wraps a 10-digit ASCII string.
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.len() == 10 && value.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(value))
        } else {
            Err(DomainError::InvalidAccountNumber(value))
        }
    }

    /// Derives a fresh account number from a random UUID.
    pub fn generate() -> Self {
        let digits = Uuid::new_v4().as_u128() % 10_000_000_000;
        Self(format!("{:010}", digits))
    }

    /// Returns the digits as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountNumber> for String {
    fn from(value: AccountNumber) -> Self {
        value.0
    }
}

impl std::fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AccountNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Account product type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Checking,
    Savings,
    FixedDeposit,
}

impl AccountType {
    /// Returns true for types that accrue interest.
    pub fn bears_interest(&self) -> bool {
        matches!(self, AccountType::Savings | AccountType::FixedDeposit)
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountType::Checking => write!(f, "CHECKING"),
            AccountType::Savings => write!(f, "SAVINGS"),
            AccountType::FixedDeposit => write!(f, "FIXED_DEPOSIT"),
        }
    }
}

/// Counting window for the savings withdrawal cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawalWindow {
    /// Count every withdrawal over the account's lifetime.
    Lifetime,
    /// Count withdrawals within the last `n` days.
    Days(u32),
}

/// Savings withdrawal cap configuration.
#[derive(Debug, Clone, Copy)]
pub struct WithdrawalPolicy {
    pub max_withdrawals: u32,
    pub window: WithdrawalWindow,
}

impl Default for WithdrawalPolicy {
    fn default() -> Self {
        Self {
            max_withdrawals: 6,
            window: WithdrawalWindow::Lifetime,
        }
    }
}

/// Account-level business policy knobs.
#[derive(Debug, Clone, Copy)]
pub struct AccountPolicy {
    /// Upper bound on the opening deposit, in smallest currency units.
    pub max_initial_deposit: i64,
    pub withdrawal: WithdrawalPolicy,
}

impl Default for AccountPolicy {
    fn default() -> Self {
        Self {
            max_initial_deposit: 100_000_000,
            withdrawal: WithdrawalPolicy::default(),
        }
    }
}

/// The Account aggregate.
///
/// Invariants enforced here: the balance never goes negative, mutations are
/// rejected once the account is closed or soft-deleted, and savings accounts
/// honour the withdrawal cap. The `version` field is the optimistic
/// concurrency token checked by the persistence adapter on commit.
#[derive(Debug, Clone)]
pub struct Account {
    id: AccountId,
    account_number: AccountNumber,
    account_type: AccountType,
    balance: Money,
    customer_id: CustomerId,
    active: bool,
    deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
    deleted_by: Option<String>,
    delete_reason: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    transactions: Vec<Transaction>,
    committed_len: usize,
    events: Vec<DomainEvent>,
}

impl Account {
    /// Opens a new account.
    ///
    /// Fails unless `0 <= initial_balance <= policy.max_initial_deposit`.
    /// Buffers an `AccountOpened` event on success.
    pub fn open(
        customer_id: CustomerId,
        account_number: AccountNumber,
        account_type: AccountType,
        initial_balance: Money,
        policy: &AccountPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if initial_balance.amount() > policy.max_initial_deposit {
            return Err(DomainError::InitialDepositOutOfRange {
                requested: initial_balance.amount(),
                cap: policy.max_initial_deposit,
            });
        }

        let mut account = Self {
            id: AccountId::new(),
            account_number,
            account_type,
            balance: initial_balance,
            customer_id,
            active: true,
            deleted: false,
            deleted_at: None,
            deleted_by: None,
            delete_reason: None,
            version: 0,
            created_at: now,
            transactions: Vec::new(),
            committed_len: 0,
            events: Vec::new(),
        };

        account.events.push(DomainEvent::AccountOpened {
            account_id: account.id,
            account_number: account.account_number.clone(),
            customer_id,
            account_type,
            balance: initial_balance.amount(),
            currency: initial_balance.currency(),
            occurred_at: now,
        });

        Ok(account)
    }

    /// Rehydrates an account from storage.
    #[allow(clippy::too_many_arguments)]
    pub fn from_storage(
        id: AccountId,
        account_number: AccountNumber,
        account_type: AccountType,
        balance: Money,
        customer_id: CustomerId,
        active: bool,
        deleted: bool,
        deleted_at: Option<DateTime<Utc>>,
        deleted_by: Option<String>,
        delete_reason: Option<String>,
        version: i64,
        created_at: DateTime<Utc>,
        transactions: Vec<Transaction>,
    ) -> Self {
        let committed_len = transactions.len();
        Self {
            id,
            account_number,
            account_type,
            balance,
            customer_id,
            active,
            deleted,
            deleted_at,
            deleted_by,
            delete_reason,
            version,
            created_at,
            transactions,
            committed_len,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn account_number(&self) -> &AccountNumber {
        &self.account_number
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn deleted_by(&self) -> Option<&str> {
        self.deleted_by.as_deref()
    }

    pub fn delete_reason(&self) -> Option<&str> {
        self.delete_reason.as_deref()
    }

    /// Current optimistic concurrency token.
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Full owned transaction list, oldest first.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Transactions appended since the last commit.
    pub fn uncommitted_transactions(&self) -> &[Transaction] {
        &self.transactions[self.committed_len..]
    }

    /// Domain events buffered since the last commit.
    pub fn pending_events(&self) -> &[DomainEvent] {
        &self.events
    }

    /// Drains the event and transaction buffers and bumps the version.
    ///
    /// Must only be called by the persistence adapter after its storage
    /// transaction has committed; draining earlier would lose events on a
    /// rolled-back commit, draining later would re-publish them.
    pub fn mark_committed(&mut self) {
        self.committed_len = self.transactions.len();
        self.events.clear();
        self.version += 1;
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if !self.active || self.deleted {
            return Err(DomainError::AccountInactive(self.id));
        }
        Ok(())
    }

    fn check_withdrawal_limit(
        &self,
        policy: &WithdrawalPolicy,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.account_type != AccountType::Savings {
            return Ok(());
        }
        let cutoff = match policy.window {
            WithdrawalWindow::Lifetime => None,
            WithdrawalWindow::Days(days) => Some(now - Duration::days(i64::from(days))),
        };
        let count = self
            .transactions
            .iter()
            .filter(|t| t.kind.is_debit())
            .filter(|t| cutoff.is_none_or(|c| t.created_at >= c))
            .count();
        if count as u32 >= policy.max_withdrawals {
            return Err(DomainError::WithdrawalLimitReached {
                limit: policy.max_withdrawals,
            });
        }
        Ok(())
    }

    /// Credits (adds) money to the account.
    ///
    /// No balance-sufficiency check; fails only on inactive/deleted account,
    /// non-positive amount, or currency mismatch.
    pub fn credit(
        &mut self,
        amount: Money,
        kind: TransactionKind,
        description: &str,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Transaction, DomainError> {
        debug_assert!(kind.is_credit());
        self.ensure_open()?;
        if amount.is_zero() {
            return Err(DomainError::InvalidAmount);
        }
        self.balance = self.balance.checked_add(amount)?;
        let tx = Transaction::new(self.id, kind, amount, description, reference, now);
        self.transactions.push(tx.clone());
        Ok(tx)
    }

    /// Debits (subtracts) money from the account.
    ///
    /// An insufficient balance additionally buffers an
    /// `InsufficientFundsDetected` event so failed attempts remain
    /// observable downstream.
    pub fn debit(
        &mut self,
        amount: Money,
        kind: TransactionKind,
        description: &str,
        reference: Option<String>,
        policy: &WithdrawalPolicy,
        now: DateTime<Utc>,
    ) -> Result<Transaction, DomainError> {
        debug_assert!(kind.is_debit());
        self.ensure_open()?;
        if amount.is_zero() {
            return Err(DomainError::InvalidAmount);
        }
        if amount.currency() != self.balance.currency() {
            return Err(DomainError::CurrencyMismatch {
                expected: self.balance.currency(),
                got: amount.currency(),
            });
        }
        self.check_withdrawal_limit(policy, now)?;
        if !self.balance.gte(&amount) {
            self.events.push(DomainEvent::InsufficientFundsDetected {
                account_id: self.id,
                account_number: self.account_number.clone(),
                requested: amount.amount(),
                available: self.balance.amount(),
                currency: amount.currency(),
                occurred_at: now,
            });
            return Err(DomainError::InsufficientFunds {
                available: self.balance.amount(),
                requested: amount.amount(),
            });
        }
        self.balance = self.balance.checked_sub(amount)?;
        let tx = Transaction::new(self.id, kind, amount, description, reference, now);
        self.transactions.push(tx.clone());
        Ok(tx)
    }

    /// Transfers money to another account.
    ///
    /// Every validation runs before either aggregate is touched, so a failed
    /// transfer leaves both balances and transaction lists exactly as they
    /// were. The `InsufficientFundsDetected` event is still buffered on the
    /// source so the failed attempt reaches the outbox. Both aggregates must
    /// be committed together by the caller's single storage transaction.
    pub fn transfer_to(
        &mut self,
        destination: &mut Account,
        amount: Money,
        reference: Option<String>,
        description: &str,
        policy: &WithdrawalPolicy,
        now: DateTime<Utc>,
    ) -> Result<Transaction, DomainError> {
        if destination.id == self.id {
            return Err(DomainError::SameAccountTransfer);
        }
        self.ensure_open()?;
        destination.ensure_open()?;
        if amount.is_zero() {
            return Err(DomainError::InvalidAmount);
        }
        if amount.currency() != destination.balance.currency() {
            return Err(DomainError::CurrencyMismatch {
                expected: destination.balance.currency(),
                got: amount.currency(),
            });
        }

        let out = self.debit(
            amount,
            TransactionKind::TransferOut,
            description,
            reference.clone(),
            policy,
            now,
        )?;
        destination.credit(
            amount,
            TransactionKind::TransferIn,
            description,
            reference.clone(),
            now,
        )?;

        self.events.push(DomainEvent::MoneyTransferred {
            transaction_id: out.id,
            source_account_number: self.account_number.clone(),
            destination_account_number: destination.account_number.clone(),
            amount: amount.amount(),
            currency: amount.currency(),
            reference,
            occurred_at: now,
        });

        Ok(out)
    }

    /// Closes the account. Only allowed from an exactly-zero balance; one-way.
    pub fn close(&mut self) -> Result<(), DomainError> {
        self.ensure_open()?;
        if !self.balance.is_zero() {
            return Err(DomainError::BalanceNotZero {
                balance: self.balance.amount(),
            });
        }
        self.active = false;
        Ok(())
    }

    /// Soft-deletes the account, recording actor, reason and timestamp.
    ///
    /// Allowed from any state; all subsequent mutations are rejected.
    pub fn mark_deleted(&mut self, actor: &str, reason: &str, now: DateTime<Utc>) {
        self.deleted = true;
        self.deleted_at = Some(now);
        self.deleted_by = Some(actor.to_string());
        self.delete_reason = Some(reason.to_string());
    }
}
