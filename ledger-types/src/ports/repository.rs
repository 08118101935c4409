//! Persistence gateway port.
//!
//! This is the primary port in the hexagonal architecture; the SQLite
//! adapter implements it. The `commit` contract is the heart of the outbox
//! mechanism: one storage transaction covers the account rows (guarded by
//! the optimistic version token), the new transaction rows and one outbox
//! row per buffered event, so the store can never hold a mutation without
//! its events or vice versa.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Account, AccountId, AccountNumber, DomainEvent, OutboxMessage, Transaction};
use crate::dto::{HistoryQuery, Page};
use crate::error::RepoError;

#[async_trait::async_trait]
pub trait LedgerRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────
    // Aggregate load / commit
    // ─────────────────────────────────────────────────────────────────────────

    /// Persists a freshly opened account together with its buffered events,
    /// then drains the aggregate's buffers.
    async fn insert_account(&self, account: &mut Account) -> Result<(), RepoError>;

    /// Loads an account (with its owned transaction list) by id.
    async fn load(&self, id: AccountId) -> Result<Option<Account>, RepoError>;

    /// Loads an account by its 10-digit account number.
    async fn load_by_number(&self, number: &AccountNumber)
    -> Result<Option<Account>, RepoError>;

    /// Commits one or more mutated aggregates atomically.
    ///
    /// Every account row update is guarded by `WHERE version = ?`; a stale
    /// token fails the entire unit of work with [`RepoError::Concurrency`]
    /// and nothing - balances, transactions, outbox rows - is persisted.
    /// On success the aggregates' buffers are drained and versions bumped.
    async fn commit(&self, accounts: &mut [&mut Account]) -> Result<(), RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Pages through an account's transaction history, newest first.
    async fn transactions_for_account(
        &self,
        account_id: AccountId,
        query: &HistoryQuery,
    ) -> Result<Page<Transaction>, RepoError>;

    /// Ids of active, non-deleted interest-bearing accounts.
    async fn interest_bearing_accounts(&self) -> Result<Vec<AccountId>, RepoError>;

    /// Whether an interest credit was already posted on or after `since`.
    async fn has_interest_credit_since(
        &self,
        account_id: AccountId,
        since: DateTime<Utc>,
    ) -> Result<bool, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Outbox
    // ─────────────────────────────────────────────────────────────────────────

    /// Appends a standalone event (not tied to an aggregate commit) to the
    /// outbox, e.g. the interest batch summary.
    async fn append_outbox(&self, event: &DomainEvent) -> Result<(), RepoError>;

    /// Unprocessed rows below the retry cap, ordered by `occurred_at`.
    async fn unprocessed_outbox(
        &self,
        max_attempts: i32,
        limit: i64,
    ) -> Result<Vec<OutboxMessage>, RepoError>;

    /// Stamps `processed_at`; a no-op if the row was already processed.
    async fn mark_outbox_processed(&self, id: Uuid) -> Result<(), RepoError>;

    /// Increments the attempt counter and records the dispatch error.
    async fn mark_outbox_failed(&self, id: Uuid, error: &str) -> Result<(), RepoError>;

    /// Claims (or renews) the single relay lease. Returns false when another
    /// live holder owns it, in which case the caller must skip its poll.
    async fn acquire_relay_lease(
        &self,
        holder: &str,
        ttl: chrono::Duration,
    ) -> Result<bool, RepoError>;
}
