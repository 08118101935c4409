//! # Ledger Repository
//!
//! Concrete adapters for the ledger service: the SQLite implementation of
//! the `LedgerRepository` and `BalanceHistory` ports, the outbox relay and
//! the webhook event sender.

pub mod relay;
pub mod sender;
pub mod sqlite;

mod types;

#[cfg(test)]
mod sqlite_tests;

pub use relay::{OutboxRelay, RelayConfig};
pub use sender::WebhookSender;
pub use sqlite::SqliteLedger;

/// Build and initialize a repository from a database URL.
///
/// Connects, runs the embedded migrations and returns a ready-to-use
/// [`SqliteLedger`].
///
/// # Examples
///
/// ```ignore
/// let repo = build_repo("sqlite://ledger.db?mode=rwc").await?;
/// ```
pub async fn build_repo(database_url: &str) -> anyhow::Result<SqliteLedger> {
    SqliteLedger::new(database_url).await
}
