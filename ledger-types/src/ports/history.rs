//! Balance history port consumed by the interest batch engine.

use chrono::{DateTime, Utc};

use crate::domain::AccountId;
use crate::error::RepoError;

/// Port trait for average-daily-balance lookups.
#[async_trait::async_trait]
pub trait BalanceHistory: Send + Sync + 'static {
    /// Average daily closing balance over `[from, to)`, in smallest
    /// currency units.
    async fn average_daily_balance(
        &self,
        account_id: AccountId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, RepoError>;
}
