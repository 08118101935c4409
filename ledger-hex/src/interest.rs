//! Interest batch engine.
//!
//! Credits interest to savings and fixed-deposit accounts for a period,
//! based on the average daily balance over that period. One failing account
//! never aborts the batch; a period already credited on an account is
//! skipped, so re-running after a partial failure only touches the accounts
//! that missed out.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument};
use uuid::Uuid;

use ledger_types::{
    AccountId, AccountType, AppError, BalanceHistory, Clock, DomainEvent, LedgerRepository,
    Money, SystemClock, TransactionKind,
};

/// One rate tier: the annual rate applied from `min_balance` upwards.
#[derive(Debug, Clone, Copy)]
pub struct RateTier {
    /// Smallest average balance (minor units) this tier applies to.
    pub min_balance: i64,
    /// Annual rate in basis points.
    pub annual_bps: u32,
}

/// Per-product rate tiers, highest qualifying tier wins.
#[derive(Debug, Clone)]
pub struct InterestRateTable {
    pub savings: Vec<RateTier>,
    pub fixed_deposit: Vec<RateTier>,
}

impl Default for InterestRateTable {
    fn default() -> Self {
        Self {
            savings: vec![
                RateTier {
                    min_balance: 0,
                    annual_bps: 150,
                },
                RateTier {
                    min_balance: 50_000_000,
                    annual_bps: 200,
                },
            ],
            fixed_deposit: vec![
                RateTier {
                    min_balance: 0,
                    annual_bps: 400,
                },
                RateTier {
                    min_balance: 50_000_000,
                    annual_bps: 450,
                },
            ],
        }
    }
}

impl InterestRateTable {
    /// Annual rate for an account type at a given average balance.
    /// Non-interest-bearing types get zero.
    pub fn annual_bps(&self, account_type: AccountType, average_balance: i64) -> u32 {
        let tiers = match account_type {
            AccountType::Savings => &self.savings,
            AccountType::FixedDeposit => &self.fixed_deposit,
            AccountType::Checking => return 0,
        };
        tiers
            .iter()
            .filter(|t| t.min_balance <= average_balance)
            .map(|t| t.annual_bps)
            .max()
            .unwrap_or(0)
    }
}

/// Interest amount in minor units, rounded half-up.
///
/// `average_balance x annual_bps / 10_000 x days / 365`, computed in i128 so
/// the intermediate product cannot overflow.
pub fn interest_for(average_balance: i64, annual_bps: u32, days: i64) -> i64 {
    if average_balance <= 0 || annual_bps == 0 || days <= 0 {
        return 0;
    }
    let numerator =
        i128::from(average_balance) * i128::from(annual_bps) * i128::from(days);
    let divisor: i128 = 10_000 * 365;
    ((numerator + divisor / 2) / divisor) as i64
}

/// Half-open accrual period `[from, to)`.
#[derive(Debug, Clone, Copy)]
pub struct InterestPeriod {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl InterestPeriod {
    /// Number of accrual days in the period.
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days()
    }
}

/// One account the batch could not credit.
#[derive(Debug)]
pub struct AccountFailure {
    pub account_id: AccountId,
    pub error: String,
}

/// Outcome of one batch run.
#[derive(Debug)]
pub struct InterestRunSummary {
    pub batch_id: Uuid,
    pub succeeded: u32,
    pub skipped: u32,
    pub failed: Vec<AccountFailure>,
    /// Total interest credited, in minor units, keyed by currency code.
    pub total_interest: BTreeMap<String, i64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

enum AccountOutcome {
    Credited { currency: &'static str, amount: i64 },
    Skipped,
}

/// The batch engine itself, generic over its three ports.
pub struct InterestEngine<R, H, C = SystemClock> {
    repo: R,
    history: H,
    clock: C,
    rates: InterestRateTable,
}

impl<R, H> InterestEngine<R, H>
where
    R: LedgerRepository,
    H: BalanceHistory,
{
    pub fn new(repo: R, history: H) -> Self {
        Self {
            repo,
            history,
            clock: SystemClock,
            rates: InterestRateTable::default(),
        }
    }
}

impl<R, H, C> InterestEngine<R, H, C>
where
    R: LedgerRepository,
    H: BalanceHistory,
    C: Clock,
{
    pub fn with_clock(repo: R, history: H, clock: C) -> Self {
        Self {
            repo,
            history,
            clock,
            rates: InterestRateTable::default(),
        }
    }

    /// Overrides the rate table.
    pub fn rates(mut self, rates: InterestRateTable) -> Self {
        self.rates = rates;
        self
    }

    /// Runs one batch over the given period.
    ///
    /// Returns the summary and appends an `INTEREST_BATCH_COMPLETED` event
    /// to the outbox. Only fails outright when the account listing or the
    /// summary append fails.
    #[instrument(skip(self), fields(from = %period.from, to = %period.to))]
    pub async fn run(&self, period: InterestPeriod) -> Result<InterestRunSummary, AppError> {
        let batch_id = Uuid::new_v4();
        let started_at = self.clock.now();
        let ids = self.repo.interest_bearing_accounts().await?;
        info!(%batch_id, accounts = ids.len(), "Starting interest batch");

        let mut succeeded = 0u32;
        let mut skipped = 0u32;
        let mut failed = Vec::new();
        let mut total_interest: BTreeMap<String, i64> = BTreeMap::new();

        for id in ids {
            match self.process_account(id, period).await {
                Ok(AccountOutcome::Credited { currency, amount }) => {
                    succeeded += 1;
                    *total_interest.entry(currency.to_string()).or_insert(0) += amount;
                }
                Ok(AccountOutcome::Skipped) => skipped += 1,
                Err(e) => {
                    error!(account_id = %id, "Interest credit failed: {}", e);
                    failed.push(AccountFailure {
                        account_id: id,
                        error: e.to_string(),
                    });
                }
            }
        }

        let finished_at = self.clock.now();
        self.repo
            .append_outbox(&DomainEvent::InterestBatchCompleted {
                batch_id,
                succeeded,
                skipped,
                failed: failed.len() as u32,
                total_interest: total_interest.clone(),
                started_at,
                finished_at,
            })
            .await?;

        info!(
            %batch_id,
            succeeded,
            skipped,
            failed = failed.len(),
            "Interest batch finished"
        );
        Ok(InterestRunSummary {
            batch_id,
            succeeded,
            skipped,
            failed,
            total_interest,
            started_at,
            finished_at,
        })
    }

    async fn process_account(
        &self,
        id: AccountId,
        period: InterestPeriod,
    ) -> Result<AccountOutcome, AppError> {
        // A credit on or after the period start means this period is done.
        if self.repo.has_interest_credit_since(id, period.from).await? {
            return Ok(AccountOutcome::Skipped);
        }

        let average = self
            .history
            .average_daily_balance(id, period.from, period.to)
            .await?;

        let mut account = self
            .repo
            .load(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Account {}", id)))?;

        let bps = self.rates.annual_bps(account.account_type(), average);
        let amount = interest_for(average, bps, period.days());
        if amount == 0 {
            return Ok(AccountOutcome::Skipped);
        }

        let currency = account.balance().currency();
        let money = Money::new(amount, currency).map_err(AppError::from)?;
        account.credit(
            money,
            TransactionKind::InterestCredit,
            "Interest credit",
            None,
            self.clock.now(),
        )?;
        self.repo.commit(&mut [&mut account]).await?;

        Ok(AccountOutcome::Credited {
            currency: currency.code(),
            amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service_tests::tests::{MockHistory, MockRepo};
    use chrono::Duration;
    use ledger_types::{Account, AccountNumber, AccountPolicy, Currency, CustomerId, Money};

    fn period_of_days(days: i64) -> InterestPeriod {
        let to = Utc::now();
        InterestPeriod {
            from: to - Duration::days(days),
            to,
        }
    }

    async fn seeded_account(
        repo: &MockRepo,
        account_type: AccountType,
        balance: i64,
    ) -> AccountId {
        let mut account = Account::open(
            CustomerId::new(),
            AccountNumber::generate(),
            account_type,
            Money::new(balance, Currency::NGN).unwrap(),
            &AccountPolicy::default(),
            Utc::now(),
        )
        .unwrap();
        repo.insert_account(&mut account).await.unwrap();
        account.id()
    }

    #[test]
    fn test_interest_formula_scenario() {
        // 1_000_000 minor at 150 bps over 30 days.
        assert_eq!(interest_for(1_000_000, 150, 30), 1233);
    }

    #[test]
    fn test_interest_formula_rounds_half_up() {
        // 50 x 100 x 365 / (10_000 x 365) = 0.5 exactly
        assert_eq!(interest_for(50, 100, 365), 1);
        assert_eq!(interest_for(49, 100, 365), 0);
    }

    #[test]
    fn test_interest_formula_degenerate_inputs() {
        assert_eq!(interest_for(0, 150, 30), 0);
        assert_eq!(interest_for(1_000_000, 0, 30), 0);
        assert_eq!(interest_for(1_000_000, 150, 0), 0);
    }

    #[test]
    fn test_rate_table_picks_highest_qualifying_tier() {
        let table = InterestRateTable::default();
        assert_eq!(table.annual_bps(AccountType::Savings, 1_000_000), 150);
        assert_eq!(table.annual_bps(AccountType::Savings, 50_000_000), 200);
        assert_eq!(table.annual_bps(AccountType::FixedDeposit, 1_000_000), 400);
        assert_eq!(table.annual_bps(AccountType::Checking, 50_000_000), 0);
    }

    #[tokio::test]
    async fn test_batch_credits_savings_account() {
        let repo = MockRepo::new();
        let id = seeded_account(&repo, AccountType::Savings, 1_000_000).await;
        let history = MockHistory::constant(1_000_000);
        let engine = InterestEngine::new(repo.clone(), history);

        let summary = engine.run(period_of_days(30)).await.unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.skipped, 0);
        assert!(summary.failed.is_empty());
        assert_eq!(summary.total_interest.get("NGN"), Some(&1233));

        let account = repo.get(id);
        assert_eq!(account.balance().amount(), 1_001_233);
        assert_eq!(
            account.transactions().last().unwrap().kind,
            TransactionKind::InterestCredit
        );

        // Batch summary landed in the outbox.
        assert!(repo
            .outbox_rows()
            .iter()
            .any(|m| m.event_type == "INTEREST_BATCH_COMPLETED"));
    }

    #[tokio::test]
    async fn test_rerun_skips_already_credited_period() {
        let repo = MockRepo::new();
        let id = seeded_account(&repo, AccountType::Savings, 1_000_000).await;
        let history = MockHistory::constant(1_000_000);
        let engine = InterestEngine::new(repo.clone(), history);
        let period = period_of_days(30);

        engine.run(period).await.unwrap();
        let second = engine.run(period).await.unwrap();

        assert_eq!(second.succeeded, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(repo.get(id).balance().amount(), 1_001_233);
    }

    #[tokio::test]
    async fn test_one_failing_account_does_not_abort_batch() {
        let repo = MockRepo::new();
        let broken = seeded_account(&repo, AccountType::Savings, 1_000_000).await;
        let healthy = seeded_account(&repo, AccountType::Savings, 1_000_000).await;
        let history = MockHistory::constant(1_000_000).failing_for(broken);
        let engine = InterestEngine::new(repo.clone(), history);

        let summary = engine.run(period_of_days(30)).await.unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].account_id, broken);
        assert_eq!(repo.get(healthy).balance().amount(), 1_001_233);
        assert_eq!(repo.get(broken).balance().amount(), 1_000_000);
    }

    #[tokio::test]
    async fn test_zero_interest_counts_as_skipped() {
        let repo = MockRepo::new();
        seeded_account(&repo, AccountType::Savings, 0).await;
        let history = MockHistory::constant(0);
        let engine = InterestEngine::new(repo.clone(), history);

        let summary = engine.run(period_of_days(30)).await.unwrap();
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.skipped, 1);
    }
}
