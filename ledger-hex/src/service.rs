//! Ledger Application Service
//!
//! Orchestrates domain operations through the repository port.
//! Contains NO infrastructure logic - pure business orchestration.

use tracing::{info, instrument, warn};

use ledger_types::{
    Account, AccountPolicy, AccountResponse, AppError, Clock, DepositRequest, DomainError,
    HistoryQuery, LedgerRepository, Money, OpenAccountRequest, Page, SystemClock, Transaction,
    TransactionKind, TransferRequest, TransferResponse, WithdrawRequest,
};

/// Application service for ledger operations.
///
/// Generic over `R: LedgerRepository` - the adapter is injected at compile
/// time, so tests run against an in-memory repository. The clock is
/// injectable for the same reason.
pub struct LedgerService<R: LedgerRepository, C: Clock = SystemClock> {
    repo: R,
    clock: C,
    policy: AccountPolicy,
}

impl<R: LedgerRepository> LedgerService<R> {
    /// Creates a service on the wall clock with default policy.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            clock: SystemClock,
            policy: AccountPolicy::default(),
        }
    }
}

impl<R: LedgerRepository, C: Clock> LedgerService<R, C> {
    /// Creates a service with an explicit clock, for tests.
    pub fn with_clock(repo: R, clock: C) -> Self {
        Self {
            repo,
            clock,
            policy: AccountPolicy::default(),
        }
    }

    /// Overrides the account policy.
    pub fn policy(mut self, policy: AccountPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    async fn load_account(
        &self,
        number: &ledger_types::AccountNumber,
    ) -> Result<Account, AppError> {
        self.repo
            .load_by_number(number)
            .await
            .map_err(AppError::from)
            .and_then(|opt| opt.ok_or_else(|| AppError::NotFound(format!("Account {}", number))))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Account Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Opens a new account with an initial deposit.
    #[instrument(skip(self, req), fields(customer_id = %req.customer_id))]
    pub async fn open_account(
        &self,
        req: OpenAccountRequest,
    ) -> Result<AccountResponse, AppError> {
        let initial = Money::new(req.initial_deposit, req.currency).map_err(AppError::from)?;
        let mut account = Account::open(
            req.customer_id,
            ledger_types::AccountNumber::generate(),
            req.account_type,
            initial,
            &self.policy,
            self.clock.now(),
        )?;

        self.repo.insert_account(&mut account).await?;
        info!(account_number = %account.account_number(), "Opened account");
        Ok(AccountResponse::from(&account))
    }

    /// Fetches an account by its account number.
    pub async fn get_account(
        &self,
        number: &ledger_types::AccountNumber,
    ) -> Result<AccountResponse, AppError> {
        let account = self.load_account(number).await?;
        Ok(AccountResponse::from(&account))
    }

    /// Closes an account. The balance must be exactly zero.
    #[instrument(skip(self))]
    pub async fn close_account(
        &self,
        number: &ledger_types::AccountNumber,
    ) -> Result<AccountResponse, AppError> {
        let mut account = self.load_account(number).await?;
        account.close()?;
        self.repo.commit(&mut [&mut account]).await?;
        info!(account_number = %number, "Closed account");
        Ok(AccountResponse::from(&account))
    }

    /// Soft-deletes an account, keeping the row for audit.
    #[instrument(skip(self, reason))]
    pub async fn delete_account(
        &self,
        number: &ledger_types::AccountNumber,
        actor: &str,
        reason: &str,
    ) -> Result<(), AppError> {
        let mut account = self.load_account(number).await?;
        account.mark_deleted(actor, reason, self.clock.now());
        self.repo.commit(&mut [&mut account]).await?;
        info!(account_number = %number, actor, "Soft-deleted account");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Money Movement
    // ─────────────────────────────────────────────────────────────────────────────

    /// Deposits money into an account.
    #[instrument(skip(self, req), fields(account_number = %req.account_number))]
    pub async fn deposit(&self, req: DepositRequest) -> Result<AccountResponse, AppError> {
        let amount = Money::new(req.amount, req.currency).map_err(AppError::from)?;
        let mut account = self.load_account(&req.account_number).await?;

        account.credit(
            amount,
            TransactionKind::Deposit,
            &req.description,
            req.reference,
            self.clock.now(),
        )?;
        self.repo.commit(&mut [&mut account]).await?;
        Ok(AccountResponse::from(&account))
    }

    /// Withdraws money from an account.
    ///
    /// A shortfall still commits the aggregate: the balance is unchanged but
    /// the buffered `InsufficientFundsDetected` event must reach the outbox.
    #[instrument(skip(self, req), fields(account_number = %req.account_number))]
    pub async fn withdraw(&self, req: WithdrawRequest) -> Result<AccountResponse, AppError> {
        let amount = Money::new(req.amount, req.currency).map_err(AppError::from)?;
        let mut account = self.load_account(&req.account_number).await?;

        let result = account.debit(
            amount,
            TransactionKind::Withdrawal,
            &req.description,
            req.reference,
            &self.policy.withdrawal,
            self.clock.now(),
        );

        match result {
            Ok(_) => {
                self.repo.commit(&mut [&mut account]).await?;
                Ok(AccountResponse::from(&account))
            }
            Err(err @ DomainError::InsufficientFunds { .. }) => {
                warn!(account_number = %req.account_number, "Withdrawal rejected: {}", err);
                self.repo.commit(&mut [&mut account]).await?;
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Transfers money between two accounts atomically.
    #[instrument(
        skip(self, req),
        fields(source = %req.source_account_number, destination = %req.destination_account_number)
    )]
    pub async fn transfer(&self, req: TransferRequest) -> Result<TransferResponse, AppError> {
        if req.source_account_number == req.destination_account_number {
            return Err(DomainError::SameAccountTransfer.into());
        }
        let amount = Money::new(req.amount, req.currency).map_err(AppError::from)?;
        let mut source = self.load_account(&req.source_account_number).await?;
        let mut destination = self.load_account(&req.destination_account_number).await?;

        let result = source.transfer_to(
            &mut destination,
            amount,
            req.reference,
            &req.description,
            &self.policy.withdrawal,
            self.clock.now(),
        );

        match result {
            Ok(out) => {
                // One storage transaction covers both legs.
                self.repo.commit(&mut [&mut source, &mut destination]).await?;
                info!(transaction_id = %out.id, "Transfer completed");
                Ok(TransferResponse {
                    transaction_id: out.id,
                    source_account_number: req.source_account_number,
                    destination_account_number: req.destination_account_number,
                    amount: req.amount,
                    currency: req.currency,
                    source_balance: source.balance().amount(),
                    destination_balance: destination.balance().amount(),
                })
            }
            Err(err @ DomainError::InsufficientFunds { .. }) => {
                warn!(source = %req.source_account_number, "Transfer rejected: {}", err);
                // Balances untouched; only the detection event gets persisted.
                self.repo.commit(&mut [&mut source]).await?;
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────────

    /// Pages through an account's transaction history, newest first.
    pub async fn transaction_history(
        &self,
        number: &ledger_types::AccountNumber,
        query: &HistoryQuery,
    ) -> Result<Page<Transaction>, AppError> {
        let account = self.load_account(number).await?;
        self.repo
            .transactions_for_account(account.id(), query)
            .await
            .map_err(Into::into)
    }
}
