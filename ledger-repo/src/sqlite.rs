//! SQLite persistence adapter.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::str::FromStr;
use uuid::Uuid;

use ledger_types::{
    Account, AccountId, AccountNumber, BalanceHistory, DomainEvent, HistoryQuery,
    LedgerRepository, OutboxMessage, Page, RepoError, Transaction,
};

use crate::types::{DbAccount, DbOutboxMessage, DbTransaction};

fn db_err(e: sqlx::Error) -> RepoError {
    RepoError::Database(e.to_string())
}

fn tx_err(e: sqlx::Error) -> RepoError {
    RepoError::Transaction(e.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite implementation of the ledger persistence gateway.
#[derive(Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Connects and runs embedded migrations.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        for ddl in [
            include_str!("../migrations/0001_create_tables.sql"),
            include_str!("../migrations/0002_create_outbox.sql"),
        ] {
            sqlx::raw_sql(ddl).execute(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_account_row(&self, row: DbAccount) -> Result<Account, RepoError> {
        let rows: Vec<DbTransaction> = sqlx::query_as(
            r#"SELECT id, account_id, kind, amount, currency, description, reference, created_at
               FROM transactions WHERE account_id = ? ORDER BY created_at ASC, id ASC"#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let transactions = rows
            .into_iter()
            .map(DbTransaction::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        row.into_domain(transactions)
    }
}

const SELECT_ACCOUNT: &str = r#"SELECT id, account_number, account_type, customer_id, balance,
    currency, active, deleted, deleted_at, deleted_by, delete_reason, version, created_at
    FROM accounts"#;

async fn insert_transaction_row(
    db_tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    t: &Transaction,
) -> Result<(), RepoError> {
    sqlx::query(
        r#"INSERT INTO transactions (id, account_id, kind, amount, currency, description, reference, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(t.id.to_string())
    .bind(t.account_id.to_string())
    .bind(t.kind.to_string())
    .bind(t.amount.amount())
    .bind(t.amount.currency().code())
    .bind(&t.description)
    .bind(&t.reference)
    .bind(t.created_at.to_rfc3339())
    .execute(&mut **db_tx)
    .await
    .map_err(db_err)?;
    Ok(())
}

async fn insert_outbox_row(
    db_tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    message: &OutboxMessage,
) -> Result<(), RepoError> {
    sqlx::query(
        r#"INSERT INTO outbox_messages (id, event_type, payload, occurred_at, attempts)
           VALUES (?, ?, ?, ?, 0)"#,
    )
    .bind(message.id.to_string())
    .bind(&message.event_type)
    .bind(message.payload.to_string())
    .bind(message.occurred_at.to_rfc3339())
    .execute(&mut **db_tx)
    .await
    .map_err(db_err)?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LedgerRepository for SqliteLedger {
    async fn insert_account(&self, account: &mut Account) -> Result<(), RepoError> {
        let mut db_tx = self.pool.begin().await.map_err(tx_err)?;

        sqlx::query(
            r#"INSERT INTO accounts (id, account_number, account_type, customer_id, balance,
                   currency, active, deleted, deleted_at, deleted_by, delete_reason, version, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL, NULL, ?, ?)"#,
        )
        .bind(account.id().to_string())
        .bind(account.account_number().as_str())
        .bind(account.account_type().to_string())
        .bind(account.customer_id().to_string())
        .bind(account.balance().amount())
        .bind(account.balance().currency().code())
        .bind(i64::from(account.is_active()))
        .bind(i64::from(account.is_deleted()))
        .bind(account.version() + 1)
        .bind(account.created_at().to_rfc3339())
        .execute(&mut *db_tx)
        .await
        .map_err(db_err)?;

        for t in account.uncommitted_transactions() {
            insert_transaction_row(&mut db_tx, t).await?;
        }
        for event in account.pending_events() {
            insert_outbox_row(&mut db_tx, &OutboxMessage::from_event(event)).await?;
        }

        db_tx.commit().await.map_err(tx_err)?;
        account.mark_committed();
        Ok(())
    }

    async fn load(&self, id: AccountId) -> Result<Option<Account>, RepoError> {
        let row: Option<DbAccount> =
            sqlx::query_as(&format!("{SELECT_ACCOUNT} WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        match row {
            Some(row) => Ok(Some(self.load_account_row(row).await?)),
            None => Ok(None),
        }
    }

    async fn load_by_number(
        &self,
        number: &AccountNumber,
    ) -> Result<Option<Account>, RepoError> {
        let row: Option<DbAccount> =
            sqlx::query_as(&format!("{SELECT_ACCOUNT} WHERE account_number = ?"))
                .bind(number.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        match row {
            Some(row) => Ok(Some(self.load_account_row(row).await?)),
            None => Ok(None),
        }
    }

    async fn commit(&self, accounts: &mut [&mut Account]) -> Result<(), RepoError> {
        let mut db_tx = self.pool.begin().await.map_err(tx_err)?;

        for account in accounts.iter() {
            let result = sqlx::query(
                r#"UPDATE accounts
                   SET balance = ?, active = ?, deleted = ?, deleted_at = ?, deleted_by = ?,
                       delete_reason = ?, version = ?
                   WHERE id = ? AND version = ?"#,
            )
            .bind(account.balance().amount())
            .bind(i64::from(account.is_active()))
            .bind(i64::from(account.is_deleted()))
            .bind(account.deleted_at().map(|dt| dt.to_rfc3339()))
            .bind(account.deleted_by())
            .bind(account.delete_reason())
            .bind(account.version() + 1)
            .bind(account.id().to_string())
            .bind(account.version())
            .execute(&mut *db_tx)
            .await
            .map_err(db_err)?;

            // Stale version token: dropping db_tx rolls the whole unit back.
            if result.rows_affected() == 0 {
                return Err(RepoError::Concurrency(account.id()));
            }

            for t in account.uncommitted_transactions() {
                insert_transaction_row(&mut db_tx, t).await?;
            }
            for event in account.pending_events() {
                insert_outbox_row(&mut db_tx, &OutboxMessage::from_event(event)).await?;
            }
        }

        db_tx.commit().await.map_err(tx_err)?;

        for account in accounts.iter_mut() {
            account.mark_committed();
        }
        Ok(())
    }

    async fn transactions_for_account(
        &self,
        account_id: AccountId,
        query: &HistoryQuery,
    ) -> Result<Page<Transaction>, RepoError> {
        let account_id_str = account_id.to_string();
        let from = query
            .from
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| "0001-01-01T00:00:00+00:00".to_string());
        let to = query
            .to
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| "9999-12-31T23:59:59+00:00".to_string());

        let total: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(1) FROM transactions
               WHERE account_id = ? AND created_at >= ? AND created_at <= ?"#,
        )
        .bind(&account_id_str)
        .bind(&from)
        .bind(&to)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        let rows: Vec<DbTransaction> = sqlx::query_as(
            r#"SELECT id, account_id, kind, amount, currency, description, reference, created_at
               FROM transactions
               WHERE account_id = ? AND created_at >= ? AND created_at <= ?
               ORDER BY created_at DESC, id DESC
               LIMIT ? OFFSET ?"#,
        )
        .bind(&account_id_str)
        .bind(&from)
        .bind(&to)
        .bind(i64::from(query.page_size))
        .bind(query.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let items = rows
            .into_iter()
            .map(DbTransaction::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            page: query.page,
            page_size: query.page_size,
            total,
        })
    }

    async fn interest_bearing_accounts(&self) -> Result<Vec<AccountId>, RepoError> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"SELECT id FROM accounts
               WHERE account_type IN ('SAVINGS', 'FIXED_DEPOSIT')
                 AND active = 1 AND deleted = 0
               ORDER BY created_at ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        ids.iter()
            .map(|s| crate::types::parse_uuid(s).map(AccountId::from_uuid))
            .collect()
    }

    async fn has_interest_credit_since(
        &self,
        account_id: AccountId,
        since: DateTime<Utc>,
    ) -> Result<bool, RepoError> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(1) FROM transactions
               WHERE account_id = ? AND kind = 'INTEREST_CREDIT' AND created_at >= ?"#,
        )
        .bind(account_id.to_string())
        .bind(since.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(count > 0)
    }

    async fn append_outbox(&self, event: &DomainEvent) -> Result<(), RepoError> {
        let message = OutboxMessage::from_event(event);
        sqlx::query(
            r#"INSERT INTO outbox_messages (id, event_type, payload, occurred_at, attempts)
               VALUES (?, ?, ?, ?, 0)"#,
        )
        .bind(message.id.to_string())
        .bind(&message.event_type)
        .bind(message.payload.to_string())
        .bind(message.occurred_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn unprocessed_outbox(
        &self,
        max_attempts: i32,
        limit: i64,
    ) -> Result<Vec<OutboxMessage>, RepoError> {
        let rows: Vec<DbOutboxMessage> = sqlx::query_as(
            r#"SELECT id, event_type, payload, occurred_at, processed_at, attempts, last_error
               FROM outbox_messages
               WHERE processed_at IS NULL AND attempts < ?
               ORDER BY occurred_at ASC
               LIMIT ?"#,
        )
        .bind(max_attempts)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbOutboxMessage::into_domain).collect()
    }

    async fn mark_outbox_processed(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query(
            r#"UPDATE outbox_messages SET processed_at = ?
               WHERE id = ? AND processed_at IS NULL"#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn mark_outbox_failed(&self, id: Uuid, error: &str) -> Result<(), RepoError> {
        sqlx::query(
            r#"UPDATE outbox_messages SET attempts = attempts + 1, last_error = ?
               WHERE id = ? AND processed_at IS NULL"#,
        )
        .bind(error)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn acquire_relay_lease(
        &self,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, RepoError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"UPDATE relay_lease SET holder = ?, expires_at = ?
               WHERE id = 1 AND (holder IS NULL OR holder = ? OR expires_at < ?)"#,
        )
        .bind(holder)
        .bind((now + ttl).to_rfc3339())
        .bind(holder)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Balance history
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl BalanceHistory for SqliteLedger {
    /// Walks the ledger backwards from the current balance to reconstruct
    /// each day's closing balance over `[from, to)` and averages them.
    async fn average_daily_balance(
        &self,
        account_id: AccountId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, RepoError> {
        let current: Option<i64> =
            sqlx::query_scalar(r#"SELECT balance FROM accounts WHERE id = ?"#)
                .bind(account_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        let current = current.ok_or(RepoError::NotFound)?;

        // Everything from period start until now, newest first, so entries
        // can be undone while stepping back day by day.
        let rows: Vec<DbTransaction> = sqlx::query_as(
            r#"SELECT id, account_id, kind, amount, currency, description, reference, created_at
               FROM transactions
               WHERE account_id = ? AND created_at >= ?
               ORDER BY created_at DESC, id DESC"#,
        )
        .bind(account_id.to_string())
        .bind(from.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let transactions = rows
            .into_iter()
            .map(DbTransaction::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        let days = (to - from).num_days().max(1);
        let mut balance = current;
        let mut entries = transactions.into_iter().peekable();
        let mut total: i128 = 0;

        for offset in (0..days).rev() {
            let day_end = from + Duration::days(offset + 1);
            while let Some(t) = entries.peek() {
                if t.created_at < day_end {
                    break;
                }
                // Undo the entry to move the balance back in time.
                if t.kind.is_credit() {
                    balance -= t.amount.amount();
                } else {
                    balance += t.amount.amount();
                }
                entries.next();
            }
            total += i128::from(balance);
        }

        Ok((total / i128::from(days)) as i64)
    }
}
