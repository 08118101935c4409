//! Integration tests for the SQLite adapter, run against in-memory databases.

use chrono::{Duration, Utc};
use ledger_types::{
    Account, AccountNumber, AccountPolicy, AccountType, BalanceHistory, Currency, CustomerId,
    HistoryQuery, LedgerRepository, Money, RepoError, TransactionKind, WithdrawalPolicy,
};

use crate::sqlite::SqliteLedger;

async fn setup() -> SqliteLedger {
    SqliteLedger::new("sqlite::memory:").await.unwrap()
}

fn open_account(account_type: AccountType, balance: i64) -> Account {
    Account::open(
        CustomerId::new(),
        AccountNumber::generate(),
        account_type,
        Money::new(balance, Currency::NGN).unwrap(),
        &AccountPolicy::default(),
        Utc::now(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_insert_and_load_round_trip() {
    let repo = setup().await;
    let mut account = open_account(AccountType::Checking, 100_000);
    let id = account.id();

    repo.insert_account(&mut account).await.unwrap();

    // Buffers drained, version advanced to match the stored row.
    assert_eq!(account.version(), 1);
    assert!(account.pending_events().is_empty());

    let loaded = repo.load(id).await.unwrap().unwrap();
    assert_eq!(loaded.id(), id);
    assert_eq!(loaded.balance().amount(), 100_000);
    assert_eq!(loaded.balance().currency(), Currency::NGN);
    assert_eq!(loaded.version(), 1);
    assert!(loaded.is_active());
    assert!(loaded.transactions().is_empty());

    let by_number = repo
        .load_by_number(account.account_number())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_number.id(), id);
}

#[tokio::test]
async fn test_insert_writes_account_opened_outbox_row() {
    let repo = setup().await;
    let mut account = open_account(AccountType::Savings, 50_000);

    repo.insert_account(&mut account).await.unwrap();

    let pending = repo.unprocessed_outbox(3, 10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].event_type, "ACCOUNT_OPENED");
    assert_eq!(pending[0].payload["balance"], 50_000);
    assert_eq!(pending[0].attempts, 0);
}

#[tokio::test]
async fn test_commit_persists_transactions_and_events() {
    let repo = setup().await;
    let mut account = open_account(AccountType::Checking, 100_000);
    let id = account.id();
    repo.insert_account(&mut account).await.unwrap();

    account
        .credit(
            Money::new(25_000, Currency::NGN).unwrap(),
            TransactionKind::Deposit,
            "Salary",
            Some("PAY-2024-07".to_string()),
            Utc::now(),
        )
        .unwrap();
    repo.commit(&mut [&mut account]).await.unwrap();
    assert_eq!(account.version(), 2);

    let loaded = repo.load(id).await.unwrap().unwrap();
    assert_eq!(loaded.balance().amount(), 125_000);
    assert_eq!(loaded.version(), 2);
    assert_eq!(loaded.transactions().len(), 1);
    assert_eq!(loaded.transactions()[0].kind, TransactionKind::Deposit);
    assert_eq!(
        loaded.transactions()[0].reference.as_deref(),
        Some("PAY-2024-07")
    );
}

#[tokio::test]
async fn test_stale_version_rolls_back_everything() {
    let repo = setup().await;
    let mut account = open_account(AccountType::Checking, 100_000);
    let id = account.id();
    repo.insert_account(&mut account).await.unwrap();

    let mut copy_a = repo.load(id).await.unwrap().unwrap();
    let mut copy_b = repo.load(id).await.unwrap().unwrap();
    let policy = WithdrawalPolicy::default();

    copy_a
        .debit(
            Money::new(10_000, Currency::NGN).unwrap(),
            TransactionKind::Withdrawal,
            "First writer",
            None,
            &policy,
            Utc::now(),
        )
        .unwrap();
    repo.commit(&mut [&mut copy_a]).await.unwrap();

    copy_b
        .debit(
            Money::new(99_000, Currency::NGN).unwrap(),
            TransactionKind::Withdrawal,
            "Second writer",
            None,
            &policy,
            Utc::now(),
        )
        .unwrap();
    let result = repo.commit(&mut [&mut copy_b]).await;
    assert!(matches!(result, Err(RepoError::Concurrency(conflicted)) if conflicted == id));

    // Only the first writer's mutation is visible.
    let loaded = repo.load(id).await.unwrap().unwrap();
    assert_eq!(loaded.balance().amount(), 90_000);
    assert_eq!(loaded.version(), 2);
    assert_eq!(loaded.transactions().len(), 1);
    assert_eq!(loaded.transactions()[0].description, "First writer");
}

#[tokio::test]
async fn test_transfer_commits_both_aggregates_atomically() {
    let repo = setup().await;
    let mut a = open_account(AccountType::Checking, 100_000);
    let mut b = open_account(AccountType::Checking, 50_000);
    repo.insert_account(&mut a).await.unwrap();
    repo.insert_account(&mut b).await.unwrap();

    a.transfer_to(
        &mut b,
        Money::new(40_000, Currency::NGN).unwrap(),
        Some("RENT-08".to_string()),
        "Rent",
        &WithdrawalPolicy::default(),
        Utc::now(),
    )
    .unwrap();
    repo.commit(&mut [&mut a, &mut b]).await.unwrap();

    let source = repo.load(a.id()).await.unwrap().unwrap();
    let destination = repo.load(b.id()).await.unwrap().unwrap();
    assert_eq!(source.balance().amount(), 60_000);
    assert_eq!(destination.balance().amount(), 90_000);
    assert_eq!(source.transactions().len(), 1);
    assert_eq!(source.transactions()[0].kind, TransactionKind::TransferOut);
    assert_eq!(destination.transactions().len(), 1);
    assert_eq!(
        destination.transactions()[0].kind,
        TransactionKind::TransferIn
    );

    let transferred: Vec<_> = repo
        .unprocessed_outbox(i32::MAX, 50)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.event_type == "MONEY_TRANSFERRED")
        .collect();
    assert_eq!(transferred.len(), 1);
    assert_eq!(transferred[0].payload["amount"], 40_000);
}

#[tokio::test]
async fn test_stale_second_aggregate_rolls_back_whole_transfer() {
    let repo = setup().await;
    let mut a = open_account(AccountType::Checking, 100_000);
    let mut b = open_account(AccountType::Checking, 50_000);
    repo.insert_account(&mut a).await.unwrap();
    repo.insert_account(&mut b).await.unwrap();

    // Bump the destination's stored version behind our back.
    let mut b_other = repo.load(b.id()).await.unwrap().unwrap();
    b_other
        .credit(
            Money::new(1_000, Currency::NGN).unwrap(),
            TransactionKind::Deposit,
            "Concurrent deposit",
            None,
            Utc::now(),
        )
        .unwrap();
    repo.commit(&mut [&mut b_other]).await.unwrap();

    a.transfer_to(
        &mut b,
        Money::new(40_000, Currency::NGN).unwrap(),
        None,
        "Rent",
        &WithdrawalPolicy::default(),
        Utc::now(),
    )
    .unwrap();
    let result = repo.commit(&mut [&mut a, &mut b]).await;
    assert!(matches!(result, Err(RepoError::Concurrency(conflicted)) if conflicted == b.id()));

    // The source leg executed first inside the unit; the conflict on the
    // destination must have rolled it back too.
    let source = repo.load(a.id()).await.unwrap().unwrap();
    assert_eq!(source.balance().amount(), 100_000);
    assert_eq!(source.version(), 1);
    assert!(source.transactions().is_empty());

    let destination = repo.load(b.id()).await.unwrap().unwrap();
    assert_eq!(destination.balance().amount(), 51_000);

    assert!(!repo
        .unprocessed_outbox(i32::MAX, 50)
        .await
        .unwrap()
        .iter()
        .any(|m| m.event_type == "MONEY_TRANSFERRED"));
}

#[tokio::test]
async fn test_history_pages_newest_first_with_range() {
    let repo = setup().await;
    let mut account = open_account(AccountType::Checking, 100_000);
    let id = account.id();
    repo.insert_account(&mut account).await.unwrap();

    let base = Utc::now() - Duration::days(3);
    for (i, desc) in ["first", "second", "third"].iter().enumerate() {
        account
            .credit(
                Money::new(1_000, Currency::NGN).unwrap(),
                TransactionKind::Deposit,
                desc,
                None,
                base + Duration::days(i as i64),
            )
            .unwrap();
    }
    repo.commit(&mut [&mut account]).await.unwrap();

    let page1 = repo
        .transactions_for_account(
            id,
            &HistoryQuery {
                page_size: 2,
                ..HistoryQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page1.total, 3);
    assert_eq!(page1.items.len(), 2);
    assert_eq!(page1.items[0].description, "third");
    assert_eq!(page1.items[1].description, "second");

    let page2 = repo
        .transactions_for_account(
            id,
            &HistoryQuery {
                page: 2,
                page_size: 2,
                ..HistoryQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page2.items.len(), 1);
    assert_eq!(page2.items[0].description, "first");

    // Range bound excludes the oldest entry.
    let ranged = repo
        .transactions_for_account(
            id,
            &HistoryQuery {
                from: Some(base + Duration::hours(12)),
                ..HistoryQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(ranged.total, 2);
}

#[tokio::test]
async fn test_interest_bearing_accounts_filters_type_and_state() {
    let repo = setup().await;

    let mut checking = open_account(AccountType::Checking, 0);
    let mut savings = open_account(AccountType::Savings, 0);
    let mut fixed = open_account(AccountType::FixedDeposit, 0);
    let mut deleted_savings = open_account(AccountType::Savings, 0);
    repo.insert_account(&mut checking).await.unwrap();
    repo.insert_account(&mut savings).await.unwrap();
    repo.insert_account(&mut fixed).await.unwrap();
    repo.insert_account(&mut deleted_savings).await.unwrap();

    deleted_savings.mark_deleted("ops", "test", Utc::now());
    repo.commit(&mut [&mut deleted_savings]).await.unwrap();

    let ids = repo.interest_bearing_accounts().await.unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&savings.id()));
    assert!(ids.contains(&fixed.id()));
}

#[tokio::test]
async fn test_has_interest_credit_since() {
    let repo = setup().await;
    let mut account = open_account(AccountType::Savings, 1_000_000);
    let id = account.id();
    repo.insert_account(&mut account).await.unwrap();

    let period_start = Utc::now() - Duration::days(30);
    assert!(!repo
        .has_interest_credit_since(id, period_start)
        .await
        .unwrap());

    account
        .credit(
            Money::new(1_233, Currency::NGN).unwrap(),
            TransactionKind::InterestCredit,
            "Interest",
            None,
            Utc::now(),
        )
        .unwrap();
    repo.commit(&mut [&mut account]).await.unwrap();

    assert!(repo
        .has_interest_credit_since(id, period_start)
        .await
        .unwrap());
    // A credit before the period start does not count.
    assert!(!repo
        .has_interest_credit_since(id, Utc::now() + Duration::days(1))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_average_daily_balance_weights_each_day() {
    let repo = setup().await;
    let mut account = open_account(AccountType::Savings, 1_000_000);
    let id = account.id();
    repo.insert_account(&mut account).await.unwrap();

    let to = Utc::now();
    let from = to - Duration::days(10);

    // Deposit lands halfway through the period: five days at the opening
    // balance, five days at the topped-up balance.
    account
        .credit(
            Money::new(365_000, Currency::NGN).unwrap(),
            TransactionKind::Deposit,
            "Top-up",
            None,
            from + Duration::days(5) + Duration::hours(12),
        )
        .unwrap();
    repo.commit(&mut [&mut account]).await.unwrap();

    let avg = repo.average_daily_balance(id, from, to).await.unwrap();
    assert_eq!(avg, (5 * 1_000_000 + 5 * 1_365_000) / 10);
}

#[tokio::test]
async fn test_average_daily_balance_flat_period() {
    let repo = setup().await;
    let mut account = open_account(AccountType::Savings, 777_000);
    let id = account.id();
    repo.insert_account(&mut account).await.unwrap();

    let to = Utc::now();
    let from = to - Duration::days(30);
    let avg = repo.average_daily_balance(id, from, to).await.unwrap();
    assert_eq!(avg, 777_000);
}

#[tokio::test]
async fn test_mark_outbox_processed_is_idempotent() {
    let repo = setup().await;
    let mut account = open_account(AccountType::Checking, 100);
    repo.insert_account(&mut account).await.unwrap();

    let pending = repo.unprocessed_outbox(3, 10).await.unwrap();
    assert_eq!(pending.len(), 1);
    let row_id = pending[0].id;

    repo.mark_outbox_processed(row_id).await.unwrap();
    repo.mark_outbox_processed(row_id).await.unwrap();

    assert!(repo.unprocessed_outbox(3, 10).await.unwrap().is_empty());
}
