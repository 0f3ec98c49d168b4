//! PostgreSQL store integration tests
//!
//! Run with: DATABASE_URL=postgres://... cargo test --test integration_postgres -- --ignored

use std::sync::Arc;
use std::time::Duration;

use simple_bank::domain::{CreateAccountParams, Currency};
use simple_bank::store::{AccountStore, PgStore, StorageErrorKind, UnitOfWork};
use simple_bank::{TransferCommand, TransferEngine, TransferError};

mod common;

use common::{balance_of, fast_retry, random_owner, seed_account, seed_user, setup_test_db};

async fn pg_store() -> Arc<PgStore> {
    Arc::new(PgStore::new(setup_test_db().await))
}

async fn seed_pg_account(store: &PgStore, balance: i64, currency: Currency) -> i64 {
    let owner = random_owner();
    seed_user(store, &owner, "unused").await;
    seed_account(store, &owner, balance, currency).await.id
}

async fn transfer_count(store: &PgStore, account_id: i64) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM transfers WHERE from_account_id = $1 OR to_account_id = $1",
    )
        .bind(account_id)
        .fetch_one(store.pool())
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_pg_transfer_end_to_end() {
    let store = pg_store().await;
    let a = seed_pg_account(&store, 100, Currency::USD).await;
    let b = seed_pg_account(&store, 50, Currency::USD).await;
    let engine = TransferEngine::new(store.clone(), fast_retry(3));

    let result = engine
        .execute(TransferCommand::new(a, b, 30, Currency::USD))
        .await
        .unwrap();

    assert_eq!(result.transfer.amount, 30);
    assert_eq!(result.from_entry.amount, -30);
    assert_eq!(result.to_entry.amount, 30);
    assert_eq!(balance_of(&*store, a).await, 70);
    assert_eq!(balance_of(&*store, b).await, 80);
    assert_eq!(transfer_count(&store, a).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL"]
async fn test_pg_opposite_transfers() {
    let store = pg_store().await;
    let a = seed_pg_account(&store, 1_000, Currency::USD).await;
    let b = seed_pg_account(&store, 1_000, Currency::USD).await;
    let engine = TransferEngine::new(store.clone(), fast_retry(5));

    let mut handles = Vec::new();
    for i in 0..10 {
        let engine = engine.clone();
        let command = if i % 2 == 0 {
            TransferCommand::new(a, b, 10, Currency::USD)
        } else {
            TransferCommand::new(b, a, 7, Currency::USD)
        };
        handles.push(tokio::spawn(async move { engine.execute(command).await }));
    }

    let all = async {
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    };
    tokio::time::timeout(Duration::from_secs(30), all)
        .await
        .expect("opposite transfers deadlocked");

    assert_eq!(balance_of(&*store, a).await, 1_000 - 50 + 35);
    assert_eq!(balance_of(&*store, b).await, 1_000 + 50 - 35);
    assert_eq!(transfer_count(&store, a).await, 10);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_pg_insufficient_funds_rolls_back() {
    let store = pg_store().await;
    let a = seed_pg_account(&store, 10, Currency::EUR).await;
    let b = seed_pg_account(&store, 0, Currency::EUR).await;
    let engine = TransferEngine::new(store.clone(), fast_retry(3));

    let err = engine
        .execute(TransferCommand::new(a, b, 11, Currency::EUR))
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::InsufficientFunds { .. }));
    assert_eq!(balance_of(&*store, a).await, 10);
    assert_eq!(transfer_count(&store, a).await, 0);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_pg_dropped_unit_of_work_rolls_back() {
    let store = pg_store().await;
    let a = seed_pg_account(&store, 100, Currency::USD).await;
    let b = seed_pg_account(&store, 0, Currency::USD).await;

    {
        let mut uow = store.begin().await.unwrap();
        uow.lock_account(a).await.unwrap().unwrap();
        uow.insert_transfer(a, b, 40).await.unwrap();
        uow.insert_entry(a, -40).await.unwrap();
        uow.add_account_balance(a, -40).await.unwrap();
    }

    assert_eq!(balance_of(&*store, a).await, 100);
    assert_eq!(transfer_count(&store, a).await, 0);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_pg_constraint_classification() {
    let store = pg_store().await;

    let err = store
        .create_account(CreateAccountParams {
            owner: random_owner(),
            balance: 0,
            currency: Currency::USD,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), StorageErrorKind::ForeignKeyViolation);

    let owner = random_owner();
    seed_user(&*store, &owner, "unused").await;
    seed_account(&*store, &owner, 0, Currency::CAD).await;
    let err = store
        .create_account(CreateAccountParams {
            owner,
            balance: 0,
            currency: Currency::CAD,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), StorageErrorKind::UniqueViolation);
    assert!(!err.is_retryable());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_pg_list_accounts_pages() {
    let store = pg_store().await;
    let owner = random_owner();
    seed_user(&*store, &owner, "unused").await;
    for currency in Currency::ALL {
        seed_account(&*store, &owner, 0, currency).await;
    }

    let page = store
        .list_accounts(simple_bank::domain::ListAccountsParams {
            owner: owner.clone(),
            limit: 2,
            offset: 0,
        })
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
    assert!(page[0].id < page[1].id);

    let rest = store
        .list_accounts(simple_bank::domain::ListAccountsParams {
            owner,
            limit: 2,
            offset: 2,
        })
        .await
        .unwrap();
    assert_eq!(rest.len(), 1);
}
