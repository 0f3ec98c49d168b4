//! Common test utilities

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;

use simple_bank::api::AppState;
use simple_bank::domain::{
    Account, CreateAccountParams, CreateUserParams, Currency, Entry, ListAccountsParams, Transfer,
    User,
};
use simple_bank::store::{AccountStore, InMemoryStore, StoreError, UnitOfWork, UserStore};
use simple_bank::token::{Maker, PasetoMaker};
use simple_bank::RetryPolicy;

pub const TEST_SECRET: &str = "abcdefghijklmnopqrstuvwxyz012345";

/// Random lowercase alphanumeric owner name
pub fn random_owner() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

/// Retry policy with delays short enough for tests
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::from_millis(1))
}

pub async fn seed_user<S: UserStore + ?Sized>(
    store: &S,
    username: &str,
    hashed_password: &str,
) -> User {
    store
        .create_user(CreateUserParams {
            username: username.to_string(),
            hashed_password: hashed_password.to_string(),
            full_name: format!("{} Test", username),
            email: format!("{}@example.com", username),
        })
        .await
        .expect("Failed to seed user")
}

pub async fn seed_account<S: AccountStore + ?Sized>(
    store: &S,
    owner: &str,
    balance: i64,
    currency: Currency,
) -> Account {
    store
        .create_account(CreateAccountParams {
            owner: owner.to_string(),
            balance,
            currency,
        })
        .await
        .expect("Failed to seed account")
}

/// New user owning a single account
pub async fn seed_owner_with_account(
    store: &InMemoryStore,
    balance: i64,
    currency: Currency,
) -> Account {
    let owner = random_owner();
    seed_user(store, &owner, "unused").await;
    seed_account(store, &owner, balance, currency).await
}

pub async fn balance_of<S: AccountStore + ?Sized>(store: &S, id: i64) -> i64 {
    store
        .get_account(id)
        .await
        .expect("Failed to read account")
        .expect("Account missing")
        .balance
}

/// Router state over an in-memory store with a PASETO maker
pub fn test_state(store: Arc<InMemoryStore>) -> (AppState, Arc<dyn Maker>) {
    let maker: Arc<dyn Maker> =
        Arc::new(PasetoMaker::new(TEST_SECRET).expect("Failed to create token maker"));
    let state = AppState::new(
        store,
        maker.clone(),
        fast_retry(3),
        chrono::Duration::minutes(15),
    );
    (state, maker)
}

// =========================================================================
// FaultyStore: injects storage failures into units of work
// =========================================================================

/// Wraps an [`InMemoryStore`] and makes selected commits fail or stall.
///
/// Failed or stalled units of work are dropped uncommitted, so the wrapped
/// store rolls them back exactly as it would after a real conflict.
pub struct FaultyStore {
    pub inner: InMemoryStore,
    conflicts_left: AtomicU32,
    fatal: AtomicBool,
    stall_commit: AtomicBool,
    begins: AtomicU32,
}

impl FaultyStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            conflicts_left: AtomicU32::new(0),
            fatal: AtomicBool::new(false),
            stall_commit: AtomicBool::new(false),
            begins: AtomicU32::new(0),
        }
    }

    /// The next `n` commits fail with a serialization conflict
    pub fn fail_with_conflicts(&self, n: u32) {
        self.conflicts_left.store(n, Ordering::SeqCst);
    }

    /// Every commit fails with a unique violation
    pub fn fail_fatally(&self, fatal: bool) {
        self.fatal.store(fatal, Ordering::SeqCst);
    }

    /// Commits never resolve
    pub fn stall_commits(&self, stall: bool) {
        self.stall_commit.store(stall, Ordering::SeqCst);
    }

    /// Number of units of work started
    pub fn begins(&self) -> u32 {
        self.begins.load(Ordering::SeqCst)
    }

    fn take_conflict(&self) -> bool {
        self.conflicts_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl AccountStore for FaultyStore {
    async fn get_account(&self, id: i64) -> Result<Option<Account>, StoreError> {
        self.inner.get_account(id).await
    }

    async fn create_account(&self, params: CreateAccountParams) -> Result<Account, StoreError> {
        self.inner.create_account(params).await
    }

    async fn list_accounts(&self, params: ListAccountsParams) -> Result<Vec<Account>, StoreError> {
        self.inner.list_accounts(params).await
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.begin().await?;

        let fault = if self.fatal.load(Ordering::SeqCst) {
            Some(Fault::Fail(StoreError::unique_violation("transfers_pkey")))
        } else if self.take_conflict() {
            Some(Fault::Fail(StoreError::Conflict(
                "could not serialize access due to concurrent update".to_string(),
            )))
        } else if self.stall_commit.load(Ordering::SeqCst) {
            Some(Fault::Stall)
        } else {
            None
        };

        Ok(match fault {
            Some(fault) => Box::new(FaultyUnitOfWork { inner, fault }) as Box<dyn UnitOfWork>,
            None => inner,
        })
    }
}

enum Fault {
    Fail(StoreError),
    Stall,
}

struct FaultyUnitOfWork {
    inner: Box<dyn UnitOfWork>,
    fault: Fault,
}

#[async_trait]
impl UnitOfWork for FaultyUnitOfWork {
    async fn lock_account(&mut self, id: i64) -> Result<Option<Account>, StoreError> {
        self.inner.lock_account(id).await
    }

    async fn insert_transfer(
        &mut self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<Transfer, StoreError> {
        self.inner
            .insert_transfer(from_account_id, to_account_id, amount)
            .await
    }

    async fn insert_entry(&mut self, account_id: i64, amount: i64) -> Result<Entry, StoreError> {
        self.inner.insert_entry(account_id, amount).await
    }

    async fn add_account_balance(&mut self, id: i64, delta: i64) -> Result<Account, StoreError> {
        self.inner.add_account_balance(id, delta).await
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        match &self.fault {
            Fault::Fail(err) => Err(err.clone()),
            Fault::Stall => std::future::pending().await,
        }
    }
}

// =========================================================================
// PostgreSQL
// =========================================================================

static MIGRATED: tokio::sync::OnceCell<()> = tokio::sync::OnceCell::const_new();

/// Connect to `DATABASE_URL` and make sure the schema exists.
///
/// Tests never truncate; each one works with freshly generated owners.
pub async fn setup_test_db() -> sqlx::PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    MIGRATED
        .get_or_init(|| async {
            let migration = include_str!("../../migrations/0001_init.sql");
            for statement in migration.split(';').filter(|s| !s.trim().is_empty()) {
                sqlx::query(statement)
                    .execute(&pool)
                    .await
                    .expect("Failed to apply migration");
            }
        })
        .await;

    assert!(
        simple_bank::db::check_schema(&pool).await.unwrap(),
        "schema incomplete"
    );
    pool
}
