//! In-memory Store
//!
//! A thread-safe store with the same locking and constraint behaviour as the
//! PostgreSQL adapter. Each account has its own async row lock; a unit of
//! work stages its writes and publishes them only on commit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::domain::{
    Account, CreateAccountParams, CreateUserParams, Entry, ListAccountsParams, Transfer, User,
};

use super::{AccountStore, StorageErrorKind, StoreError, UnitOfWork, UserStore};

/// Committed rows
#[derive(Default)]
struct State {
    users: HashMap<String, User>,
    accounts: BTreeMap<i64, Account>,
    transfers: Vec<Transfer>,
    entries: Vec<Entry>,
}

#[derive(Default)]
struct Inner {
    state: RwLock<State>,
    row_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
    account_seq: AtomicI64,
    transfer_seq: AtomicI64,
    entry_seq: AtomicI64,
}

impl Inner {
    /// Row lock of an existing account; unknown ids get no entry
    async fn row_lock(&self, id: i64) -> Option<Arc<Mutex<()>>> {
        let mut locks = self.row_locks.lock().await;
        if let Some(lock) = locks.get(&id) {
            return Some(lock.clone());
        }
        if !self.state.read().await.accounts.contains_key(&id) {
            return None;
        }
        Some(locks.entry(id).or_default().clone())
    }
}

fn next_id(seq: &AtomicI64) -> i64 {
    seq.fetch_add(1, Ordering::SeqCst) + 1
}

/// Default `password_changed_at` for users that never changed their password
fn never() -> DateTime<Utc> {
    DateTime::from_timestamp(-62_135_596_800, 0).unwrap_or_default()
}

/// A thread-safe in-memory store.
///
/// Cloning is cheap and every clone shares the same data, so a test can keep
/// a handle for inspection while the engine and the router hold others.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All committed transfers in commit order
    pub async fn transfers(&self) -> Vec<Transfer> {
        self.inner.state.read().await.transfers.clone()
    }

    /// All committed entries in commit order
    pub async fn entries(&self) -> Vec<Entry> {
        self.inner.state.read().await.entries.clone()
    }

    /// All accounts ordered by id
    pub async fn accounts(&self) -> Vec<Account> {
        self.inner.state.read().await.accounts.values().cloned().collect()
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn get_account(&self, id: i64) -> Result<Option<Account>, StoreError> {
        Ok(self.inner.state.read().await.accounts.get(&id).cloned())
    }

    async fn create_account(&self, params: CreateAccountParams) -> Result<Account, StoreError> {
        let mut state = self.inner.state.write().await;

        if !state.users.contains_key(&params.owner) {
            return Err(StoreError::foreign_key_violation(format!(
                "owner {} does not exist",
                params.owner
            )));
        }
        if state
            .accounts
            .values()
            .any(|a| a.owner == params.owner && a.currency == params.currency)
        {
            return Err(StoreError::unique_violation(format!(
                "owner {} already has a {} account",
                params.owner, params.currency
            )));
        }
        if params.balance < 0 {
            return Err(StoreError::Constraint {
                kind: StorageErrorKind::Other,
                message: "balance must not be negative".to_string(),
            });
        }

        let account = Account {
            id: next_id(&self.inner.account_seq),
            owner: params.owner,
            balance: params.balance,
            currency: params.currency,
            created_at: Utc::now(),
        };
        state.accounts.insert(account.id, account.clone());

        Ok(account)
    }

    async fn list_accounts(&self, params: ListAccountsParams) -> Result<Vec<Account>, StoreError> {
        let offset = usize::try_from(params.offset).unwrap_or(0);
        let limit = usize::try_from(params.limit).unwrap_or(0);

        let state = self.inner.state.read().await;
        Ok(state
            .accounts
            .values()
            .filter(|a| a.owner == params.owner)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        Ok(Box::new(MemoryUnitOfWork {
            inner: self.inner.clone(),
            guards: HashMap::new(),
            locked: HashMap::new(),
            transfers: Vec::new(),
            entries: Vec::new(),
            committed: false,
        }))
    }
}

/// Staged writes plus the row locks they depend on.
/// Dropping it discards the staged writes and releases the locks.
struct MemoryUnitOfWork {
    inner: Arc<Inner>,
    guards: HashMap<i64, OwnedMutexGuard<()>>,
    locked: HashMap<i64, Account>,
    transfers: Vec<Transfer>,
    entries: Vec<Entry>,
    committed: bool,
}

impl MemoryUnitOfWork {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.committed {
            return Err(StoreError::Backend(
                "unit of work already committed".to_string(),
            ));
        }
        Ok(())
    }

    async fn account_exists(&self, id: i64) -> bool {
        self.locked.contains_key(&id) || self.inner.state.read().await.accounts.contains_key(&id)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn lock_account(&mut self, id: i64) -> Result<Option<Account>, StoreError> {
        self.ensure_open()?;
        if let Some(account) = self.locked.get(&id) {
            return Ok(Some(account.clone()));
        }

        let Some(row_lock) = self.inner.row_lock(id).await else {
            return Ok(None);
        };
        let guard = row_lock.lock_owned().await;

        let account = self.inner.state.read().await.accounts.get(&id).cloned();
        if let Some(account) = &account {
            self.guards.insert(id, guard);
            self.locked.insert(id, account.clone());
        }

        Ok(account)
    }

    async fn insert_transfer(
        &mut self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<Transfer, StoreError> {
        self.ensure_open()?;
        for id in [from_account_id, to_account_id] {
            if !self.account_exists(id).await {
                return Err(StoreError::foreign_key_violation(format!(
                    "account {} does not exist",
                    id
                )));
            }
        }
        if amount <= 0 {
            return Err(StoreError::Constraint {
                kind: StorageErrorKind::Other,
                message: "transfer amount must be positive".to_string(),
            });
        }

        let transfer = Transfer {
            id: next_id(&self.inner.transfer_seq),
            from_account_id,
            to_account_id,
            amount,
            created_at: Utc::now(),
        };
        self.transfers.push(transfer.clone());

        Ok(transfer)
    }

    async fn insert_entry(&mut self, account_id: i64, amount: i64) -> Result<Entry, StoreError> {
        self.ensure_open()?;
        if !self.account_exists(account_id).await {
            return Err(StoreError::foreign_key_violation(format!(
                "account {} does not exist",
                account_id
            )));
        }

        let entry = Entry {
            id: next_id(&self.inner.entry_seq),
            account_id,
            amount,
            created_at: Utc::now(),
        };
        self.entries.push(entry.clone());

        Ok(entry)
    }

    async fn add_account_balance(&mut self, id: i64, delta: i64) -> Result<Account, StoreError> {
        self.ensure_open()?;
        if !self.locked.contains_key(&id) && self.lock_account(id).await?.is_none() {
            return Err(StoreError::Backend(format!("account {} does not exist", id)));
        }

        let account = self
            .locked
            .get_mut(&id)
            .ok_or_else(|| StoreError::Backend(format!("account {} is not locked", id)))?;
        let balance = account
            .balance
            .checked_add(delta)
            .ok_or_else(|| StoreError::Backend("balance out of range".to_string()))?;
        if balance < 0 {
            return Err(StoreError::Constraint {
                kind: StorageErrorKind::Other,
                message: format!("balance of account {} must not be negative", id),
            });
        }
        account.balance = balance;

        Ok(account.clone())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        {
            let mut state = self.inner.state.write().await;
            for (id, account) in self.locked.drain() {
                state.accounts.insert(id, account);
            }
            state.transfers.append(&mut self.transfers);
            state.entries.append(&mut self.entries);
        }
        self.committed = true;
        self.guards.clear();
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, params: CreateUserParams) -> Result<User, StoreError> {
        let mut state = self.inner.state.write().await;

        if state.users.contains_key(&params.username) {
            return Err(StoreError::unique_violation(format!(
                "username {} already exists",
                params.username
            )));
        }
        if state.users.values().any(|u| u.email == params.email) {
            return Err(StoreError::unique_violation(format!(
                "email {} already exists",
                params.email
            )));
        }

        let user = User {
            username: params.username,
            hashed_password: params.hashed_password,
            full_name: params.full_name,
            email: params.email,
            password_changed_at: never(),
            created_at: Utc::now(),
        };
        state.users.insert(user.username.clone(), user.clone());

        Ok(user)
    }

    async fn get_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.inner.state.read().await.users.get(username).cloned())
    }
}
