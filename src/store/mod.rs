//! Store module
//!
//! Persistence ports for accounts, ledger rows and users, with a PostgreSQL
//! adapter and an in-memory adapter implementing the same contract.

mod error;
mod memory;
mod postgres;

use async_trait::async_trait;

use crate::domain::{
    Account, CreateAccountParams, CreateUserParams, Entry, ListAccountsParams, Transfer, User,
};

pub use error::{StorageErrorKind, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Account lookups plus the scoped atomic-update primitive
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Read the committed state of an account without locking it
    async fn get_account(&self, id: i64) -> Result<Option<Account>, StoreError>;

    async fn create_account(&self, params: CreateAccountParams) -> Result<Account, StoreError>;

    /// Accounts of one owner ordered by id
    async fn list_accounts(&self, params: ListAccountsParams) -> Result<Vec<Account>, StoreError>;

    /// Start an atomic unit of work
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;
}

/// A group of writes that commit together or not at all.
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] rolls it
/// back and releases every row it locked.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Read an account and hold its update right until commit or rollback
    async fn lock_account(&mut self, id: i64) -> Result<Option<Account>, StoreError>;

    async fn insert_transfer(
        &mut self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<Transfer, StoreError>;

    async fn insert_entry(&mut self, account_id: i64, amount: i64) -> Result<Entry, StoreError>;

    /// Add a signed delta to a balance and return the updated row
    async fn add_account_balance(&mut self, id: i64, delta: i64) -> Result<Account, StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<User, StoreError>;

    async fn get_user(&self, username: &str) -> Result<Option<User>, StoreError>;
}

/// Everything the HTTP layer needs from persistence
pub trait Store: AccountStore + UserStore {}

impl<T: AccountStore + UserStore> Store for T {}
