//! PostgreSQL Store
//!
//! sqlx-backed implementation of the store ports. Transfers run under
//! READ COMMITTED with explicit `SELECT ... FOR NO KEY UPDATE` row locks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::{
    Account, CreateAccountParams, CreateUserParams, Currency, Entry, ListAccountsParams, Transfer,
    User,
};

use super::{AccountStore, StoreError, UnitOfWork, UserStore};

type AccountRow = (i64, String, i64, String, DateTime<Utc>);
type TransferRow = (i64, i64, i64, i64, DateTime<Utc>);
type UserRow = (String, String, String, String, DateTime<Utc>, DateTime<Utc>);

fn account_from_row(
    (id, owner, balance, currency, created_at): AccountRow,
) -> Result<Account, StoreError> {
    let currency: Currency = currency
        .parse()
        .map_err(|e| StoreError::Backend(format!("account {}: {}", id, e)))?;

    Ok(Account {
        id,
        owner,
        balance,
        currency,
        created_at,
    })
}

fn user_from_row(
    (username, hashed_password, full_name, email, password_changed_at, created_at): UserRow,
) -> User {
    User {
        username,
        hashed_password,
        full_name,
        email,
        password_changed_at,
        created_at,
    }
}

/// PostgreSQL-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new PgStore with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn get_account(&self, id: i64) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, owner, balance, currency, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(account_from_row).transpose()
    }

    async fn create_account(&self, params: CreateAccountParams) -> Result<Account, StoreError> {
        let row: AccountRow = sqlx::query_as(
            r#"
            INSERT INTO accounts (owner, balance, currency)
            VALUES ($1, $2, $3)
            RETURNING id, owner, balance, currency, created_at
            "#,
        )
        .bind(&params.owner)
        .bind(params.balance)
        .bind(params.currency.as_str())
        .fetch_one(&self.pool)
        .await?;

        account_from_row(row)
    }

    async fn list_accounts(&self, params: ListAccountsParams) -> Result<Vec<Account>, StoreError> {
        let rows: Vec<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, owner, balance, currency, created_at
            FROM accounts
            WHERE owner = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&params.owner)
        .bind(params.limit)
        .bind(params.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(account_from_row).collect()
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx: Some(tx) }))
    }
}

/// A single database transaction.
/// sqlx rolls the transaction back when it is dropped uncommitted.
struct PgUnitOfWork {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgUnitOfWork {
    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>, StoreError> {
        self.tx
            .as_mut()
            .ok_or_else(|| StoreError::Backend("unit of work already committed".to_string()))
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn lock_account(&mut self, id: i64) -> Result<Option<Account>, StoreError> {
        let tx = self.tx()?;
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, owner, balance, currency, created_at
            FROM accounts
            WHERE id = $1
            FOR NO KEY UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(account_from_row).transpose()
    }

    async fn insert_transfer(
        &mut self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<Transfer, StoreError> {
        let tx = self.tx()?;
        let (id, from_account_id, to_account_id, amount, created_at): TransferRow =
            sqlx::query_as(
                r#"
                INSERT INTO transfers (from_account_id, to_account_id, amount)
                VALUES ($1, $2, $3)
                RETURNING id, from_account_id, to_account_id, amount, created_at
                "#,
            )
            .bind(from_account_id)
            .bind(to_account_id)
            .bind(amount)
            .fetch_one(&mut **tx)
            .await?;

        Ok(Transfer {
            id,
            from_account_id,
            to_account_id,
            amount,
            created_at,
        })
    }

    async fn insert_entry(&mut self, account_id: i64, amount: i64) -> Result<Entry, StoreError> {
        let tx = self.tx()?;
        let (id, account_id, amount, created_at): (i64, i64, i64, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO entries (account_id, amount)
            VALUES ($1, $2)
            RETURNING id, account_id, amount, created_at
            "#,
        )
        .bind(account_id)
        .bind(amount)
        .fetch_one(&mut **tx)
        .await?;

        Ok(Entry {
            id,
            account_id,
            amount,
            created_at,
        })
    }

    async fn add_account_balance(&mut self, id: i64, delta: i64) -> Result<Account, StoreError> {
        let tx = self.tx()?;
        let row: AccountRow = sqlx::query_as(
            r#"
            UPDATE accounts
            SET balance = balance + $2
            WHERE id = $1
            RETURNING id, owner, balance, currency, created_at
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_one(&mut **tx)
        .await?;

        account_from_row(row)
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| StoreError::Backend("unit of work already committed".to_string()))?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, params: CreateUserParams) -> Result<User, StoreError> {
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (username, hashed_password, full_name, email)
            VALUES ($1, $2, $3, $4)
            RETURNING username, hashed_password, full_name, email, password_changed_at, created_at
            "#,
        )
        .bind(&params.username)
        .bind(&params.hashed_password)
        .bind(&params.full_name)
        .bind(&params.email)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(row))
    }

    async fn get_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT username, hashed_password, full_name, email, password_changed_at, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }
}
