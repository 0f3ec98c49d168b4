//! Transfer Engine
//!
//! Moves funds between two accounts as one atomic unit of work: one transfer
//! row, two entries and two balance updates commit together or not at all.

use std::sync::Arc;

use crate::domain::{Account, Amount, Balance, Currency};
use crate::store::{AccountStore, StoreError, UnitOfWork};

use super::{RetryPolicy, TransferCommand, TransferError, TransferResult};

/// Executes transfers against an [`AccountStore`].
///
/// Row locks are always taken in ascending account id order, so a transfer
/// A→B and a concurrent transfer B→A queue on the same first lock instead of
/// waiting on each other.
#[derive(Clone)]
pub struct TransferEngine {
    store: Arc<dyn AccountStore>,
    retry: RetryPolicy,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn AccountStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Execute the transfer command.
    ///
    /// Calling this twice with the same command moves the funds twice.
    /// Dropping the returned future before it resolves rolls back whatever
    /// the in-flight unit of work had written.
    pub async fn execute(&self, command: TransferCommand) -> Result<TransferResult, TransferError> {
        if command.from_account_id == command.to_account_id {
            return Err(TransferError::SameAccount);
        }
        let amount =
            Amount::new(command.amount).map_err(|_| TransferError::InvalidAmount(command.amount))?;

        self.check_account(command.from_account_id, command.currency)
            .await?;
        self.check_account(command.to_account_id, command.currency)
            .await?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_execute(&command, amount).await {
                Ok(result) => {
                    tracing::debug!(
                        transfer_id = result.transfer.id,
                        from_account_id = command.from_account_id,
                        to_account_id = command.to_account_id,
                        amount = command.amount,
                        attempt,
                        "Transfer committed"
                    );
                    return Ok(result);
                }
                Err(TransferError::TransactionFatal(ref e)) if e.is_retryable() => {
                    if attempt >= self.retry.max_attempts {
                        return Err(TransferError::TransactionConflict { attempts: attempt });
                    }
                    let delay = self.retry.backoff(attempt);
                    tracing::warn!(
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Transfer conflict, retrying (attempt {}/{})",
                        attempt,
                        self.retry.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Reject unknown accounts and currency mismatches before any write
    async fn check_account(&self, id: i64, currency: Currency) -> Result<Account, TransferError> {
        let account = self
            .store
            .get_account(id)
            .await?
            .ok_or(TransferError::AccountNotFound(id))?;
        ensure_currency(&account, currency)?;
        Ok(account)
    }

    /// Single attempt; the unit of work rolls back on every early return
    async fn try_execute(
        &self,
        command: &TransferCommand,
        amount: Amount,
    ) -> Result<TransferResult, TransferError> {
        let mut uow = self.store.begin().await?;

        let (from, to) = lock_pair(
            uow.as_mut(),
            command.from_account_id,
            command.to_account_id,
        )
        .await?;
        ensure_currency(&from, command.currency)?;
        ensure_currency(&to, command.currency)?;

        let from_balance = Balance::new(from.balance).map_err(corrupt_balance(from.id))?;
        from_balance
            .debit(amount)
            .map_err(|_| TransferError::InsufficientFunds {
                account_id: from.id,
                balance: from.balance,
                amount: amount.value(),
            })?;
        Balance::new(to.balance)
            .map_err(corrupt_balance(to.id))?
            .credit(amount)
            .map_err(|_| {
                TransferError::TransactionFatal(StoreError::Backend(format!(
                    "account {} balance would overflow",
                    to.id
                )))
            })?;

        let transfer = uow
            .insert_transfer(from.id, to.id, amount.value())
            .await?;
        let from_entry = uow.insert_entry(from.id, -amount.value()).await?;
        let to_entry = uow.insert_entry(to.id, amount.value()).await?;

        let (from_account, to_account) = if from.id < to.id {
            let from_account = uow.add_account_balance(from.id, -amount.value()).await?;
            let to_account = uow.add_account_balance(to.id, amount.value()).await?;
            (from_account, to_account)
        } else {
            let to_account = uow.add_account_balance(to.id, amount.value()).await?;
            let from_account = uow.add_account_balance(from.id, -amount.value()).await?;
            (from_account, to_account)
        };

        uow.commit().await?;

        Ok(TransferResult {
            transfer,
            from_entry,
            to_entry,
            from_account,
            to_account,
        })
    }
}

/// Lock both accounts in ascending id order and return them as (from, to)
async fn lock_pair(
    uow: &mut dyn UnitOfWork,
    from_account_id: i64,
    to_account_id: i64,
) -> Result<(Account, Account), TransferError> {
    let first_id = from_account_id.min(to_account_id);
    let second_id = from_account_id.max(to_account_id);

    let first = uow
        .lock_account(first_id)
        .await?
        .ok_or(TransferError::AccountNotFound(first_id))?;
    let second = uow
        .lock_account(second_id)
        .await?
        .ok_or(TransferError::AccountNotFound(second_id))?;

    if first.id == from_account_id {
        Ok((first, second))
    } else {
        Ok((second, first))
    }
}

fn ensure_currency(account: &Account, currency: Currency) -> Result<(), TransferError> {
    if account.currency != currency {
        return Err(TransferError::CurrencyMismatch {
            account_id: account.id,
            expected: currency,
            found: account.currency,
        });
    }
    Ok(())
}

fn corrupt_balance(account_id: i64) -> impl Fn(crate::domain::AmountError) -> TransferError {
    move |e| {
        TransferError::TransactionFatal(StoreError::Backend(format!(
            "account {} holds an invalid balance: {}",
            account_id, e
        )))
    }
}
