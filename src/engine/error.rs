//! Transfer Errors

use thiserror::Error;

use crate::domain::Currency;
use crate::store::StoreError;

/// Reasons a transfer did not commit.
///
/// Every variant guarantees that none of the transfer's writes are visible.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// Source and destination are the same account
    #[error("Cannot transfer to the same account")]
    SameAccount,

    /// Amount is zero or negative
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    #[error("Account not found: {0}")]
    AccountNotFound(i64),

    #[error("Account {account_id} currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch {
        account_id: i64,
        expected: Currency,
        found: Currency,
    },

    #[error("Insufficient funds in account {account_id}: balance {balance}, required {amount}")]
    InsufficientFunds {
        account_id: i64,
        balance: i64,
        amount: i64,
    },

    /// Conflicts persisted through every retry
    #[error("Transaction conflict after {attempts} attempts")]
    TransactionConflict { attempts: u32 },

    /// Non-retryable storage failure
    #[error("Transaction failed: {0}")]
    TransactionFatal(#[source] StoreError),
}

impl TransferError {
    /// Check if this is a client error (caller's input or account state)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::SameAccount
                | Self::InvalidAmount(_)
                | Self::AccountNotFound(_)
                | Self::CurrencyMismatch { .. }
                | Self::InsufficientFunds { .. }
        )
    }
}

impl From<StoreError> for TransferError {
    fn from(err: StoreError) -> Self {
        TransferError::TransactionFatal(err)
    }
}
