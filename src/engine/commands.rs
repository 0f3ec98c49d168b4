//! Transfer command and result

use serde::{Deserialize, Serialize};

use crate::domain::{Account, Currency, Entry, Transfer};

/// Intention to move `amount` minor units between two accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCommand {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
    /// Both accounts must hold this currency
    pub currency: Currency,
}

impl TransferCommand {
    pub fn new(from_account_id: i64, to_account_id: i64, amount: i64, currency: Currency) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
            currency,
        }
    }
}

/// Everything written by one committed transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub transfer: Transfer,
    pub from_entry: Entry,
    pub to_entry: Entry,
    /// Source account after the debit
    pub from_account: Account,
    /// Destination account after the credit
    pub to_account: Account,
}
