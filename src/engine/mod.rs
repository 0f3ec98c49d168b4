//! Transfer engine module
//!
//! Atomic fund movement between two accounts with canonical lock ordering
//! and bounded retry on storage conflicts.

mod commands;
mod error;
mod retry;
mod transfer;

pub use commands::{TransferCommand, TransferResult};
pub use error::TransferError;
pub use retry::RetryPolicy;
pub use transfer::TransferEngine;
