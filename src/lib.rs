//! simple_bank Library
//!
//! Transfer engine, token makers and the HTTP boundary around them.
//! Re-exports modules for integration testing and the binaries.

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
mod error;
pub mod password;
pub mod store;
pub mod token;

pub use config::{Config, LogFormat};
pub use error::{AppError, AppResult, ErrorResponse};
pub use domain::{Account, Amount, AmountError, Balance, Currency, Entry, Transfer, User};
pub use engine::{RetryPolicy, TransferCommand, TransferEngine, TransferError, TransferResult};
