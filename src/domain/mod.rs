//! Domain module
//!
//! Core domain types shared by the store, the transfer engine and the API.

pub mod amount;
pub mod currency;
pub mod models;

pub use amount::{Amount, AmountError, Balance};
pub use currency::{Currency, UnsupportedCurrency};
pub use models::{
    Account, CreateAccountParams, CreateUserParams, Entry, ListAccountsParams, Transfer, User,
};
