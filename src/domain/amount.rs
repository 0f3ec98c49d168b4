//! Amount type
//!
//! Domain primitives for monetary values held in minor currency units
//! (cents for USD). Amounts are validated at construction time, so an
//! invalid transfer amount or a negative balance cannot be represented.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Amount represents a strictly positive transfer amount in minor units.
///
/// # Invariants
/// - Value is always positive (> 0)
///
/// # Example
/// ```
/// use simple_bank::domain::Amount;
///
/// let amount = Amount::new(250).unwrap();
/// assert_eq!(amount.value(), 250);
/// assert!(Amount::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

/// Errors that can occur when creating or combining amounts
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(i64),

    #[error("Balance must not be negative (got {0})")]
    Negative(i64),

    #[error("Insufficient balance: available {available}, required {required}")]
    Insufficient { available: i64, required: i64 },

    #[error("Amount exceeds the representable range")]
    Overflow,
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    pub fn new(value: i64) -> Result<Self, AmountError> {
        if value <= 0 {
            return Err(AmountError::NotPositive(value));
        }
        Ok(Self(value))
    }

    /// Get the underlying minor-unit value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Amount {
    type Error = AmountError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Balance represents an account balance (zero or positive).
/// Unlike Amount, Balance can be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Balance(i64);

impl Balance {
    /// Create a new balance (zero or positive)
    pub fn new(value: i64) -> Result<Self, AmountError> {
        if value < 0 {
            return Err(AmountError::Negative(value));
        }
        Ok(Self(value))
    }

    /// Create a zero balance
    pub fn zero() -> Self {
        Self(0)
    }

    /// Get the underlying value
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Check if balance is sufficient for withdrawal
    pub fn is_sufficient_for(&self, amount: Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Add amount to balance
    pub fn credit(&self, amount: Amount) -> Result<Balance, AmountError> {
        self.0
            .checked_add(amount.value())
            .map(Self)
            .ok_or(AmountError::Overflow)
    }

    /// Subtract amount from balance
    pub fn debit(&self, amount: Amount) -> Result<Balance, AmountError> {
        if !self.is_sufficient_for(amount) {
            return Err(AmountError::Insufficient {
                available: self.0,
                required: amount.value(),
            });
        }
        Ok(Self(self.0 - amount.value()))
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}

impl TryFrom<i64> for Balance {
    type Error = AmountError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Balance::new(value)
    }
}

impl From<Balance> for i64 {
    fn from(balance: Balance) -> Self {
        balance.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_positive() {
        let amount = Amount::new(100);
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().value(), 100);
    }

    #[test]
    fn test_amount_zero_rejected() {
        assert!(matches!(Amount::new(0), Err(AmountError::NotPositive(0))));
    }

    #[test]
    fn test_amount_negative_rejected() {
        assert!(matches!(Amount::new(-5), Err(AmountError::NotPositive(-5))));
    }

    #[test]
    fn test_amount_deserialize_rejects_zero() {
        let result: Result<Amount, _> = serde_json::from_str("0");
        assert!(result.is_err());

        let amount: Amount = serde_json::from_str("42").unwrap();
        assert_eq!(amount.value(), 42);
    }

    #[test]
    fn test_balance_negative_rejected() {
        assert!(matches!(Balance::new(-1), Err(AmountError::Negative(-1))));
        assert_eq!(Balance::new(0).unwrap(), Balance::zero());
    }

    #[test]
    fn test_balance_credit_debit() {
        let balance = Balance::zero();

        let balance = balance.credit(Amount::new(100).unwrap()).unwrap();
        assert_eq!(balance.value(), 100);

        let balance = balance.debit(Amount::new(30).unwrap()).unwrap();
        assert_eq!(balance.value(), 70);
    }

    #[test]
    fn test_balance_debit_to_exactly_zero() {
        let balance = Balance::new(30).unwrap();
        let balance = balance.debit(Amount::new(30).unwrap()).unwrap();
        assert_eq!(balance, Balance::zero());
    }

    #[test]
    fn test_balance_insufficient() {
        let balance = Balance::new(50).unwrap();
        let amount = Amount::new(100).unwrap();

        assert!(!balance.is_sufficient_for(amount));
        assert_eq!(
            balance.debit(amount),
            Err(AmountError::Insufficient {
                available: 50,
                required: 100
            })
        );
    }

    #[test]
    fn test_balance_credit_overflow() {
        let balance = Balance::new(i64::MAX).unwrap();
        assert_eq!(
            balance.credit(Amount::new(1).unwrap()),
            Err(AmountError::Overflow)
        );
    }
}
