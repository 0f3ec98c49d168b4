//! Token payload
//!
//! The claims carried by every token, whichever maker produced it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TokenError;

/// Identity and validity window of a bearer token.
///
/// A payload has no storage of its own; it lives only inside the token
/// string that encodes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// Random per-token id, usable as a revocation or audit key
    pub id: Uuid,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expired_at: DateTime<Utc>,
}

impl TokenPayload {
    /// Create a payload valid for `duration` from now.
    ///
    /// Fails with `DurationOutOfRange` when the expiry instant cannot be
    /// represented.
    pub fn new(username: impl Into<String>, duration: Duration) -> Result<Self, TokenError> {
        let issued_at = Utc::now();
        let expired_at = issued_at
            .checked_add_signed(duration)
            .ok_or(TokenError::DurationOutOfRange)?;
        Ok(Self {
            id: Uuid::new_v4(),
            username: username.into(),
            issued_at,
            expired_at,
        })
    }

    /// Fails with `ExpiredToken` once the expiry instant has been reached
    pub fn valid(&self) -> Result<(), TokenError> {
        if Utc::now() >= self.expired_at {
            return Err(TokenError::ExpiredToken);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_payload_window() {
        let payload = TokenPayload::new("alice", Duration::minutes(1)).unwrap();
        assert_eq!(payload.username, "alice");
        assert_eq!(payload.expired_at - payload.issued_at, Duration::minutes(1));
        assert!(payload.valid().is_ok());
    }

    #[test]
    fn test_payload_ids_are_unique() {
        let a = TokenPayload::new("alice", Duration::minutes(1)).unwrap();
        let b = TokenPayload::new("alice", Duration::minutes(1)).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_expired_payload() {
        let payload = TokenPayload::new("alice", -Duration::minutes(1)).unwrap();
        assert_eq!(payload.valid(), Err(TokenError::ExpiredToken));
    }

    #[test]
    fn test_zero_duration_is_already_expired() {
        let payload = TokenPayload::new("alice", Duration::zero()).unwrap();
        assert_eq!(payload.valid(), Err(TokenError::ExpiredToken));
    }

    #[test]
    fn test_unrepresentable_expiry_is_rejected() {
        assert_eq!(
            TokenPayload::new("alice", Duration::max_value()),
            Err(TokenError::DurationOutOfRange)
        );
        assert_eq!(
            TokenPayload::new("alice", Duration::min_value()),
            Err(TokenError::DurationOutOfRange)
        );
    }
}
