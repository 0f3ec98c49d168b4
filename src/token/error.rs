//! Token Errors

/// Errors returned by token makers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Secret key shorter than the minimum; no maker is created
    #[error("Invalid key size: must be at least {min} bytes, got {actual}")]
    KeyTooShort { min: usize, actual: usize },

    /// Malformed token, failed authentication or unexpected algorithm
    #[error("token is invalid")]
    InvalidToken,

    /// Authentic token whose expiry has passed
    #[error("token has expired")]
    ExpiredToken,

    /// Requested lifetime puts the expiry outside the representable range
    #[error("token duration out of range")]
    DurationOutOfRange,

    /// Failure inside a cryptographic primitive while issuing a token
    #[error("Token crypto error: {0}")]
    Crypto(String),
}
