//! Token module
//!
//! Stateless bearer tokens. Two interchangeable makers sit behind the
//! [`Maker`] trait; the server picks one at startup.

mod error;
mod jwt;
mod paseto;
mod payload;

pub use error::TokenError;
pub use jwt::JwtMaker;
pub use paseto::PasetoMaker;
pub use payload::TokenPayload;

use chrono::Duration;
use std::str::FromStr;
use std::sync::Arc;

/// Minimum secret length accepted by every maker
pub const MIN_SECRET_KEY_SIZE: usize = 32;

/// Issues and verifies bearer tokens
pub trait Maker: Send + Sync {
    /// Create a token for `username` valid for `duration`
    fn create_token(&self, username: &str, duration: Duration) -> Result<String, TokenError>;

    /// Check authenticity first, then expiry
    fn verify_token(&self, token: &str) -> Result<TokenPayload, TokenError>;
}

/// Which maker the server uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenKind {
    Jwt,
    #[default]
    Paseto,
}

impl FromStr for TokenKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jwt" => Ok(Self::Jwt),
            "paseto" => Ok(Self::Paseto),
            other => Err(format!("unknown token kind '{}'", other)),
        }
    }
}

/// Build the configured maker
pub fn new_maker(kind: TokenKind, secret: impl AsRef<[u8]>) -> Result<Arc<dyn Maker>, TokenError> {
    Ok(match kind {
        TokenKind::Jwt => Arc::new(JwtMaker::new(secret)?),
        TokenKind::Paseto => Arc::new(PasetoMaker::new(secret)?),
    })
}
