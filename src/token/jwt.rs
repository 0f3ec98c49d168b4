//! JWT maker
//!
//! Compact `header.claims.signature` tokens signed with HMAC-SHA256.
//! The claims are readable by anyone; only integrity is protected.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;

use super::{Maker, TokenError, TokenPayload, MIN_SECRET_KEY_SIZE};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// HMAC-SHA256 signed JSON Web Token maker
pub struct JwtMaker {
    secret: Vec<u8>,
}

impl JwtMaker {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, TokenError> {
        let secret = secret.as_ref();
        if secret.len() < MIN_SECRET_KEY_SIZE {
            return Err(TokenError::KeyTooShort {
                min: MIN_SECRET_KEY_SIZE,
                actual: secret.len(),
            });
        }
        Ok(Self {
            secret: secret.to_vec(),
        })
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| TokenError::Crypto(e.to_string()))
    }
}

impl fmt::Debug for JwtMaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtMaker").finish_non_exhaustive()
    }
}

impl Maker for JwtMaker {
    fn create_token(&self, username: &str, duration: Duration) -> Result<String, TokenError> {
        let payload = TokenPayload::new(username, duration)?;
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };

        let header = serde_json::to_vec(&header).map_err(|e| TokenError::Crypto(e.to_string()))?;
        let claims = serde_json::to_vec(&payload).map_err(|e| TokenError::Crypto(e.to_string()))?;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(claims)
        );

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    fn verify_token(&self, token: &str) -> Result<TokenPayload, TokenError> {
        let mut parts = token.split('.');
        let (Some(header), Some(claims), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::InvalidToken);
        };

        // The algorithm is fixed by the maker, never chosen by the token
        let decoded_header = URL_SAFE_NO_PAD
            .decode(header)
            .map_err(|_| TokenError::InvalidToken)?;
        let decoded_header: Header =
            serde_json::from_slice(&decoded_header).map_err(|_| TokenError::InvalidToken)?;
        if decoded_header.alg != ALGORITHM {
            return Err(TokenError::InvalidToken);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::InvalidToken)?;
        let mut mac = self.mac()?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(claims.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidToken)?;

        let claims = URL_SAFE_NO_PAD
            .decode(claims)
            .map_err(|_| TokenError::InvalidToken)?;
        let payload: TokenPayload =
            serde_json::from_slice(&claims).map_err(|_| TokenError::InvalidToken)?;

        payload.valid()?;
        Ok(payload)
    }
}
