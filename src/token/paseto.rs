//! PASETO-style maker
//!
//! `v2.local.` tokens: the payload is sealed with XChaCha20-Poly1305 so it
//! is opaque on the wire, and the version header is bound as associated
//! data. The layout follows PASETO v2.local but uses the header itself as
//! associated data instead of PASETO's pre-authentication encoding, so the
//! tokens are not meant to be read by other PASETO libraries.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use chrono::Duration;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;

use super::{Maker, TokenError, TokenPayload, MIN_SECRET_KEY_SIZE};

const HEADER: &str = "v2.local.";
const NONCE_SIZE: usize = 24;

/// Authenticated-encryption token maker
pub struct PasetoMaker {
    cipher: XChaCha20Poly1305,
}

impl PasetoMaker {
    /// The 256-bit cipher key is the SHA-256 digest of the secret, so any
    /// secret of at least 32 bytes is accepted.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, TokenError> {
        let secret = secret.as_ref();
        if secret.len() < MIN_SECRET_KEY_SIZE {
            return Err(TokenError::KeyTooShort {
                min: MIN_SECRET_KEY_SIZE,
                actual: secret.len(),
            });
        }

        let key = Sha256::digest(secret);
        Ok(Self {
            cipher: XChaCha20Poly1305::new(Key::from_slice(&key)),
        })
    }
}

impl fmt::Debug for PasetoMaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasetoMaker").finish_non_exhaustive()
    }
}

impl Maker for PasetoMaker {
    fn create_token(&self, username: &str, duration: Duration) -> Result<String, TokenError> {
        let payload = TokenPayload::new(username, duration)?;
        let message = serde_json::to_vec(&payload).map_err(|e| TokenError::Crypto(e.to_string()))?;

        let mut nonce = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: &message,
                    aad: HEADER.as_bytes(),
                },
            )
            .map_err(|e| TokenError::Crypto(e.to_string()))?;

        let mut body = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        body.extend_from_slice(&nonce);
        body.extend_from_slice(&ciphertext);

        Ok(format!("{}{}", HEADER, URL_SAFE_NO_PAD.encode(body)))
    }

    fn verify_token(&self, token: &str) -> Result<TokenPayload, TokenError> {
        let body = token
            .strip_prefix(HEADER)
            .ok_or(TokenError::InvalidToken)?;
        let body = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|_| TokenError::InvalidToken)?;
        if body.len() <= NONCE_SIZE {
            return Err(TokenError::InvalidToken);
        }

        let (nonce, ciphertext) = body.split_at(NONCE_SIZE);
        let message = self
            .cipher
            .decrypt(
                XNonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: HEADER.as_bytes(),
                },
            )
            .map_err(|_| TokenError::InvalidToken)?;

        let payload: TokenPayload =
            serde_json::from_slice(&message).map_err(|_| TokenError::InvalidToken)?;

        payload.valid()?;
        Ok(payload)
    }
}
