//! Reversible AES-CBC tokens with optional embedded expiry.

use tollgate_common::constants::{EXPIRY_BLOCK_LEN, handlers};
use tollgate_common::{CipherSettings, ExpirationPolicy, Result, TokenError};

use super::CaptchaHandler;
use crate::cipher::{self, DerivedKey, TokenKey};
use crate::token::{TokenParts, decode_expiry, encode_expiry};

/// Encrypts the solution itself; validation decrypts and compares
#[derive(Debug, Clone)]
pub struct CipherHandler {
    identity: String,
    settings: CipherSettings,
    expiration: Option<ExpirationPolicy>,
}

impl CipherHandler {
    pub fn new(settings: CipherSettings) -> Self {
        Self {
            identity: handlers::CIPHER.to_string(),
            settings,
            expiration: None,
        }
    }

    /// Embed an encrypted expiry in every issued token
    pub fn with_expiration(mut self, policy: ExpirationPolicy) -> Self {
        self.expiration = Some(policy);
        self
    }

    /// Register under a different key, e.g. several expiry windows side by side
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// The caller's key must come from the settings this handler encrypts with
    fn key<'k>(&self, key: &'k TokenKey<'_>) -> Result<&'k DerivedKey> {
        if key.settings() != &self.settings {
            return Err(TokenError::Configuration(format!(
                "handler {} uses {}, key was derived with {}",
                self.identity,
                self.settings,
                key.settings()
            )));
        }
        key.get()
    }
}

impl CaptchaHandler for CipherHandler {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn issue(&self, solution: &str, key: &TokenKey<'_>) -> Result<String> {
        let key = self.key(key)?;
        let iv = cipher::generate_iv();
        let ciphertext = cipher::encrypt(&self.settings, key, &iv, solution.as_bytes())?;

        // Expiry and solution share key and IV
        let expiry_block = match &self.expiration {
            Some(policy) => {
                let expires_at = policy.expiry_from_now();
                let encrypted = cipher::encrypt(&self.settings, key, &iv, &encode_expiry(expires_at))?;
                let block: [u8; EXPIRY_BLOCK_LEN] = encrypted.as_slice().try_into().map_err(|_| {
                    TokenError::Configuration(format!(
                        "expiry encrypted to {} bytes, layout needs {EXPIRY_BLOCK_LEN}",
                        encrypted.len()
                    ))
                })?;
                tracing::debug!(handler = %self.identity, expires_at, "Embedding token expiry");
                Some(block)
            }
            None => None,
        };

        Ok(TokenParts {
            iv,
            expiry_block,
            ciphertext,
        }
        .encode())
    }

    fn verify(&self, answer: &str, token: &str, key: &TokenKey<'_>) -> Result<bool> {
        let parts = TokenParts::decode(token, self.expiration.is_some())?;
        let key = self.key(key)?;

        // Expiry is checked first so a stale token fails regardless of the answer
        if let (Some(policy), Some(block)) = (&self.expiration, &parts.expiry_block) {
            let plaintext = cipher::decrypt(&self.settings, key, &parts.iv, block)?;
            let expired_at = decode_expiry(&plaintext)?;
            if policy.is_expired(expired_at) {
                return Err(TokenError::Expired {
                    expired_at,
                    now: policy.now(),
                });
            }
        }

        let solution = cipher::decrypt(&self.settings, key, &parts.iv, &parts.ciphertext)?;
        Ok(solution == answer.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};
    use tollgate_common::KeySize;

    fn settings() -> CipherSettings {
        CipherSettings::default().with_iterations(1_000)
    }

    fn issue(handler: &CipherHandler, solution: &str, salt: &[u8]) -> String {
        handler.issue(solution, &TokenKey::new(settings(), "pw", salt)).unwrap()
    }

    fn verify(handler: &CipherHandler, answer: &str, token: &str, salt: &[u8]) -> Result<bool> {
        handler.verify(answer, token, &TokenKey::new(settings(), "pw", salt))
    }

    fn manual_clock(start: i64) -> (Arc<AtomicI64>, ExpirationPolicy) {
        let now = Arc::new(AtomicI64::new(start));
        let reader = now.clone();
        let policy = ExpirationPolicy::with_clock(1000, Arc::new(move || reader.load(Ordering::SeqCst)));
        (now, policy)
    }

    #[test]
    fn test_issue_and_verify() {
        let handler = CipherHandler::new(settings());
        let token = issue(&handler, "X7KQ2", b"session-1");

        assert!(verify(&handler, "X7KQ2", &token, b"session-1").unwrap());
        assert!(!verify(&handler, "X7KQ3", &token, b"session-1").unwrap());
    }

    #[test]
    fn test_case_sensitive_comparison() {
        let handler = CipherHandler::new(settings());
        let token = issue(&handler, "AbCd", b"s");
        assert!(!verify(&handler, "abcd", &token, b"s").unwrap());
    }

    #[test]
    fn test_wrong_salt_rejected() {
        let handler = CipherHandler::new(settings());
        let token = issue(&handler, "X7KQ2", b"session-1");
        let outcome = verify(&handler, "X7KQ2", &token, b"session-2");
        assert!(!matches!(outcome, Ok(true)));
    }

    #[test]
    fn test_token_length_without_expiry() {
        let handler = CipherHandler::new(settings());
        let token = issue(&handler, "X7KQ2", b"s");
        let parts = TokenParts::decode(&token, false).unwrap();
        assert_eq!(parts.ciphertext.len(), 16);
    }

    #[test]
    fn test_expiry_boundary() {
        let (now, policy) = manual_clock(1_000_000);
        let handler = CipherHandler::new(settings()).with_expiration(policy);
        let token = issue(&handler, "X7KQ2", b"s");

        now.store(1_000_999, Ordering::SeqCst);
        assert!(verify(&handler, "X7KQ2", &token, b"s").unwrap());

        now.store(1_001_000, Ordering::SeqCst);
        assert!(verify(&handler, "X7KQ2", &token, b"s").unwrap());

        now.store(1_001_001, Ordering::SeqCst);
        let err = verify(&handler, "X7KQ2", &token, b"s").unwrap_err();
        assert!(matches!(
            err,
            TokenError::Expired {
                expired_at: 1_001_000,
                now: 1_001_001
            }
        ));
    }

    #[test]
    fn test_expired_even_with_wrong_answer() {
        let (now, policy) = manual_clock(0);
        let handler = CipherHandler::new(settings()).with_expiration(policy);
        let token = issue(&handler, "X7KQ2", b"s");

        now.store(5_000, Ordering::SeqCst);
        assert!(matches!(
            verify(&handler, "nope", &token, b"s"),
            Err(TokenError::Expired { .. })
        ));
    }

    #[test]
    fn test_expiring_layout_has_expiry_block() {
        let (_now, policy) = manual_clock(0);
        let handler = CipherHandler::new(settings()).with_expiration(policy);
        let token = issue(&handler, "X7KQ2", b"s");
        let parts = TokenParts::decode(&token, true).unwrap();
        assert!(parts.expiry_block.is_some());
        assert_eq!(parts.ciphertext.len(), 16);
    }

    /// Expiring token assembled by hand with the given expiry plaintext
    fn token_with_expiry(expiry_plaintext: &[u8]) -> String {
        let key = crate::cipher::derive_key(&settings(), "pw", b"s").unwrap();
        let iv = cipher::generate_iv();
        let block = cipher::encrypt(&settings(), &key, &iv, expiry_plaintext).unwrap();
        TokenParts {
            iv,
            expiry_block: Some(block.as_slice().try_into().unwrap()),
            ciphertext: cipher::encrypt(&settings(), &key, &iv, b"X7KQ2").unwrap(),
        }
        .encode()
    }

    #[test]
    fn test_accepts_minimal_and_fixed_width_expiry() {
        let (_now, policy) = manual_clock(1_700_000_000_000);
        let handler = CipherHandler::new(settings()).with_expiration(policy);
        let expires_at: i64 = 1_700_000_060_000;

        let minimal = encode_expiry(expires_at);
        assert_eq!(minimal.len(), 6);
        let token = token_with_expiry(&minimal);
        assert!(verify(&handler, "X7KQ2", &token, b"s").unwrap());

        let token = token_with_expiry(&expires_at.to_be_bytes());
        assert!(verify(&handler, "X7KQ2", &token, b"s").unwrap());
    }

    #[test]
    fn test_oversized_expiry_is_integrity_error() {
        let (_now, policy) = manual_clock(0);
        let handler = CipherHandler::new(settings()).with_expiration(policy);
        let token = token_with_expiry(&[0u8; 9]);
        assert!(matches!(
            verify(&handler, "X7KQ2", &token, b"s"),
            Err(TokenError::Integrity(_))
        ));
    }

    #[test]
    fn test_short_token_malformed_for_expiring_handler() {
        let (_now, policy) = manual_clock(0);
        let plain = CipherHandler::new(settings());
        let expiring = CipherHandler::new(settings()).with_expiration(policy);

        // Truncated to 6 bytes, below the 32 byte expiring header
        let token = issue(&plain, "X", b"s");
        assert!(matches!(
            verify(&expiring, "X", &token[..8], b"s"),
            Err(TokenError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_key_from_other_settings_is_configuration_error() {
        let handler = CipherHandler::new(settings());
        let other = CipherSettings {
            key_size: KeySize::Aes128,
            ..settings()
        };
        let err = handler.issue("X7KQ2", &TokenKey::new(other, "pw", b"s")).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_custom_identity() {
        let handler = CipherHandler::new(settings()).with_identity("cipher-5m");
        assert_eq!(handler.identity(), "cipher-5m");
    }
}
