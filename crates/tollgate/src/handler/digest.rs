//! Salted SHA-256 digest tokens.

use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};
use tollgate_common::constants::handlers;
use tollgate_common::{Result, TokenError};

use super::CaptchaHandler;
use crate::cipher::TokenKey;
use crate::token::digest;

/// Equality-only handler: no key, no IV, no expiry.
///
/// The password is not part of the digest and the key is never derived; it
/// only matters when a capability reference is attached around the token.
#[derive(Debug, Clone)]
pub struct DigestHandler {
    identity: String,
}

impl DigestHandler {
    pub fn new() -> Self {
        Self {
            identity: handlers::DIGEST.to_string(),
        }
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }
}

impl Default for DigestHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptchaHandler for DigestHandler {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn issue(&self, solution: &str, key: &TokenKey<'_>) -> Result<String> {
        Ok(digest::digest(solution, key.salt()))
    }

    fn verify(&self, answer: &str, token: &str, key: &TokenKey<'_>) -> Result<bool> {
        let expected_len = Sha256::output_size();
        let decoded = STANDARD
            .decode(token)
            .map_err(|e| TokenError::MalformedToken(format!("invalid base64: {e}")))?;
        if decoded.len() != expected_len {
            return Err(TokenError::MalformedToken(format!(
                "digest token is {} bytes, expected {expected_len}",
                decoded.len()
            )));
        }

        Ok(digest::matches(answer, key.salt(), token))
    }
}

/// Canonical answer string for an image-grid selection.
///
/// Indices are sorted and rendered as `[0,3,5]`, so the order in which the
/// user clicked cells does not matter. Repeated indices are kept.
pub fn grid_answer(indices: &[usize]) -> String {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();

    let joined = sorted
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("[{joined}]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_common::CipherSettings;

    fn token_key<'a>(salt: &'a [u8], password: &'a str) -> TokenKey<'a> {
        TokenKey::new(CipherSettings::default(), password, salt)
    }

    #[test]
    fn test_issue_is_deterministic() {
        let handler = DigestHandler::new();
        let a = handler.issue("X7KQ2", &token_key(b"s", "pw")).unwrap();
        let b = handler.issue("X7KQ2", &token_key(b"s", "other")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_verify() {
        let handler = DigestHandler::new();
        let token = handler.issue("X7KQ2", &token_key(b"s", "pw")).unwrap();
        assert!(handler.verify("X7KQ2", &token, &token_key(b"s", "pw")).unwrap());
        assert!(!handler.verify("X7KQ2", &token, &token_key(b"t", "pw")).unwrap());
        assert!(!handler.verify("x7kq2", &token, &token_key(b"s", "pw")).unwrap());
    }

    #[test]
    fn test_key_is_never_derived() {
        let handler = DigestHandler::new();
        let key = token_key(b"s", "pw");
        let token = handler.issue("X7KQ2", &key).unwrap();
        assert!(handler.verify("X7KQ2", &token, &key).unwrap());
        assert!(!key.is_derived());
    }

    #[test]
    fn test_malformed_digest_token() {
        let handler = DigestHandler::new();
        assert!(matches!(
            handler.verify("a", "***", &token_key(b"s", "pw")),
            Err(TokenError::MalformedToken(_))
        ));
        assert!(matches!(
            handler.verify("a", &STANDARD.encode([0u8; 16]), &token_key(b"s", "pw")),
            Err(TokenError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_grid_answer_is_order_independent() {
        assert_eq!(grid_answer(&[5, 0, 3]), "[0,3,5]");
        assert_eq!(grid_answer(&[]), "[]");
    }

    #[test]
    fn test_grid_answer_keeps_repeated_cells() {
        assert_eq!(grid_answer(&[3, 5, 0, 3]), "[0,3,3,5]");
        assert_ne!(grid_answer(&[3, 5, 0, 3]), grid_answer(&[0, 3, 5]));
    }

    #[test]
    fn test_grid_selection_round_trip() {
        let handler = DigestHandler::new();
        let key = token_key(b"s", "pw");
        let token = handler.issue(&grid_answer(&[1, 4, 7]), &key).unwrap();
        assert!(handler.verify(&grid_answer(&[7, 1, 4]), &token, &key).unwrap());
        assert!(!handler.verify(&grid_answer(&[1, 4]), &token, &key).unwrap());
    }
}
