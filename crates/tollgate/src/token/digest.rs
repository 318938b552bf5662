//! Salted digest tokens.
//!
//! `base64(SHA-256(solution || salt))`. No key, no IV: the same inputs always
//! produce the same token, and the solution cannot be recovered from it.

use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};

/// Digest a solution together with its salt bytes
pub fn digest(solution: &str, salt: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(solution.as_bytes());
    hasher.update(salt);
    STANDARD.encode(hasher.finalize())
}

/// Recompute the digest for `answer` and compare with `token`
pub fn matches(answer: &str, salt: &[u8], token: &str) -> bool {
    digest(answer, salt) == token
}
