//! Handler variants and the registry that resolves them.
//!
//! A handler decides what a token body looks like and how an answer is checked
//! against it. Handlers are stateless apart from their configuration and are
//! shared read-only across threads.

mod cipher;
mod digest;
mod registry;

pub use cipher::CipherHandler;
pub use digest::{DigestHandler, grid_answer};
pub use registry::HandlerRegistry;

use tollgate_common::Result;

use crate::cipher::TokenKey;

/// A named token issuing/verification policy.
///
/// `key` carries the salt and the password for this call. It is shared with
/// the capability reference, so the key is derived once per call at most.
pub trait CaptchaHandler: Send + Sync {
    /// Stable registry key, embedded in capability references
    fn identity(&self) -> &str;

    /// Produce a token body for `solution`
    fn issue(&self, solution: &str, key: &TokenKey<'_>) -> Result<String>;

    /// Check `answer` against a token body.
    ///
    /// `Ok(false)` means the token was sound but the answer is wrong. Errors
    /// describe why the token itself was rejected.
    fn verify(&self, answer: &str, token: &str, key: &TokenKey<'_>) -> Result<bool>;
}
