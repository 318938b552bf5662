//! # Tollgate
//!
//! Stateless proof-of-solution tokens for CAPTCHA challenges.
//!
//! A token commits to a solution and a caller-supplied salt. It is either an
//! AES-CBC ciphertext under a PBKDF2 key derived from a password and the salt,
//! or a salted SHA-256 digest. Validation re-derives everything from the token,
//! the salt and the password, so nothing is stored server-side.
//!
//! ## Token format
//! ```text
//! base64( iv[16] || expiry?[16] || ciphertext ) [ ### base64( ref_iv[16] || ref_ciphertext ) ]
//! ```
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use tollgate::{CipherHandler, CipherSettings, HandlerRegistry, TokenGenerator, Validator};
//!
//! let settings = CipherSettings::default();
//! let generator = TokenGenerator::new(Arc::new(CipherHandler::new(settings)), settings, "secret")
//!     .with_capability(true);
//! let token = generator.generate("X7KQ2", "session-42").unwrap();
//!
//! let registry = Arc::new(HandlerRegistry::with_defaults(settings, None));
//! let validator = Validator::new(registry, "cipher", settings, "secret").unwrap();
//! assert!(validator.validate("X7KQ2", &token, "session-42"));
//! ```

pub mod captcha;
pub mod cipher;
pub mod config;
pub mod handler;
pub mod salt;
pub mod token;

pub use captcha::{TokenGenerator, Validator};
pub use cipher::TokenKey;
pub use handler::{CaptchaHandler, CipherHandler, DigestHandler, HandlerRegistry, grid_answer};
pub use salt::{JsonSalt, SaltSource};
pub use tollgate_common::{CipherSettings, ExpirationPolicy, TokenError};
