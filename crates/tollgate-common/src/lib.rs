//! # Tollgate Common
//!
//! Shared types, errors, and constants used across Tollgate components.
//!
//! ## Modules
//! - `types` - Cipher settings, expiration policy
//! - `error` - Token error taxonomy
//! - `constants` - Wire layout sizes, defaults, handler keys

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Result, TokenError};
pub use types::*;
