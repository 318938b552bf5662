//! Key derivation and block cipher primitives.

mod codec;
mod kdf;

pub use codec::{decrypt, encrypt, generate_iv};
pub use kdf::{DerivedKey, TokenKey, derive_key};
