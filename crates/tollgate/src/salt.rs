//! Salt serialization.
//!
//! A token is bound to whatever salt value the caller supplies (a session id,
//! a client address, a form nonce). The same logical value must serialize to the
//! same bytes at generation and validation time, otherwise the derived key and
//! the digest differ and every answer is rejected.

use serde::Serialize;

/// A value that can be mixed into key derivation and digests
pub trait SaltSource {
    /// Deterministic byte form of this value
    fn salt_bytes(&self) -> Vec<u8>;
}

impl SaltSource for str {
    fn salt_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl SaltSource for String {
    fn salt_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl SaltSource for [u8] {
    fn salt_bytes(&self) -> Vec<u8> {
        self.to_vec()
    }
}

impl SaltSource for Vec<u8> {
    fn salt_bytes(&self) -> Vec<u8> {
        self.clone()
    }
}

impl<const N: usize> SaltSource for [u8; N] {
    fn salt_bytes(&self) -> Vec<u8> {
        self.to_vec()
    }
}

macro_rules! int_salt {
    ($($ty:ty),*) => {
        $(
            impl SaltSource for $ty {
                fn salt_bytes(&self) -> Vec<u8> {
                    self.to_be_bytes().to_vec()
                }
            }
        )*
    };
}

int_salt!(u16, u32, u64, u128, i16, i32, i64, i128);

/// Salt built from any `Serialize` value via its JSON encoding.
///
/// Serialization happens once, up front, so a value that cannot be encoded is
/// reported to the caller instead of silently producing an empty salt.
/// Struct field order is stable within a build; maps should use ordered
/// containers (`BTreeMap`) to stay deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonSalt(Vec<u8>);

impl JsonSalt {
    pub fn new<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Self> {
        serde_json::to_vec(value).map(Self)
    }
}

impl SaltSource for JsonSalt {
    fn salt_bytes(&self) -> Vec<u8> {
        self.0.clone()
    }
}
