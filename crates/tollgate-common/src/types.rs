//! Core types shared across Tollgate components.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CIPHER_ALGORITHM, DEFAULT_KDF_ALGORITHM, DEFAULT_KDF_ITERATIONS};
use crate::error::TokenError;

/// Password-based key derivation function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KdfAlgorithm {
    /// PBKDF2 with HMAC-SHA-256
    #[default]
    Pbkdf2HmacSha256,
    /// PBKDF2 with HMAC-SHA-512
    Pbkdf2HmacSha512,
}

impl KdfAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pbkdf2HmacSha256 => DEFAULT_KDF_ALGORITHM,
            Self::Pbkdf2HmacSha512 => "PBKDF2-HMAC-SHA512",
        }
    }
}

impl FromStr for KdfAlgorithm {
    type Err = TokenError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_uppercase().as_str() {
            "PBKDF2-HMAC-SHA256" | "PBKDF2WITHHMACSHA256" => Ok(Self::Pbkdf2HmacSha256),
            "PBKDF2-HMAC-SHA512" | "PBKDF2WITHHMACSHA512" => Ok(Self::Pbkdf2HmacSha512),
            _ => Err(TokenError::Configuration(format!(
                "unknown key derivation algorithm: {name}"
            ))),
        }
    }
}

impl TryFrom<String> for KdfAlgorithm {
    type Error = TokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KdfAlgorithm> for String {
    fn from(value: KdfAlgorithm) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for KdfAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Block cipher, mode and padding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CipherAlgorithm {
    /// AES in CBC mode with PKCS#5/PKCS#7 padding
    #[default]
    AesCbcPkcs5,
}

impl CipherAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AesCbcPkcs5 => DEFAULT_CIPHER_ALGORITHM,
        }
    }
}

impl FromStr for CipherAlgorithm {
    type Err = TokenError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_uppercase().as_str() {
            "AES-CBC-PKCS5" | "AES-CBC-PKCS7" | "AES/CBC/PKCS5PADDING" => Ok(Self::AesCbcPkcs5),
            _ => Err(TokenError::Configuration(format!(
                "unknown cipher algorithm: {name}"
            ))),
        }
    }
}

impl TryFrom<String> for CipherAlgorithm {
    type Error = TokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CipherAlgorithm> for String {
    fn from(value: CipherAlgorithm) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// AES key length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum KeySize {
    Aes128,
    Aes192,
    #[default]
    Aes256,
}

impl KeySize {
    pub fn bits(&self) -> u32 {
        match self {
            Self::Aes128 => 128,
            Self::Aes192 => 192,
            Self::Aes256 => 256,
        }
    }

    /// Key length in bytes
    pub fn byte_len(&self) -> usize {
        self.bits() as usize / 8
    }
}

impl TryFrom<u32> for KeySize {
    type Error = TokenError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            128 => Ok(Self::Aes128),
            192 => Ok(Self::Aes192),
            256 => Ok(Self::Aes256),
            _ => Err(TokenError::Configuration(format!(
                "unsupported key length: {bits} bits"
            ))),
        }
    }
}

impl From<KeySize> for u32 {
    fn from(value: KeySize) -> Self {
        value.bits()
    }
}

/// Immutable cipher configuration shared by every generate/validate call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherSettings {
    #[serde(default)]
    pub kdf_algorithm: KdfAlgorithm,

    #[serde(default)]
    pub cipher_algorithm: CipherAlgorithm,

    #[serde(default, rename = "key_bits")]
    pub key_size: KeySize,

    /// PBKDF2 rounds
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

fn default_iterations() -> u32 {
    DEFAULT_KDF_ITERATIONS
}

impl CipherSettings {
    /// Build settings from algorithm names, failing fast on anything unknown
    pub fn new(kdf_algorithm: &str, cipher_algorithm: &str, key_bits: u32) -> crate::Result<Self> {
        let settings = Self {
            kdf_algorithm: kdf_algorithm.parse()?,
            cipher_algorithm: cipher_algorithm.parse()?,
            key_size: KeySize::try_from(key_bits)?,
            iterations: DEFAULT_KDF_ITERATIONS,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Override the iteration count
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Check invariants the type system does not carry
    pub fn validate(&self) -> crate::Result<()> {
        if self.iterations == 0 {
            return Err(TokenError::Configuration(
                "key derivation iteration count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CipherSettings {
    fn default() -> Self {
        Self {
            kdf_algorithm: KdfAlgorithm::default(),
            cipher_algorithm: CipherAlgorithm::default(),
            key_size: KeySize::default(),
            iterations: DEFAULT_KDF_ITERATIONS,
        }
    }
}

impl fmt::Display for CipherSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}x{}",
            self.kdf_algorithm,
            self.cipher_algorithm,
            self.key_size.bits(),
            self.iterations
        )
    }
}

/// Source of "now" in unix milliseconds
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Embedded token expiry: issuance time plus a fixed offset
#[derive(Clone)]
pub struct ExpirationPolicy {
    offset_millis: u64,
    clock: Clock,
}

impl ExpirationPolicy {
    /// Expire tokens `offset_millis` after issuance, using the system clock
    pub fn new(offset_millis: u64) -> Self {
        Self::with_clock(offset_millis, Arc::new(|| chrono::Utc::now().timestamp_millis()))
    }

    /// Expire tokens using a caller-provided clock
    pub fn with_clock(offset_millis: u64, clock: Clock) -> Self {
        Self { offset_millis, clock }
    }

    /// Current time in unix millis
    pub fn now(&self) -> i64 {
        (self.clock)()
    }

    /// Expiry instant for a token issued right now
    pub fn expiry_from_now(&self) -> i64 {
        let offset = i64::try_from(self.offset_millis).unwrap_or(i64::MAX);
        self.now().saturating_add(offset)
    }

    /// Returns true once `now` is strictly past `expires_at`
    pub fn is_expired(&self, expires_at: i64) -> bool {
        self.now() > expires_at
    }
}

impl fmt::Debug for ExpirationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpirationPolicy")
            .field("offset_millis", &self.offset_millis)
            .finish_non_exhaustive()
    }
}
