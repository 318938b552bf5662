//! Password-based key derivation.

use std::cell::OnceCell;
use std::fmt;

use pbkdf2::pbkdf2_hmac;
use sha2::{Sha256, Sha512};
use tollgate_common::{CipherSettings, KdfAlgorithm, Result};
use zeroize::Zeroizing;

/// Symmetric key material, wiped on drop
pub struct DerivedKey(Zeroizing<Vec<u8>>);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DerivedKey([REDACTED; {}])", self.0.len())
    }
}

/// Derive a key from a password and salt bytes.
///
/// Pure function of its inputs: validation re-derives the exact key used at
/// generation, so nothing has to be stored between the two.
pub fn derive_key(settings: &CipherSettings, password: &str, salt: &[u8]) -> Result<DerivedKey> {
    settings.validate()?;

    let mut key = Zeroizing::new(vec![0u8; settings.key_size.byte_len()]);
    match settings.kdf_algorithm {
        KdfAlgorithm::Pbkdf2HmacSha256 => {
            pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, settings.iterations, key.as_mut_slice())
        }
        KdfAlgorithm::Pbkdf2HmacSha512 => {
            pbkdf2_hmac::<Sha512>(password.as_bytes(), salt, settings.iterations, key.as_mut_slice())
        }
    }

    Ok(DerivedKey(key))
}

/// Password, salt and settings for a single issue or verify call.
///
/// The key is derived at most once, on first use, and dropped with the call.
/// Handlers that never touch the key (digest tokens) never pay for PBKDF2.
pub struct TokenKey<'a> {
    settings: CipherSettings,
    password: &'a str,
    salt: &'a [u8],
    key: OnceCell<DerivedKey>,
}

impl<'a> TokenKey<'a> {
    pub fn new(settings: CipherSettings, password: &'a str, salt: &'a [u8]) -> Self {
        Self {
            settings,
            password,
            salt,
            key: OnceCell::new(),
        }
    }

    pub fn settings(&self) -> &CipherSettings {
        &self.settings
    }

    pub fn salt(&self) -> &[u8] {
        self.salt
    }

    /// Derived key, computed on the first call
    pub fn get(&self) -> Result<&DerivedKey> {
        if let Some(key) = self.key.get() {
            return Ok(key);
        }
        let key = derive_key(&self.settings, self.password, self.salt)?;
        Ok(self.key.get_or_init(|| key))
    }

    pub fn is_derived(&self) -> bool {
        self.key.get().is_some()
    }
}

impl fmt::Debug for TokenKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenKey")
            .field("settings", &self.settings)
            .field("derived", &self.is_derived())
            .finish_non_exhaustive()
    }
}
