//! Encrypted handler references.
//!
//! A token may carry the identity of the handler that issued it, so the
//! validator can dispatch without the caller remembering which variant was
//! used:
//!
//! ```text
//! core_token ### base64( ref_iv[16] || AES-CBC(identity) )
//! ```
//!
//! The reference is encrypted under the same password/salt derived key as the
//! token body, with its own fresh IV.

use base64::{Engine, engine::general_purpose::STANDARD};
use tollgate_common::constants::{CAPABILITY_DELIMITER, CIPHER_BLOCK_LEN, IV_LEN};
use tollgate_common::{CipherSettings, Result, TokenError};

use crate::cipher::{self, DerivedKey};

/// A token split at its capability delimiter, reference not yet decrypted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityRef<'a> {
    /// Token body, untouched
    pub core: &'a str,
    iv: [u8; IV_LEN],
    ciphertext: Vec<u8>,
}

impl<'a> CapabilityRef<'a> {
    /// Split `token` at the first delimiter.
    ///
    /// Returns `Ok(None)` for tokens without a reference. A reference segment
    /// that is empty, not base64, or too short to hold an IV and one block is
    /// malformed.
    pub fn parse(token: &'a str) -> Result<Option<Self>> {
        let Some((core, reference)) = token.split_once(CAPABILITY_DELIMITER) else {
            return Ok(None);
        };

        let bytes = STANDARD.decode(reference).map_err(|e| {
            TokenError::MalformedToken(format!("invalid capability reference: {e}"))
        })?;
        if bytes.len() < IV_LEN + CIPHER_BLOCK_LEN {
            return Err(TokenError::MalformedToken(format!(
                "capability reference is {} bytes, needs at least {}",
                bytes.len(),
                IV_LEN + CIPHER_BLOCK_LEN
            )));
        }

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&bytes[..IV_LEN]);

        Ok(Some(Self {
            core,
            iv,
            ciphertext: bytes[IV_LEN..].to_vec(),
        }))
    }

    /// Decrypt the handler identity
    pub fn identity(&self, settings: &CipherSettings, key: &DerivedKey) -> Result<String> {
        let plaintext = cipher::decrypt(settings, key, &self.iv, &self.ciphertext)?;
        String::from_utf8(plaintext).map_err(|_| {
            TokenError::Integrity("capability reference is not valid UTF-8".to_string())
        })
    }
}

/// Append an encrypted reference to `identity`
pub fn attach(
    settings: &CipherSettings,
    token: &str,
    identity: &str,
    key: &DerivedKey,
) -> Result<String> {
    let iv = cipher::generate_iv();
    let ciphertext = cipher::encrypt(settings, key, &iv, identity.as_bytes())?;

    let mut reference = Vec::with_capacity(IV_LEN + ciphertext.len());
    reference.extend_from_slice(&iv);
    reference.extend_from_slice(&ciphertext);

    Ok(format!(
        "{token}{CAPABILITY_DELIMITER}{}",
        STANDARD.encode(reference)
    ))
}

/// Split off and decrypt the reference, returning `(core_token, identity)`.
///
/// A token without a delimiter is malformed here; callers that accept both
/// forms should use [`CapabilityRef::parse`].
pub fn recover<'a>(
    settings: &CipherSettings,
    token: &'a str,
    key: &DerivedKey,
) -> Result<(&'a str, String)> {
    let reference = CapabilityRef::parse(token)?.ok_or_else(|| {
        TokenError::MalformedToken("missing capability delimiter".to_string())
    })?;
    let identity = reference.identity(settings, key)?;
    Ok((reference.core, identity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::derive_key;

    fn setup() -> (CipherSettings, DerivedKey) {
        let settings = CipherSettings::default().with_iterations(1_000);
        let key = derive_key(&settings, "pw", b"session-1").unwrap();
        (settings, key)
    }

    #[test]
    fn test_attach_and_recover() {
        let (settings, key) = setup();
        let token = attach(&settings, "Y29yZQ==", "cipher", &key).unwrap();

        assert!(token.starts_with("Y29yZQ==###"));

        let (core, identity) = recover(&settings, &token, &key).unwrap();
        assert_eq!(core, "Y29yZQ==");
        assert_eq!(identity, "cipher");
    }

    #[test]
    fn test_reference_uses_fresh_iv() {
        let (settings, key) = setup();
        let a = attach(&settings, "core", "digest", &key).unwrap();
        let b = attach(&settings, "core", "digest", &key).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_plain_token_has_no_reference() {
        assert!(CapabilityRef::parse("Y29yZQ==").unwrap().is_none());

        let (settings, key) = setup();
        assert!(matches!(
            recover(&settings, "Y29yZQ==", &key),
            Err(TokenError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_garbage_reference_is_malformed() {
        assert!(matches!(
            CapabilityRef::parse("core###%%%not-base64"),
            Err(TokenError::MalformedToken(_))
        ));
        assert!(matches!(
            CapabilityRef::parse("core###"),
            Err(TokenError::MalformedToken(_))
        ));
        let short = format!("core###{}", STANDARD.encode([0u8; 20]));
        assert!(matches!(
            CapabilityRef::parse(&short),
            Err(TokenError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_splits_on_first_delimiter() {
        let (settings, key) = setup();
        let token = attach(&settings, "core", "cipher", &key).unwrap();
        let doubled = format!("{token}###extra");
        // Trailing junk lands in the reference segment and fails to decode
        assert!(CapabilityRef::parse(&doubled).is_err());
    }
}
