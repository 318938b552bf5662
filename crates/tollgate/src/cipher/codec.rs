//! AES-CBC encryption of token payloads.
//!
//! CBC carries no authentication tag. A wrong key or IV almost always breaks the
//! PKCS#7 padding and surfaces as [`TokenError::Integrity`], but a tampered
//! ciphertext can occasionally unpad cleanly into different plaintext. The
//! comparison against the user's answer is what finally rejects it.

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit};
use rand::Rng;
use tollgate_common::constants::IV_LEN;
use tollgate_common::{CipherAlgorithm, CipherSettings, KeySize, Result, TokenError};

use super::kdf::DerivedKey;

/// Fresh random IV from the thread-local CSPRNG.
///
/// Must never be reused under the same key.
pub fn generate_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    rand::rng().fill(&mut iv);
    iv
}

/// Encrypt `plaintext` with the configured cipher
pub fn encrypt(
    settings: &CipherSettings,
    key: &DerivedKey,
    iv: &[u8; IV_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    match settings.cipher_algorithm {
        CipherAlgorithm::AesCbcPkcs5 => match settings.key_size {
            KeySize::Aes128 => cbc_encrypt::<Aes128>(key.as_bytes(), iv, plaintext),
            KeySize::Aes192 => cbc_encrypt::<Aes192>(key.as_bytes(), iv, plaintext),
            KeySize::Aes256 => cbc_encrypt::<Aes256>(key.as_bytes(), iv, plaintext),
        },
    }
}

/// Decrypt `ciphertext`; padding failures become [`TokenError::Integrity`]
pub fn decrypt(
    settings: &CipherSettings,
    key: &DerivedKey,
    iv: &[u8; IV_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    match settings.cipher_algorithm {
        CipherAlgorithm::AesCbcPkcs5 => match settings.key_size {
            KeySize::Aes128 => cbc_decrypt::<Aes128>(key.as_bytes(), iv, ciphertext),
            KeySize::Aes192 => cbc_decrypt::<Aes192>(key.as_bytes(), iv, ciphertext),
            KeySize::Aes256 => cbc_decrypt::<Aes256>(key.as_bytes(), iv, ciphertext),
        },
    }
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>
where
    C: BlockCipher + BlockEncryptMut + KeyInit,
{
    let encryptor = cbc::Encryptor::<C>::new_from_slices(key, iv).map_err(|_| {
        TokenError::Configuration(format!(
            "key length {} does not match the configured cipher",
            key.len()
        ))
    })?;
    Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>
where
    C: BlockCipher + BlockDecryptMut + KeyInit,
{
    let decryptor = cbc::Decryptor::<C>::new_from_slices(key, iv).map_err(|_| {
        TokenError::Configuration(format!(
            "key length {} does not match the configured cipher",
            key.len()
        ))
    })?;
    decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| TokenError::Integrity("cipher padding mismatch".to_string()))
}
