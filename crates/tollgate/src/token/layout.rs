//! Binary token layout.
//!
//! ```text
//! base64( iv[16] || expiry_block?[16] || ciphertext )
//! ```
//!
//! The expiry block is present iff the issuing handler has an expiration
//! policy; decoding must be told which layout to expect.

use base64::{Engine, engine::general_purpose::STANDARD};
use tollgate_common::constants::{EXPIRY_BLOCK_LEN, IV_LEN};
use tollgate_common::{Result, TokenError};

/// Decoded fields of a cipher token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenParts {
    pub iv: [u8; IV_LEN],
    pub expiry_block: Option<[u8; EXPIRY_BLOCK_LEN]>,
    pub ciphertext: Vec<u8>,
}

impl TokenParts {
    /// Minimum byte length for the given layout
    pub fn header_len(expiring: bool) -> usize {
        if expiring {
            IV_LEN + EXPIRY_BLOCK_LEN
        } else {
            IV_LEN
        }
    }

    /// Base64 text form
    pub fn encode(&self) -> String {
        let expiry_len = self.expiry_block.map_or(0, |block| block.len());
        let mut bytes = Vec::with_capacity(IV_LEN + expiry_len + self.ciphertext.len());
        bytes.extend_from_slice(&self.iv);
        if let Some(block) = &self.expiry_block {
            bytes.extend_from_slice(block);
        }
        bytes.extend_from_slice(&self.ciphertext);
        STANDARD.encode(bytes)
    }

    /// Slice a token by fixed offsets. Does not check that anything decrypts.
    pub fn decode(text: &str, expiring: bool) -> Result<Self> {
        let bytes = STANDARD
            .decode(text)
            .map_err(|e| TokenError::MalformedToken(format!("invalid base64: {e}")))?;

        let header_len = Self::header_len(expiring);
        if bytes.len() < header_len {
            return Err(TokenError::MalformedToken(format!(
                "token is {} bytes, header needs {}",
                bytes.len(),
                header_len
            )));
        }

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&bytes[..IV_LEN]);

        let expiry_block = if expiring {
            let mut block = [0u8; EXPIRY_BLOCK_LEN];
            block.copy_from_slice(&bytes[IV_LEN..header_len]);
            Some(block)
        } else {
            None
        };

        Ok(Self {
            iv,
            expiry_block,
            ciphertext: bytes[header_len..].to_vec(),
        })
    }
}

/// Widest expiry plaintext that still fits an `i64`
const MAX_EXPIRY_LEN: usize = 8;

/// Plaintext form of an expiry instant: unix millis as minimal big-endian
/// two's complement, so current timestamps take 6 bytes
pub fn encode_expiry(expires_at: i64) -> Vec<u8> {
    let bytes = expires_at.to_be_bytes();
    // Drop leading bytes that only repeat the sign of the next one
    let start = bytes
        .windows(2)
        .take_while(|pair| match pair[0] {
            0x00 => pair[1] & 0x80 == 0,
            0xff => pair[1] & 0x80 != 0,
            _ => false,
        })
        .count();
    bytes[start..].to_vec()
}

/// Parse a decrypted expiry block.
///
/// Accepts 1 to 8 big-endian two's complement bytes and sign-extends them,
/// which covers both the minimal form and a fixed 8-byte `i64`.
pub fn decode_expiry(plaintext: &[u8]) -> Result<i64> {
    if plaintext.is_empty() || plaintext.len() > MAX_EXPIRY_LEN {
        return Err(TokenError::Integrity(format!(
            "expiry block decrypted to {} bytes, expected 1 to {MAX_EXPIRY_LEN}",
            plaintext.len()
        )));
    }

    let fill = if plaintext[0] & 0x80 != 0 { 0xff } else { 0x00 };
    let mut bytes = [fill; MAX_EXPIRY_LEN];
    bytes[MAX_EXPIRY_LEN - plaintext.len()..].copy_from_slice(plaintext);
    Ok(i64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_offsets() {
        let parts = TokenParts {
            iv: [1u8; IV_LEN],
            expiry_block: Some([2u8; EXPIRY_BLOCK_LEN]),
            ciphertext: vec![3u8; 32],
        };
        let raw = STANDARD.decode(parts.encode()).unwrap();
        assert_eq!(raw.len(), 64);
        assert!(raw[..16].iter().all(|&b| b == 1));
        assert!(raw[16..32].iter().all(|&b| b == 2));
        assert!(raw[32..].iter().all(|&b| b == 3));

        assert_eq!(TokenParts::decode(&parts.encode(), true).unwrap(), parts);
    }

    #[test]
    fn test_non_expiring_ciphertext_starts_after_iv() {
        let parts = TokenParts {
            iv: [9u8; IV_LEN],
            expiry_block: None,
            ciphertext: vec![4u8; 16],
        };
        let decoded = TokenParts::decode(&parts.encode(), false).unwrap();
        assert_eq!(decoded.ciphertext, vec![4u8; 16]);
        assert!(decoded.expiry_block.is_none());
    }

    #[test]
    fn test_short_token_is_malformed() {
        let short = STANDARD.encode([0u8; 10]);
        assert!(matches!(
            TokenParts::decode(&short, false),
            Err(TokenError::MalformedToken(_))
        ));

        // Long enough without expiry, too short with it
        let iv_only = STANDARD.encode([0u8; 20]);
        assert!(TokenParts::decode(&iv_only, false).is_ok());
        assert!(matches!(
            TokenParts::decode(&iv_only, true),
            Err(TokenError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            TokenParts::decode("not base64!!", false),
            Err(TokenError::MalformedToken(_))
        ));
        assert!(matches!(
            TokenParts::decode("", false),
            Err(TokenError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_expiry_encoding() {
        let millis = 1_700_000_000_123i64;
        assert_eq!(decode_expiry(&encode_expiry(millis)).unwrap(), millis);
        assert!(matches!(decode_expiry(&[]), Err(TokenError::Integrity(_))));
        assert!(matches!(decode_expiry(&[0u8; 9]), Err(TokenError::Integrity(_))));
    }

    #[test]
    fn test_expiry_is_minimal_twos_complement() {
        let encoded = encode_expiry(1_700_000_060_000);
        assert_eq!(encoded, vec![0x01, 0x8b, 0xcf, 0xe6, 0x52, 0x60]);

        assert_eq!(encode_expiry(0), vec![0x00]);
        assert_eq!(encode_expiry(127), vec![0x7f]);
        assert_eq!(encode_expiry(128), vec![0x00, 0x80]);
        assert_eq!(encode_expiry(-1), vec![0xff]);
        assert_eq!(encode_expiry(-129), vec![0xff, 0x7f]);
        assert_eq!(encode_expiry(i64::MIN).len(), 8);
    }

    #[test]
    fn test_expiry_decoding_sign_extends() {
        // Six-byte form of current epoch millis
        assert_eq!(
            decode_expiry(&[0x01, 0x8b, 0xcf, 0xe6, 0x52, 0x60]).unwrap(),
            1_700_000_060_000
        );
        // Fixed-width form of the same instant
        assert_eq!(
            decode_expiry(&1_700_000_060_000i64.to_be_bytes()).unwrap(),
            1_700_000_060_000
        );
        assert_eq!(decode_expiry(&[0x80]).unwrap(), -128);
        assert_eq!(decode_expiry(&[0xff, 0x7f]).unwrap(), -129);

        for millis in [0, 1, -1, 255, -256, i64::MAX, i64::MIN] {
            assert_eq!(decode_expiry(&encode_expiry(millis)).unwrap(), millis);
        }
    }
}
