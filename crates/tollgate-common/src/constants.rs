//! Shared constants for Tollgate components.

/// AES block size in bytes
pub const CIPHER_BLOCK_LEN: usize = 16;

/// Initialization vector length (one cipher block)
pub const IV_LEN: usize = CIPHER_BLOCK_LEN;

/// Length of the encrypted expiry block (an 8-byte timestamp padded to one block)
pub const EXPIRY_BLOCK_LEN: usize = CIPHER_BLOCK_LEN;

/// Default PBKDF2 iteration count
pub const DEFAULT_KDF_ITERATIONS: u32 = 65_536;

/// Default derived key length in bits
pub const DEFAULT_KEY_BITS: u32 = 256;

/// Default key derivation algorithm name
pub const DEFAULT_KDF_ALGORITHM: &str = "PBKDF2-HMAC-SHA256";

/// Default cipher/mode/padding name
pub const DEFAULT_CIPHER_ALGORITHM: &str = "AES-CBC-PKCS5";

/// Separates the core token from the encrypted handler reference.
///
/// `#` is outside the standard base64 alphabet, so the first occurrence
/// always marks the boundary.
pub const CAPABILITY_DELIMITER: &str = "###";

/// Registry keys of the built-in handler variants
pub mod handlers {
    /// Reversible AES-CBC token, optionally expiring
    pub const CIPHER: &str = "cipher";

    /// Salted SHA-256 digest token
    pub const DIGEST: &str = "digest";
}

/// Environment variable names
pub mod env {
    /// Prefix for `config` environment overrides (`TOLLGATE_PASSWORD`, ...)
    pub const PREFIX: &str = "TOLLGATE";
}
