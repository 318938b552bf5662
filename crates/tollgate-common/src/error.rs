//! Common error types for Tollgate components.

use thiserror::Error;

/// Errors raised while issuing or validating tokens
#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad algorithm name, key length, iteration count or registry setup.
    /// Raised at startup, never per request.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Token text is not decodable or too short for its layout
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Decryption or padding failure (wrong password, salt, or tampered bytes)
    #[error("Integrity check failed: {0}")]
    Integrity(String),

    /// Capability reference names a handler that is not registered
    #[error("Unresolved handler: {0}")]
    UnresolvedHandler(String),

    /// Embedded expiry has passed
    #[error("Token expired at {expired_at} (now {now})")]
    Expired {
        /// Expiry instant in unix millis
        expired_at: i64,
        /// Clock reading at validation time
        now: i64,
    },
}

impl TokenError {
    /// Short stable name for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::MalformedToken(_) => "malformed_token",
            Self::Integrity(_) => "integrity",
            Self::UnresolvedHandler(_) => "unresolved_handler",
            Self::Expired { .. } => "expired",
        }
    }

    /// Returns true for operator-facing errors that must abort startup
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns true if this error should be retried.
    ///
    /// A failed validation is final for that attempt; nothing in the token
    /// core is transient.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Result alias for token operations
pub type Result<T> = std::result::Result<T, TokenError>;
