//! Identity → handler lookup.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tollgate_common::{CipherSettings, ExpirationPolicy, Result, TokenError};

use super::{CaptchaHandler, CipherHandler, DigestHandler};

/// Fixed map from registry keys to handlers, built at startup.
///
/// After construction the registry is only read, so it can be shared behind
/// an `Arc` without locking.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn CaptchaHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in cipher and digest handlers
    pub fn with_defaults(settings: CipherSettings, expiration: Option<ExpirationPolicy>) -> Self {
        let mut cipher = CipherHandler::new(settings);
        if let Some(policy) = expiration {
            cipher = cipher.with_expiration(policy);
        }

        let mut handlers: HashMap<String, Arc<dyn CaptchaHandler>> = HashMap::new();
        let cipher: Arc<dyn CaptchaHandler> = Arc::new(cipher);
        let digest: Arc<dyn CaptchaHandler> = Arc::new(DigestHandler::new());
        handlers.insert(cipher.identity().to_string(), cipher);
        handlers.insert(digest.identity().to_string(), digest);

        Self { handlers }
    }

    /// Add a handler; identities must be unique
    pub fn register(&mut self, handler: Arc<dyn CaptchaHandler>) -> Result<()> {
        let identity = handler.identity().to_string();
        if identity.is_empty() {
            return Err(TokenError::Configuration(
                "handler identity must not be empty".to_string(),
            ));
        }
        if self.contains(&identity) {
            return Err(TokenError::Configuration(format!(
                "handler already registered: {identity}"
            )));
        }

        tracing::debug!(handler = %identity, "Registered token handler");
        self.handlers.insert(identity, handler);
        Ok(())
    }

    /// Look up the handler named by a capability reference
    pub fn resolve(&self, identity: &str) -> Result<Arc<dyn CaptchaHandler>> {
        self.handlers
            .get(identity)
            .cloned()
            .ok_or_else(|| TokenError::UnresolvedHandler(identity.to_string()))
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.handlers.contains_key(identity)
    }

    /// Registered identities, sorted
    pub fn identities(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.identities())
            .finish()
    }
}
