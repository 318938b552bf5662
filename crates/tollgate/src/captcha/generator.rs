//! Token issuance.

use std::fmt;
use std::sync::Arc;

use tollgate_common::{CipherSettings, Result};
use zeroize::Zeroizing;

use crate::cipher::TokenKey;
use crate::handler::CaptchaHandler;
use crate::salt::SaltSource;
use crate::token::capability;

/// Issues tokens through one handler, optionally tagging them with an
/// encrypted reference to that handler
pub struct TokenGenerator {
    handler: Arc<dyn CaptchaHandler>,
    settings: CipherSettings,
    password: Zeroizing<String>,
    attach_capability: bool,
}

impl TokenGenerator {
    pub fn new(
        handler: Arc<dyn CaptchaHandler>,
        settings: CipherSettings,
        password: impl Into<String>,
    ) -> Self {
        Self {
            handler,
            settings,
            password: Zeroizing::new(password.into()),
            attach_capability: false,
        }
    }

    /// Append the handler identity to every token so a generic
    /// [`Validator`](super::Validator) can dispatch on it
    pub fn with_capability(mut self, attach: bool) -> Self {
        self.attach_capability = attach;
        self
    }

    /// Produce a token committing to `solution` and `salt`
    pub fn generate<S>(&self, solution: &str, salt: &S) -> Result<String>
    where
        S: SaltSource + ?Sized,
    {
        let salt = salt.salt_bytes();
        let key = TokenKey::new(self.settings, &self.password, &salt);
        let token = self.handler.issue(solution, &key)?;

        if !self.attach_capability {
            tracing::debug!(handler = %self.handler.identity(), "Issued token");
            return Ok(token);
        }

        let token = capability::attach(&self.settings, &token, self.handler.identity(), key.get()?)?;

        tracing::debug!(
            handler = %self.handler.identity(),
            capability = true,
            "Issued token"
        );
        Ok(token)
    }
}

impl fmt::Debug for TokenGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGenerator")
            .field("handler", &self.handler.identity())
            .field("settings", &self.settings)
            .field("attach_capability", &self.attach_capability)
            .finish_non_exhaustive()
    }
}
