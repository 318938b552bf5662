//! Answer validation with handler dispatch.

use std::fmt;
use std::sync::Arc;

use tollgate_common::{CipherSettings, Result, TokenError};
use zeroize::Zeroizing;

use crate::cipher::TokenKey;
use crate::handler::{CaptchaHandler, HandlerRegistry};
use crate::salt::SaltSource;
use crate::token::CapabilityRef;

/// Checks answers against tokens.
///
/// Tokens carrying a capability reference are routed to the handler they
/// name; plain tokens go to the default handler.
pub struct Validator {
    registry: Arc<HandlerRegistry>,
    default_handler: Arc<dyn CaptchaHandler>,
    settings: CipherSettings,
    password: Zeroizing<String>,
}

impl Validator {
    /// Build a validator; fails if `default_identity` is not registered
    pub fn new(
        registry: Arc<HandlerRegistry>,
        default_identity: &str,
        settings: CipherSettings,
        password: impl Into<String>,
    ) -> Result<Self> {
        settings.validate()?;
        let default_handler = registry.resolve(default_identity).map_err(|_| {
            TokenError::Configuration(format!(
                "default handler {default_identity} is not registered"
            ))
        })?;

        Ok(Self {
            registry,
            default_handler,
            settings,
            password: Zeroizing::new(password.into()),
        })
    }

    /// Returns true only if the token is sound, unexpired, and matches.
    ///
    /// Every rejection reason collapses to `false` so a caller probing the
    /// endpoint cannot tell a wrong answer from a broken token.
    pub fn validate<S>(&self, answer: &str, token: &str, salt: &S) -> bool
    where
        S: SaltSource + ?Sized,
    {
        match self.try_validate(answer, token, salt) {
            Ok(valid) => {
                tracing::debug!(valid, "Token validated");
                valid
            }
            Err(err) if err.is_configuration() => {
                tracing::error!(error = %err, "Token validation misconfigured");
                false
            }
            Err(err) => {
                tracing::debug!(kind = err.kind(), error = %err, "Token rejected");
                false
            }
        }
    }

    /// Like [`validate`](Self::validate) but keeps the rejection reason
    pub fn try_validate<S>(&self, answer: &str, token: &str, salt: &S) -> Result<bool>
    where
        S: SaltSource + ?Sized,
    {
        let salt = salt.salt_bytes();
        let key = TokenKey::new(self.settings, &self.password, &salt);

        let Some(reference) = CapabilityRef::parse(token)? else {
            return self.default_handler.verify(answer, token, &key);
        };

        let identity = reference.identity(&self.settings, key.get()?)?;
        let handler = self.registry.resolve(&identity)?;

        tracing::trace!(handler = %identity, "Dispatching to handler from capability reference");
        handler.verify(answer, reference.core, &key)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("registry", &self.registry)
            .field("default_handler", &self.default_handler.identity())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
