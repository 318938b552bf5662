//! Configuration management for Tollgate.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use tollgate_common::constants::{env, handlers};
use tollgate_common::{CipherSettings, ExpirationPolicy};

use crate::captcha::{TokenGenerator, Validator};
use crate::handler::HandlerRegistry;

/// Application configuration
#[derive(Clone, Deserialize)]
pub struct AppConfig {
    /// Token encryption password
    #[serde(default)]
    pub password: String,

    /// Key derivation and cipher settings
    #[serde(default)]
    pub cipher: CipherSettings,

    /// Embed an expiry this many millis after issuance (cipher handler only)
    #[serde(default)]
    pub expiration_offset_millis: Option<u64>,

    /// Append an encrypted handler reference to issued tokens
    #[serde(default = "default_attach_capability")]
    pub attach_capability: bool,

    /// Handler used for issuing, and for validating tokens without a reference
    #[serde(default = "default_handler")]
    pub handler: String,
}

// Default value functions
fn default_attach_capability() -> bool { true }
fn default_handler() -> String { handlers::CIPHER.to_string() }

/// Command line values that take precedence over file and environment
#[derive(Clone, Default)]
pub struct ConfigOverrides {
    pub password: Option<String>,
    pub expiration_offset_millis: Option<u64>,
}

impl AppConfig {
    /// Load configuration from an optional file plus `TOLLGATE_*` environment
    /// variables (`TOLLGATE_CIPHER__ITERATIONS` for nested keys), then apply
    /// CLI overrides and validate the result
    pub fn load(config_path: &str, overrides: &ConfigOverrides) -> Result<Self> {
        let mut builder = config::Config::builder();
        if Path::new(config_path).exists() {
            builder = builder.add_source(config::File::with_name(config_path));
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(env::PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load config")?;

        let mut config: Self = settings
            .try_deserialize()
            .context("Failed to parse config")?;

        // Apply CLI overrides
        if let Some(ref password) = overrides.password {
            config.password = password.clone();
        }
        if let Some(offset) = overrides.expiration_offset_millis {
            config.expiration_offset_millis = Some(offset);
        }

        config.validate()?;

        Ok(config)
    }

    /// Reject settings that can never produce a working token
    pub fn validate(&self) -> Result<()> {
        self.cipher.validate().context("Invalid cipher settings")?;

        if self.handler.is_empty() {
            anyhow::bail!("Handler identity must not be empty");
        }
        if self.password.is_empty() {
            tracing::warn!("No token password configured, using empty password");
        }

        Ok(())
    }

    pub fn expiration_policy(&self) -> Option<ExpirationPolicy> {
        self.expiration_offset_millis.map(ExpirationPolicy::new)
    }

    /// Built-in handlers configured from these settings
    pub fn registry(&self) -> HandlerRegistry {
        HandlerRegistry::with_defaults(self.cipher, self.expiration_policy())
    }

    /// Generator for `handler`, or the configured default handler
    pub fn generator(&self, handler: Option<&str>) -> Result<TokenGenerator> {
        let identity = handler.unwrap_or(&self.handler);
        let handler = self
            .registry()
            .resolve(identity)
            .with_context(|| format!("Unknown handler: {identity}"))?;

        Ok(TokenGenerator::new(handler, self.cipher, self.password.clone())
            .with_capability(self.attach_capability))
    }

    pub fn validator(&self) -> Result<Validator> {
        Validator::new(
            Arc::new(self.registry()),
            &self.handler,
            self.cipher,
            self.password.clone(),
        )
        .context("Failed to build validator")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            password: String::new(),
            cipher: CipherSettings::default(),
            expiration_offset_millis: None,
            attach_capability: default_attach_capability(),
            handler: default_handler(),
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("password", &"[REDACTED]")
            .field("cipher", &self.cipher)
            .field("expiration_offset_millis", &self.expiration_offset_millis)
            .field("attach_capability", &self.attach_capability)
            .field("handler", &self.handler)
            .finish()
    }
}
