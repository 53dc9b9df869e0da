//! API key holder with refresh between retry attempts.

use std::sync::{PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::config::EndpointConfig;
use crate::types::{ResearchError, Result};

/// API key for one provider.
///
/// Keys configured inline are fixed. Keys read from an environment variable
/// are re-read by [`Credentials::refresh`], so rotated tokens are picked up
/// on the next retry attempt.
pub struct Credentials {
    env_var: Option<String>,
    key: RwLock<SecretString>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("env_var", &self.env_var)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    pub fn from_endpoint(endpoint: &EndpointConfig) -> Result<Self> {
        if let Some(key) = &endpoint.api_key {
            return Ok(Self {
                env_var: None,
                key: RwLock::new(SecretString::from(key.clone())),
            });
        }

        let key = std::env::var(&endpoint.api_key_env).map_err(|_| {
            ResearchError::Config(format!(
                "{} API key not found. Set {} or provide api_key in config",
                endpoint.provider, endpoint.api_key_env
            ))
        })?;

        Ok(Self {
            env_var: Some(endpoint.api_key_env.clone()),
            key: RwLock::new(SecretString::from(key)),
        })
    }

    /// `Bearer <key>` header value
    pub fn bearer(&self) -> String {
        let key = self.key.read().unwrap_or_else(PoisonError::into_inner);
        format!("Bearer {}", key.expose_secret())
    }

    /// Re-read the key from its environment variable. Returns whether it changed.
    pub fn refresh(&self) -> bool {
        let Some(var) = &self.env_var else {
            return false;
        };
        let Ok(fresh) = std::env::var(var) else {
            return false;
        };

        let mut key = self.key.write().unwrap_or_else(PoisonError::into_inner);
        if key.expose_secret() == fresh {
            return false;
        }
        *key = SecretString::from(fresh);
        debug!(env_var = %var, "Refreshed provider credentials");
        true
    }
}
