//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (the remote store token) and the signed-in principal are
//! referenced by env-var name in the config and resolved at runtime via
//! `std::env::var`.

use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// Origin allowed by CORS; `"*"` when unset.
    #[serde(default)]
    pub allowed_origin: Option<String>,
    /// Minutes an untouched session stays live.
    #[serde(default = "default_session_ttl_mins")]
    pub session_ttl_mins: i64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_session_ttl_mins() -> i64 {
    120
}

/// Which `BracketStore` backend to build.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Remote,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// JSON file path for the `file` backend.
    #[serde(default)]
    pub path: Option<String>,
    /// Base URL for the `remote` backend.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Env var holding the remote bearer token.
    #[serde(default)]
    pub api_token_env: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    /// Env var naming the signed-in principal. Unset means anonymous.
    #[serde(default = "default_principal_env")]
    pub principal_env: String,
}

fn default_principal_env() -> String {
    "GOAL_BRACKET_USER".to_string()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            principal_env: default_principal_env(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse and validate configuration text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.storage.backend == StorageBackend::Remote && self.storage.endpoint.is_none() {
            bail!("storage.endpoint is required for the remote backend");
        }
        if self.server.session_ttl_mins <= 0 {
            bail!("server.session_ttl_mins must be positive");
        }
        Ok(())
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// The remote store token, if one is configured and set.
    pub fn api_token(&self) -> Option<SecretString> {
        let env = self.storage.api_token_env.as_deref()?;
        Self::resolve_env(env).ok().map(SecretString::new)
    }

    /// The signed-in principal id from the environment, if any.
    pub fn principal_id(&self) -> Option<String> {
        Self::resolve_env(&self.identity.principal_env)
            .ok()
            .filter(|id| !id.trim().is_empty())
    }
}
