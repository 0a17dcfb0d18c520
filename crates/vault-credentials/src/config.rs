//! Provider configuration.
//!
//! [`ProviderSettings`] is the raw, deserialisable form (file or CLI input).
//! [`ProviderConfig`] is the validated, immutable value the provider runs on;
//! the only way to obtain one is through validation.

use crate::error::ConfigError;
use crate::openbao::TokenFile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Raw provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Secret store address (e.g., "https://openbao.internal:8200").
    pub address: String,

    /// Auth token sent as `X-Vault-Token`. Mutually exclusive with `token_file`.
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// File holding the auth token.
    #[serde(default)]
    pub token_file: Option<PathBuf>,

    /// Path of the secret holding both keys (e.g., "secret/data/aws/ci").
    pub secret_path: String,

    /// Field of the secret holding the access key id.
    pub access_key_name: String,

    /// Field of the secret holding the secret access key.
    pub secret_key_name: String,

    /// How long fetched credentials stay valid, in milliseconds.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    /// HTTP transport timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Upper bound for one secret read, in milliseconds.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Optional CA certificate file for TLS verification.
    #[serde(default)]
    pub ca_file: Option<PathBuf>,

    /// Unwrap KV v2 `{data, metadata}` envelopes.
    #[serde(default = "default_kv_v2")]
    pub kv_v2: bool,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:8200".to_string(),
            token: None,
            token_file: None,
            secret_path: String::new(),
            access_key_name: String::new(),
            secret_key_name: String::new(),
            ttl_ms: default_ttl_ms(),
            timeout_ms: default_timeout_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            ca_file: None,
            kv_v2: default_kv_v2(),
        }
    }
}

impl ProviderSettings {
    /// Validate into a [`ProviderConfig`].
    pub fn build(self) -> Result<ProviderConfig, ConfigError> {
        ProviderConfig::from_settings(self)
    }
}

/// Longest accepted credential TTL.
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// HTTP transport settings for the secret store client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    pub timeout: Duration,
    pub ca_file: Option<PathBuf>,
}

/// Validated provider configuration.
#[derive(Clone)]
pub struct ProviderConfig {
    address: String,
    token: String,
    secret_path: String,
    access_key_name: String,
    secret_key_name: String,
    ttl: Duration,
    fetch_timeout: Duration,
    kv_v2: bool,
    transport: TransportSettings,
}

impl ProviderConfig {
    /// Build a configuration from the required fields, defaults elsewhere.
    pub fn new(
        address: impl Into<String>,
        token: impl Into<String>,
        secret_path: impl Into<String>,
        access_key_name: impl Into<String>,
        secret_key_name: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Self::from_settings(ProviderSettings {
            address: address.into(),
            token: Some(token.into()),
            secret_path: secret_path.into(),
            access_key_name: access_key_name.into(),
            secret_key_name: secret_key_name.into(),
            ..Default::default()
        })
    }

    /// Validate raw settings, resolving the token.
    pub fn from_settings(settings: ProviderSettings) -> Result<Self, ConfigError> {
        let address = settings.address.trim().trim_end_matches('/').to_string();
        if address.is_empty() {
            return Err(ConfigError::Empty("address"));
        }
        if !(address.starts_with("http://") || address.starts_with("https://")) {
            return Err(ConfigError::InvalidAddress { address });
        }

        let secret_path = settings.secret_path.trim().trim_matches('/').to_string();
        if secret_path.is_empty() {
            return Err(ConfigError::Empty("secret_path"));
        }
        if settings.access_key_name.is_empty() {
            return Err(ConfigError::Empty("access_key_name"));
        }
        if settings.secret_key_name.is_empty() {
            return Err(ConfigError::Empty("secret_key_name"));
        }
        if settings.access_key_name == settings.secret_key_name {
            return Err(ConfigError::DuplicateKeyName(settings.access_key_name));
        }
        if settings.ttl_ms == 0 {
            return Err(ConfigError::ZeroDuration("ttl_ms"));
        }
        let ttl = Duration::from_millis(settings.ttl_ms);
        if ttl > MAX_TTL {
            return Err(ConfigError::DurationTooLong {
                name: "ttl_ms",
                max: MAX_TTL,
            });
        }
        if settings.timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("timeout_ms"));
        }
        if settings.fetch_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("fetch_timeout_ms"));
        }

        let token = match (settings.token, settings.token_file) {
            (Some(token), None) => token.trim().to_string(),
            (None, Some(path)) => TokenFile::new(path).load().map_err(ConfigError::Token)?,
            _ => return Err(ConfigError::TokenSource),
        };
        if token.is_empty() {
            return Err(ConfigError::Empty("token"));
        }

        Ok(Self {
            address,
            token,
            secret_path,
            access_key_name: settings.access_key_name,
            secret_key_name: settings.secret_key_name,
            ttl,
            fetch_timeout: Duration::from_millis(settings.fetch_timeout_ms),
            kv_v2: settings.kv_v2,
            transport: TransportSettings {
                timeout: Duration::from_millis(settings.timeout_ms),
                ca_file: settings.ca_file,
            },
        })
    }

    /// Secret store base address, without a trailing slash.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn secret_path(&self) -> &str {
        &self.secret_path
    }

    pub fn access_key_name(&self) -> &str {
        &self.access_key_name
    }

    pub fn secret_key_name(&self) -> &str {
        &self.secret_key_name
    }

    /// Validity window granted by each successful refresh.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Upper bound for one secret read.
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn kv_v2(&self) -> bool {
        self.kv_v2
    }

    pub fn transport(&self) -> &TransportSettings {
        &self.transport
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("address", &self.address)
            .field("token", &"<redacted>")
            .field("secret_path", &self.secret_path)
            .field("access_key_name", &self.access_key_name)
            .field("secret_key_name", &self.secret_key_name)
            .field("ttl", &self.ttl)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("kv_v2", &self.kv_v2)
            .field("transport", &self.transport)
            .finish()
    }
}

// Default value functions for serde
fn default_ttl_ms() -> u64 {
    6000
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_fetch_timeout_ms() -> u64 {
    5000
}

fn default_kv_v2() -> bool {
    true
}
