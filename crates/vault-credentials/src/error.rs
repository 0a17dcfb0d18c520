//! Error types surfaced by the credentials provider.

use thiserror::Error;

/// Outcome of a failed credential refresh.
///
/// The same value is handed to the refreshing caller and to every caller
/// that joined the refresh while it was in flight, so it is `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// The secret read failed (transport, auth, remote error, timeout) or
    /// returned no data.
    #[error("secret source unavailable: {0}")]
    SourceUnavailable(String),

    /// The secret exists but does not carry the configured keys as strings.
    #[error("secret has unexpected shape at key {key:?}: {reason}")]
    SecretShapeMismatch { key: String, reason: ShapeIssue },
}

impl CredentialError {
    pub(crate) fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::SourceUnavailable(err.to_string())
    }

    /// Whether the failure came from the secret source rather than its contents.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, Self::SourceUnavailable(_))
    }

    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, Self::SecretShapeMismatch { .. })
    }
}

/// Why a required key was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeIssue {
    Missing,
    NotAString,
}

impl std::fmt::Display for ShapeIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeIssue::Missing => f.write_str("key is missing"),
            ShapeIssue::NotAString => f.write_str("value is not a string"),
        }
    }
}

/// Invalid provider configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("invalid address {address:?}: expected an http:// or https:// URL")]
    InvalidAddress { address: String },

    #[error("access and secret key names must differ (both are {0:?})")]
    DuplicateKeyName(String),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("{name} must not exceed {max:?}")]
    DurationTooLong {
        name: &'static str,
        max: std::time::Duration,
    },

    #[error("exactly one of token or token_file must be set")]
    TokenSource,

    #[error("failed to load token: {0:#}")]
    Token(anyhow::Error),

    #[error("failed to build secret store client: {0:#}")]
    Client(anyhow::Error),
}

/// Provider registry lookup failure.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cannot create provider: unknown provider {0:?}")]
    UnknownProvider(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
