//! Expiring access/secret key credentials backed by OpenBao/Vault.
//!
//! This crate keeps an access key / secret key pair fresh for a process that
//! needs it repeatedly:
//! - A KV secret is read from OpenBao/Vault with a token
//! - The pair is cached for a configurable TTL
//! - Concurrent refreshes are coalesced into a single secret read, and every
//!   waiting caller receives that read's outcome
//!
//! # Example
//!
//! ```no_run
//! use vault_credentials::{CredentialsProvider, ProviderSettings, VaultCredentialsProvider};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ProviderSettings {
//!     address: "https://openbao.internal:8200".to_string(),
//!     token_file: Some("/etc/app/openbao-token".into()),
//!     secret_path: "secret/aws/ci".to_string(),
//!     access_key_name: "access_key_id".to_string(),
//!     secret_key_name: "secret_access_key".to_string(),
//!     ..Default::default()
//! }
//! .build()?;
//!
//! let provider = VaultCredentialsProvider::new(config)?;
//! let creds = provider.retrieve().await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;
pub mod openbao;
pub mod provider;
pub mod registry;
pub mod source;

// Re-exports for convenience
pub use cache::CoalescingCache;
pub use config::{ProviderConfig, ProviderSettings, TransportSettings, MAX_TTL};
pub use credentials::{CredentialSet, Credentials, SecretMap, VAULT_PROVIDER_NAME};
pub use error::{ConfigError, CredentialError, RegistryError, ShapeIssue};
pub use openbao::OpenBaoClient;
pub use provider::{
    CachedCredentials, CredentialsProvider, SharedCredentialsProvider, VaultCredentialsProvider,
};
pub use source::SecretSource;
