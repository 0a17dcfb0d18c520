//! Name → constructor table for credentials providers.

use crate::config::ProviderConfig;
use crate::error::{ConfigError, RegistryError};
use crate::provider::{CredentialsProvider, VaultCredentialsProvider};
use std::sync::Arc;

/// Builds a provider from a validated configuration.
pub type Constructor = fn(&ProviderConfig) -> Result<Arc<dyn CredentialsProvider>, ConfigError>;

/// Name under which the OpenBao/Vault provider is registered.
pub const VAULT: &str = "vault";

const PROVIDERS: &[(&str, Constructor)] = &[(VAULT, vault)];

fn vault(config: &ProviderConfig) -> Result<Arc<dyn CredentialsProvider>, ConfigError> {
    Ok(Arc::new(VaultCredentialsProvider::new(config.clone())?))
}

/// Look up the constructor registered under `name`.
pub fn lookup(name: &str) -> Result<Constructor, RegistryError> {
    PROVIDERS
        .iter()
        .find(|(registered, _)| *registered == name)
        .map(|(_, constructor)| *constructor)
        .ok_or_else(|| RegistryError::UnknownProvider(name.to_string()))
}

/// Look up `name` and build the provider in one step.
pub fn create(
    name: &str,
    config: &ProviderConfig,
) -> Result<Arc<dyn CredentialsProvider>, RegistryError> {
    let constructor = lookup(name)?;
    Ok(constructor(config)?)
}

/// Names of all registered providers.
pub fn names() -> impl Iterator<Item = &'static str> {
    PROVIDERS.iter().map(|(name, _)| *name)
}
