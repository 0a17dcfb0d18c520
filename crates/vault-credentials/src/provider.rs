//! CredentialsProvider trait and implementations.

use crate::cache::CoalescingCache;
use crate::config::ProviderConfig;
use crate::credentials::Credentials;
use crate::error::{ConfigError, CredentialError};
use crate::openbao::OpenBaoClient;
use crate::source::SecretSource;
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Trait for credentials providers.
///
/// Consumers call [`retrieve`](CredentialsProvider::retrieve) when
/// [`is_expired`](CredentialsProvider::is_expired) reports stale credentials.
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    /// Fetch fresh credentials from the backend.
    async fn retrieve(&self) -> Result<Credentials, CredentialError>;

    /// Whether the last retrieved credentials are past their validity.
    fn is_expired(&self) -> bool;
}

/// Credentials provider reading an access/secret key pair from OpenBao.
///
/// Concurrent [`retrieve`](CredentialsProvider::retrieve) calls share a
/// single secret read.
pub struct VaultCredentialsProvider<S = OpenBaoClient> {
    cache: CoalescingCache<S>,
    config: Arc<ProviderConfig>,
}

impl VaultCredentialsProvider<OpenBaoClient> {
    /// Create a provider talking to the OpenBao server in `config`.
    pub fn new(config: ProviderConfig) -> Result<Self, ConfigError> {
        let client = OpenBaoClient::new(&config).map_err(ConfigError::Client)?;
        info!(
            address = %config.address(),
            path = %config.secret_path(),
            ttl = ?config.ttl(),
            "created vault credentials provider"
        );
        Ok(Self::with_source(client, config))
    }
}

impl<S: SecretSource> VaultCredentialsProvider<S> {
    /// Create a provider over any secret source.
    pub fn with_source(source: S, config: ProviderConfig) -> Self {
        let config = Arc::new(config);
        Self {
            cache: CoalescingCache::new(source, config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// The underlying cache, for inspecting expiry and in-flight state.
    pub fn cache(&self) -> &CoalescingCache<S> {
        &self.cache
    }
}

#[async_trait]
impl<S: SecretSource> CredentialsProvider for VaultCredentialsProvider<S> {
    async fn retrieve(&self) -> Result<Credentials, CredentialError> {
        self.cache.fetch().await
    }

    fn is_expired(&self) -> bool {
        self.cache.is_expired()
    }
}

/// Wrapper to hold a provider behind an Arc for sharing.
pub struct SharedCredentialsProvider {
    inner: Arc<dyn CredentialsProvider>,
}

impl SharedCredentialsProvider {
    /// Create a new shared provider.
    pub fn new<P: CredentialsProvider + 'static>(provider: P) -> Self {
        Self {
            inner: Arc::new(provider),
        }
    }

    /// Get a clone of the inner Arc.
    pub fn clone_inner(&self) -> Arc<dyn CredentialsProvider> {
        self.inner.clone()
    }
}

impl From<Arc<dyn CredentialsProvider>> for SharedCredentialsProvider {
    fn from(inner: Arc<dyn CredentialsProvider>) -> Self {
        Self { inner }
    }
}

impl Clone for SharedCredentialsProvider {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

#[async_trait]
impl CredentialsProvider for SharedCredentialsProvider {
    async fn retrieve(&self) -> Result<Credentials, CredentialError> {
        self.inner.retrieve().await
    }

    fn is_expired(&self) -> bool {
        self.inner.is_expired()
    }
}

/// Consumer-side credentials handle.
///
/// Hands out the last retrieved value until the provider reports expiry or
/// [`expire`](CachedCredentials::expire) is called, then retrieves again.
pub struct CachedCredentials {
    provider: Arc<dyn CredentialsProvider>,
    current: RwLock<Option<Credentials>>,
}

impl CachedCredentials {
    pub fn new(provider: Arc<dyn CredentialsProvider>) -> Self {
        Self {
            provider,
            current: RwLock::new(None),
        }
    }

    /// Current credentials, retrieving them if missing or expired.
    pub async fn get(&self) -> Result<Credentials, CredentialError> {
        if let Some(creds) = self.cached() {
            return Ok(creds);
        }

        debug!("credentials missing or expired, retrieving");
        let creds = self.provider.retrieve().await?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(creds.clone());
        Ok(creds)
    }

    /// Force the next [`get`](CachedCredentials::get) to retrieve.
    pub fn expire(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Whether the next [`get`](CachedCredentials::get) will retrieve.
    pub fn is_expired(&self) -> bool {
        self.cached().is_none()
    }

    fn cached(&self) -> Option<Credentials> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        match current.as_ref() {
            Some(creds) if !self.provider.is_expired() => Some(creds.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderSettings;
    use crate::credentials::{SecretMap, VAULT_PROVIDER_NAME};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SecretSource for CountingSource {
        async fn read(&self, _path: &str) -> anyhow::Result<Option<SecretMap>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let data = json!({ "ak": format!("AKIA{}", n), "sk": format!("SECRET{}", n) });
            Ok(Some(serde_json::from_value(data)?))
        }
    }

    fn provider(ttl_secs: u64) -> Arc<VaultCredentialsProvider<Arc<CountingSource>>> {
        let config = ProviderSettings {
            address: "http://127.0.0.1:8200".to_string(),
            token: Some("root".to_string()),
            secret_path: "secret/aws".to_string(),
            access_key_name: "ak".to_string(),
            secret_key_name: "sk".to_string(),
            ttl_ms: ttl_secs * 1000,
            ..Default::default()
        }
        .build()
        .unwrap();
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        Arc::new(VaultCredentialsProvider::with_source(source, config))
    }

    #[tokio::test]
    async fn test_provider_retrieve() {
        let provider = provider(60);
        assert!(provider.is_expired());

        let creds = provider.retrieve().await.unwrap();
        assert_eq!(creds.access_key_id, "AKIA1");
        assert_eq!(creds.secret_access_key, "SECRET1");
        assert_eq!(creds.provider_name, VAULT_PROVIDER_NAME);
        assert!(!provider.is_expired());
    }

    #[tokio::test]
    async fn test_shared_provider() {
        let shared = SharedCredentialsProvider::new(VaultCredentialsProvider::with_source(
            Arc::new(CountingSource {
                calls: AtomicUsize::new(0),
            }),
            provider(60).config().clone(),
        ));
        let cloned = shared.clone();

        let first = shared.retrieve().await.unwrap();
        assert_eq!(first.access_key_id, "AKIA1");
        assert!(!cloned.is_expired());

        let second = cloned.clone_inner().retrieve().await.unwrap();
        assert_eq!(second.access_key_id, "AKIA2");
    }

    #[tokio::test]
    async fn test_cached_credentials_reuse_until_expiry() {
        let provider = provider(60);
        let handle = CachedCredentials::new(provider.clone());
        assert!(handle.is_expired());

        let first = handle.get().await.unwrap();
        let second = handle.get().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.access_key_id, "AKIA1");
        assert!(!handle.is_expired());

        handle.expire();
        let third = handle.get().await.unwrap();
        assert_eq!(third.access_key_id, "AKIA2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_credentials_refresh_after_ttl() {
        let provider = provider(1);
        let handle = CachedCredentials::new(provider.clone());

        assert_eq!(handle.get().await.unwrap().access_key_id, "AKIA1");
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert!(handle.is_expired());
        assert_eq!(handle.get().await.unwrap().access_key_id, "AKIA2");
    }
}
