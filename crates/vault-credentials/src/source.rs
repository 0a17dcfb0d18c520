//! Secret source abstraction.

use crate::credentials::SecretMap;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A remote key/value secret store.
///
/// One call is one attempt: implementations must not cache or retry.
/// `Ok(None)` means the store answered but holds no data at `path`.
#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn read(&self, path: &str) -> Result<Option<SecretMap>>;
}

#[async_trait]
impl<S: SecretSource + ?Sized> SecretSource for Arc<S> {
    async fn read(&self, path: &str) -> Result<Option<SecretMap>> {
        (**self).read(path).await
    }
}
