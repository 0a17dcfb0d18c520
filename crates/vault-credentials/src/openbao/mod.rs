//! OpenBao/Vault client integration.
//!
//! This module provides a [`SecretSource`] backed by OpenBao (or HashiCorp
//! Vault). It supports:
//! - Token authentication, with the token given inline or read from a file
//! - KV v1 and KV v2 secrets engines

mod auth;
mod client;
mod kv;

pub use auth::TokenFile;
pub use client::{ApiResponse, OpenBaoClient};
pub use kv::KvClient;

use crate::credentials::SecretMap;
use crate::source::SecretSource;
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

#[async_trait]
impl SecretSource for OpenBaoClient {
    async fn read(&self, path: &str) -> Result<Option<SecretMap>> {
        let api_path = self.kv().secret_path(path);
        debug!(path = %api_path, "reading secret from OpenBao");

        let data: Option<SecretMap> = self.get(&api_path).await?;
        Ok(data.and_then(|data| self.kv().unwrap_data(data)))
    }
}
