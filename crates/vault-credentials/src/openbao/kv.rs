//! KV secrets engine helpers.

use crate::credentials::SecretMap;
use serde_json::Value;

/// Path and payload handling for the KV secrets engine.
///
/// With KV v2 enabled, reads go through `<mount>/data/<path>` and the
/// payload arrives wrapped as `{ "data": {...}, "metadata": {...} }`.
/// With KV v2 disabled, paths and payloads are used as they are.
#[derive(Debug, Clone, Copy)]
pub struct KvClient {
    v2: bool,
}

impl KvClient {
    pub fn new(v2: bool) -> Self {
        Self { v2 }
    }

    /// Get the full API path for a secret.
    pub fn secret_path(&self, path: &str) -> String {
        let path = path.trim_matches('/');
        if !self.v2 || path.contains("/data/") {
            return path.to_string();
        }
        // Convert "secret/aws" to "secret/data/aws"
        match path.split_once('/') {
            Some((mount, rest)) => format!("{}/data/{}", mount, rest),
            None => path.to_string(),
        }
    }

    /// Strip the KV v2 envelope, if present.
    ///
    /// A soft-deleted v2 secret (`"data": null`) yields `None`.
    pub fn unwrap_data(&self, mut data: SecretMap) -> Option<SecretMap> {
        if !self.v2 || !data.contains_key("metadata") {
            return Some(data);
        }
        match data.remove("data") {
            Some(Value::Object(inner)) => Some(inner.into_iter().collect()),
            Some(Value::Null) => None,
            Some(other) => {
                data.insert("data".to_string(), other);
                Some(data)
            }
            None => Some(data),
        }
    }
}
