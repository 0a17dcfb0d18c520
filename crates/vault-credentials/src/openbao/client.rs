//! OpenBao HTTP client.

use crate::config::ProviderConfig;
use crate::openbao::KvClient;
use anyhow::{Context, Result};
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

/// OpenBao HTTP client.
///
/// Sends token-authenticated requests to the OpenBao (or Vault) HTTP API.
/// Each request is a single attempt.
pub struct OpenBaoClient {
    http: Client,
    address: String,
    token: String,
    kv: KvClient,
}

/// Generic OpenBao API response wrapper.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub warnings: Option<Vec<String>>,
}

impl OpenBaoClient {
    /// Create a new OpenBao client with the given configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let transport = config.transport();
        let mut builder = ClientBuilder::new()
            .timeout(transport.timeout)
            .pool_max_idle_per_host(4);

        // Configure TLS if CA file is provided
        if let Some(ref ca_path) = transport.ca_file {
            let ca_cert = std::fs::read(ca_path)
                .with_context(|| format!("failed to read CA file: {:?}", ca_path))?;
            let cert = reqwest::Certificate::from_pem(&ca_cert)
                .with_context(|| "failed to parse CA certificate")?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder.build().context("failed to build HTTP client")?;

        debug!(address = %config.address(), "configured OpenBao client");

        Ok(Self {
            http,
            address: config.address().to_string(),
            token: config.token().to_string(),
            kv: KvClient::new(config.kv_v2()),
        })
    }

    /// Make an authenticated GET request.
    ///
    /// `Ok(None)` when the path holds nothing (404, 204, or no `data`).
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = format!("{}/v1/{}", self.address, path.trim_start_matches('/'));

        let response = self
            .http
            .get(&url)
            .header("X-Vault-Token", &self.token)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        match response.status() {
            StatusCode::OK => {
                let api_response: ApiResponse<T> =
                    response.json().await.context("failed to parse response")?;
                if let Some(warnings) = api_response.warnings.as_ref().filter(|w| !w.is_empty()) {
                    warn!(path = %path, warnings = ?warnings, "OpenBao returned warnings");
                }
                Ok(api_response.data)
            }
            StatusCode::NO_CONTENT => Ok(None),
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::FORBIDDEN => {
                anyhow::bail!("forbidden: token may be invalid or insufficient permissions")
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                anyhow::bail!("request failed: {} - {}", status, text.trim())
            }
        }
    }

    /// Get the KV client for secret operations.
    pub fn kv(&self) -> &KvClient {
        &self.kv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderSettings;
    use serde_json::json;
    use std::collections::HashMap;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(address: &str) -> ProviderConfig {
        ProviderSettings {
            address: address.to_string(),
            token: Some("s.test-token".to_string()),
            secret_path: "secret/aws".to_string(),
            access_key_name: "ak".to_string(),
            secret_key_name: "sk".to_string(),
            ..Default::default()
        }
        .build()
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_sends_token_and_returns_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/secret/aws"))
            .and(header("X-Vault-Token", "s.test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "ak": "AKIA", "sk": "SECRET" },
                "lease_duration": 0,
                "renewable": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenBaoClient::new(&config(&server.uri())).unwrap();
        let data: HashMap<String, String> = client.get("/secret/aws").await.unwrap().unwrap();
        assert_eq!(data.get("ak").map(String::as_str), Some("AKIA"));
        server.verify().await;
    }

    #[tokio::test]
    async fn test_get_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/secret/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "errors": [] })))
            .mount(&server)
            .await;

        let client = OpenBaoClient::new(&config(&server.uri())).unwrap();
        let data: Option<serde_json::Value> = client.get("secret/missing").await.unwrap();
        assert!(data.is_none());
    }

    #[tokio::test]
    async fn test_get_forbidden_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = OpenBaoClient::new(&config(&server.uri())).unwrap();
        let err = client.get::<serde_json::Value>("secret/aws").await.unwrap_err();
        assert!(err.to_string().contains("forbidden"));
    }

    #[tokio::test]
    async fn test_get_server_error_includes_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("sealed"))
            .mount(&server)
            .await;

        let client = OpenBaoClient::new(&config(&server.uri())).unwrap();
        let err = client.get::<serde_json::Value>("secret/aws").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("sealed"));
    }

    #[test]
    fn test_missing_ca_file_fails() {
        let config = ProviderSettings {
            address: "https://vault.example.com".to_string(),
            token: Some("root".to_string()),
            secret_path: "secret/aws".to_string(),
            access_key_name: "ak".to_string(),
            secret_key_name: "sk".to_string(),
            ca_file: Some("/nonexistent/ca.pem".into()),
            ..Default::default()
        }
        .build()
        .unwrap();

        let err = OpenBaoClient::new(&config).err().unwrap();
        assert!(err.to_string().contains("CA file"));
    }
}
