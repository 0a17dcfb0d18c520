use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use vault_credentials::registry;
use vault_credentials::ProviderSettings;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// JSON structured logging for log aggregation (ELK, Loki).
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "vault-credentials",
    version,
    about = "Fetch an access/secret key pair from OpenBao/Vault"
)]
pub struct Args {
    /// JSON provider settings file. Replaces the connection flags below.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Registered provider to use.
    #[arg(long, default_value = registry::VAULT)]
    pub provider: String,

    /// Secret store address.
    #[arg(long, env = "VAULT_ADDR")]
    pub address: Option<String>,

    /// Auth token.
    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// File containing the auth token. Takes precedence over --token.
    #[arg(long)]
    pub token_file: Option<PathBuf>,

    /// Path of the secret holding the key pair.
    #[arg(long)]
    pub secret_path: Option<String>,

    /// Secret field holding the access key id.
    #[arg(long, default_value = "access_key_id")]
    pub access_key_name: String,

    /// Secret field holding the secret access key.
    #[arg(long, default_value = "secret_access_key")]
    pub secret_key_name: String,

    /// How long fetched credentials stay valid (ms).
    #[arg(long, default_value_t = 6000)]
    pub ttl_ms: u64,

    /// HTTP transport timeout (ms).
    #[arg(long, default_value_t = 5000)]
    pub timeout_ms: u64,

    /// Upper bound for a single secret read (ms).
    #[arg(long, default_value_t = 5000)]
    pub fetch_timeout_ms: u64,

    /// CA certificate (PEM) for TLS verification.
    #[arg(long)]
    pub ca_file: Option<PathBuf>,

    /// Treat the secret path as a KV v1 path.
    #[arg(long)]
    pub kv_v1: bool,

    /// Print shell `export` lines for both values instead of a masked summary.
    #[arg(long)]
    pub export: bool,

    /// Keep running and re-fetch whenever the credentials expire.
    #[arg(long)]
    pub watch: bool,

    /// Expiry check interval in watch mode (ms).
    #[arg(long, default_value_t = 1000)]
    pub poll_ms: u64,

    /// Log output format: text or json.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Args {
    /// Provider settings from `--config`, or from the individual flags.
    pub fn settings(&self) -> Result<ProviderSettings> {
        if let Some(path) = self.config.as_ref() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read settings from {:?}", path))?;
            let mut settings: ProviderSettings = serde_json::from_str(&content)
                .with_context(|| format!("failed to parse settings in {:?}", path))?;
            if settings.token.is_none() && settings.token_file.is_none() {
                settings.token = self.token.clone();
            }
            return Ok(settings);
        }

        Ok(ProviderSettings {
            address: self
                .address
                .clone()
                .context("--address (or VAULT_ADDR) is required")?,
            token: match self.token_file {
                Some(_) => None,
                None => self.token.clone(),
            },
            token_file: self.token_file.clone(),
            secret_path: self
                .secret_path
                .clone()
                .context("--secret-path is required")?,
            access_key_name: self.access_key_name.clone(),
            secret_key_name: self.secret_key_name.clone(),
            ttl_ms: self.ttl_ms,
            timeout_ms: self.timeout_ms,
            fetch_timeout_ms: self.fetch_timeout_ms,
            ca_file: self.ca_file.clone(),
            kv_v2: !self.kv_v1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["vault-credentials"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults() {
        let args = parse(&["--address", "http://vault:8200", "--secret-path", "secret/aws"]);
        assert_eq!(args.provider, "vault");
        assert_eq!(args.log_format, LogFormat::Text);
        assert!(!args.watch);

        let settings = args.settings().unwrap();
        assert_eq!(settings.access_key_name, "access_key_id");
        assert_eq!(settings.secret_key_name, "secret_access_key");
        assert_eq!(settings.ttl_ms, 6000);
        assert!(settings.kv_v2);
    }

    #[test]
    fn flags_map_to_settings() {
        let args = parse(&[
            "--address",
            "https://vault:8200",
            "--token",
            "s.cli",
            "--secret-path",
            "kv/aws",
            "--access-key-name",
            "ak",
            "--secret-key-name",
            "sk",
            "--ttl-ms",
            "30000",
            "--kv-v1",
            "--log-format",
            "json",
        ]);
        assert_eq!(args.log_format, LogFormat::Json);

        let config = args.settings().unwrap().build().unwrap();
        assert_eq!(config.token(), "s.cli");
        assert_eq!(config.secret_path(), "kv/aws");
        assert_eq!(config.ttl().as_secs(), 30);
        assert!(!config.kv_v2());
    }

    #[test]
    fn token_file_takes_precedence() {
        let args = parse(&[
            "--address",
            "http://vault:8200",
            "--secret-path",
            "secret/aws",
            "--token",
            "s.inline",
            "--token-file",
            "/run/secrets/vault-token",
        ]);
        let settings = args.settings().unwrap();
        assert!(settings.token.is_none());
        assert_eq!(
            settings.token_file,
            Some(PathBuf::from("/run/secrets/vault-token"))
        );
    }

    #[test]
    fn missing_secret_path() {
        let args = parse(&["--address", "http://vault:8200"]);
        let err = args.settings().unwrap_err();
        assert!(err.to_string().contains("--secret-path"));
    }

    #[test]
    fn settings_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "address": "http://vault:8200",
                "secret_path": "secret/aws",
                "access_key_name": "ak",
                "secret_key_name": "sk",
                "ttl_ms": 120000
            }}"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap();
        let args = parse(&["--config", path, "--token", "s.from-cli"]);
        let config = args.settings().unwrap().build().unwrap();
        assert_eq!(config.ttl().as_secs(), 120);
        assert_eq!(config.token(), "s.from-cli");
    }
}
