use crate::config::{Args, LogFormat};
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;
use vault_credentials::{registry, CachedCredentials, Credentials};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_format)?;

    let config = args
        .settings()?
        .build()
        .context("invalid provider configuration")?;
    let provider = registry::create(&args.provider, &config)?;
    let credentials = CachedCredentials::new(provider);

    report(&credentials.get().await?, args.export);

    if !args.watch {
        return Ok(());
    }

    let mut interval = tokio::time::interval(Duration::from_millis(args.poll_ms.max(1)));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, stopping");
                break;
            }
            _ = interval.tick() => {
                if !credentials.is_expired() {
                    continue;
                }
                match credentials.get().await {
                    Ok(creds) => report(&creds, args.export),
                    Err(err) => warn!(error = %err, "credential refresh failed"),
                }
            }
        }
    }

    Ok(())
}

fn init_logging(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| anyhow!("failed to install log subscriber: {}", e))
}

fn report(creds: &Credentials, export: bool) {
    if export {
        println!("export AWS_ACCESS_KEY_ID={}", creds.access_key_id);
        println!("export AWS_SECRET_ACCESS_KEY={}", creds.secret_access_key);
    } else {
        println!("{} {}", creds.provider_name, creds.masked_access_key_id());
    }
}

mod config;
