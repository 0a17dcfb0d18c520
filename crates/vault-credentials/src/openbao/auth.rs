//! Token loading for OpenBao.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

/// Auth token stored in a file on disk.
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read the token, trimming surrounding whitespace.
    pub fn load(&self) -> Result<String> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read token from {:?}", self.path))?;
        let token = content.trim().to_string();
        debug!(path = ?self.path, "loaded OpenBao token");
        Ok(token)
    }
}
