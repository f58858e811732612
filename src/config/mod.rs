mod types;

pub use types::*;

use std::path::Path;

use anyhow::Context;
use nova_common::{validate, Error};

/// Load executor options from a TOML file.
pub fn load_options(path: &Path) -> anyhow::Result<ExecutorOptions> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read options file: {:?}", path))?;

    let options = ExecutorOptions::from_toml_str(&content)
        .with_context(|| format!("Failed to parse options file: {:?}", path))?;

    Ok(options)
}

impl ExecutorOptions {
    /// Parse and validate options from a TOML document.
    pub fn from_toml_str(content: &str) -> nova_common::Result<Self> {
        let options: ExecutorOptions =
            toml::from_str(content).map_err(|e| Error::config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Reject rate limits that could never admit a request.
    pub fn validate(&self) -> nova_common::Result<()> {
        let limits = [
            ("local", &self.rate_limits.local),
            ("global", &self.rate_limits.global),
        ];
        for (scope, limit) in limits {
            if let Some(limit) = limit {
                validate::configured(
                    limit.window_ms > 0,
                    format!("{scope} rate limit window must be greater than 0"),
                )?;
                validate::configured(
                    limit.limit > 0,
                    format!("{scope} rate limit must allow at least one request"),
                )?;
            }
        }
        Ok(())
    }
}
