//! Layered pipeline settings
//!
//! Defaults that used to live as in-file constants: an optional `nap.toml`
//! in the working directory, overlaid with `NAP_*` environment variables.
//! Command-line flags still win over everything here.

use anyhow::{Context, Result};
use nap_lib::features::FeatureConfig;
use serde::Deserialize;

/// Settings shared across subcommands
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Item name patterns to collect; empty means the built-in defaults
    #[serde(default)]
    pub item_patterns: Vec<String>,

    /// Extra host display names to exclude from collection
    #[serde(default)]
    pub excluded_hosts: Vec<String>,

    /// Feature extraction defaults
    #[serde(default)]
    pub features: Option<FeatureConfig>,
}

impl Settings {
    /// Load `nap.toml` (optional) layered with `NAP_*` environment
    /// variables.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("nap").required(false))
            .add_source(config::Environment::with_prefix("NAP").separator("__"))
            .build()
            .context("failed to load settings")?;

        Ok(config.try_deserialize().unwrap_or_default())
    }
}
