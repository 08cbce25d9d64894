//! Configuration file discovery and loading.

pub use liveops_core::config::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Locations searched, in order, when no path is given.
const DEFAULT_PATHS: [&str; 4] = [
    "./liveops.toml",
    "./config.toml",
    "~/.config/liveops/config.toml",
    "/etc/liveops/config.toml",
];

/// Load configuration from a TOML file, then apply environment overrides.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config = Config::from_toml(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;
    config.apply_env_overrides();

    Ok(config)
}

/// First default config location that exists.
pub fn find_config() -> Option<PathBuf> {
    DEFAULT_PATHS
        .iter()
        .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
        .find(|p| p.exists())
}

/// Load config from `custom_path`, a default location, or built-in defaults.
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    if let Some(path) = find_config() {
        tracing::debug!("Using config file {:?}", path);
        return load_config(&path);
    }

    let mut config = Config::default();
    config.apply_env_overrides();
    Ok(config)
}
