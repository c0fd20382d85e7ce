use std::{
    fs,
    path::{Path, PathBuf},
};

use caduceus_agent::embedder::EmbedderSettings;
use caduceus_index::IndexSettings;
use color_eyre::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};

/// User-level configuration loaded from `~/.config/caduceus/config.toml`
/// (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Tenant namespace this installation produces and queries for.
    pub hospital: Option<String>,
    /// Override for the data directory (tenant keys, audit journal).
    pub data_dir: Option<PathBuf>,
    /// Credential signing settings.
    pub auth: Option<AuthConfig>,
    /// Key-resolution settings.
    pub key: Option<KeyConfig>,
    /// Vector-store collaborator connection.
    pub index: Option<IndexSettings>,
    /// Embedding collaborator connection; a local hashing embedder is used
    /// when absent.
    pub embedder: Option<EmbedderSettings>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct AuthConfig {
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct KeyConfig {
    /// `local` (provision under `dir`) or `external` (read-only mount).
    pub mode: Option<String>,
    pub dir: Option<PathBuf>,
    pub mount_dir: Option<PathBuf>,
}

/// Load config from the default path; if missing, return defaults.
pub fn load() -> Result<Config> {
    let path = default_path()?;
    load_from_path(path)
}

/// Load config from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = toml::from_str(&contents)?;
    Ok(cfg)
}

/// Resolve the default config path (platform aware).
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("caduceus").join("config.toml"))
}

/// Write the given config to disk, creating parent directories as needed.
/// Never overwrites an existing file.
pub fn write_default_if_missing(config: &Config) -> Result<PathBuf> {
    let path = default_path()?;
    if path.exists() {
        return Ok(path);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(&path, body)?;
    Ok(path)
}
