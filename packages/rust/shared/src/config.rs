//! Application configuration for reactorconf.
//!
//! User config lives at `~/.reactorconf/reactorconf.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ReactorConfError, Result};
use crate::types::DEFAULT_SECRETS_PATH;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "reactorconf.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".reactorconf";

// ---------------------------------------------------------------------------
// Config structs (matching reactorconf.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Rendering defaults.
    #[serde(default)]
    pub render: RenderDefaults,
}

/// `[render]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderDefaults {
    /// Directory registry secrets are mounted under in the build container.
    #[serde(default = "default_secrets_path")]
    pub secrets_path: String,

    /// Externally reachable URL of the build service. Used when a build
    /// spec does not carry its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builder_url: Option<Url>,

    /// Pretty-print rendered JSON.
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            secrets_path: default_secrets_path(),
            builder_url: None,
            pretty: true,
        }
    }
}

fn default_secrets_path() -> String {
    DEFAULT_SECRETS_PATH.into()
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.reactorconf/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ReactorConfError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.reactorconf/reactorconf.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ReactorConfError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        ReactorConfError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    init_config_at(&config_file_path()?)
}

/// Write a default config file at `path`, creating parent directories.
pub fn init_config_at(path: &Path) -> Result<PathBuf> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| ReactorConfError::io(dir, e))?;
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ReactorConfError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ReactorConfError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path.to_path_buf())
}

/// Reject settings the renderer cannot use.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let secrets = &config.render.secrets_path;
    if !Path::new(secrets).is_absolute() {
        return Err(ReactorConfError::config(format!(
            "render.secrets_path must be an absolute path, got '{secrets}'"
        )));
    }
    Ok(())
}
