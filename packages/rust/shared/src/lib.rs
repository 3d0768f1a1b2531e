//! Shared types, error model, and configuration for reactorconf.
//!
//! This crate is the foundation depended on by all other reactorconf crates.
//! It provides:
//! - [`ReactorConfError`]: the unified error type
//! - The plugin configuration tree ([`PluginsConfig`], [`PluginEntry`], [`Phase`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, RenderDefaults, config_dir, config_file_path, init_config, init_config_at,
    load_config, load_config_from, validate_config,
};
pub use error::{ReactorConfError, Result};
pub use types::{
    Args, DEFAULT_REGISTRY_VERSION, DEFAULT_SECRETS_PATH, Phase, PluginEntry, PluginsConfig,
    REGISTRY_PLACEHOLDER, load_template,
};
