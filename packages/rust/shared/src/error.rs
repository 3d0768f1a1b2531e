//! Error types for reactorconf.
//!
//! Library crates use [`ReactorConfError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::Phase;

/// Top-level error type for all reactorconf operations.
#[derive(Debug, thiserror::Error)]
pub enum ReactorConfError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A template or build spec could not be decoded.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The build spec cannot satisfy a configured plugin. Aborts the render.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A plugin was looked up by (phase, name) but is not configured.
    #[error("no plugin '{plugin}' configured in phase {phase}")]
    ConfigLookup { phase: Phase, plugin: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ReactorConfError>;

impl ReactorConfError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Plugin lookup failure for `(phase, plugin)`.
    pub fn lookup(phase: Phase, plugin: impl Into<String>) -> Self {
        Self::ConfigLookup {
            phase,
            plugin: plugin.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
