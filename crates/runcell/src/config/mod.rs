use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

pub use crate::config::language::{CompileConfig, FileExtension, Language, RunConfig};
pub use crate::config::registry::{LANGUAGES, LanguageRegistry};

pub mod language;
mod loader;
pub mod registry;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../runcell.example.toml");

/// Default cap on captured bytes per output stream (1 MiB)
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid characters in file extension")]
    InvalidFileExtChars,

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("language '{0}' not found in configuration")]
    LanguageNotFound(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Service configuration for runcell
///
/// Run and compile timeouts are deliberately absent: they are fixed by the
/// crate (see [`crate::runner::RUN_TIMEOUT`]).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory under which per-request workspaces are created.
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    /// Maximum number of workspaces (and so executions) alive at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_executions: usize,

    /// Cap on captured bytes per output stream of a single process.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP service listens on
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Config {
    /// Create a config with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a language from the built-in registry by ID
    pub fn get_language(&self, id: &str) -> Result<&'static Language, ConfigError> {
        LanguageRegistry::builtin().lookup(id)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            max_concurrent_executions: default_max_concurrent(),
            max_output_bytes: default_max_output_bytes(),
            server: ServerConfig::default(),
        }
    }
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("runcell")
}

fn default_max_concurrent() -> usize {
    8
}

fn default_max_output_bytes() -> usize {
    DEFAULT_MAX_OUTPUT_BYTES
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 4000))
}
