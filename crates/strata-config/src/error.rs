//! Configuration error types.

use std::path::PathBuf;

/// Errors from loading or resolving the host configuration. All of these are
/// fatal at boot.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    /// Reading the configuration file failed.
    #[error("read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The YAML failed to parse.
    #[error("decode configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A required option is missing or empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Cloning a remote-git work dir failed.
    #[error("clone remote plugin {plugin_id:?}: {message}")]
    GitClone {
        /// The plugin whose work dir failed to resolve.
        plugin_id: String,
        /// Failure description.
        message: String,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
