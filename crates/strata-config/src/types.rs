//! Configuration file structure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The host configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Listen address: `host:port` (suffix `:0` picks an ephemeral loopback
    /// port) or a Unix socket path (`unix:/path` or a leading `/`).
    #[serde(default)]
    pub server_port: String,

    /// Plugin ids whose Hello must arrive before boot progresses.
    #[serde(default)]
    pub required_plugins: Vec<String>,

    /// Cap on the Hello wait, in milliseconds. Zero falls back to the
    /// default.
    #[serde(default)]
    pub hello_timeout_ms: u64,

    /// The configured plugins, one session each.
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,
}

/// Process configuration for a single plugin instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Stable session identity. Defaults to `name`, then `plugin-<index>`.
    #[serde(default)]
    pub id: String,

    /// Human-readable name.
    #[serde(default)]
    pub name: String,

    /// Command to spawn. Empty means the plugin connects on its own and no
    /// child process is launched.
    #[serde(default)]
    pub command: String,

    /// Arguments passed to the command.
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory configuration.
    #[serde(default)]
    pub work_dir: WorkDir,

    /// Extra environment for the child process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Override for the address advertised to this plugin. Defaults to the
    /// host's actual listen address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Working-directory configuration for a plugin process.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkDir {
    /// A filesystem path, or a git remote URL when `git.enabled`.
    #[serde(default)]
    pub path: String,

    /// Remote-git mode.
    #[serde(default)]
    pub git: GitWorkDir,
}

/// Remote-git work-dir options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GitWorkDir {
    /// Treat `path` as a git remote and clone it into a per-plugin temp
    /// directory.
    #[serde(default)]
    pub enabled: bool,

    /// Keep the checkout across host runs instead of re-cloning.
    #[serde(default)]
    pub persistent: bool,

    /// Optional ref to check out (detached) after cloning.
    #[serde(default)]
    pub version: String,
}
