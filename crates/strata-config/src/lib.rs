//! Strata Config - Configuration surface for the Strata plugin host.
//!
//! The host reads one YAML file:
//!
//! ```yaml
//! server_port: "127.0.0.1:0"      # or a unix socket path
//! required_plugins: [economy]
//! hello_timeout_ms: 2000
//! plugins:
//!   - id: economy
//!     name: Economy
//!     command: ./economy-plugin
//!     args: ["--verbose"]
//!     work_dir:
//!       path: ./plugins/economy
//!     env:
//!       ECONOMY_DB: economy.sqlite
//! ```
//!
//! Loading is two-phase: [`Config::load`] parses and validates, and the
//! async [`resolve_work_dirs`] performs the side-effectful part (cloning
//! remote-git work dirs) before processes are spawned.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod error;
mod loader;
mod types;
mod workdir;

pub use error::{ConfigError, ConfigResult};
pub use types::{Config, GitWorkDir, PluginConfig, WorkDir};
pub use workdir::resolve_work_dirs;

/// Default hello-wait cap in milliseconds.
pub const DEFAULT_HELLO_TIMEOUT_MS: u64 = 2000;
