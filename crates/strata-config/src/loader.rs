//! Parsing, validation and defaulting.

use std::path::Path;

use crate::DEFAULT_HELLO_TIMEOUT_MS;
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

impl Config {
    /// Read and decode the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NotFound`] if the file does not exist (callers may
    /// treat a missing file as "no plugins"), [`ConfigError::Parse`] for
    /// malformed YAML, and [`ConfigError::MissingField`] for a missing
    /// `server_port`.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };
        Self::from_str(&data)
    }

    /// Decode configuration from a YAML string and apply defaults.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`], minus the I/O cases.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(data: &str) -> ConfigResult<Self> {
        let mut cfg: Self = serde_yaml::from_str(data)?;
        cfg.apply_defaults()?;
        Ok(cfg)
    }

    fn apply_defaults(&mut self) -> ConfigResult<()> {
        if self.server_port.is_empty() {
            return Err(ConfigError::MissingField("server_port"));
        }
        if self.hello_timeout_ms == 0 {
            self.hello_timeout_ms = DEFAULT_HELLO_TIMEOUT_MS;
        }
        for (i, plugin) in self.plugins.iter_mut().enumerate() {
            if plugin.id.is_empty() {
                plugin.id = if plugin.name.is_empty() {
                    format!("plugin-{}", i + 1)
                } else {
                    plugin.name.to_lowercase().replace(' ', "-")
                };
            }
        }
        Ok(())
    }
}
