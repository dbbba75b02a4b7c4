//! Identifier newtypes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Unique, stable, human-readable plugin identifier.
///
/// Plugin IDs come from the host configuration and are strings like
/// `"economy"` or `"region-guard"`. They must be non-empty and contain only
/// lowercase alphanumeric characters, hyphens and underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PluginId(String);

/// Deserialize with validation so malformed identifiers are rejected at the
/// wire boundary rather than deep inside session bookkeeping.
impl<'de> Deserialize<'de> for PluginId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl PluginId {
    /// Create a new `PluginId`, validating the format.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPluginId`] if the ID is empty or contains
    /// invalid characters.
    pub fn new(id: impl Into<String>) -> CoreResult<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Create a `PluginId` without validation (for tests and internal use).
    #[must_use]
    pub fn from_static(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> CoreResult<()> {
        if id.is_empty() {
            return Err(CoreError::InvalidPluginId(
                "plugin id must not be empty".into(),
            ));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            return Err(CoreError::InvalidPluginId(format!(
                "plugin id must contain only lowercase alphanumeric characters, hyphens and underscores, got: {id}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PluginId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Host-assigned world identifier.
///
/// Allocated by the registry when a world is attached and stable for the
/// lifetime of that world instance. Never reused within one host run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldId(pub u64);

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
