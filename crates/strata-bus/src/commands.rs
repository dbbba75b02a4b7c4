//! The host-level command table.
//!
//! Plugin-declared commands are recorded here during Hello handling (the
//! only writer) and a single binding per command is registered with the
//! engine. The engine-side runtime handler is a no-op; actual execution is
//! reported back to plugins as a command event, so there is no contention on
//! the gameplay hot path.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use strata_core::{CommandSpec, EngineServices, PluginId};

/// One registered command or alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommandBinding {
    /// The declaring plugin.
    pub(crate) plugin_id: PluginId,
    /// The normalized spec (slashes stripped, aliases de-duplicated).
    pub(crate) spec: CommandSpec,
}

#[derive(Default)]
pub(crate) struct CommandTable {
    entries: Mutex<HashMap<String, CommandBinding>>,
}

impl CommandTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register every spec from a Hello.
    ///
    /// Normalization strips leading slashes, drops empty aliases and aliases
    /// equal to the primary name, and de-duplicates the rest. Registration
    /// is idempotent by name: a byte-equal re-declaration is a no-op, while
    /// a changed spec overwrites the entry (Hello overwrites).
    pub(crate) fn register(
        &self,
        engine: &dyn EngineServices,
        plugin_id: &PluginId,
        specs: &[CommandSpec],
    ) {
        for spec in specs {
            let name = spec.name.trim_start_matches('/').to_string();
            if name.is_empty() {
                continue;
            }

            let mut aliases: Vec<String> = Vec::with_capacity(spec.aliases.len());
            for alias in &spec.aliases {
                let alias = alias.trim_start_matches('/');
                if alias.is_empty() || alias == name || aliases.iter().any(|a| a == alias) {
                    continue;
                }
                aliases.push(alias.to_string());
            }

            let normalized = CommandSpec {
                name: name.clone(),
                description: spec.description.clone(),
                aliases,
            };
            let binding = CommandBinding {
                plugin_id: plugin_id.clone(),
                spec: normalized.clone(),
            };

            {
                let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
                if entries.get(&name) == Some(&binding) {
                    continue;
                }
                entries.insert(name.clone(), binding.clone());
                for alias in &normalized.aliases {
                    entries.insert(alias.clone(), binding.clone());
                }
            }

            debug!(plugin_id = %plugin_id, command = %name, aliases = normalized.aliases.len(), "registered plugin command");
            engine.register_command(&normalized);
        }
    }

    /// Look up the binding for a command or alias name.
    pub(crate) fn get(&self, name: &str) -> Option<CommandBinding> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
