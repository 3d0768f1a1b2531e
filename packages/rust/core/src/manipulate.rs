//! Locate, mutate, and remove plugins in a plugin configuration tree.
//!
//! Plugins are addressed by `(phase, name)`; when a phase lists the same
//! name twice, the first entry wins. Nothing here adds a plugin to a phase.

use serde_json::Value;
use tracing::{debug, warn};

use reactorconf_shared::{Args, Phase, PluginsConfig, ReactorConfError, Result};

/// Narrow view of a plugin configuration used by render rules.
pub trait PluginStore {
    /// Whether `phase` exists and lists a plugin called `name`.
    fn has_plugin(&self, phase: Phase, name: &str) -> bool;

    /// The plugin's argument block, `None` when the entry has no `args` or
    /// an `args` of `null`.
    ///
    /// Fails with [`ReactorConfError::ConfigLookup`] if the plugin is not configured.
    fn get_plugin_args(&self, phase: Phase, name: &str) -> Result<Option<&Args>>;

    /// Mutable argument block of a configured plugin, inserting an empty
    /// `args` block if the entry has none or has `null`.
    fn get_plugin_args_mut(&mut self, phase: Phase, name: &str) -> Result<&mut Args>;

    /// Remove the plugin from its phase. Returns whether anything was removed.
    fn remove_plugin(&mut self, phase: Phase, name: &str) -> bool;

    /// Overwrite argument `key`.
    fn set_arg(&mut self, phase: Phase, name: &str, key: &str, value: Value) -> Result<()> {
        self.get_plugin_args_mut(phase, name)?
            .insert(key.to_string(), value);
        Ok(())
    }

    /// Merge `incoming` into mapping argument `key`. Keys already present
    /// in the plugin's mapping keep their values.
    fn merge_arg(&mut self, phase: Phase, name: &str, key: &str, incoming: Args) -> Result<()> {
        let args = self.get_plugin_args_mut(phase, name)?;
        match args.get_mut(key) {
            None => {
                args.insert(key.to_string(), Value::Object(incoming));
            }
            Some(Value::Object(existing)) => {
                let current = std::mem::take(existing);
                *existing = shallow_union(current, incoming);
            }
            Some(other) => {
                warn!(%phase, plugin = name, key, found = %other, "argument is not a mapping, leaving it as is");
            }
        }
        Ok(())
    }
}

/// `existing ∪ (incoming − existing.keys)`. Not recursive.
pub fn shallow_union(mut existing: Args, incoming: Args) -> Args {
    for (key, value) in incoming {
        existing.entry(key).or_insert(value);
    }
    existing
}

impl PluginStore for PluginsConfig {
    fn has_plugin(&self, phase: Phase, name: &str) -> bool {
        self.phase(phase)
            .is_some_and(|plugins| plugins.iter().any(|p| p.name == name))
    }

    fn get_plugin_args(&self, phase: Phase, name: &str) -> Result<Option<&Args>> {
        self.phase(phase)
            .and_then(|plugins| plugins.iter().find(|p| p.name == name))
            .map(|plugin| plugin.args())
            .ok_or_else(|| ReactorConfError::lookup(phase, name))
    }

    fn get_plugin_args_mut(&mut self, phase: Phase, name: &str) -> Result<&mut Args> {
        let plugin = self
            .phase_mut(phase)
            .and_then(|plugins| plugins.iter_mut().find(|p| p.name == name))
            .ok_or_else(|| ReactorConfError::lookup(phase, name))?;
        Ok(plugin.args_mut())
    }

    fn remove_plugin(&mut self, phase: Phase, name: &str) -> bool {
        let Some(plugins) = self.phase_mut(phase) else {
            return false;
        };
        match plugins.iter().position(|p| p.name == name) {
            Some(index) => {
                plugins.remove(index);
                debug!(%phase, plugin = name, "removed plugin");
                true
            }
            None => false,
        }
    }
}
