//! Plugin configuration tree consumed by the container build executor.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{ReactorConfError, Result};

/// Sentinel registry key expanded once per configured registry.
pub const REGISTRY_PLACEHOLDER: &str = "{{REGISTRY_URI}}";

/// Base directory under which registry secret names are resolved.
pub const DEFAULT_SECRETS_PATH: &str = "/var/run/secrets/atomic-reactor";

/// Registry API version assumed when the URI carries none.
pub const DEFAULT_REGISTRY_VERSION: &str = "v1";

/// A plugin's argument mapping. Insertion order is preserved.
pub type Args = Map<String, Value>;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Build phases, declared (and ordered) in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "prebuild_plugins")]
    Prebuild,
    #[serde(rename = "buildstep_plugins")]
    Buildstep,
    #[serde(rename = "postbuild_plugins")]
    Postbuild,
    #[serde(rename = "prepublish_plugins")]
    Prepublish,
    #[serde(rename = "exit_plugins")]
    Exit,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Phase; 5] = [
        Phase::Prebuild,
        Phase::Buildstep,
        Phase::Postbuild,
        Phase::Prepublish,
        Phase::Exit,
    ];

    /// Bare phase name, e.g. `prebuild`.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Prebuild => "prebuild",
            Phase::Buildstep => "buildstep",
            Phase::Postbuild => "postbuild",
            Phase::Prepublish => "prepublish",
            Phase::Exit => "exit",
        }
    }

    /// Top-level key of this phase in the serialized configuration.
    pub fn config_key(self) -> &'static str {
        match self {
            Phase::Prebuild => "prebuild_plugins",
            Phase::Buildstep => "buildstep_plugins",
            Phase::Postbuild => "postbuild_plugins",
            Phase::Prepublish => "prepublish_plugins",
            Phase::Exit => "exit_plugins",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PluginEntry
// ---------------------------------------------------------------------------

/// A single plugin within a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginEntry {
    /// Plugin name, unique within its phase.
    pub name: String,
    /// Plugin arguments. The outer `None` means the entry has no `args`
    /// key; `Some(None)` is an explicit `"args": null`. Both stay as they
    /// are until something writes to the block.
    #[serde(
        default,
        deserialize_with = "present_args",
        skip_serializing_if = "Option::is_none"
    )]
    pub args: Option<Option<Args>>,
    /// Any other keys of the entry (`required`, `is_allowed_to_fail`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PluginEntry {
    /// Argument block, if the entry carries a non-null one.
    pub fn args(&self) -> Option<&Args> {
        self.args.as_ref().and_then(Option::as_ref)
    }

    /// Argument block for writing, replacing a missing or null block with
    /// an empty mapping.
    pub fn args_mut(&mut self) -> &mut Args {
        self.args.get_or_insert(None).get_or_insert_with(Args::new)
    }
}

// A present key always yields `Some`, so `null` survives as `Some(None)`.
fn present_args<'de, D>(deserializer: D) -> std::result::Result<Option<Option<Args>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Args>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// PluginsConfig
// ---------------------------------------------------------------------------

/// Phase → ordered plugin list. Plugin order within a phase is the
/// executor's run order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginsConfig(pub BTreeMap<Phase, Vec<PluginEntry>>);

impl PluginsConfig {
    /// Plugins configured for `phase`, if the phase is present at all.
    pub fn phase(&self, phase: Phase) -> Option<&[PluginEntry]> {
        self.0.get(&phase).map(Vec::as_slice)
    }

    /// Mutable plugin list for `phase`, if present.
    pub fn phase_mut(&mut self, phase: Phase) -> Option<&mut Vec<PluginEntry>> {
        self.0.get_mut(&phase)
    }

    /// Plugin names of `phase`, in order.
    pub fn plugin_names(&self, phase: Phase) -> Vec<&str> {
        self.phase(phase)
            .map(|plugins| plugins.iter().map(|p| p.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Parse a template from its JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| ReactorConfError::parse(format!("invalid plugins template: {e}")))
    }
}

/// Load a plugins template from a JSON file.
pub fn load_template(path: &Path) -> Result<PluginsConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ReactorConfError::io(path, e))?;
    let template = PluginsConfig::from_json(&content).map_err(|e| match e {
        ReactorConfError::Parse { message } => {
            ReactorConfError::parse(format!("{}: {message}", path.display()))
        }
        other => other,
    })?;
    tracing::debug!(?path, phases = template.0.len(), "loaded plugins template");
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn phases_are_ordered_for_execution() {
        let mut shuffled = vec![Phase::Exit, Phase::Prebuild, Phase::Prepublish, Phase::Postbuild];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![Phase::Prebuild, Phase::Postbuild, Phase::Prepublish, Phase::Exit]
        );
        assert_eq!(Phase::Buildstep.to_string(), "buildstep");
        assert_eq!(Phase::Exit.config_key(), "exit_plugins");
    }

    #[test]
    fn template_keeps_entry_shape() {
        let raw = json!({
            "prebuild_plugins": [
                {"name": "add_filesystem", "args": {}},
                {"name": "pull_base_image", "required": false},
            ],
            "exit_plugins": []
        });

        let config: PluginsConfig = serde_json::from_value(raw.clone()).expect("deserialize");
        assert_eq!(
            config.plugin_names(Phase::Prebuild),
            vec!["add_filesystem", "pull_base_image"]
        );
        assert!(config.phase(Phase::Prebuild).unwrap()[1].args.is_none());
        assert!(config.phase(Phase::Prebuild).unwrap()[0].args().is_some());
        assert!(config.phase(Phase::Postbuild).is_none());

        let back = serde_json::to_value(&config).expect("serialize");
        assert_eq!(back, raw);
    }

    #[test]
    fn null_args_differs_from_missing_args() {
        let raw = json!({
            "exit_plugins": [
                {"name": "remove_built_image", "args": null},
                {"name": "store_metadata_in_osv3"}
            ]
        });

        let mut config: PluginsConfig = serde_json::from_value(raw.clone()).expect("deserialize");
        let exit = config.phase(Phase::Exit).unwrap();
        assert_eq!(exit[0].args, Some(None));
        assert!(exit[0].args().is_none());
        assert_eq!(exit[1].args, None);
        assert_eq!(serde_json::to_value(&config).expect("serialize"), raw);

        config.phase_mut(Phase::Exit).unwrap()[0]
            .args_mut()
            .insert("tag".into(), json!("latest"));
        assert_eq!(
            serde_json::to_value(&config).expect("serialize")["exit_plugins"][0],
            json!({"name": "remove_built_image", "args": {"tag": "latest"}})
        );
    }

    #[test]
    fn loaded_template_names_its_file() {
        let path = std::env::temp_dir().join("reactorconf-bad-template.json");
        std::fs::write(&path, r#"{"middle_plugins": []}"#).expect("write temp template");
        let err = load_template(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);

        assert!(matches!(err, ReactorConfError::Parse { .. }));
        assert!(err.to_string().contains("reactorconf-bad-template.json"));
        assert!(err.to_string().contains("invalid plugins template"));
    }

    #[test]
    fn unknown_phase_is_rejected() {
        let err = PluginsConfig::from_json(r#"{"middle_plugins": []}"#).unwrap_err();
        assert!(err.to_string().contains("invalid plugins template"));
    }

    #[test]
    fn template_fixture_validates() {
        let fixture = std::fs::read_to_string("../../../fixtures/json/plugins.fixture.json")
            .expect("read fixture");
        let parsed = PluginsConfig::from_json(&fixture).expect("deserialize fixture template");
        assert_eq!(parsed.0.len(), 3);
        assert_eq!(parsed.plugin_names(Phase::Postbuild), vec!["tag_and_push"]);
    }
}
