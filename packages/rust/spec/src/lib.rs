//! Build request fields read by the plugin renderer.
//!
//! Every field is optional. A field is either set or absent; rules that
//! need a usable value additionally treat empty strings and empty lists
//! as absent (see the `*_value` accessors).

pub mod registry;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use reactorconf_shared::{ReactorConfError, Result};

pub use registry::RegistryUri;

/// Read-only snapshot of a build request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSpec {
    /// Koji hub URL.
    pub kojihub: Option<String>,
    /// Yum repo file URLs to inject.
    pub yum_repourls: Option<Vec<String>>,
    /// Target architectures.
    pub platforms: Option<Vec<String>>,
    /// Koji task that produced a base filesystem image.
    pub filesystem_koji_task_id: Option<u64>,
    pub vendor: Option<String>,
    pub authoritative_registry: Option<String>,
    pub distribution_scope: Option<String>,
    /// Explicit release. When set, release bumping is skipped.
    pub release: Option<String>,
    pub info_url_format: Option<String>,
    /// Groups of labels that must carry equal values.
    pub equal_labels: Option<Vec<Vec<String>>>,
    /// Proxy for yum repos.
    pub proxy: Option<String>,
    pub flatpak: Option<bool>,
    /// Externally reachable URL of the build service.
    pub builder_openshift_url: Option<String>,
    pub use_auth: Option<bool>,
    /// Registries to push to, `[scheme://]host[:port][/path][/vN]`.
    pub registry_uris: Option<Vec<String>>,
    /// Secret names, paired positionally with `registry_uris`.
    pub registry_secrets: Option<Vec<String>>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn non_empty_list<T>(value: &Option<Vec<T>>) -> Option<&[T]> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl BuildSpec {
    /// Parse a spec from JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| ReactorConfError::parse(format!("invalid build spec: {e}")))
    }

    /// Parse a spec from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ReactorConfError::parse(format!("invalid build spec: {e}")))
    }

    pub fn kojihub_value(&self) -> Option<&str> {
        non_empty(&self.kojihub)
    }

    pub fn release_value(&self) -> Option<&str> {
        non_empty(&self.release)
    }

    pub fn proxy_value(&self) -> Option<&str> {
        non_empty(&self.proxy)
    }

    pub fn info_url_format_value(&self) -> Option<&str> {
        non_empty(&self.info_url_format)
    }

    pub fn yum_repourls_value(&self) -> Option<&[String]> {
        non_empty_list(&self.yum_repourls)
    }

    pub fn platforms_value(&self) -> Option<&[String]> {
        non_empty_list(&self.platforms)
    }

    pub fn equal_labels_value(&self) -> Option<&[Vec<String>]> {
        non_empty_list(&self.equal_labels)
    }

    /// Task id, ignoring the zero id Koji never assigns.
    pub fn filesystem_koji_task_id_value(&self) -> Option<u64> {
        self.filesystem_koji_task_id.filter(|id| *id != 0)
    }

    pub fn is_flatpak(&self) -> bool {
        self.flatpak.unwrap_or(false)
    }

    /// Registry records paired positionally with secret names.
    ///
    /// The shorter list is padded with `None`. An unparseable registry is
    /// reported as `None` so the caller can skip just that entry.
    pub fn registries(&self) -> Vec<(Option<RegistryUri>, Option<&str>)> {
        let uris = self.registry_uris.as_deref().unwrap_or_default();
        let secrets = self.registry_secrets.as_deref().unwrap_or_default();
        let len = uris.len().max(secrets.len());

        (0..len)
            .map(|i| {
                let registry = uris.get(i).and_then(|raw| match RegistryUri::parse(raw) {
                    Ok(registry) => Some(registry),
                    Err(e) => {
                        warn!(registry = %raw, error = %e, "skipping unusable registry");
                        None
                    }
                });
                let secret = secrets.get(i).map(String::as_str).filter(|s| !s.is_empty());
                (registry, secret)
            })
            .collect()
    }
}

/// Load a build spec file. `.toml` files are read as TOML, anything else as JSON.
pub fn load_spec(path: &Path) -> Result<BuildSpec> {
    let content = std::fs::read_to_string(path).map_err(|e| ReactorConfError::io(path, e))?;
    let is_toml = path.extension().is_some_and(|ext| ext == "toml");

    let spec = if is_toml {
        BuildSpec::from_toml(&content)
    } else {
        BuildSpec::from_json(&content)
    };

    spec.map_err(|e| match e {
        ReactorConfError::Parse { message } => {
            ReactorConfError::parse(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}
