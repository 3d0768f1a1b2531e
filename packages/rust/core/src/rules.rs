//! Per-plugin render rules.
//!
//! Each rule refines the arguments of one plugin, or drops it, based on the
//! build spec. The renderer only calls a rule when its plugin is configured.

use std::path::Path;

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use reactorconf_shared::{Args, Phase, REGISTRY_PLACEHOLDER, ReactorConfError, Result};
use reactorconf_spec::BuildSpec;

use crate::manipulate::PluginStore;

/// Read-only inputs shared by all rules of one render.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub spec: &'a BuildSpec,
    /// Directory registry secrets are resolved under.
    pub secrets_path: &'a Path,
}

/// A render rule for one plugin.
pub type Rule = fn(&RenderContext<'_>, &mut dyn PluginStore) -> Result<()>;

// ---------------------------------------------------------------------------
// Prebuild
// ---------------------------------------------------------------------------

pub(crate) fn add_filesystem(ctx: &RenderContext<'_>, store: &mut dyn PluginStore) -> Result<()> {
    const PLUGIN: &str = "add_filesystem";
    let spec = ctx.spec;

    let Some(hub) = spec.kojihub_value() else {
        return Err(ReactorConfError::validation(
            "custom base image builds require a build hub to be defined",
        ));
    };
    store.set_arg(Phase::Prebuild, PLUGIN, "koji_hub", json!(hub))?;

    if let Some(repos) = spec.yum_repourls_value() {
        store.set_arg(Phase::Prebuild, PLUGIN, "repos", json!(repos))?;
    }
    if let Some(platforms) = spec.platforms_value() {
        store.set_arg(Phase::Prebuild, PLUGIN, "architectures", json!(platforms))?;
    }
    if let Some(task_id) = spec.filesystem_koji_task_id_value() {
        store.set_arg(Phase::Prebuild, PLUGIN, "from_task_id", json!(task_id))?;
    }
    Ok(())
}

pub(crate) fn add_labels_in_dockerfile(
    ctx: &RenderContext<'_>,
    store: &mut dyn PluginStore,
) -> Result<()> {
    const PLUGIN: &str = "add_labels_in_dockerfile";
    let spec = ctx.spec;

    let label_fields = [
        ("vendor", &spec.vendor),
        ("authoritative-source-url", &spec.authoritative_registry),
        ("distribution-scope", &spec.distribution_scope),
        ("release", &spec.release),
    ];
    let implicit_labels: Args = label_fields
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .as_ref()
                .map(|value| (label.to_string(), Value::String(value.clone())))
        })
        .collect();

    debug!(count = implicit_labels.len(), "merging implicit labels");
    store.merge_arg(Phase::Prebuild, PLUGIN, "labels", implicit_labels)?;

    if let Some(info_url_format) = spec.info_url_format_value() {
        store.set_arg(Phase::Prebuild, PLUGIN, "info_url_format", json!(info_url_format))?;
    }
    if let Some(equal_labels) = spec.equal_labels_value() {
        store.set_arg(Phase::Prebuild, PLUGIN, "equal_labels", json!(equal_labels))?;
    }
    Ok(())
}

pub(crate) fn add_yum_repo_by_url(
    ctx: &RenderContext<'_>,
    store: &mut dyn PluginStore,
) -> Result<()> {
    const PLUGIN: &str = "add_yum_repo_by_url";
    let spec = ctx.spec;

    let Some(repourls) = spec.yum_repourls_value() else {
        return Ok(());
    };
    store.set_arg(Phase::Prebuild, PLUGIN, "repourls", json!(repourls))?;

    if let Some(proxy) = spec.proxy_value() {
        store.set_arg(Phase::Prebuild, PLUGIN, "inject_proxy", json!(proxy))?;
    }
    Ok(())
}

pub(crate) fn bump_release(ctx: &RenderContext<'_>, store: &mut dyn PluginStore) -> Result<()> {
    const PLUGIN: &str = "bump_release";
    let spec = ctx.spec;

    if spec.release_value().is_some() {
        info!(plugin = PLUGIN, "removing plugin, release already specified");
        store.remove_plugin(Phase::Prebuild, PLUGIN);
        return Ok(());
    }

    let Some(hub) = spec.kojihub_value() else {
        info!(plugin = PLUGIN, "removing plugin, koji hub not specified");
        store.remove_plugin(Phase::Prebuild, PLUGIN);
        return Ok(());
    };
    store.set_arg(Phase::Prebuild, PLUGIN, "hub", json!(hub))?;

    // Flatpak NVRs are <name>-<stream>-<module version>.<n>; Koji appends .<n>
    // to keep them unique.
    if spec.is_flatpak() {
        store.set_arg(Phase::Prebuild, PLUGIN, "append", json!(true))?;
    }
    Ok(())
}

pub(crate) fn check_and_set_rebuild(
    ctx: &RenderContext<'_>,
    store: &mut dyn PluginStore,
) -> Result<()> {
    const PLUGIN: &str = "check_and_set_rebuild";
    let spec = ctx.spec;

    store.set_arg(Phase::Prebuild, PLUGIN, "url", json!(spec.builder_openshift_url))?;

    if let Some(use_auth) = spec.use_auth {
        store.set_arg(Phase::Prebuild, PLUGIN, "use_auth", json!(use_auth))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Postbuild
// ---------------------------------------------------------------------------

pub(crate) fn tag_and_push(ctx: &RenderContext<'_>, store: &mut dyn PluginStore) -> Result<()> {
    const PLUGIN: &str = "tag_and_push";

    let has_placeholder = store
        .get_plugin_args(Phase::Postbuild, PLUGIN)?
        .and_then(|args| args.get("registries"))
        .and_then(Value::as_object)
        .is_some_and(|registries| registries.contains_key(REGISTRY_PLACEHOLDER));
    if !has_placeholder {
        debug!("no registry placeholder, registries left as configured");
        return Ok(());
    }

    let args = store.get_plugin_args_mut(Phase::Postbuild, PLUGIN)?;
    let Some(Value::Object(registries)) = args.get_mut("registries") else {
        return Ok(());
    };

    let template = match registries.shift_remove(REGISTRY_PLACEHOLDER) {
        Some(Value::Object(template)) => template,
        Some(other) => {
            warn!(found = %other, "registry placeholder options are not a mapping, using none");
            Args::new()
        }
        None => Args::new(),
    };

    for (registry, secret) in ctx.spec.registries() {
        let Some(registry) = registry.filter(|r| !r.docker_uri().is_empty()) else {
            continue;
        };

        let mut options = template.clone();
        options.insert("version".to_string(), json!(registry.version()));
        if let Some(secret) = secret {
            let path = ctx.secrets_path.join(secret);
            options.insert("secret".to_string(), json!(path.to_string_lossy()));
        }

        debug!(registry = registry.docker_uri(), version = registry.version(), "expanded registry");
        registries.insert(registry.docker_uri().to_string(), Value::Object(options));
    }
    Ok(())
}
