//! Plugin configuration renderer.
//!
//! Takes a plugins template and a build spec and produces the configuration
//! handed to the build executor. Phases render in execution order, and each
//! phase applies its rules in the order of its rule table. A rule runs only
//! if the template configures its plugin; rules never add plugins.

use std::path::PathBuf;

use tracing::{debug, info, instrument, trace};

use reactorconf_shared::{DEFAULT_SECRETS_PATH, Phase, PluginsConfig, Result};
use reactorconf_spec::BuildSpec;

use crate::manipulate::PluginStore;
use crate::rules::{self, RenderContext, Rule};

const PREBUILD_RULES: &[(&str, Rule)] = &[
    ("add_filesystem", rules::add_filesystem),
    ("add_labels_in_dockerfile", rules::add_labels_in_dockerfile),
    ("add_yum_repo_by_url", rules::add_yum_repo_by_url),
    ("bump_release", rules::bump_release),
    ("check_and_set_rebuild", rules::check_and_set_rebuild),
];

const POSTBUILD_RULES: &[(&str, Rule)] = &[("tag_and_push", rules::tag_and_push)];

/// Rules applied in `phase`, keyed by the plugin they configure.
pub fn phase_rules(phase: Phase) -> &'static [(&'static str, Rule)] {
    match phase {
        Phase::Prebuild => PREBUILD_RULES,
        Phase::Postbuild => POSTBUILD_RULES,
        Phase::Buildstep | Phase::Prepublish | Phase::Exit => &[],
    }
}

/// Renders one plugins template against one build spec.
#[derive(Debug)]
pub struct PluginsRenderer<'a> {
    spec: &'a BuildSpec,
    config: PluginsConfig,
    secrets_path: PathBuf,
}

impl<'a> PluginsRenderer<'a> {
    /// Prepare a render. The template is copied; the caller's value is never touched.
    pub fn new(spec: &'a BuildSpec, template: &PluginsConfig) -> Self {
        Self {
            spec,
            config: template.clone(),
            secrets_path: PathBuf::from(DEFAULT_SECRETS_PATH),
        }
    }

    /// Resolve registry secrets under `path` instead of the default.
    pub fn with_secrets_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.secrets_path = path.into();
        self
    }

    /// Render all phases and return the resulting configuration.
    ///
    /// A validation failure aborts the whole render; the partially
    /// rendered copy is dropped with `self`.
    #[instrument(skip_all, fields(phases = self.config.0.len()))]
    pub fn render(mut self) -> Result<PluginsConfig> {
        let ctx = RenderContext {
            spec: self.spec,
            secrets_path: &self.secrets_path,
        };

        for phase in Phase::ALL {
            render_phase(&ctx, &mut self.config, phase)?;
        }

        info!("plugins configuration rendered");
        Ok(self.config)
    }
}

fn render_phase(ctx: &RenderContext<'_>, store: &mut dyn PluginStore, phase: Phase) -> Result<()> {
    for (plugin, rule) in phase_rules(phase) {
        if !store.has_plugin(phase, plugin) {
            trace!(%phase, plugin, "plugin not configured, skipping");
            continue;
        }
        debug!(%phase, plugin, "rendering plugin");
        rule(ctx, store)?;
    }
    Ok(())
}

/// Render `template` for `spec` with default settings.
pub fn render(spec: &BuildSpec, template: &PluginsConfig) -> Result<PluginsConfig> {
    PluginsRenderer::new(spec, template).render()
}
