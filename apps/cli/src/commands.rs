//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use reactorconf_core::{PluginsRenderer, phase_rules};
use reactorconf_shared::{
    AppConfig, Phase, PluginsConfig, init_config, init_config_at, load_config, load_config_from,
    load_template,
};
use reactorconf_spec::{BuildSpec, load_spec};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// reactorconf: render container build plugin configurations.
#[derive(Parser)]
#[command(
    name = "reactorconf",
    version,
    about = "Render a plugins template against a build spec for the container build executor.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.reactorconf/reactorconf.toml.
    #[arg(long, global = true, env = "REACTORCONF_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Render a plugins template for a build spec.
    Render {
        /// Plugins template (JSON).
        #[arg(short, long)]
        template: PathBuf,

        /// Build spec (JSON, or TOML with a .toml extension).
        #[arg(short, long)]
        spec: PathBuf,

        /// Write the rendered configuration here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Directory registry secrets are resolved under.
        #[arg(long)]
        secrets_path: Option<String>,

        /// Emit compact JSON.
        #[arg(long)]
        compact: bool,
    },

    /// List phases and the plugins rendered in each, in execution order.
    Phases,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults, at `--config` if given.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries
/// the rendered configuration.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "reactorconf=warn",
        1 => "reactorconf=info",
        2 => "reactorconf=debug",
        _ => "reactorconf=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Render {
            template,
            spec,
            out,
            secrets_path,
            compact,
        } => cmd_render(
            cli.config.as_deref(),
            &template,
            &spec,
            out.as_deref(),
            secrets_path,
            compact,
        ),
        Command::Phases => cmd_phases(),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(cli.config.as_deref()),
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Render options after merging config file values and CLI flags.
#[derive(Debug)]
struct RenderOptions {
    secrets_path: String,
    pretty: bool,
}

impl RenderOptions {
    fn resolve(config: &AppConfig, secrets_path: Option<String>, compact: bool) -> Self {
        Self {
            secrets_path: secrets_path.unwrap_or_else(|| config.render.secrets_path.clone()),
            pretty: config.render.pretty && !compact,
        }
    }
}

/// Render `template` for `spec` and serialize the result.
fn render_document(
    config: &AppConfig,
    template: &PluginsConfig,
    mut spec: BuildSpec,
    options: &RenderOptions,
) -> Result<String> {
    if spec.builder_openshift_url.is_none() {
        spec.builder_openshift_url = config.render.builder_url.as_ref().map(|u| u.to_string());
    }

    let rendered = PluginsRenderer::new(&spec, template)
        .with_secrets_path(&options.secrets_path)
        .render()?;

    let document = if options.pretty {
        serde_json::to_string_pretty(&rendered)?
    } else {
        serde_json::to_string(&rendered)?
    };
    Ok(document)
}

fn cmd_render(
    config_path: Option<&Path>,
    template_path: &Path,
    spec_path: &Path,
    out: Option<&Path>,
    secrets_path: Option<String>,
    compact: bool,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let options = RenderOptions::resolve(&config, secrets_path, compact);

    let template = load_template(template_path)?;
    let spec = load_spec(spec_path)?;

    info!(
        template = %template_path.display(),
        spec = %spec_path.display(),
        secrets_path = %options.secrets_path,
        "rendering plugins configuration"
    );

    let document = render_document(&config, &template, spec, &options)?;

    match out {
        Some(path) => {
            std::fs::write(path, format!("{document}\n"))
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "wrote rendered configuration");
        }
        None => println!("{document}"),
    }

    Ok(())
}

fn cmd_phases() -> Result<()> {
    for phase in Phase::ALL {
        let plugins: Vec<&str> = phase_rules(phase).iter().map(|(name, _)| *name).collect();
        if plugins.is_empty() {
            println!("{:<11} ({})  -", phase, phase.config_key());
        } else {
            println!("{:<11} ({})  {}", phase, phase.config_key(), plugins.join(", "));
        }
    }
    Ok(())
}

fn cmd_config_init(config_path: Option<&Path>) -> Result<()> {
    let path = match config_path {
        Some(path) => init_config_at(path)?,
        None => init_config()?,
    };
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)
        .map_err(|e| eyre!("failed to serialize config: {e}"))?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactorconf_shared::ReactorConfError;

    fn fixtures() -> (PluginsConfig, BuildSpec) {
        let template = load_template(Path::new("../../fixtures/json/plugins.fixture.json"))
            .expect("load fixture template");
        let spec = load_spec(Path::new("../../fixtures/json/spec.fixture.json"))
            .expect("load fixture spec");
        (template, spec)
    }

    #[test]
    fn cli_parses_render() {
        let cli = Cli::try_parse_from([
            "reactorconf",
            "-vv",
            "render",
            "--template",
            "t.json",
            "--spec",
            "s.toml",
            "--compact",
        ])
        .expect("parse");
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Render { compact: true, .. }));
    }

    #[test]
    fn config_init_writes_to_config_flag() {
        let dir = std::env::temp_dir().join("reactorconf-cli-init");
        let path = dir.join("reactorconf.toml");
        let _ = std::fs::remove_dir_all(&dir);

        let cli = Cli::try_parse_from([
            "reactorconf",
            "--config",
            path.to_str().expect("utf-8 temp path"),
            "config",
            "init",
        ])
        .expect("parse");
        run(cli).expect("config init");

        let config = load_config_from(&path).expect("load initialized config");
        let _ = std::fs::remove_dir_all(&dir);
        assert!(config.render.pretty);
    }

    #[test]
    fn flags_override_config() {
        let config = AppConfig::default();
        let options = RenderOptions::resolve(&config, Some("/run/secrets".into()), true);
        assert_eq!(options.secrets_path, "/run/secrets");
        assert!(!options.pretty);

        let options = RenderOptions::resolve(&config, None, false);
        assert_eq!(options.secrets_path, config.render.secrets_path);
        assert!(options.pretty);
    }

    #[test]
    fn builder_url_filled_from_config() {
        let (template, mut spec) = fixtures();
        spec.builder_openshift_url = None;

        let mut config = AppConfig::default();
        config.render.builder_url = Some("https://builds.example.com/".parse().expect("url"));
        let options = RenderOptions::resolve(&config, None, true);

        let document = render_document(&config, &template, spec, &options).expect("render");
        let value: serde_json::Value = serde_json::from_str(&document).expect("json");
        assert_eq!(
            value["prebuild_plugins"][6]["args"]["url"],
            "https://builds.example.com/"
        );
    }

    #[test]
    fn spec_builder_url_wins() {
        let (template, spec) = fixtures();
        let mut config = AppConfig::default();
        config.render.builder_url = Some("https://builds.example.com/".parse().expect("url"));
        let options = RenderOptions::resolve(&config, None, false);

        let document = render_document(&config, &template, spec, &options).expect("render");
        let value: serde_json::Value = serde_json::from_str(&document).expect("json");
        let rebuild = &value["prebuild_plugins"][6];
        assert_eq!(rebuild["name"], "check_and_set_rebuild");
        assert_eq!(rebuild["args"]["url"], "https://openshift.example.com/");
        assert!(!document.contains("https://builds.example.com/"));
    }

    #[test]
    fn validation_error_surfaces() {
        let (template, mut spec) = fixtures();
        spec.kojihub = None;
        let config = AppConfig::default();
        let options = RenderOptions::resolve(&config, None, true);

        let err = render_document(&config, &template, spec, &options).unwrap_err();
        let inner = err.downcast_ref::<ReactorConfError>().expect("reactorconf error");
        assert!(matches!(inner, ReactorConfError::Validation { .. }));
    }
}
