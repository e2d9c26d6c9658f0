//! Command line interface definition using clap.
//!
//! [`Cli`] carries every setting of a configuration run. Values are layered
//! with `ortho_config`: built-in defaults, then a discovered `kiln.toml` (or
//! the file named by `KILN_CONFIG_PATH`), then `KILN_*` environment variables,
//! and finally flags given on the command line.

use camino::{Utf8Path, Utf8PathBuf};
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use ortho_config::declarative::LayerComposition;
use ortho_config::figment::{Figment, providers::Env};
use ortho_config::uncased::Uncased;
use ortho_config::{
    ConfigDiscovery, MergeComposer, OrthoConfig, OrthoMergeExt, OrthoResult, sanitize_value,
};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use crate::variant::{Platform, RenderBackend};

mod parsing;

use parsing::{parse_platform, parse_render_backend};

const CONFIG_ENV_VAR: &str = "KILN_CONFIG_PATH";
const ENV_PREFIX: &str = "KILN_";

/// Fields with clap defaults. They only override lower layers when the user
/// typed them.
const DEFAULTED_FIELDS: [&str; 6] = ["file", "out", "debug", "optimize", "render", "verbose"];

/// Configure a C/C++ project and write a Ninja build file.
#[derive(Debug, Clone, PartialEq, Eq, Parser, Serialize, Deserialize, OrthoConfig)]
#[command(author, version, about, long_about = None)]
#[ortho_config(prefix = "KILN")]
pub struct Cli {
    /// Path to the project description.
    #[arg(short, long, value_name = "FILE", default_value = "Kilnfile")]
    #[ortho_config(default = default_manifest_path())]
    pub file: PathBuf,

    /// Directory receiving `build.ninja` and all build outputs.
    #[arg(short, long, value_name = "DIR", default_value = "build")]
    #[ortho_config(default = default_out_dir())]
    pub out: PathBuf,

    /// Build with debug information.
    #[arg(long)]
    #[ortho_config(default = false)]
    pub debug: bool,

    /// Build with optimisation enabled.
    #[arg(long)]
    #[ortho_config(default = false)]
    pub optimize: bool,

    /// Render backend compiled into the application.
    #[arg(
        short,
        long,
        value_name = "BACKEND",
        default_value = "opengl",
        value_parser = parse_render_backend
    )]
    #[ortho_config(default = RenderBackend::OpenGl)]
    pub render: RenderBackend,

    /// Target platform; defaults to the host.
    #[arg(long, value_name = "PLATFORM", value_parser = parse_platform)]
    pub platform: Option<Platform>,

    /// Code generator tool, overriding the one in the project description.
    #[arg(long, value_name = "PATH")]
    pub generator: Option<PathBuf>,

    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    #[ortho_config(default = false)]
    pub verbose: bool,
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            file: default_manifest_path(),
            out: default_out_dir(),
            debug: false,
            optimize: false,
            render: RenderBackend::default(),
            platform: None,
            generator: None,
            verbose: false,
        }
    }
}

impl Cli {
    /// Command line arguments that reproduce this configuration.
    ///
    /// The regeneration edge replays these so a rerun keeps the same
    /// variant even when it was originally selected through a config file or
    /// the environment.
    #[must_use]
    pub fn replay_args(&self) -> Vec<String> {
        let mut args = vec![
            String::from("--file"),
            self.file.display().to_string(),
            String::from("--out"),
            self.out.display().to_string(),
            String::from("--render"),
            self.render.to_string(),
        ];
        if self.debug {
            args.push(String::from("--debug"));
        }
        if self.optimize {
            args.push(String::from("--optimize"));
        }
        if let Some(platform) = self.platform {
            args.push(String::from("--platform"));
            args.push(platform.to_string());
        }
        if let Some(generator) = &self.generator {
            args.push(String::from("--generator"));
            args.push(generator.display().to_string());
        }
        args
    }
}

/// Return the default project description filename.
fn default_manifest_path() -> PathBuf {
    PathBuf::from("Kilnfile")
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("build")
}

/// Parse CLI arguments, returning the parsed struct together with the
/// `ArgMatches` needed for configuration merging.
///
/// # Errors
///
/// Returns a `clap::Error` when parsing or value validation fails.
pub fn parse_from<I, T>(iter: I) -> Result<(Cli, ArgMatches), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut command = Cli::command();
    let matches = command.try_get_matches_from_mut(iter)?;
    // Clone matches before from_arg_matches_mut consumes the values.
    let matches_for_merge = matches.clone();
    let mut matches_for_parse = matches;
    let cli = Cli::from_arg_matches_mut(&mut matches_for_parse)
        .map_err(|err| err.with_cmd(&command))?;
    Ok((cli, matches_for_merge))
}

/// Return the prefixed environment provider for CLI configuration.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX)
}

fn config_discovery() -> ConfigDiscovery {
    ConfigDiscovery::builder("kiln")
        .env_var(CONFIG_ENV_VAR)
        .build()
}

/// Configuration files that [`merge_with_config`] layers beneath the
/// environment, in discovery order.
#[must_use]
pub fn config_files() -> Vec<Utf8PathBuf> {
    config_discovery()
        .compose_layers()
        .value
        .iter()
        .filter_map(|layer| layer.path().map(Utf8Path::to_path_buf))
        .collect()
}

/// Return `true` when no CLI overrides were supplied.
///
/// The merge pipeline treats an empty JSON object as "no overrides".
fn is_empty_value(value: &serde_json::Value) -> bool {
    matches!(value, serde_json::Value::Object(map) if map.is_empty())
}

fn cli_overrides_from_matches(cli: &Cli, matches: &ArgMatches) -> OrthoResult<serde_json::Value> {
    let value = sanitize_value(cli)?;
    let serde_json::Value::Object(mut map) = value else {
        return Err(Arc::new(ortho_config::OrthoError::Validation {
            key: String::from("cli"),
            message: format!("expected parsed CLI values to serialize to an object, got {value:?}"),
        }));
    };

    for field in DEFAULTED_FIELDS {
        if matches.value_source(field) != Some(ValueSource::CommandLine) {
            map.remove(field);
        }
    }

    Ok(serde_json::Value::Object(map))
}

/// Merge configuration layers over the parsed CLI values.
///
/// # Errors
///
/// Returns an [`ortho_config::OrthoError`] if layer composition or merging
/// fails.
pub fn merge_with_config(cli: &Cli, matches: &ArgMatches) -> OrthoResult<Cli> {
    let mut errors = Vec::new();
    let mut composer = MergeComposer::with_capacity(4);

    match sanitize_value(&Cli::default()) {
        Ok(value) => composer.push_defaults(value),
        Err(err) => errors.push(err),
    }

    let mut file_layers = config_discovery().compose_layers();
    errors.append(&mut file_layers.required_errors);
    if file_layers.value.is_empty() {
        errors.append(&mut file_layers.optional_errors);
    }
    for layer in file_layers.value {
        composer.push_layer(layer);
    }

    let env_provider = env_provider()
        .map(|key| Uncased::new(key.as_str().to_ascii_uppercase()))
        .split("__");
    match Figment::from(env_provider)
        .extract::<serde_json::Value>()
        .into_ortho_merge()
    {
        Ok(value) => composer.push_environment(value),
        Err(err) => errors.push(err),
    }

    match cli_overrides_from_matches(cli, matches) {
        Ok(value) if !is_empty_value(&value) => composer.push_cli(value),
        Ok(_) => {}
        Err(err) => errors.push(err),
    }

    let composition = LayerComposition::new(composer.layers(), errors);
    composition.into_merge_result(Cli::merge_from_layers)
}
