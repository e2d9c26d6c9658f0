//! Configuration run orchestration.
//!
//! This module keeps `main` minimal: [`run`] captures the invocation, builds
//! the variant, loads the project description and writes the generated
//! build file. Every stage runs to completion before the file is touched, so
//! a failure leaves any previous output unchanged.

mod error;
mod path_helpers;

pub use error::RunnerError;

use crate::cli::Cli;
use crate::graph::TargetGraph;
use crate::ir::BuildPlan;
use crate::toolchain::RuleRegistry;
use crate::variant::{Invocation, Variant};
use crate::{manifest, ninja_gen};
use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use path_helpers::{ensure_manifest_exists, resolve_manifest_path, source_dir};

/// Wrapper around generated build file text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NinjaContent(String);

impl NinjaContent {
    /// Store generated text.
    #[must_use]
    pub const fn new(content: String) -> Self {
        Self(content)
    }

    /// Borrow the text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper returning the owned text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

/// Execute one configuration run.
///
/// # Errors
///
/// Returns an error if the variant is invalid, the project description is
/// missing or malformed, the graph is inconsistent, or the build file cannot
/// be written.
pub fn run(cli: &Cli) -> Result<()> {
    let invocation = Invocation::current(cli.replay_args())
        .context("failed to capture the invocation")?
        .with_config_files(crate::cli::config_files());
    let manifest_path = resolve_manifest_path(cli, &invocation.working_dir)?;
    let variant = Variant::from_cli(cli, source_dir(&manifest_path), invocation)
        .context("invalid build variant")?;
    debug!(
        platform = %variant.platform,
        render = variant.render.as_str(),
        debug = variant.debug,
        optimize = variant.optimize,
        "selected variant"
    );
    ensure_manifest_exists(&manifest_path)?;
    let ninja = generate_ninja(&variant, &manifest_path)?;
    let build_file = variant.build_file();
    write_ninja_file(&build_file, &ninja)?;
    info!(path = %build_file, "wrote build file");
    Ok(())
}

/// Produce the build file text for `variant` from the description at
/// `manifest_path`, without writing anything.
///
/// # Errors
///
/// Returns an error if any stage between loading and lowering fails.
pub fn generate_ninja(variant: &Variant, manifest_path: &Utf8Path) -> Result<NinjaContent> {
    let manifest = manifest::from_path(manifest_path)
        .with_context(|| format!("failed to load {manifest_path}"))?;
    if tracing::enabled!(tracing::Level::DEBUG) {
        let ast_json =
            serde_json::to_string_pretty(&manifest).context("failed to serialise description")?;
        debug!("AST:\n{ast_json}");
    }

    let registry = RuleRegistry::for_variant(variant).context("failed to select a toolchain")?;
    let mut graph = TargetGraph::new();
    manifest::populate(&manifest, variant, &mut graph)
        .with_context(|| format!("failed to apply {manifest_path}"))?;
    graph.add_config_input(manifest_path.as_str());
    debug!(targets = graph.len(), "declared targets");

    let resolved = graph.resolve().context("failed to resolve the target graph")?;
    let plan =
        BuildPlan::lower(&resolved, &registry, variant).context("failed to lower the build plan")?;
    debug!(rules = plan.rules.len(), edges = plan.edges.len(), "lowered build plan");
    Ok(NinjaContent::new(ninja_gen::generate(&plan)))
}

/// Atomically replace `path` with `content`.
///
/// The text goes to a temporary file beside `path` which is then renamed
/// over it; on failure the temporary file is removed and `path` is left as
/// it was.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file cannot be
/// written or renamed.
pub fn write_ninja_file(path: &Utf8Path, content: &NinjaContent) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("failed to create {dir}"))?;
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create a temporary file in {dir}"))?;
    tmp.write_all(content.as_str().as_bytes())
        .and_then(|()| tmp.flush())
        .with_context(|| format!("failed to write {}", tmp.path().display()))?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to replace {path}"))?;
    Ok(())
}
