//! Shared pipeline helpers for integration tests.
//!
//! These drive the library stages directly with a fixed variant so emitted
//! text is independent of the machine running the tests.

use anyhow::{Context, Result};
use kiln::graph::TargetGraph;
use kiln::ir::BuildPlan;
use kiln::toolchain::RuleRegistry;
use kiln::variant::Variant;
use kiln::{manifest, ninja_gen};

/// Directory every fixed-variant test pretends the project lives in.
pub const SOURCE_DIR: &str = "/src/demo";

/// Parse `yaml`, declare its targets and lower them for `variant`.
pub fn plan(yaml: &str, variant: &Variant) -> Result<BuildPlan> {
    let parsed = manifest::from_str(yaml).context("parse description")?;
    let registry = RuleRegistry::for_variant(variant).context("select toolchain")?;
    let mut graph = TargetGraph::new();
    manifest::populate(&parsed, variant, &mut graph).context("populate graph")?;
    graph.add_config_input(format!("{}/Kilnfile", variant.source_dir));
    let resolved = graph.resolve().context("resolve graph")?;
    BuildPlan::lower(&resolved, &registry, variant).context("lower plan")
}

/// Emit the build file for `yaml` under `variant`.
pub fn render(yaml: &str, variant: &Variant) -> Result<String> {
    Ok(ninja_gen::generate(&plan(yaml, variant)?))
}
