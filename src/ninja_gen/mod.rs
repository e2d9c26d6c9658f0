//! Ninja file generator.
//!
//! This module converts a [`BuildPlan`] into the textual representation
//! expected by the Ninja build system. Generation is pure: rules appear in
//! registration order and edges in plan order, so the same plan always yields
//! the same bytes.

pub mod escape;

use crate::ir::{Binding, BuildEdge, BuildPlan, Value};
use crate::toolchain::Rule;
use crate::variant::Platform;
use itertools::Itertools;
use std::fmt::{self, Display, Formatter};

/// Minimum executor version understanding every emitted construct.
pub const NINJA_REQUIRED_VERSION: &str = "1.5";

macro_rules! write_kv {
    ($f:expr, $key:expr, $opt:expr) => {
        if let Some(val) = $opt {
            writeln!($f, "  {} = {}", $key, val)?;
        }
    };
}

macro_rules! write_flag {
    ($f:expr, $key:expr, $cond:expr) => {
        if $cond {
            writeln!($f, "  {} = 1", $key)?;
        }
    };
}

/// Generate a Ninja build file as a string.
#[must_use]
pub fn generate(plan: &BuildPlan) -> String {
    DisplayPlan { plan }.to_string()
}

/// Join escaped paths with single spaces.
fn join(paths: &[String]) -> String {
    paths.iter().map(|p| escape::escape_path(p)).join(" ")
}

fn render_value(platform: Platform, value: &Value) -> String {
    match value {
        Value::Words(words) => words
            .iter()
            .map(|word| escape::quote_word(platform, word))
            .join(" "),
        Value::Verbatim(text) => text.clone(),
    }
}

struct DisplayPlan<'a> {
    plan: &'a BuildPlan,
}

impl Display for DisplayPlan<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let plan = self.plan;
        writeln!(f, "# Generated by kiln. Do not edit; rerun configuration instead.")?;
        writeln!(f, "ninja_required_version = {NINJA_REQUIRED_VERSION}")?;
        writeln!(f)?;
        for Binding { name, value } in plan.variables.iter().filter(|b| !b.value.is_empty()) {
            writeln!(f, "{name} = {}", render_value(plan.platform, value))?;
        }
        writeln!(f)?;
        for rule in &plan.rules {
            write!(f, "{}", DisplayRule { rule })?;
        }
        for edge in &plan.edges {
            write!(
                f,
                "{}",
                DisplayEdge {
                    edge,
                    platform: plan.platform,
                }
            )?;
        }
        writeln!(f, "default {}", escape::escape_path(&plan.default))
    }
}

/// Wrapper struct to display a rule block.
struct DisplayRule<'a> {
    rule: &'a Rule,
}

impl Display for DisplayRule<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let rule = self.rule;
        writeln!(f, "rule {}", rule.name)?;
        writeln!(f, "  command = {}", rule.command)?;
        write_kv!(f, "description", &rule.description);
        write_kv!(f, "depfile", &rule.depfile);
        write_kv!(f, "deps", &rule.deps);
        write_flag!(f, "generator", rule.generator);
        writeln!(f)
    }
}

/// Wrapper struct to display a build edge.
struct DisplayEdge<'a> {
    edge: &'a BuildEdge,
    platform: Platform,
}

impl Display for DisplayEdge<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let edge = self.edge;
        write!(f, "build {}", join(&edge.outputs))?;
        if !edge.implicit_outputs.is_empty() {
            write!(f, " | {}", join(&edge.implicit_outputs))?;
        }
        write!(f, ": {}", edge.rule)?;
        if !edge.inputs.is_empty() {
            write!(f, " {}", join(&edge.inputs))?;
        }
        if !edge.implicit_inputs.is_empty() {
            write!(f, " | {}", join(&edge.implicit_inputs))?;
        }
        if !edge.order_only.is_empty() {
            write!(f, " || {}", join(&edge.order_only))?;
        }
        writeln!(f)?;
        for Binding { name, value } in edge.bindings.iter().filter(|b| !b.value.is_empty()) {
            writeln!(f, "  {name} = {}", render_value(self.platform, value))?;
        }
        writeln!(f)
    }
}
