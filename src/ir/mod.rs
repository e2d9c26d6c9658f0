//! Build plan: the lowered, ordered form of a resolved target graph.
//!
//! A [`BuildPlan`] holds everything the emitter prints and nothing it must
//! compute: file-scope variables, the registered rules, every edge in
//! lowering order and the default target. It mirrors Ninja's model without
//! embedding Ninja syntax; quoting and escaping happen in
//! [`crate::ninja_gen`].

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

pub(crate) mod cycle;
mod lower;

use miette::Diagnostic;
use thiserror::Error;

pub use lower::ALL_TARGET;

use crate::toolchain::{RegistryError, Rule};
use crate::variant::Platform;

/// Errors raised while lowering a resolved graph into a build plan.
#[derive(Debug, Error, Diagnostic)]
pub enum IrGenError {
    /// An edge references a rule that is not registered.
    #[error("edge for '{output}' uses an unregistered rule")]
    #[diagnostic(code(kiln::ir::unknown_rule))]
    UnknownRule {
        /// First output of the offending edge.
        output: String,
        /// Registry lookup failure.
        #[source]
        #[diagnostic_source]
        source: RegistryError,
    },

    /// Two edges produce the same file.
    #[error("multiple edges produce: {}", outputs.join(", "))]
    #[diagnostic(code(kiln::ir::duplicate_output))]
    DuplicateOutput {
        /// Outputs claimed more than once.
        outputs: Vec<String>,
    },

    /// The edges form a cycle through their inputs.
    #[error("circular dependency between edges: {}", cycle.join(" -> "))]
    #[diagnostic(code(kiln::ir::cycle))]
    CircularDependency {
        /// Outputs along the cycle, first output repeated at the end.
        cycle: Vec<String>,
    },

    /// A target generates code but no generator tool was configured.
    #[error("target '{target}' declares generated sources but no generator tool is configured")]
    #[diagnostic(
        code(kiln::ir::missing_generator),
        help("set `generator` in the project description or pass --generator")
    )]
    MissingGeneratorTool {
        /// Declaring target.
        target: String,
    },

    /// A value would break the single-line syntax of the build file.
    #[error("value for '{name}' contains a line break: {value:?}")]
    #[diagnostic(code(kiln::ir::line_break))]
    LineBreak {
        /// Variable or path being bound.
        name: String,
        /// Offending value.
        value: String,
    },
}

/// What an edge does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Run the code generator over one source.
    Generate,
    /// Compile one source unit into an object.
    Compile,
    /// Bundle a library's objects into a static archive.
    Archive,
    /// Link objects and archives into a program.
    Link,
    /// Run a test program, producing a stamp file.
    Test,
    /// Re-run configuration when its inputs change.
    Regenerate,
    /// Alias grouping other outputs.
    Phony,
}

/// Right-hand side of a variable binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Separate arguments, each quoted for the platform shell on emission.
    /// `$name` references are kept intact.
    Words(Vec<String>),
    /// Text emitted exactly as given.
    Verbatim(String),
}

impl Value {
    /// Whether emitting the binding would produce an empty value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Words(words) => words.is_empty(),
            Self::Verbatim(text) => text.is_empty(),
        }
    }
}

/// A named binding, at file scope or attached to an edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Variable name.
    pub name: String,
    /// Bound value.
    pub value: Value,
}

impl Binding {
    /// Bind `name` to a list of shell words.
    #[must_use]
    pub fn words<I, S>(name: &str, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_owned(),
            value: Value::Words(words.into_iter().map(Into::into).collect()),
        }
    }

    /// Bind `name` to text emitted unchanged.
    #[must_use]
    pub fn verbatim(name: &str, text: impl Into<String>) -> Self {
        Self {
            name: name.to_owned(),
            value: Value::Verbatim(text.into()),
        }
    }
}

/// One build statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEdge {
    /// What the edge does.
    pub kind: EdgeKind,
    /// Rule executing the edge; `phony` for aliases.
    pub rule: String,
    /// Explicit inputs, bound to `$in`.
    pub inputs: Vec<String>,
    /// Inputs that trigger a rebuild without appearing in `$in`.
    pub implicit_inputs: Vec<String>,
    /// Inputs that must exist first but never trigger a rebuild.
    pub order_only: Vec<String>,
    /// Explicit outputs, bound to `$out`.
    pub outputs: Vec<String>,
    /// Outputs produced without appearing in `$out`.
    pub implicit_outputs: Vec<String>,
    /// Edge-scoped variable bindings in emission order.
    pub bindings: Vec<Binding>,
}

impl BuildEdge {
    /// Start an edge with explicit outputs and inputs.
    #[must_use]
    pub fn new(kind: EdgeKind, rule: &str, outputs: Vec<String>, inputs: Vec<String>) -> Self {
        Self {
            kind,
            rule: rule.to_owned(),
            inputs,
            implicit_inputs: Vec::new(),
            order_only: Vec::new(),
            outputs,
            implicit_outputs: Vec::new(),
            bindings: Vec::new(),
        }
    }

    /// Every output, explicit first.
    pub fn all_outputs(&self) -> impl Iterator<Item = &str> {
        self.outputs
            .iter()
            .chain(&self.implicit_outputs)
            .map(String::as_str)
    }

    /// Every input regardless of kind.
    pub fn all_inputs(&self) -> impl Iterator<Item = &str> {
        self.inputs
            .iter()
            .chain(&self.implicit_inputs)
            .chain(&self.order_only)
            .map(String::as_str)
    }

    /// Look up an edge binding by name.
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .find(|binding| binding.name == name)
            .map(|binding| &binding.value)
    }
}

/// Rule name of alias edges, built into the executor.
pub const PHONY_RULE: &str = "phony";

/// Everything needed to write one build file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    /// Platform deciding how words are quoted.
    pub platform: Platform,
    /// File-scope variables in emission order.
    pub variables: Vec<Binding>,
    /// Rules in registration order.
    pub rules: Vec<Rule>,
    /// Edges in lowering order.
    pub edges: Vec<BuildEdge>,
    /// Output built when the executor runs without arguments.
    pub default: String,
}

impl BuildPlan {
    /// Find the edge producing `output`.
    #[must_use]
    pub fn edge_for(&self, output: &str) -> Option<&BuildEdge> {
        self.edges
            .iter()
            .find(|edge| edge.all_outputs().any(|out| out == output))
    }

    /// Edges of one kind in plan order.
    pub fn edges_of(&self, kind: EdgeKind) -> impl Iterator<Item = &BuildEdge> {
        self.edges.iter().filter(move |edge| edge.kind == kind)
    }

    /// Look up a file-scope variable by name.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables
            .iter()
            .find(|binding| binding.name == name)
            .map(|binding| &binding.value)
    }
}
