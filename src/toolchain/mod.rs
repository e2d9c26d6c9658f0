//! Rule registry and toolchain selection.
//!
//! Rules are named command templates. Edges reference them by name only, so
//! all platform branching lives in [`RuleRegistry::for_variant`], which picks
//! exactly one toolchain table per run. Registration order is preserved and
//! doubles as the emission order.
//!
//! # Examples
//!
//! ```
//! use kiln::toolchain::{Rule, RuleRegistry};
//!
//! let mut registry = RuleRegistry::new();
//! registry
//!     .define_rule(Rule::new("touch", "touch $out").with_description("TOUCH $out"))
//!     .expect("valid rule");
//! assert!(registry.lookup("touch").is_ok());
//! assert!(registry.lookup("cc").is_err());
//! ```

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

mod tables;

use indexmap::IndexMap;
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::variant::{Variant, VariantError};

pub use tables::names;

/// Errors raised by rule registration and lookup.
#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    /// An edge or caller referenced a rule that was never registered.
    #[error("unknown rule '{name}'")]
    #[diagnostic(code(kiln::toolchain::unknown_rule))]
    UnknownRule {
        /// Name that failed to resolve.
        name: String,
    },

    /// A rule name was registered twice.
    #[error("rule '{name}' is already defined")]
    #[diagnostic(code(kiln::toolchain::duplicate_rule))]
    DuplicateRule {
        /// Name registered more than once.
        name: String,
    },

    /// The command template would not survive shell word splitting.
    #[error("rule '{name}' has an invalid command: {snippet}")]
    #[diagnostic(
        code(kiln::toolchain::invalid_command),
        help("check for unbalanced quotes or backticks")
    )]
    InvalidCommand {
        /// Rule being registered.
        name: String,
        /// Leading part of the rejected command.
        snippet: String,
    },

    /// The variant cannot be served by any toolchain table.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Variant(#[from] VariantError),
}

/// A named command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Unique identifier referenced by edges.
    pub name: String,
    /// Command template with `$in`, `$out` and flag-group placeholders.
    pub command: String,
    /// Human-friendly progress line.
    pub description: Option<String>,
    /// Dependency file written by the command, relative to the edge.
    pub depfile: Option<String>,
    /// Dependency file format understood by the executor (`gcc` or `msvc`).
    pub deps: Option<String>,
    /// Marks rules that regenerate the build description itself.
    pub generator: bool,
}

impl Rule {
    /// Create a rule with only a command.
    #[must_use]
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            description: None,
            depfile: None,
            deps: None,
            generator: false,
        }
    }

    /// Attach a progress description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach a depfile template and its format.
    #[must_use]
    pub fn with_depfile(mut self, depfile: impl Into<String>, deps: impl Into<String>) -> Self {
        self.depfile = Some(depfile.into());
        self.deps = Some(deps.into());
        self
    }

    /// Mark the rule as regenerating the build description.
    #[must_use]
    pub const fn as_generator(mut self) -> Self {
        self.generator = true;
        self
    }
}

/// Returns `true` when the command contains an odd number of backticks.
fn has_unmatched_backticks(s: &str) -> bool {
    s.chars().filter(|&c| c == '`').count().rem_euclid(2) != 0
}

fn validate_command(rule: &Rule) -> Result<(), RegistryError> {
    if has_unmatched_backticks(&rule.command) || shlex::split(&rule.command).is_none() {
        return Err(RegistryError::InvalidCommand {
            name: rule.name.clone(),
            snippet: rule.command.chars().take(160).collect(),
        });
    }
    Ok(())
}

/// Ordered collection of rules available to a configuration run.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: IndexMap<String, Rule>,
}

impl RuleRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry for `variant`'s target platform.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Variant`] if the variant fails validation.
    pub fn for_variant(variant: &Variant) -> Result<Self, RegistryError> {
        variant.validate()?;
        let mut registry = Self::new();
        for rule in tables::toolchain(variant.platform) {
            registry.define_rule(rule)?;
        }
        for rule in tables::common() {
            registry.define_rule(rule)?;
        }
        debug!(
            platform = %variant.platform,
            rules = registry.len(),
            "initialised rule registry"
        );
        Ok(registry)
    }

    /// Register `rule`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateRule`] when the name is taken and
    /// [`RegistryError::InvalidCommand`] when the command cannot be split into
    /// shell words.
    pub fn define_rule(&mut self, rule: Rule) -> Result<(), RegistryError> {
        if self.rules.contains_key(&rule.name) {
            return Err(RegistryError::DuplicateRule { name: rule.name });
        }
        validate_command(&rule)?;
        self.rules.insert(rule.name.clone(), rule);
        Ok(())
    }

    /// Resolve a rule by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownRule`] when no such rule exists.
    pub fn lookup(&self, name: &str) -> Result<&Rule, RegistryError> {
        self.rules.get(name).ok_or_else(|| RegistryError::UnknownRule {
            name: name.to_owned(),
        })
    }

    /// Iterate over rules in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rule has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
