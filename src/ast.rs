//! Kiln project description structures.
//!
//! These types mirror the YAML schema of a `Kilnfile`. Targets are listed in
//! dependency order: a target may only name dependencies declared above it.
//! Most list entries accept either a bare string or a mapping carrying a
//! `when` condition, which the manifest loader evaluates against the variant.
//!
//! ```rust
//! use kiln::manifest;
//!
//! let yaml = "kiln_version: 1.0.0\ntargets:\n  - name: core\n    kind: library\n    cxx: [core.cpp]\n";
//! let parsed = manifest::from_str(yaml).expect("parse");
//! assert_eq!(parsed.targets.len(), 1);
//! ```

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::graph::{FlagGroup, TargetKind};

const fn default_true() -> bool {
    true
}

/// Top-level structure of a `Kilnfile`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KilnManifest {
    /// Semantic version of the description format.
    pub kiln_version: Version,

    /// Code generator binary, relative to the project root unless absolute.
    #[serde(default)]
    pub generator: Option<String>,

    /// Directory whose layout generated headers mirror below
    /// `$builddir/generated`, relative to the project root unless absolute.
    #[serde(default)]
    pub codegen_root: Option<String>,

    /// Target built when the executor runs without arguments.
    #[serde(default)]
    pub default: Option<String>,

    /// Toolchain-wide flags.
    #[serde(default)]
    pub flags: Vec<FlagBlock>,

    /// Targets in declaration order.
    pub targets: Vec<TargetDecl>,
}

/// A group of flags sharing a category and condition.
///
/// At file scope `public` is meaningless and must be left out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FlagBlock {
    /// Category the flags belong to.
    pub group: FlagGroup,
    /// The flags themselves.
    pub values: StringOrList,
    /// Export the flags to dependents.
    #[serde(default)]
    pub public: bool,
    /// Condition selecting the block.
    #[serde(default)]
    pub when: Option<String>,
}

/// One target entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TargetDecl {
    /// Unique target name.
    pub name: String,
    /// What the target produces.
    pub kind: TargetKind,
    /// Directory that relative sources resolve against.
    #[serde(default)]
    pub root: String,
    /// Target exercised by a test.
    #[serde(default)]
    pub subject: Option<String>,
    /// Condition selecting the whole target.
    #[serde(default)]
    pub when: Option<String>,
    /// Tool flags.
    #[serde(default)]
    pub flags: Vec<FlagBlock>,
    /// Preprocessor definitions; private unless marked public.
    #[serde(default)]
    pub defines: Vec<Entry>,
    /// Header search paths; private unless marked public.
    #[serde(default)]
    pub include_paths: Vec<Entry>,
    /// External libraries; private unless marked public.
    #[serde(default)]
    pub libs: Vec<Entry>,
    /// Targets depended upon; public unless marked private.
    #[serde(default)]
    pub deps: Vec<DepEntry>,
    /// C compile units.
    #[serde(default)]
    pub c: Vec<SourceEntry>,
    /// C++ compile units.
    #[serde(default)]
    pub cxx: Vec<SourceEntry>,
    /// Sources run through the code generator.
    #[serde(default)]
    pub generate: Vec<GenerateEntry>,
}

/// A value that may carry visibility and a condition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Entry {
    /// Private and unconditional.
    Plain(String),
    /// Explicit form.
    Detailed {
        /// The value.
        value: String,
        /// Export to dependents.
        #[serde(default)]
        public: bool,
        /// Condition selecting the entry.
        #[serde(default)]
        when: Option<String>,
    },
}

impl Entry {
    /// The value.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Plain(value) | Self::Detailed { value, .. } => value,
        }
    }

    /// Whether the entry is exported.
    #[must_use]
    pub const fn is_public(&self) -> bool {
        match self {
            Self::Plain(_) => false,
            Self::Detailed { public, .. } => *public,
        }
    }

    /// Condition selecting the entry.
    #[must_use]
    pub fn when(&self) -> Option<&str> {
        match self {
            Self::Plain(_) => None,
            Self::Detailed { when, .. } => when.as_deref(),
        }
    }
}

/// A dependency on another target.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DepEntry {
    /// Public and unconditional.
    Plain(String),
    /// Explicit form.
    Detailed {
        /// Name of the dependency.
        name: String,
        /// Re-export the dependency's public attributes.
        #[serde(default = "default_true")]
        public: bool,
        /// Condition selecting the dependency.
        #[serde(default)]
        when: Option<String>,
    },
}

impl DepEntry {
    /// Name of the dependency.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Plain(name) | Self::Detailed { name, .. } => name,
        }
    }

    /// Whether the dependency is re-exported.
    #[must_use]
    pub const fn is_public(&self) -> bool {
        match self {
            Self::Plain(_) => true,
            Self::Detailed { public, .. } => *public,
        }
    }

    /// Condition selecting the dependency.
    #[must_use]
    pub fn when(&self) -> Option<&str> {
        match self {
            Self::Plain(_) => None,
            Self::Detailed { when, .. } => when.as_deref(),
        }
    }
}

/// A compile unit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SourceEntry {
    /// Unconditional source path.
    Plain(String),
    /// Conditional source path.
    Detailed {
        /// Source path.
        path: String,
        /// Condition selecting the source.
        #[serde(default)]
        when: Option<String>,
    },
}

impl SourceEntry {
    /// Source path as written.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Plain(path) | Self::Detailed { path, .. } => path,
        }
    }

    /// Condition selecting the source.
    #[must_use]
    pub fn when(&self) -> Option<&str> {
        match self {
            Self::Plain(_) => None,
            Self::Detailed { when, .. } => when.as_deref(),
        }
    }
}

/// A source handed to the code generator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum GenerateEntry {
    /// Unconditional, without extra flags.
    Plain(String),
    /// Explicit form.
    Detailed {
        /// Source path.
        path: String,
        /// Extra generator flags.
        #[serde(default)]
        flags: StringOrList,
        /// Condition selecting the source.
        #[serde(default)]
        when: Option<String>,
    },
}

impl GenerateEntry {
    /// Source path as written.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Plain(path) | Self::Detailed { path, .. } => path,
        }
    }

    /// Extra generator flags.
    #[must_use]
    pub fn flags(&self) -> Vec<String> {
        match self {
            Self::Plain(_) => Vec::new(),
            Self::Detailed { flags, .. } => flags.to_vec(),
        }
    }

    /// Condition selecting the source.
    #[must_use]
    pub fn when(&self) -> Option<&str> {
        match self {
            Self::Plain(_) => None,
            Self::Detailed { when, .. } => when.as_deref(),
        }
    }
}

/// A helper for fields that accept either a single string or a list of
/// strings.
///
/// ```yaml
/// # Scalar
/// values: -Wall
/// # Sequence
/// values: [-Wall, -Wextra]
/// ```
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum StringOrList {
    /// No value provided.
    #[default]
    Empty,
    /// A single string item.
    String(String),
    /// A list of string items.
    List(Vec<String>),
}

impl StringOrList {
    /// Items in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let items: &[String] = match self {
            Self::Empty => &[],
            Self::String(item) => std::slice::from_ref(item),
            Self::List(items) => items,
        };
        items.iter().map(String::as_str)
    }

    /// Owned copy of the items.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_owned).collect()
    }
}
