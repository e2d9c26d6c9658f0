//! Target model.
//!
//! [`TargetGraph`] is the builder context for one configuration run. Targets
//! are declared in dependency order, receive sources, attributes and
//! generator declarations, and are finally resolved by
//! [`TargetGraph::resolve`] into a [`ResolvedGraph`] that the lowering stage
//! consumes. Nothing here is global; each run starts from an empty graph.
//!
//! # Examples
//!
//! ```
//! use kiln::graph::{Attribute, Language, TargetGraph, TargetKind, Visibility};
//!
//! let mut graph = TargetGraph::new();
//! let core = graph.declare_target("core", TargetKind::Library, "$root/core").unwrap();
//! graph
//!     .add_attribute(core, Attribute::IncludePath(".".into()), Visibility::Public)
//!     .unwrap();
//! graph.add_source(core, Language::Cxx, "core.cpp").unwrap();
//! let app = graph.declare_target("app", TargetKind::Executable, "$root/app").unwrap();
//! graph.add_dependency(app, core, Visibility::Public).unwrap();
//!
//! let resolved = graph.resolve().unwrap();
//! let includes: Vec<_> = resolved.effective(app).include_paths().collect();
//! assert_eq!(includes, ["."]);
//! ```

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

pub mod attributes;
pub mod codegen;
pub mod propagate;

use camino::Utf8Path;
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

pub use attributes::{
    Attribute, AttributeSet, EffectiveAttributes, FlagGroup, Language, Visibility,
};
pub use codegen::GeneratorDecl;
pub use propagate::ResolvedGraph;

/// Errors raised while declaring or resolving targets.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum GraphError {
    /// A target name was declared twice.
    #[error("target '{name}' is already declared")]
    #[diagnostic(code(kiln::graph::duplicate_target))]
    DuplicateTarget {
        /// The repeated name.
        name: String,
    },

    /// A name or id does not refer to a declared target.
    #[error("unknown target '{name}'")]
    #[diagnostic(
        code(kiln::graph::unknown_target),
        help("targets must be declared before they are referenced")
    )]
    UnknownTarget {
        /// The name, or `#<index>` for an id from another graph.
        name: String,
    },

    /// The dependency is not allowed between these targets.
    #[error("target '{target}' cannot depend on '{dependency}': {reason}")]
    #[diagnostic(code(kiln::graph::invalid_dependency))]
    InvalidDependency {
        /// Dependent target.
        target: String,
        /// Requested dependency.
        dependency: String,
        /// Why the edge was refused.
        reason: String,
    },

    /// An identical attribute entry already exists on the target.
    #[error("target '{target}' already has {attribute}")]
    #[diagnostic(code(kiln::graph::duplicate_attribute))]
    DuplicateAttribute {
        /// Owning target.
        target: String,
        /// Rendered attribute.
        attribute: String,
    },

    /// A source unit is already owned by a target.
    #[error("source '{path}' is already compiled by target '{owner}'")]
    #[diagnostic(code(kiln::graph::duplicate_source))]
    DuplicateSource {
        /// Resolved source path.
        path: String,
        /// Target owning the unit.
        owner: String,
    },

    /// A static library named a link library only for itself. Libraries are
    /// never linked on their own, so the entry would reach no link line.
    #[error("library target '{target}' links '{library}' privately")]
    #[diagnostic(
        code(kiln::graph::private_library),
        help("mark the entry public so dependents link it")
    )]
    PrivateLibrary {
        /// Library target declaring the entry.
        target: String,
        /// The link library.
        library: String,
    },

    /// The same source was registered with the generator twice for a target.
    #[error("target '{target}' already generates code from '{source_path}'")]
    #[diagnostic(code(kiln::graph::duplicate_generator))]
    DuplicateGenerator {
        /// Declaring target.
        target: String,
        /// Resolved generator input.
        source_path: String,
    },

    /// The target dependency graph contains a cycle.
    #[error("dependency cycle: {}", cycle.join(" -> "))]
    #[diagnostic(code(kiln::graph::cycle))]
    DependencyCycle {
        /// Target names along the cycle, first name repeated at the end.
        cycle: Vec<String>,
    },
}

/// Index of a declared target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(usize);

impl TargetId {
    /// Declaration index of the target.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl Display for TargetId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Static archive.
    Library,
    /// Linked program.
    Executable,
    /// Linked program that is run as part of the build.
    Test,
}

impl TargetKind {
    /// Whether the target is linked into a program.
    #[must_use]
    pub const fn is_linked(self) -> bool {
        matches!(self, Self::Executable | Self::Test)
    }
}

impl Display for TargetKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Library => "library",
            Self::Executable => "executable",
            Self::Test => "test",
        })
    }
}

/// A compile unit owned by a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Language deciding the compile rule.
    pub language: Language,
    /// Path as written in the build file.
    pub path: String,
    /// Path as declared, relative to the target root when it was relative.
    pub declared: String,
}

/// Dependency edge from one target to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    /// Target depended upon.
    pub target: TargetId,
    /// Visibility as declared. Propagation and linking follow every edge.
    pub visibility: Visibility,
}

/// A declared target.
#[derive(Debug, Clone)]
pub struct Target {
    name: String,
    kind: TargetKind,
    root: String,
    sources: Vec<SourceUnit>,
    attributes: AttributeSet,
    dependencies: Vec<Dependency>,
    subject: Option<TargetId>,
    generators: Vec<GeneratorDecl>,
}

impl Target {
    /// Unique target name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// What the target produces.
    #[must_use]
    pub const fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Directory relative source paths are resolved against.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Compile units in declaration order.
    #[must_use]
    pub fn sources(&self) -> &[SourceUnit] {
        &self.sources
    }

    /// Attributes owned by the target.
    #[must_use]
    pub const fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    /// Dependencies in declaration order.
    #[must_use]
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Target exercised by a test.
    #[must_use]
    pub const fn subject(&self) -> Option<TargetId> {
        self.subject
    }

    /// Code generator declarations in declaration order.
    #[must_use]
    pub fn generators(&self) -> &[GeneratorDecl] {
        &self.generators
    }

    /// Resolve `path` against the target root.
    ///
    /// Absolute paths and paths starting with a `$` variable are kept.
    #[must_use]
    pub fn resolve_path(&self, path: &str) -> String {
        if self.root.is_empty()
            || path.starts_with('$')
            || path.starts_with('/')
            || Utf8Path::new(path).is_absolute()
        {
            path.to_owned()
        } else {
            format!("{}/{path}", self.root.trim_end_matches('/'))
        }
    }
}

/// Builder context holding every target of a configuration run.
#[derive(Debug, Clone, Default)]
pub struct TargetGraph {
    targets: Vec<Target>,
    by_name: IndexMap<String, TargetId>,
    source_owners: IndexMap<String, TargetId>,
    global_flags: IndexSet<(FlagGroup, String)>,
    default: Option<TargetId>,
    generator_tool: Option<String>,
    codegen_root: Option<String>,
    config_inputs: IndexSet<String>,
}

impl TargetGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a target.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateTarget`] if the name is taken.
    pub fn declare_target(
        &mut self,
        name: &str,
        kind: TargetKind,
        root: &str,
    ) -> Result<TargetId, GraphError> {
        if self.by_name.contains_key(name) {
            return Err(GraphError::DuplicateTarget {
                name: name.to_owned(),
            });
        }
        let id = TargetId(self.targets.len());
        self.targets.push(Target {
            name: name.to_owned(),
            kind,
            root: root.to_owned(),
            sources: Vec::new(),
            attributes: AttributeSet::default(),
            dependencies: Vec::new(),
            subject: None,
            generators: Vec::new(),
        });
        self.by_name.insert(name.to_owned(), id);
        tracing::debug!(target_name = name, %kind, root, "declared target");
        Ok(id)
    }

    /// Declare a test target privately depending on `subject`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateTarget`] if the name is taken or
    /// [`GraphError::UnknownTarget`] if `subject` is not part of this graph.
    pub fn declare_test(
        &mut self,
        name: &str,
        subject: TargetId,
        root: &str,
    ) -> Result<TargetId, GraphError> {
        self.target(subject)?;
        let id = self.declare_target(name, TargetKind::Test, root)?;
        self.add_dependency(id, subject, Visibility::Private)?;
        self.target_mut(id)?.subject = Some(subject);
        Ok(id)
    }

    /// Find a target by name.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownTarget`] when no target has that name.
    pub fn lookup(&self, name: &str) -> Result<TargetId, GraphError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownTarget {
                name: name.to_owned(),
            })
    }

    /// Borrow a declared target.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownTarget`] for ids from another graph.
    pub fn target(&self, id: TargetId) -> Result<&Target, GraphError> {
        self.targets
            .get(id.0)
            .ok_or_else(|| GraphError::UnknownTarget {
                name: id.to_string(),
            })
    }

    fn target_mut(&mut self, id: TargetId) -> Result<&mut Target, GraphError> {
        self.targets
            .get_mut(id.0)
            .ok_or_else(|| GraphError::UnknownTarget {
                name: id.to_string(),
            })
    }

    /// Record that `target` depends on `other`.
    ///
    /// Repeating an identical dependency is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownTarget`] for foreign ids and
    /// [`GraphError::InvalidDependency`] for self dependencies or when a
    /// non-test target depends on an executable.
    pub fn add_dependency(
        &mut self,
        target: TargetId,
        other: TargetId,
        visibility: Visibility,
    ) -> Result<(), GraphError> {
        let dependency = self.target(other)?;
        let dependent = self.target(target)?;
        let refusal = if target == other {
            Some("a target cannot depend on itself")
        } else if dependency.kind() == TargetKind::Executable && dependent.kind() != TargetKind::Test
        {
            Some("only tests may depend on executables")
        } else if dependency.kind() == TargetKind::Test {
            Some("tests cannot be depended upon")
        } else {
            None
        };
        if let Some(reason) = refusal {
            return Err(GraphError::InvalidDependency {
                target: dependent.name().to_owned(),
                dependency: dependency.name().to_owned(),
                reason: reason.to_owned(),
            });
        }
        let edge = Dependency {
            target: other,
            visibility,
        };
        let deps = &mut self.target_mut(target)?.dependencies;
        if !deps.contains(&edge) {
            deps.push(edge);
        }
        Ok(())
    }

    /// Attach an attribute to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateAttribute`] for an identical entry and
    /// [`GraphError::PrivateLibrary`] for a private link library on a library
    /// target.
    pub fn add_attribute(
        &mut self,
        target: TargetId,
        attribute: Attribute,
        visibility: Visibility,
    ) -> Result<(), GraphError> {
        let owner = self.target_mut(target)?;
        if let Attribute::Library(library) = &attribute
            && owner.kind == TargetKind::Library
            && visibility == Visibility::Private
        {
            return Err(GraphError::PrivateLibrary {
                target: owner.name.clone(),
                library: library.clone(),
            });
        }
        let rendered = attribute.to_string();
        if owner.attributes.insert(attribute, visibility) {
            Ok(())
        } else {
            Err(GraphError::DuplicateAttribute {
                target: owner.name.clone(),
                attribute: rendered,
            })
        }
    }

    /// Add a compile unit to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateSource`] when any target already
    /// compiles the resolved path.
    pub fn add_source(
        &mut self,
        target: TargetId,
        language: Language,
        path: &str,
    ) -> Result<(), GraphError> {
        let resolved = self.target(target)?.resolve_path(path);
        if let Some(owner) = self.source_owners.get(&resolved) {
            return Err(GraphError::DuplicateSource {
                path: resolved,
                owner: self.target(*owner)?.name().to_owned(),
            });
        }
        self.source_owners.insert(resolved.clone(), target);
        self.target_mut(target)?.sources.push(SourceUnit {
            language,
            path: resolved,
            declared: path.to_owned(),
        });
        Ok(())
    }

    /// Add a toolchain-wide flag, emitted as a file-scope variable.
    ///
    /// Repeated flags are ignored.
    pub fn add_global_flag(&mut self, group: FlagGroup, flag: impl Into<String>) {
        self.global_flags.insert((group, flag.into()));
    }

    /// Toolchain-wide flags of `group` in insertion order.
    pub fn global_flags(&self, group: FlagGroup) -> impl Iterator<Item = &str> {
        self.global_flags
            .iter()
            .filter(move |(g, _)| *g == group)
            .map(|(_, flag)| flag.as_str())
    }

    /// Select the target built when the executor is run without arguments.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownTarget`] for foreign ids.
    pub fn set_default(&mut self, target: TargetId) -> Result<(), GraphError> {
        self.target(target)?;
        self.default = Some(target);
        Ok(())
    }

    /// Target built by default, if one was selected.
    #[must_use]
    pub const fn default_target(&self) -> Option<TargetId> {
        self.default
    }

    /// Set the code generator binary.
    pub fn set_generator_tool(&mut self, path: impl Into<String>) {
        self.generator_tool = Some(path.into());
    }

    /// Code generator binary, if configured.
    #[must_use]
    pub fn generator_tool(&self) -> Option<&str> {
        self.generator_tool.as_deref()
    }

    /// Set the directory whose layout generated headers mirror.
    ///
    /// A source at `<root>/core/window.cpp` generates
    /// `$builddir/generated/core/window.h`.
    pub fn set_codegen_root(&mut self, path: impl Into<String>) {
        self.codegen_root = Some(path.into());
    }

    /// Directory generated headers are placed relative to, `$root` unless
    /// set.
    #[must_use]
    pub fn codegen_root(&self) -> &str {
        self.codegen_root.as_deref().unwrap_or("$root")
    }

    /// Register a file whose change must re-run configuration.
    pub fn add_config_input(&mut self, path: impl Into<String>) {
        self.config_inputs.insert(path.into());
    }

    /// Files that trigger regeneration, in insertion order.
    pub fn config_inputs(&self) -> impl Iterator<Item = &str> {
        self.config_inputs.iter().map(String::as_str)
    }

    /// Every target in declaration order.
    pub fn targets(&self) -> impl Iterator<Item = (TargetId, &Target)> {
        self.targets
            .iter()
            .enumerate()
            .map(|(index, target)| (TargetId(index), target))
    }

    /// Number of declared targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether no target has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Names of `ids`, joined for log output.
    pub(crate) fn names(&self, ids: impl IntoIterator<Item = TargetId>) -> String {
        ids.into_iter()
            .filter_map(|id| self.targets.get(id.0).map(Target::name))
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn graph() -> TargetGraph {
        TargetGraph::new()
    }

    #[rstest]
    fn duplicate_target_names_are_rejected(mut graph: TargetGraph) {
        graph
            .declare_target("core", TargetKind::Library, "$root/core")
            .expect("first");
        let err = graph
            .declare_target("core", TargetKind::Executable, "$root/app")
            .expect_err("duplicate");
        assert_eq!(
            err,
            GraphError::DuplicateTarget {
                name: String::from("core")
            }
        );
    }

    #[rstest]
    fn lookup_reports_unknown_names(graph: TargetGraph) {
        assert_eq!(
            graph.lookup("ghost"),
            Err(GraphError::UnknownTarget {
                name: String::from("ghost")
            })
        );
    }

    #[rstest]
    fn foreign_ids_are_unknown(mut graph: TargetGraph) {
        let mut other = TargetGraph::new();
        other.declare_target("a", TargetKind::Library, "").expect("a");
        let foreign = other.declare_target("b", TargetKind::Library, "").expect("b");
        let local = graph.declare_target("a", TargetKind::Library, "").expect("a");
        let err = graph
            .add_dependency(local, foreign, Visibility::Public)
            .expect_err("foreign id");
        assert!(matches!(err, GraphError::UnknownTarget { name } if name == "#1"));
    }

    #[rstest]
    fn self_dependency_is_invalid(mut graph: TargetGraph) {
        let core = graph
            .declare_target("core", TargetKind::Library, "")
            .expect("core");
        let err = graph
            .add_dependency(core, core, Visibility::Public)
            .expect_err("self dependency");
        assert!(matches!(err, GraphError::InvalidDependency { .. }));
    }

    #[rstest]
    fn only_tests_depend_on_executables(mut graph: TargetGraph) {
        let app = graph
            .declare_target("app", TargetKind::Executable, "")
            .expect("app");
        let lib = graph
            .declare_target("lib", TargetKind::Library, "")
            .expect("lib");
        assert!(graph.add_dependency(lib, app, Visibility::Public).is_err());
        let test = graph.declare_test("app-tests", app, "").expect("test");
        assert_eq!(graph.target(test).expect("test").subject(), Some(app));
        assert_eq!(
            graph.target(test).expect("test").dependencies(),
            [Dependency {
                target: app,
                visibility: Visibility::Private
            }]
        );
    }

    #[rstest]
    fn repeated_dependency_is_ignored(mut graph: TargetGraph) {
        let a = graph.declare_target("a", TargetKind::Library, "").expect("a");
        let b = graph.declare_target("b", TargetKind::Library, "").expect("b");
        graph.add_dependency(b, a, Visibility::Public).expect("first");
        graph.add_dependency(b, a, Visibility::Public).expect("repeat");
        assert_eq!(graph.target(b).expect("b").dependencies().len(), 1);
    }

    #[rstest]
    fn duplicate_attribute_is_rejected(mut graph: TargetGraph) {
        let a = graph.declare_target("a", TargetKind::Library, "").expect("a");
        let define = Attribute::Define(String::from("X=1"));
        graph
            .add_attribute(a, define.clone(), Visibility::Public)
            .expect("first");
        let err = graph
            .add_attribute(a, define, Visibility::Public)
            .expect_err("duplicate");
        assert_eq!(err.to_string(), "target 'a' already has define 'X=1'");
    }

    #[rstest]
    #[case(TargetKind::Library, Visibility::Private, false)]
    #[case(TargetKind::Library, Visibility::Public, true)]
    #[case(TargetKind::Executable, Visibility::Private, true)]
    #[case(TargetKind::Test, Visibility::Private, true)]
    fn private_link_libraries_need_a_link_edge(
        mut graph: TargetGraph,
        #[case] kind: TargetKind,
        #[case] visibility: Visibility,
        #[case] accepted: bool,
    ) {
        let subject = graph
            .declare_target("app", TargetKind::Executable, "")
            .expect("app");
        let id = match kind {
            TargetKind::Test => graph.declare_test("t", subject, "").expect("test"),
            other => graph.declare_target("t", other, "").expect("target"),
        };
        let result = graph.add_attribute(id, Attribute::Library(String::from("m")), visibility);
        if accepted {
            assert_eq!(result, Ok(()));
        } else {
            assert_eq!(
                result,
                Err(GraphError::PrivateLibrary {
                    target: String::from("t"),
                    library: String::from("m"),
                })
            );
        }
    }

    #[rstest]
    #[case("$root/src", "main.cpp", "$root/src/main.cpp")]
    #[case("$root/src/", "gfx/gl.cpp", "$root/src/gfx/gl.cpp")]
    #[case("$root/src", "$builddir/gen.cpp", "$builddir/gen.cpp")]
    #[case("$root/src", "/abs/x.c", "/abs/x.c")]
    #[case("", "x.c", "x.c")]
    fn sources_resolve_against_the_root(
        mut graph: TargetGraph,
        #[case] root: &str,
        #[case] path: &str,
        #[case] expected: &str,
    ) {
        let t = graph.declare_target("t", TargetKind::Library, root).expect("t");
        graph.add_source(t, Language::C, path).expect("source");
        let unit = graph.target(t).expect("t").sources().first().cloned();
        assert_eq!(unit.map(|u| u.path).as_deref(), Some(expected));
    }

    #[rstest]
    fn a_source_unit_belongs_to_one_target(mut graph: TargetGraph) {
        let a = graph
            .declare_target("a", TargetKind::Library, "$root/src")
            .expect("a");
        let b = graph
            .declare_target("b", TargetKind::Library, "$root")
            .expect("b");
        graph.add_source(a, Language::Cxx, "x.cpp").expect("a source");
        let err = graph
            .add_source(b, Language::Cxx, "src/x.cpp")
            .expect_err("shared source");
        assert_eq!(
            err,
            GraphError::DuplicateSource {
                path: String::from("$root/src/x.cpp"),
                owner: String::from("a"),
            }
        );
    }

    #[rstest]
    fn global_flags_are_grouped_and_deduplicated(mut graph: TargetGraph) {
        graph.add_global_flag(FlagGroup::Cxx, "-std=c++20");
        graph.add_global_flag(FlagGroup::Common, "-Wall");
        graph.add_global_flag(FlagGroup::Cxx, "-fno-rtti");
        graph.add_global_flag(FlagGroup::Cxx, "-std=c++20");
        assert_eq!(
            graph.global_flags(FlagGroup::Cxx).collect::<Vec<_>>(),
            ["-std=c++20", "-fno-rtti"]
        );
        assert_eq!(graph.global_flags(FlagGroup::Link).count(), 0);
    }
}
