//! Code generator declarations.
//!
//! A declaration ties one source file of a target to the external generator.
//! Its outputs depend only on the source path. With the source at
//! `<codegen root>/<dir>/<name>.cpp` they are:
//!
//! ```text
//! $builddir/generated/<dir>/<name>.h
//! $builddir/generated/<dir>/internal/<name>.h
//! ```
//!
//! so code compiled with `-I$builddir` includes them as
//! `"generated/<dir>/<name>.h"`.
//!
//! Declarations carry no attributes and are never seen by propagation. The
//! lowering stage turns each into a `meta` edge and wires the outputs into the
//! declaring target's compile edges only.

use camino::Utf8Path;

use super::{GraphError, TargetGraph, TargetId};

/// A request to run the generator over one source of a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorDecl {
    /// Generator input as written in the build file.
    pub source: String,
    /// Extra generator arguments, bound to `$genflags`.
    pub flags: Vec<String>,
}

impl GeneratorDecl {
    /// Source path below `codegen_root`, without its extension.
    ///
    /// Sources outside `codegen_root` keep their whole path.
    #[must_use]
    pub fn stem(&self, codegen_root: &str) -> String {
        let source = Utf8Path::new(&self.source);
        let relative = source.strip_prefix(codegen_root).unwrap_or(source);
        relative_key(relative.with_extension("").as_str())
    }

    /// Header exported to every compile unit of the target.
    #[must_use]
    pub fn public_header(&self, codegen_root: &str) -> String {
        format!("$builddir/generated/{}.h", self.stem(codegen_root))
    }

    /// Header holding definitions private to the generated source.
    #[must_use]
    pub fn internal_header(&self, codegen_root: &str) -> String {
        let stem = self.stem(codegen_root);
        match stem.rsplit_once('/') {
            Some((dir, name)) => format!("$builddir/generated/{dir}/internal/{name}.h"),
            None => format!("$builddir/generated/internal/{stem}.h"),
        }
    }

    /// Both outputs, public header first.
    #[must_use]
    pub fn outputs(&self, codegen_root: &str) -> [String; 2] {
        [self.public_header(codegen_root), self.internal_header(codegen_root)]
    }
}

/// Turn a declared path into a relative key usable below a build directory.
///
/// Parent components become `__` so keys never escape their directory, and
/// characters with meaning to the executor are dropped.
pub(crate) fn relative_key(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != ".")
        .map(|part| {
            if part == ".." {
                String::from("__")
            } else {
                part.chars().filter(|c| !matches!(c, '$' | ':')).collect()
            }
        })
        .filter(|part: &String| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

impl TargetGraph {
    /// Declare that `source` of `target` is fed to the code generator.
    ///
    /// `source` is resolved against the target root like compile units.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateGenerator`] when the pair was already
    /// declared or [`GraphError::UnknownTarget`] for a foreign id.
    pub fn generate(
        &mut self,
        target: TargetId,
        source: &str,
        extra_flags: Vec<String>,
    ) -> Result<(), GraphError> {
        let owner = self.target(target)?;
        let resolved = owner.resolve_path(source);
        if owner.generators().iter().any(|decl| decl.source == resolved) {
            return Err(GraphError::DuplicateGenerator {
                target: owner.name().to_owned(),
                source_path: resolved,
            });
        }
        tracing::debug!(target_name = owner.name(), source = %resolved, "declared generator");
        self.target_mut(target)?.generators.push(GeneratorDecl {
            source: resolved,
            flags: extra_flags,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TargetKind;
    use rstest::rstest;

    fn decl(source: &str) -> GeneratorDecl {
        GeneratorDecl {
            source: source.to_owned(),
            flags: Vec::new(),
        }
    }

    #[rstest]
    #[case("$root/src/window.cpp", "$root/src", "window")]
    #[case("$root/src/core/window.cpp", "$root/src", "core/window")]
    #[case("$root/src/core/window.cpp", "$root", "src/core/window")]
    #[case("$root/shared/../ini.cpp", "$root", "shared/__/ini")]
    #[case("/opt/gen/gui.cpp", "$root/src", "opt/gen/gui")]
    fn stems_mirror_the_source_below_the_codegen_root(
        #[case] source: &str,
        #[case] root: &str,
        #[case] stem: &str,
    ) {
        assert_eq!(decl(source).stem(root), stem);
    }

    #[rstest]
    #[case(
        "$root/src/mimir.cpp",
        "$builddir/generated/mimir.h",
        "$builddir/generated/internal/mimir.h"
    )]
    #[case(
        "$root/src/core/window.cpp",
        "$builddir/generated/core/window.h",
        "$builddir/generated/core/internal/window.h"
    )]
    fn outputs_are_a_function_of_the_source_path(
        #[case] source: &str,
        #[case] public: &str,
        #[case] internal: &str,
    ) {
        assert_eq!(
            decl(source).outputs("$root/src"),
            [public.to_owned(), internal.to_owned()]
        );
    }

    #[test]
    fn second_declaration_for_the_same_source_is_rejected() {
        let mut graph = TargetGraph::new();
        let core = graph
            .declare_target("core", TargetKind::Library, "$root/src/core")
            .expect("core");
        graph.generate(core, "ini.cpp", Vec::new()).expect("first");
        let err = graph
            .generate(core, "ini.cpp", vec![String::from("--tests")])
            .expect_err("duplicate");
        assert_eq!(
            err,
            GraphError::DuplicateGenerator {
                target: String::from("core"),
                source_path: String::from("$root/src/core/ini.cpp"),
            }
        );
    }

    #[test]
    fn the_same_source_may_be_generated_by_two_targets() {
        let mut graph = TargetGraph::new();
        let a = graph.declare_target("a", TargetKind::Library, "$root").expect("a");
        let b = graph.declare_target("b", TargetKind::Library, "$root").expect("b");
        graph.generate(a, "x.cpp", Vec::new()).expect("a");
        graph.generate(b, "x.cpp", Vec::new()).expect("b");
        assert_eq!(graph.target(b).expect("b").generators().len(), 1);
    }
}
