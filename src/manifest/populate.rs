//! Applies a parsed project description to a [`TargetGraph`].
//!
//! Entries whose `when` condition fails are skipped; everything else is
//! declared in the order written so that graph errors point at the first
//! offending entry.

use camino::Utf8Path;

use super::ManifestError;
use super::conditions::Conditions;
use crate::ast::{FlagBlock, KilnManifest, TargetDecl};
use crate::graph::{Attribute, Language, TargetGraph, TargetId, TargetKind, Visibility};
use crate::variant::Variant;

/// Declare every selected target of `manifest` in `graph`.
///
/// # Errors
///
/// Returns a [`ManifestError`] for failing conditions, misplaced subjects or
/// any declaration the graph refuses.
pub fn populate(
    manifest: &KilnManifest,
    variant: &Variant,
    graph: &mut TargetGraph,
) -> Result<(), ManifestError> {
    let conditions = Conditions::new(variant);
    for block in &manifest.flags {
        if block.public {
            return Err(ManifestError::PublicGlobalFlags { group: block.group });
        }
        if conditions.holds(block.when.as_deref())? {
            for flag in block.values.iter() {
                graph.add_global_flag(block.group, flag);
            }
        }
    }
    for decl in &manifest.targets {
        if conditions.holds(decl.when.as_deref())? {
            declare(decl, &conditions, graph)?;
        } else {
            tracing::debug!(target_name = %decl.name, "target skipped by condition");
        }
    }
    if let Some(tool) = &manifest.generator {
        graph.set_generator_tool(rooted(tool));
    }
    if let Some(dir) = &manifest.codegen_root {
        graph.set_codegen_root(rooted(dir));
    }
    if let Some(name) = &manifest.default {
        let id = graph.lookup(name)?;
        graph.set_default(id)?;
    }
    Ok(())
}

/// Anchor a project-relative path at `$root`.
fn rooted(path: &str) -> String {
    if path.is_empty() {
        String::from("$root")
    } else if path.starts_with('$') || Utf8Path::new(path).is_absolute() {
        path.to_owned()
    } else {
        format!("$root/{path}")
    }
}

fn declare(
    decl: &TargetDecl,
    conditions: &Conditions,
    graph: &mut TargetGraph,
) -> Result<TargetId, ManifestError> {
    let root = rooted(&decl.root);
    let id = match (decl.kind, &decl.subject) {
        (TargetKind::Test, Some(subject)) => {
            let subject_id = graph.lookup(subject)?;
            graph.declare_test(&decl.name, subject_id, &root)?
        }
        (TargetKind::Test, None) => {
            return Err(ManifestError::MissingSubject {
                target: decl.name.clone(),
            });
        }
        (kind, Some(_)) => {
            return Err(ManifestError::UnexpectedSubject {
                target: decl.name.clone(),
                kind,
            });
        }
        (kind, None) => graph.declare_target(&decl.name, kind, &root)?,
    };

    for dep in &decl.deps {
        if conditions.holds(dep.when())? {
            let other = graph.lookup(dep.name())?;
            graph.add_dependency(id, other, Visibility::from_public(dep.is_public()))?;
        }
    }
    add_flags(id, &decl.flags, conditions, graph)?;
    let entries = [
        (&decl.defines, Attribute::Define as fn(String) -> Attribute),
        (&decl.include_paths, Attribute::IncludePath),
        (&decl.libs, Attribute::Library),
    ];
    for (list, make) in entries {
        for entry in list {
            if conditions.holds(entry.when())? {
                let visibility = Visibility::from_public(entry.is_public());
                graph.add_attribute(id, make(entry.value().to_owned()), visibility)?;
            }
        }
    }
    for entry in &decl.generate {
        if conditions.holds(entry.when())? {
            graph.generate(id, entry.path(), entry.flags())?;
        }
    }
    for (list, language) in [(&decl.c, Language::C), (&decl.cxx, Language::Cxx)] {
        for entry in list {
            if conditions.holds(entry.when())? {
                graph.add_source(id, language, entry.path())?;
            }
        }
    }
    Ok(id)
}

fn add_flags(
    id: TargetId,
    blocks: &[FlagBlock],
    conditions: &Conditions,
    graph: &mut TargetGraph,
) -> Result<(), ManifestError> {
    for block in blocks {
        if !conditions.holds(block.when.as_deref())? {
            continue;
        }
        let visibility = Visibility::from_public(block.public);
        for flag in block.values.iter() {
            graph.add_attribute(id, Attribute::Flag(block.group, flag.to_owned()), visibility)?;
        }
    }
    Ok(())
}
