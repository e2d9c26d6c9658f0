//! Dependency propagation.
//!
//! Resolution runs once, after every target is declared:
//!
//! 1. the dependency graph is checked for cycles over public and private
//!    edges alike;
//! 2. each target's effective attributes are computed as its own attributes
//!    followed by what every dependency exports, where a dependency exports
//!    its public attributes and, recursively, the exports of all of its own
//!    dependencies;
//! 3. the link closure collects every library reachable through any
//!    dependency, dependents first.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use tracing::debug;

use super::{
    Attribute, EffectiveAttributes, GraphError, Target, TargetGraph, TargetId, TargetKind,
};
use crate::ir::cycle;

/// A target graph with propagation applied.
#[derive(Debug)]
pub struct ResolvedGraph<'g> {
    graph: &'g TargetGraph,
    effective: Vec<EffectiveAttributes>,
    link_libraries: Vec<Vec<TargetId>>,
    empty: EffectiveAttributes,
}

impl<'g> ResolvedGraph<'g> {
    /// The underlying declarations.
    #[must_use]
    pub const fn graph(&self) -> &'g TargetGraph {
        self.graph
    }

    /// Attributes visible to `id`'s edges.
    ///
    /// Ids from another graph yield an empty set.
    #[must_use]
    pub fn effective(&self, id: TargetId) -> &EffectiveAttributes {
        self.effective.get(id.index()).unwrap_or(&self.empty)
    }

    /// Libraries linked into `id`, dependents before their dependencies.
    #[must_use]
    pub fn link_libraries(&self, id: TargetId) -> &[TargetId] {
        self.link_libraries
            .get(id.index())
            .map_or(&[], Vec::as_slice)
    }
}

impl TargetGraph {
    /// Check for cycles and compute effective attributes and link closures.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DependencyCycle`] naming the targets on the first
    /// cycle found.
    pub fn resolve(&self) -> Result<ResolvedGraph<'_>, GraphError> {
        self.check_cycles()?;

        let mut memo = HashMap::new();
        let mut effective = Vec::with_capacity(self.targets.len());
        let mut link_libraries = Vec::with_capacity(self.targets.len());
        for (id, target) in self.targets() {
            let mut attrs = EffectiveAttributes::default();
            attrs.extend(target.attributes().iter().map(|(attr, _)| attr));
            for dep in target.dependencies() {
                attrs.extend(self.exported(dep.target, &mut memo));
            }
            effective.push(attrs);

            let closure = self.link_closure(id);
            debug!(
                target_name = target.name(),
                links = %self.names(closure.iter().copied()),
                "resolved target"
            );
            link_libraries.push(closure);
        }

        Ok(ResolvedGraph {
            graph: self,
            effective,
            link_libraries,
            empty: EffectiveAttributes::default(),
        })
    }

    fn check_cycles(&self) -> Result<(), GraphError> {
        let found = cycle::find_cycle(self.targets().map(|(_, t)| t.name()), |name| {
            self.by_name
                .get(*name)
                .and_then(|id| self.targets.get(id.index()))
                .map(|target| self.dependency_names(target))
                .unwrap_or_default()
        });
        match found {
            Some(names) => Err(GraphError::DependencyCycle {
                cycle: names.into_iter().map(str::to_owned).collect(),
            }),
            None => Ok(()),
        }
    }

    fn dependency_names<'a>(&'a self, target: &Target) -> Vec<&'a str> {
        target
            .dependencies()
            .iter()
            .filter_map(|dep| self.targets.get(dep.target.index()))
            .map(Target::name)
            .collect()
    }

    /// Attributes `id` exports to its dependents, memoised per target.
    fn exported<'a>(
        &'a self,
        id: TargetId,
        memo: &mut HashMap<TargetId, Vec<&'a Attribute>>,
    ) -> Vec<&'a Attribute> {
        if let Some(done) = memo.get(&id) {
            return done.clone();
        }
        let Some(target) = self.targets.get(id.index()) else {
            return Vec::new();
        };
        let mut exports: Vec<&Attribute> = target.attributes().public().collect();
        for dep in target.dependencies() {
            exports.extend(self.exported(dep.target, memo));
        }
        let unique = exports.into_iter().unique().collect_vec();
        memo.insert(id, unique.clone());
        unique
    }

    /// Every library reachable from `root`, in reverse post-order.
    fn link_closure(&self, root: TargetId) -> Vec<TargetId> {
        fn visit(
            graph: &TargetGraph,
            id: TargetId,
            seen: &mut HashSet<TargetId>,
            post_order: &mut Vec<TargetId>,
        ) {
            if !seen.insert(id) {
                return;
            }
            if let Some(target) = graph.targets.get(id.index()) {
                for dep in target.dependencies() {
                    visit(graph, dep.target, seen, post_order);
                }
            }
            post_order.push(id);
        }

        let mut seen = HashSet::new();
        let mut post_order = Vec::new();
        visit(self, root, &mut seen, &mut post_order);
        post_order
            .into_iter()
            .rev()
            .filter(|id| *id != root)
            .filter(|id| {
                self.targets
                    .get(id.index())
                    .is_some_and(|t| t.kind() == TargetKind::Library)
            })
            .collect()
    }
}
