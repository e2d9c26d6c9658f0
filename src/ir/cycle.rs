//! Cycle detection shared by the target graph and the lowered edge graph.

use std::collections::HashMap;
use std::hash::Hash;

/// Tracks the visitation state of a node during cycle detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum VisitState {
    Visiting,
    Visited,
}

/// Depth-first search for the first cycle reachable from `roots`.
///
/// `successors` lists the nodes a node depends on. The returned path starts
/// at its smallest node and repeats it at the end.
pub(crate) fn find_cycle<N, I, F>(roots: I, successors: F) -> Option<Vec<N>>
where
    N: Clone + Eq + Hash + Ord,
    I: IntoIterator<Item = N>,
    F: FnMut(&N) -> Vec<N>,
{
    let mut detector = CycleDetector::new(successors);
    for node in roots {
        if detector.is_visited(&node) {
            continue;
        }
        if let Some(found) = detector.visit(node) {
            return Some(found);
        }
    }
    None
}

struct CycleDetector<N, F> {
    successors: F,
    stack: Vec<N>,
    states: HashMap<N, VisitState>,
}

impl<N, F> CycleDetector<N, F>
where
    N: Clone + Eq + Hash + Ord,
    F: FnMut(&N) -> Vec<N>,
{
    fn new(successors: F) -> Self {
        Self {
            successors,
            stack: Vec::new(),
            states: HashMap::new(),
        }
    }

    fn is_visited(&self, node: &N) -> bool {
        matches!(self.states.get(node), Some(VisitState::Visited))
    }

    fn visit(&mut self, node: N) -> Option<Vec<N>> {
        match self.states.get(&node) {
            Some(VisitState::Visited) => return None,
            Some(VisitState::Visiting) => {
                let idx = self
                    .stack
                    .iter()
                    .position(|n| n == &node)
                    .unwrap_or_else(|| {
                        debug_assert!(false, "visiting node must be on the stack");
                        0
                    });
                let mut cycle: Vec<N> = self.stack.iter().skip(idx).cloned().collect();
                cycle.push(node);
                return Some(canonicalize_cycle(cycle));
            }
            None => {
                self.states.insert(node.clone(), VisitState::Visiting);
            }
        }

        self.stack.push(node.clone());
        for next in (self.successors)(&node) {
            if let Some(cycle) = self.visit(next) {
                return Some(cycle);
            }
        }
        self.stack.pop();
        self.states.insert(node, VisitState::Visited);
        None
    }
}

fn canonicalize_cycle<N: Clone + Ord>(mut cycle: Vec<N>) -> Vec<N> {
    if cycle.len() < 2 {
        return cycle;
    }
    let len = cycle.len() - 1;
    let start = cycle
        .iter()
        .take(len)
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map_or(0, |(idx, _)| idx);
    let (prefix, suffix) = cycle.split_at_mut(len);
    prefix.rotate_left(start);
    if let (Some(first), Some(slot)) = (prefix.first().cloned(), suffix.first_mut()) {
        slot.clone_from(&first);
    }
    cycle
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn graph(edges: &[(&'static str, &[&'static str])]) -> BTreeMap<&'static str, Vec<&'static str>> {
        edges
            .iter()
            .map(|(node, deps)| (*node, deps.to_vec()))
            .collect()
    }

    fn search(edges: &BTreeMap<&'static str, Vec<&'static str>>) -> Option<Vec<&'static str>> {
        find_cycle(edges.keys().copied(), |node| {
            edges.get(node).cloned().unwrap_or_default()
        })
    }

    #[test]
    fn detects_self_edge_cycle() {
        let edges = graph(&[("a", &["a"])]);
        assert_eq!(search(&edges), Some(vec!["a", "a"]));
    }

    #[test]
    fn acyclic_graphs_pass() {
        let edges = graph(&[("a", &["b", "c"]), ("b", &["c"]), ("c", &[])]);
        assert_eq!(search(&edges), None);
    }

    #[test]
    fn unknown_successors_are_leaves() {
        let edges = graph(&[("a", &["missing"])]);
        assert_eq!(search(&edges), None);
    }

    #[test]
    fn detector_marks_nodes_visited_after_traversal() {
        let edges = graph(&[("a", &["b"]), ("b", &[])]);
        let mut detector =
            CycleDetector::new(|node: &&str| edges.get(node).cloned().unwrap_or_default());
        assert!(detector.visit("a").is_none());
        assert!(detector.is_visited(&"a"));
        assert!(detector.is_visited(&"b"));
        assert!(detector.stack.is_empty());
    }

    #[test]
    fn finds_two_node_cycle() {
        let edges = graph(&[("a", &["b"]), ("b", &["a"])]);
        assert_eq!(search(&edges), Some(vec!["a", "b", "a"]));
    }

    #[test]
    fn canonicalize_rotates_smallest_node() {
        let canonical = canonicalize_cycle(vec!["c", "a", "b", "c"]);
        assert_eq!(canonical, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn canonicalize_handles_reverse_direction() {
        let canonical = canonicalize_cycle(vec!["c", "b", "a", "c"]);
        assert_eq!(canonical, vec!["a", "c", "b", "a"]);
    }
}
