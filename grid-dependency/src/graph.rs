//! Pure graph algorithms over the `(from_state, to_state)` adjacency list:
//! cycle detection for `AddDependency` and direction-aware topological
//! layering for `GetTopologicalOrder`.

use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

/// Direction of traversal for [`topological_layers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow edges from producer to consumer (the natural edge direction).
    Downstream,
    /// Follow edges from consumer to producer (reversed).
    Upstream,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "downstream" => Some(Direction::Downstream),
            "upstream" => Some(Direction::Upstream),
            _ => None,
        }
    }
}

/// Would adding an edge `from_state -> to_state` close a cycle in a graph
/// that already contains `adjacency`? True if `from_state` is reachable from
/// `to_state` by following existing edges forward.
pub fn would_cycle(adjacency: &[(Uuid, Uuid)], from_state: Uuid, to_state: Uuid) -> bool {
    if from_state == to_state {
        return true;
    }
    let mut successors: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for &(f, t) in adjacency {
        successors.entry(f).or_default().push(t);
    }

    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(to_state);
    seen.insert(to_state);
    while let Some(node) = queue.pop_front() {
        if node == from_state {
            return true;
        }
        if let Some(next) = successors.get(&node) {
            for &n in next {
                if seen.insert(n) {
                    queue.push_back(n);
                }
            }
        }
    }
    false
}

/// Kahn's algorithm restricted to the subgraph reachable from `start` in the
/// requested direction, emitted as successive layers (layer 0 is `[start]`).
///
/// A cycle within the reachable subgraph is a data-integrity error — the
/// insert-time cycle check in `would_cycle` should have prevented it — and is
/// reported rather than silently truncating the output.
pub fn topological_layers(
    adjacency: &[(Uuid, Uuid)],
    start: Uuid,
    direction: Direction,
) -> Result<Vec<Vec<Uuid>>, CycleError> {
    // Build the effective successor map for the requested direction: for
    // "downstream" a state's successors are the edges leaving it; for
    // "upstream" a state's successors are the edges arriving at it (reversed).
    let mut successors: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for &(from, to) in adjacency {
        let (src, dst) = match direction {
            Direction::Downstream => (from, to),
            Direction::Upstream => (to, from),
        };
        successors.entry(src).or_default().push(dst);
    }

    // Find the reachable subgraph via BFS from `start`.
    let mut reachable = HashSet::new();
    reachable.insert(start);
    let mut queue = VecDeque::new();
    queue.push_back(start);
    while let Some(node) = queue.pop_front() {
        if let Some(next) = successors.get(&node) {
            for &n in next {
                if reachable.insert(n) {
                    queue.push_back(n);
                }
            }
        }
    }

    // In-degree within the reachable subgraph only.
    let mut in_degree: HashMap<Uuid, usize> = reachable.iter().map(|&n| (n, 0)).collect();
    for &node in &reachable {
        if let Some(next) = successors.get(&node) {
            for &n in next {
                if reachable.contains(&n) {
                    *in_degree.entry(n).or_insert(0) += 1;
                }
            }
        }
    }

    let mut layers = Vec::new();
    let mut remaining = reachable.len();
    let mut frontier: Vec<Uuid> = vec![start];
    // `start` always has in-degree 0 within its own reachable subgraph by
    // construction (nothing upstream-of-start, direction-relative, points
    // back into the traversal root on the first layer).
    in_degree.insert(start, 0);

    while !frontier.is_empty() {
        layers.push(frontier.clone());
        remaining -= frontier.len();

        let mut next_frontier = Vec::new();
        for node in &frontier {
            if let Some(next) = successors.get(node) {
                for &n in next {
                    if !reachable.contains(&n) {
                        continue;
                    }
                    let deg = in_degree.get_mut(&n).unwrap();
                    *deg -= 1;
                    if *deg == 0 {
                        next_frontier.push(n);
                    }
                }
            }
        }
        next_frontier.sort();
        next_frontier.dedup();
        frontier = next_frontier;
    }

    if remaining != 0 {
        return Err(CycleError);
    }
    Ok(layers)
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("dependency graph contains a cycle reachable from the requested state")]
pub struct CycleError;

#[cfg(test)]
mod tests {
    use super::*;

    fn uuids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn detects_direct_cycle() {
        let ids = uuids(2);
        let (a, b) = (ids[0], ids[1]);
        let adjacency = vec![(a, b)];
        assert!(would_cycle(&adjacency, b, a));
        assert!(!would_cycle(&adjacency, a, b));
    }

    #[test]
    fn detects_self_loop() {
        let ids = uuids(1);
        assert!(would_cycle(&[], ids[0], ids[0]));
    }

    #[test]
    fn worked_example_layers_match_spec() {
        // A -> B, B -> C, A -> D
        let ids = uuids(4);
        let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);
        let adjacency = vec![(a, b), (b, c), (a, d)];

        let downstream = topological_layers(&adjacency, a, Direction::Downstream).unwrap();
        assert_eq!(downstream.len(), 3);
        assert_eq!(downstream[0], vec![a]);
        let mut layer1 = downstream[1].clone();
        layer1.sort();
        let mut expected1 = vec![b, d];
        expected1.sort();
        assert_eq!(layer1, expected1);
        assert_eq!(downstream[2], vec![c]);

        let upstream = topological_layers(&adjacency, c, Direction::Upstream).unwrap();
        assert_eq!(upstream, vec![vec![c], vec![b], vec![a]]);
    }

    #[test]
    fn single_node_is_one_layer() {
        let ids = uuids(1);
        let layers = topological_layers(&[], ids[0], Direction::Downstream).unwrap();
        assert_eq!(layers, vec![vec![ids[0]]]);
    }
}
