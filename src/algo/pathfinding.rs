//! Pathfinding algorithms
//!
//! Shortest path (BFS), weighted shortest path (Dijkstra), all shortest paths
//! and hop-bounded simple paths over the graph store, each optionally
//! restricted to one edge type.

use crate::graph::{Edge, GraphStore, NodeId, PropertyValue};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

/// Result of a pathfinding algorithm
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    pub source: NodeId,
    pub target: NodeId,
    pub path: Vec<NodeId>,
    pub cost: f64,
}

impl PathResult {
    fn unweighted(path: Vec<NodeId>) -> Self {
        PathResult {
            source: path[0],
            target: path[path.len() - 1],
            cost: (path.len() - 1) as f64,
            path,
        }
    }

    /// Number of edges along the path
    pub fn hops(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

fn matches_type(edge: &Edge, edge_type: Option<&str>) -> bool {
    edge_type.map_or(true, |et| edge.is_type(et))
}

/// Distinct neighbours reachable over matching outgoing edges, in edge order
fn neighbours(store: &GraphStore, node: NodeId, edge_type: Option<&str>) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    store
        .get_outgoing_edges(node)
        .into_iter()
        .filter(|edge| matches_type(edge, edge_type) && edge.target != node)
        .filter_map(|edge| seen.insert(edge.target).then_some(edge.target))
        .collect()
}

/// Breadth-First Search (Unweighted Shortest Path)
pub fn bfs(
    store: &GraphStore,
    source: NodeId,
    target: NodeId,
    edge_type: Option<&str>,
) -> Option<PathResult> {
    if !store.has_node(source) || !store.has_node(target) {
        return None;
    }

    let mut queue = VecDeque::new();
    let mut visited: HashMap<NodeId, Option<NodeId>> = HashMap::new(); // node -> parent

    queue.push_back(source);
    visited.insert(source, None);

    while let Some(current) = queue.pop_front() {
        if current == target {
            let mut path = Vec::new();
            let mut curr = Some(target);
            while let Some(node) = curr {
                path.push(node);
                curr = visited.get(&node).copied().flatten();
            }
            path.reverse();
            return Some(PathResult::unweighted(path));
        }

        for next in neighbours(store, current, edge_type) {
            if !visited.contains_key(&next) {
                visited.insert(next, Some(current));
                queue.push_back(next);
            }
        }
    }

    None
}

/// State for Dijkstra priority queue
#[derive(Copy, Clone, PartialEq)]
struct State {
    cost: f64,
    node: NodeId,
}

// BinaryHeap is a max-heap; reverse on cost for min-heap behaviour
impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn edge_weight(edge: &Edge, weight_property: &str) -> f64 {
    // Missing or non-numeric weights count as one hop
    edge.get_property(weight_property)
        .and_then(PropertyValue::as_float)
        .unwrap_or(1.0)
}

/// Dijkstra's Algorithm (Weighted Shortest Path)
///
/// Parallel edges are all considered, so the cheapest one between two
/// nodes wins. Negative weights are skipped.
pub fn dijkstra(
    store: &GraphStore,
    source: NodeId,
    target: NodeId,
    weight_property: &str,
    edge_type: Option<&str>,
) -> Option<PathResult> {
    if !store.has_node(source) || !store.has_node(target) {
        return None;
    }

    let mut dist: HashMap<NodeId, f64> = HashMap::new();
    let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
    let mut heap = BinaryHeap::new();

    dist.insert(source, 0.0);
    heap.push(State { cost: 0.0, node: source });

    while let Some(State { cost, node }) = heap.pop() {
        if node == target {
            let mut path = vec![target];
            let mut curr = target;
            while let Some(&p) = parent.get(&curr) {
                path.push(p);
                curr = p;
            }
            path.reverse();
            return Some(PathResult {
                source,
                target,
                path,
                cost,
            });
        }

        if cost > *dist.get(&node).unwrap_or(&f64::INFINITY) {
            continue;
        }

        for edge in store.get_outgoing_edges(node) {
            if !matches_type(edge, edge_type) || edge.target == node {
                continue;
            }

            let weight = edge_weight(edge, weight_property);
            if weight < 0.0 {
                continue;
            }

            let next_cost = cost + weight;
            let next_node = edge.target;

            if next_cost < *dist.get(&next_node).unwrap_or(&f64::INFINITY) {
                dist.insert(next_node, next_cost);
                parent.insert(next_node, node);
                heap.push(State { cost: next_cost, node: next_node });
            }
        }
    }

    None
}

/// Every shortest (fewest-hop) path from source to target
///
/// Paths come out in lexicographic order of their node ids.
pub fn all_shortest_paths(
    store: &GraphStore,
    source: NodeId,
    target: NodeId,
    edge_type: Option<&str>,
) -> Vec<PathResult> {
    if !store.has_node(source) || !store.has_node(target) {
        return Vec::new();
    }

    // BFS layering, keeping every parent on a shortest path
    let mut depth: HashMap<NodeId, usize> = HashMap::new();
    let mut parents: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let mut queue = VecDeque::new();
    depth.insert(source, 0);
    queue.push_back(source);

    while let Some(current) = queue.pop_front() {
        let d = depth[&current];
        if let Some(&target_depth) = depth.get(&target) {
            if d >= target_depth {
                break;
            }
        }
        for next in neighbours(store, current, edge_type) {
            match depth.get(&next) {
                None => {
                    depth.insert(next, d + 1);
                    parents.entry(next).or_default().push(current);
                    queue.push_back(next);
                }
                Some(&nd) if nd == d + 1 => parents.entry(next).or_default().push(current),
                Some(_) => {}
            }
        }
    }

    if !depth.contains_key(&target) {
        return Vec::new();
    }

    // Walk parents back from the target
    let mut paths = Vec::new();
    let mut stack = vec![vec![target]];
    while let Some(partial) = stack.pop() {
        let head = partial[partial.len() - 1];
        if head == source {
            let mut path = partial;
            path.reverse();
            paths.push(path);
            continue;
        }
        for p in parents.get(&head).into_iter().flatten() {
            let mut extended = partial.clone();
            extended.push(*p);
            stack.push(extended);
        }
    }

    paths.sort();
    paths.into_iter().map(PathResult::unweighted).collect()
}

/// Simple paths from source to target using at most `max_hops` edges
///
/// Ordered by hop count, then by node ids.
pub fn bounded_paths(
    store: &GraphStore,
    source: NodeId,
    target: NodeId,
    max_hops: usize,
    edge_type: Option<&str>,
) -> Vec<PathResult> {
    if !store.has_node(source) || !store.has_node(target) || source == target {
        return Vec::new();
    }

    let mut found = Vec::new();
    let mut path = vec![source];
    let mut on_path: HashSet<NodeId> = HashSet::from([source]);
    extend_paths(store, target, max_hops, edge_type, &mut path, &mut on_path, &mut found);

    found.sort_by(|a: &Vec<NodeId>, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    found.into_iter().map(PathResult::unweighted).collect()
}

fn extend_paths(
    store: &GraphStore,
    target: NodeId,
    max_hops: usize,
    edge_type: Option<&str>,
    path: &mut Vec<NodeId>,
    on_path: &mut HashSet<NodeId>,
    found: &mut Vec<Vec<NodeId>>,
) {
    let current = path[path.len() - 1];
    if current == target {
        found.push(path.clone());
        return;
    }
    if path.len() > max_hops {
        return;
    }
    for next in neighbours(store, current, edge_type) {
        if on_path.insert(next) {
            path.push(next);
            extend_paths(store, target, max_hops, edge_type, path, on_path, found);
            path.pop();
            on_path.remove(&next);
        }
    }
}
