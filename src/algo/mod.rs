//! Graph algorithms module
//!
//! Path queries over the graph store, consumed by the route queries.

pub mod pathfinding;

pub use pathfinding::{all_shortest_paths, bfs, bounded_paths, dijkstra, PathResult};
