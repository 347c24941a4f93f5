//! graph-batch-core: concurrent multi-query BFS engine.
//!
//! A pure Rust library that holds an immutable adjacency list and answers
//! batches of breadth-first queries on a fixed-size pool of worker threads.
//! Each query yields its BFS visitation order (or, in the path variant, a
//! shortest edge-count route to every reachable node), and a batch returns
//! one mapping from start node to result once every query has finished.
//!
//! The traversal kernel is usable on its own for single queries.

mod config;
mod dispatch;
mod error;
mod graph;
mod traversal;

pub use config::{
    ChannelCapacity, DispatchConfig, ENV_CHANNEL_CAPACITY, ENV_WORKERS, MAX_WORKERS, MIN_WORKERS,
};
pub use dispatch::{
    distinct_queries, run_path_queries, run_queries, BatchReport, BatchResult, CancelToken,
    Dispatcher,
};
pub use error::{ConfigError, DispatchError, GraphError};
pub use graph::{Graph, NodeId, NodeKey};
pub use traversal::{
    bfs, bfs_paths, bfs_paths_until, distances, shortest_path, GoalSearch, PathTable,
};
