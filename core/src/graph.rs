use std::collections::HashMap;
use std::hash::Hash;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Default node identifier.
pub type NodeId = u64;

/// Anything usable as a node identifier.
///
/// `Send + Sync` is required so a `&Graph` can be handed to worker threads.
pub trait NodeKey: Eq + Hash + Clone + Send + Sync {}

impl<T: Eq + Hash + Clone + Send + Sync> NodeKey for T {}

/// In-memory directed graph stored as an adjacency list.
///
/// Neighbor order is preserved exactly as inserted; it decides BFS order.
/// The graph is built through `&mut self` methods and afterwards only
/// borrowed shared, so traversals never observe a mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    transparent,
    bound(
        serialize = "N: Serialize + Eq + Hash",
        deserialize = "N: Deserialize<'de> + Eq + Hash"
    )
)]
pub struct Graph<N = NodeId> {
    adjacency: HashMap<N, Vec<N>>,
}

impl<N: NodeKey> Graph<N> {
    pub fn new() -> Self {
        Self {
            adjacency: HashMap::new(),
        }
    }

    /// Pre-allocate for a known node count.
    pub fn with_capacity(node_count: usize) -> Self {
        Self {
            adjacency: HashMap::with_capacity(node_count),
        }
    }

    /// Build from `(node, neighbors)` pairs. A repeated node replaces the
    /// earlier list.
    pub fn from_adjacency<I>(adjacency: I) -> Self
    where
        I: IntoIterator<Item = (N, Vec<N>)>,
    {
        Self {
            adjacency: adjacency.into_iter().collect(),
        }
    }

    /// Register a node with no outgoing edges. Existing lists are kept.
    pub fn add_node(&mut self, node: N) {
        self.adjacency.entry(node).or_default();
    }

    /// Append a directed edge. Duplicates and self-loops are stored as given.
    pub fn add_edge(&mut self, from: N, to: N) {
        self.adjacency.entry(from).or_default().push(to);
    }

    /// Replace the neighbor list of `node`.
    pub fn set_neighbors(&mut self, node: N, neighbors: Vec<N>) {
        self.adjacency.insert(node, neighbors);
    }

    /// Outgoing neighbors in insertion order. Unknown nodes have none.
    pub fn neighbors(&self, node: &N) -> &[N] {
        self.adjacency.get(node).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn contains(&self, node: &N) -> bool {
        self.adjacency.contains_key(node)
    }

    /// Number of nodes that have an adjacency entry.
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Nodes with an adjacency entry, in unspecified order.
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.adjacency.keys()
    }

    /// Approximate memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        use std::mem::size_of;

        let keys = self.adjacency.len() * (size_of::<N>() + size_of::<Vec<N>>());
        let edges: usize = self
            .adjacency
            .values()
            .map(|v| v.capacity() * size_of::<N>())
            .sum();

        keys + edges
    }
}

impl<N> Graph<N>
where
    N: NodeKey + for<'de> Deserialize<'de>,
{
    /// Parse a JSON object of `node -> [neighbors]`, e.g. `{"0": [1, 2]}`.
    pub fn from_json_str(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, GraphError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

impl<N: NodeKey> Default for Graph<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: NodeKey> From<HashMap<N, Vec<N>>> for Graph<N> {
    fn from(adjacency: HashMap<N, Vec<N>>) -> Self {
        Self { adjacency }
    }
}

impl<N: NodeKey> FromIterator<(N, Vec<N>)> for Graph<N> {
    fn from_iter<I: IntoIterator<Item = (N, Vec<N>)>>(iter: I) -> Self {
        Self::from_adjacency(iter)
    }
}
