use std::collections::{HashMap, HashSet, VecDeque};

use crate::graph::{Graph, NodeKey};

/// Route from the start node to each visited node, start and node inclusive.
pub type PathTable<N> = HashMap<N, Vec<N>>;

/// Result of a goal-seeking search.
#[derive(Debug, Clone)]
pub struct GoalSearch<N> {
    /// Whether the goal was dequeued before the frontier ran dry.
    pub found: bool,
    /// Paths for every node discovered before the search stopped.
    pub paths: PathTable<N>,
}

/// BFS visitation order from `start`.
///
/// The first element is always `start`, even when it has no adjacency
/// entry. Neighbors are expanded in adjacency-list order, so the result is
/// fully determined by the graph. Nodes are marked visited when enqueued,
/// which bounds the frontier to one entry per node.
pub fn bfs<N: NodeKey>(graph: &Graph<N>, start: &N) -> Vec<N> {
    let mut visited: HashSet<N> = HashSet::new();
    let mut queue: VecDeque<N> = VecDeque::new();
    let mut order: Vec<N> = Vec::new();

    visited.insert(start.clone());
    queue.push_back(start.clone());

    while let Some(current) = queue.pop_front() {
        for next in graph.neighbors(&current) {
            if visited.insert(next.clone()) {
                queue.push_back(next.clone());
            }
        }
        order.push(current);
    }

    order
}

/// Shortest edge-count path from `start` to every reachable node.
///
/// Traverses to exhaustion. `paths[start] == [start]`, and each other path
/// is its BFS parent's path plus the node itself.
pub fn bfs_paths<N: NodeKey>(graph: &Graph<N>, start: &N) -> PathTable<N> {
    let walk = parent_walk(graph, start, None);
    materialize_paths(&walk)
}

/// Like [`bfs_paths`], but stops as soon as `goal` is dequeued.
///
/// The table holds every node discovered up to that point; nodes that a
/// full traversal would discover later are absent. The path to the goal is
/// the same one [`bfs_paths`] records. An unreachable goal runs the search
/// to exhaustion and reports `found == false`.
pub fn bfs_paths_until<N: NodeKey>(graph: &Graph<N>, start: &N, goal: &N) -> GoalSearch<N> {
    let walk = parent_walk(graph, start, Some(goal));
    GoalSearch {
        found: walk.found,
        paths: materialize_paths(&walk),
    }
}

/// Shortest edge-count path from `start` to `goal`, both endpoints included.
///
/// Returns None if `goal` is not reachable.
pub fn shortest_path<N: NodeKey>(graph: &Graph<N>, start: &N, goal: &N) -> Option<Vec<N>> {
    let mut search = bfs_paths_until(graph, start, goal);
    if !search.found {
        return None;
    }
    search.paths.remove(goal)
}

/// Hop count from `start` to every reachable node (start is 0).
pub fn distances<N: NodeKey>(graph: &Graph<N>, start: &N) -> HashMap<N, usize> {
    let mut dist: HashMap<N, usize> = HashMap::new();
    let mut queue: VecDeque<(N, usize)> = VecDeque::new();

    dist.insert(start.clone(), 0);
    queue.push_back((start.clone(), 0));

    while let Some((current, depth)) = queue.pop_front() {
        for next in graph.neighbors(&current) {
            if !dist.contains_key(next) {
                dist.insert(next.clone(), depth + 1);
                queue.push_back((next.clone(), depth + 1));
            }
        }
    }

    dist
}

/// Parent pointers plus discovery order from one BFS run.
struct ParentWalk<N> {
    /// Parent of each discovered node; the start maps to None.
    parents: HashMap<N, Option<N>>,
    /// Nodes in the order they were discovered (enqueued).
    discovered: Vec<N>,
    found: bool,
}

/// BFS that records parent pointers instead of cloning path Vecs at each
/// node. With `goal` set, stops when the goal is dequeued.
fn parent_walk<N: NodeKey>(graph: &Graph<N>, start: &N, goal: Option<&N>) -> ParentWalk<N> {
    let mut parents: HashMap<N, Option<N>> = HashMap::new();
    let mut discovered: Vec<N> = Vec::new();
    let mut queue: VecDeque<N> = VecDeque::new();

    parents.insert(start.clone(), None);
    discovered.push(start.clone());
    queue.push_back(start.clone());

    while let Some(current) = queue.pop_front() {
        if goal == Some(&current) {
            return ParentWalk {
                parents,
                discovered,
                found: true,
            };
        }

        for next in graph.neighbors(&current) {
            if !parents.contains_key(next) {
                parents.insert(next.clone(), Some(current.clone()));
                discovered.push(next.clone());
                queue.push_back(next.clone());
            }
        }
    }

    ParentWalk {
        parents,
        discovered,
        found: false,
    }
}

/// Build full paths in discovery order. A parent is always discovered
/// before its children, so its path already exists when a child needs it.
fn materialize_paths<N: NodeKey>(walk: &ParentWalk<N>) -> PathTable<N> {
    let mut paths: PathTable<N> = HashMap::with_capacity(walk.discovered.len());

    for node in &walk.discovered {
        let mut path = match walk.parents.get(node).and_then(|p| p.as_ref()) {
            Some(parent) => paths.get(parent).cloned().unwrap_or_default(),
            None => Vec::new(),
        };
        path.push(node.clone());
        paths.insert(node.clone(), path);
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, NodeId};

    fn make_chain(n: u64) -> Graph {
        let mut g = Graph::new();
        for i in 0..n - 1 {
            g.add_edge(i, i + 1);
        }
        g
    }

    fn make_star(center: u64, leaves: u64) -> Graph {
        let mut g = Graph::new();
        for i in 1..=leaves {
            g.add_edge(center, i);
        }
        g
    }

    fn make_cycle(n: u64) -> Graph {
        let mut g = Graph::new();
        for i in 0..n {
            g.add_edge(i, (i + 1) % n);
        }
        g
    }

    /// Undirected-style sample graph: every edge listed in both directions.
    fn make_sample() -> Graph {
        Graph::from_adjacency(vec![
            (0, vec![1, 2]),
            (1, vec![0, 3, 4]),
            (2, vec![0, 5]),
            (3, vec![1]),
            (4, vec![1]),
            (5, vec![2]),
        ])
    }

    /// Ten-node graph with a hub at 5 and a leaf chain 9 -> 8.
    fn make_hub() -> Graph {
        Graph::from_adjacency(vec![
            (0, vec![1, 2]),
            (1, vec![0, 3, 4]),
            (2, vec![0, 5]),
            (3, vec![1, 5]),
            (4, vec![1, 5]),
            (5, vec![2, 3, 6, 7, 8, 9]),
            (6, vec![5]),
            (7, vec![5]),
            (8, vec![5]),
            (9, vec![8]),
        ])
    }

    // --- BFS order ---

    #[test]
    fn test_bfs_sample_order() {
        let g = make_sample();
        assert_eq!(bfs(&g, &0), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(bfs(&g, &5), vec![5, 2, 0, 1, 3, 4]);
    }

    #[test]
    fn test_bfs_chain() {
        let g = make_chain(6);
        assert_eq!(bfs(&g, &0), vec![0, 1, 2, 3, 4, 5]);
        // Directed: nothing behind the start is reachable
        assert_eq!(bfs(&g, &3), vec![3, 4, 5]);
    }

    #[test]
    fn test_bfs_star_follows_listed_order() {
        let mut g = Graph::new();
        g.set_neighbors(0, vec![4, 2, 3, 1]);
        assert_eq!(bfs(&g, &0), vec![0, 4, 2, 3, 1]);

        let g = make_star(0, 100);
        let order = bfs(&g, &0);
        assert_eq!(order.len(), 101);
        assert_eq!(order[0], 0);
    }

    #[test]
    fn test_bfs_cycle_no_infinite_loop() {
        let g = make_cycle(5);
        assert_eq!(bfs(&g, &2), vec![2, 3, 4, 0, 1]);
    }

    #[test]
    fn test_bfs_start_not_in_graph() {
        let g = make_chain(3);
        assert_eq!(bfs(&g, &999), vec![999]);
    }

    #[test]
    fn test_bfs_empty_graph() {
        let g: Graph = Graph::new();
        assert_eq!(bfs(&g, &0), vec![0]);
    }

    #[test]
    fn test_bfs_self_loop() {
        let mut g = Graph::new();
        g.add_edge(0, 0);
        assert_eq!(bfs(&g, &0), vec![0]);
    }

    #[test]
    fn test_bfs_parallel_edges() {
        let mut g = Graph::new();
        g.add_edge(0, 1);
        g.add_edge(0, 1);
        g.add_edge(0, 1);
        assert_eq!(bfs(&g, &0), vec![0, 1]);
    }

    #[test]
    fn test_bfs_neighbor_without_entry() {
        // 7 only appears as a target; it is visited but has no edges
        let g: Graph = Graph::from_adjacency(vec![(0, vec![7, 1]), (1, vec![2])]);
        assert_eq!(bfs(&g, &0), vec![0, 7, 1, 2]);
    }

    #[test]
    fn test_bfs_unreachable_excluded() {
        let mut g = make_chain(3);
        g.add_edge(10, 11);
        let order = bfs(&g, &0);
        assert!(!order.contains(&10));
        assert!(!order.contains(&11));
    }

    #[test]
    fn test_bfs_level_order() {
        let g = make_hub();
        let order = bfs(&g, &0);
        let dist = distances(&g, &0);
        for pair in order.windows(2) {
            assert!(dist[&pair[0]] <= dist[&pair[1]]);
        }
        assert_eq!(order, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_bfs_string_keys() {
        let mut g: Graph<&str> = Graph::new();
        g.add_edge("a", "b");
        g.add_edge("a", "c");
        g.add_edge("b", "d");
        assert_eq!(bfs(&g, &"a"), vec!["a", "b", "c", "d"]);
    }

    // --- Path table ---

    #[test]
    fn test_paths_sample() {
        let g = make_sample();
        let paths = bfs_paths(&g, &0);
        assert_eq!(paths.len(), 6);
        assert_eq!(paths[&0], vec![0]);
        assert_eq!(paths[&1], vec![0, 1]);
        assert_eq!(paths[&4], vec![0, 1, 4]);
        assert_eq!(paths[&5], vec![0, 2, 5]);
    }

    #[test]
    fn test_paths_first_discovered_route() {
        let g = make_hub();
        let paths = bfs_paths(&g, &0);
        // 5 is reachable via 2 at depth 2; 3 and 4 reach it later
        assert_eq!(paths[&5], vec![0, 2, 5]);
        assert_eq!(paths[&9], vec![0, 2, 5, 9]);
    }

    #[test]
    fn test_paths_lengths_match_distances() {
        let g = make_hub();
        for start in 0..10u64 {
            let paths = bfs_paths(&g, &start);
            let dist = distances(&g, &start);
            assert_eq!(paths.len(), dist.len());
            for (node, path) in &paths {
                assert_eq!(path.len() - 1, dist[node]);
                assert_eq!(path.first(), Some(&start));
                assert_eq!(path.last(), Some(node));
            }
        }
    }

    #[test]
    fn test_paths_isolated_start() {
        let g: Graph = Graph::new();
        let paths = bfs_paths(&g, &3);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[&3], vec![3]);
    }

    // --- Early exit on goal ---

    #[test]
    fn test_until_goal_keeps_goal_path() {
        let g = make_hub();
        let full = bfs_paths(&g, &5);
        let search = bfs_paths_until(&g, &5, &0);
        assert!(search.found);
        assert_eq!(search.paths[&0], full[&0]);
        assert_eq!(search.paths[&0], vec![5, 2, 0]);
    }

    #[test]
    fn test_until_goal_omits_later_nodes() {
        let g = make_hub();
        // From 0: dequeue 0 -> {1,2}, dequeue 1 -> {3,4}, dequeue 2 -> {5},
        // then 3 is dequeued as the goal. 6..9 are only found from 5.
        let search = bfs_paths_until(&g, &0, &3);
        assert!(search.found);
        assert_eq!(search.paths[&3], vec![0, 1, 3]);
        assert!(search.paths.contains_key(&5));
        for later in 6..=9u64 {
            assert!(!search.paths.contains_key(&later));
        }
        assert_eq!(bfs_paths(&g, &0).len(), 10);
    }

    #[test]
    fn test_until_goal_is_start() {
        let g = make_hub();
        let search = bfs_paths_until(&g, &4, &4);
        assert!(search.found);
        assert_eq!(search.paths.len(), 1);
        assert_eq!(search.paths[&4], vec![4]);
    }

    #[test]
    fn test_until_goal_unreachable_runs_to_exhaustion() {
        let g = make_chain(4);
        let search = bfs_paths_until(&g, &0, &99);
        assert!(!search.found);
        assert_eq!(search.paths.len(), 4);
        assert_eq!(search.paths[&3], vec![0, 1, 2, 3]);
    }

    // --- Shortest path ---

    #[test]
    fn test_shortest_path_chain() {
        let g = make_chain(6);
        assert_eq!(shortest_path(&g, &0, &5), Some(vec![0, 1, 2, 3, 4, 5]));
    }

    #[test]
    fn test_shortest_path_self() {
        let g = make_chain(3);
        assert_eq!(shortest_path(&g, &1, &1), Some(vec![1]));
    }

    #[test]
    fn test_shortest_path_directed_no_path() {
        let g = make_chain(3);
        assert_eq!(shortest_path(&g, &2, &0), None);
    }

    #[test]
    fn test_shortest_path_cycle() {
        let g = make_cycle(5);
        assert_eq!(shortest_path(&g, &3, &1), Some(vec![3, 4, 0, 1]));
    }

    // --- Distances ---

    #[test]
    fn test_distances_star() {
        let g = make_star(0, 10);
        let dist = distances(&g, &0);
        assert_eq!(dist.len(), 11);
        assert_eq!(dist[&0], 0);
        assert!((1..=10u64).all(|leaf| dist[&leaf] == 1));
    }

    #[test]
    fn test_distances_start_not_in_graph() {
        let g: Graph<NodeId> = make_chain(3);
        let dist = distances(&g, &50);
        assert_eq!(dist.len(), 1);
        assert_eq!(dist[&50], 0);
    }
}
