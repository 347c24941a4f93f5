use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use graph_batch_core::{BatchResult, DispatchConfig, Dispatcher, Graph, NodeId};
use tracing_subscriber::EnvFilter;

/// Batch BFS benchmark: runs the same query batch at several worker counts
/// and checks that every run produces the same mapping.
#[derive(Parser, Debug)]
#[command(name = "graph-batch-bench")]
struct Args {
    /// Graph generator to benchmark
    #[arg(value_enum, default_value = "all")]
    mode: Mode,

    /// Target node count for generated graphs
    #[arg(short, long, default_value = "200000")]
    nodes: u64,

    /// Queries per batch (start nodes drawn deterministically)
    #[arg(short, long, default_value = "64")]
    queries: usize,

    /// Worker counts to compare (comma-separated)
    #[arg(short, long, value_delimiter = ',', default_value = "1,2,4,8")]
    workers: Vec<usize>,

    /// Load the graph from a JSON adjacency list instead of generating one
    #[arg(short, long)]
    graph: Option<PathBuf>,

    /// JSON dispatch config (channel capacity etc.); env overrides apply on top
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Run every generator
    All,
    /// Branching tree (deep levels, wide frontier)
    Tree,
    /// Ring lattice with random shortcuts
    Smallworld,
    /// Uniform random edges
    Random,
    /// Two dense clusters joined by a thin chain
    Barbell,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let base = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            DispatchConfig::from_json_str(&raw)?
        }
        None => DispatchConfig::default(),
    };
    let base = base.overlay_env()?;

    println!("graph-batch-bench");
    println!("=================");
    println!();

    if let Some(path) = &args.graph {
        let file = File::open(path).with_context(|| format!("opening graph {}", path.display()))?;
        let graph: Graph = Graph::from_json_reader(BufReader::new(file))?;
        run_benchmark(&path.display().to_string(), &graph, &args, base)?;
        return Ok(());
    }

    let generators: Vec<(&str, fn(u64) -> Graph)> = match args.mode {
        Mode::Tree => vec![("Branching tree", gen_tree)],
        Mode::Smallworld => vec![("Small-world ring", gen_small_world)],
        Mode::Random => vec![("Uniform random", gen_random)],
        Mode::Barbell => vec![("Barbell", gen_barbell)],
        Mode::All => vec![
            ("Branching tree", gen_tree as fn(u64) -> Graph),
            ("Small-world ring", gen_small_world),
            ("Uniform random", gen_random),
            ("Barbell", gen_barbell),
        ],
    };

    for (name, generator) in generators {
        let t = Instant::now();
        let graph = generator(args.nodes.max(2));
        tracing::info!(
            generator = name,
            elapsed_ms = t.elapsed().as_secs_f64() * 1000.0,
            "generated graph"
        );
        run_benchmark(name, &graph, &args, base)?;
    }

    Ok(())
}

fn run_benchmark(name: &str, graph: &Graph, args: &Args, base: DispatchConfig) -> Result<()> {
    println!("--- {} ---", name);
    println!(
        "{} nodes, {} edges, ~{:.0}MB",
        graph.node_count(),
        graph.edge_count(),
        graph.memory_usage() as f64 / 1_048_576.0
    );

    let queries = pick_queries(graph, args.queries);
    if queries.is_empty() {
        println!("(empty graph, nothing to query)");
        println!();
        return Ok(());
    }

    println!();
    println!("{:>8} {:>10} {:>12} {:>10}", "workers", "queries", "visited", "time");
    println!("{:->8} {:->10} {:->12} {:->10}", "", "", "", "");

    let mut baseline: Option<BatchResult<NodeId, Vec<NodeId>>> = None;

    for &workers in &args.workers {
        let config = DispatchConfig { workers, ..base };
        let dispatcher = Dispatcher::new(graph, config);
        let (results, report) = dispatcher.run_report(&queries)?;
        let visited: usize = results.values().map(|order| order.len()).sum();

        println!(
            "{:>8} {:>10} {:>12} {:>8.1}ms",
            report.workers,
            report.distinct,
            visited,
            report.elapsed.as_secs_f64() * 1000.0
        );
        tracing::debug!(workers = report.workers, jobs = ?report.jobs_per_worker, "job distribution");

        if let Some(expected) = &baseline {
            if *expected != results {
                bail!(
                    "{}: results with {} workers differ from the first run",
                    name,
                    report.workers
                );
            }
        } else {
            baseline = Some(results);
        }
    }

    println!();
    Ok(())
}

/// Deterministic spread of start nodes: every k-th node id in sorted order.
fn pick_queries(graph: &Graph, count: usize) -> Vec<NodeId> {
    let mut nodes: Vec<NodeId> = graph.nodes().copied().collect();
    nodes.sort_unstable();
    if nodes.is_empty() || count == 0 {
        return Vec::new();
    }
    let step = (nodes.len() / count).max(1);
    nodes.into_iter().step_by(step).take(count).collect()
}

// ---------------------------------------------------------------------------
// Generators: deterministic, single-threaded, O(nodes + edges)
// ---------------------------------------------------------------------------

/// Linear congruential generator; fast and reproducible across runs.
struct FastRng(u64);

impl FastRng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next(&mut self, max: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 33) % max
    }

    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Every node gets three children; child lists point back to the parent so
/// queries from leaves climb to the root and fan out again.
fn gen_tree(node_count: u64) -> Graph {
    let branching = 3u64;
    let mut graph = Graph::with_capacity(node_count as usize);
    graph.add_node(0);

    for child in 1..node_count {
        let parent = (child - 1) / branching;
        graph.add_edge(parent, child);
        graph.add_edge(child, parent);
    }

    graph
}

/// Watts-Strogatz style: each node links to its `k` clockwise ring
/// neighbors, with a small chance of each link jumping to a random node.
fn gen_small_world(node_count: u64) -> Graph {
    let k = 6u64;
    let p = 0.05f64;
    let mut graph = Graph::with_capacity(node_count as usize);
    let mut rng = FastRng::new(67890);

    for i in 0..node_count {
        for j in 1..=k {
            let target = if rng.next_f64() < p {
                rng.next(node_count)
            } else {
                (i + j) % node_count
            };
            graph.add_edge(i, target);
        }
    }

    graph
}

/// Erdos-Renyi style: about eight outgoing edges per node, uniform targets.
fn gen_random(node_count: u64) -> Graph {
    let mut graph = Graph::with_capacity(node_count as usize);
    let mut rng = FastRng::new(54321);

    for i in 0..node_count {
        graph.add_node(i);
    }
    for _ in 0..node_count * 8 {
        let from = rng.next(node_count);
        let to = rng.next(node_count);
        if from != to {
            graph.add_edge(from, to);
        }
    }

    graph
}

/// Two clusters of random edges joined by a ten-node bridge in both
/// directions. Queries from one side must squeeze through the bridge.
fn gen_barbell(node_count: u64) -> Graph {
    let bridge_len = 10u64;
    let cluster = (node_count.saturating_sub(bridge_len) / 2).max(1);
    let mut graph = Graph::with_capacity(node_count as usize);
    let mut rng = FastRng::new(99999);

    let b_start = cluster + bridge_len;
    for offset in [0, b_start] {
        for i in 0..cluster {
            for _ in 0..8 {
                let target = rng.next(cluster);
                if target != i {
                    graph.add_edge(offset + i, offset + target);
                }
            }
        }
    }

    // Chain: last node of A -> bridge -> first node of B, and back
    let mut prev = cluster - 1;
    for id in cluster..=b_start {
        graph.add_edge(prev, id);
        graph.add_edge(id, prev);
        prev = id;
    }

    graph
}
