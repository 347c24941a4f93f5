use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace};

use crate::config::{ChannelCapacity, DispatchConfig};
use crate::error::DispatchError;
use crate::graph::{Graph, NodeKey};
use crate::traversal::{bfs, bfs_paths, PathTable};

/// Mapping from query start node to its traversal result.
pub type BatchResult<N, R> = HashMap<N, R>;

/// Cooperative cancellation flag shared between a caller and a batch run.
///
/// Workers check it before claiming each job and the feeder before
/// publishing each query. A job already claimed runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Timing and load distribution of one batch run.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub queries: usize,
    pub distinct: usize,
    pub workers: usize,
    pub elapsed: Duration,
    /// Jobs completed by each worker, indexed by worker number.
    pub jobs_per_worker: Vec<usize>,
}

/// Runs batches of traversal queries over a borrowed graph on a fixed-size
/// pool of scoped worker threads.
///
/// The pool lives for one batch: workers are spawned when a batch starts
/// and joined before it returns. The graph stays borrowed for the
/// dispatcher's lifetime, so it cannot change between or during batches.
pub struct Dispatcher<'g, N> {
    graph: &'g Graph<N>,
    config: DispatchConfig,
}

impl<'g, N: NodeKey> Dispatcher<'g, N> {
    pub fn new(graph: &'g Graph<N>, config: DispatchConfig) -> Self {
        Self { graph, config }
    }

    pub fn graph(&self) -> &'g Graph<N> {
        self.graph
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// BFS order for every query.
    pub fn run(&self, queries: &[N]) -> Result<BatchResult<N, Vec<N>>, DispatchError> {
        self.run_with(queries, bfs::<N>)
    }

    /// Shortest-path table for every query.
    pub fn run_paths(
        &self,
        queries: &[N],
    ) -> Result<BatchResult<N, PathTable<N>>, DispatchError> {
        self.run_with(queries, bfs_paths::<N>)
    }

    /// BFS order for every query, with timing and per-worker job counts.
    pub fn run_report(
        &self,
        queries: &[N],
    ) -> Result<(BatchResult<N, Vec<N>>, BatchReport), DispatchError> {
        self.execute(queries, &bfs::<N>, None)
    }

    /// BFS order for every query, abandoning the batch once `cancel` is set.
    ///
    /// A cancelled batch yields `DispatchError::Cancelled`, never a
    /// partial mapping.
    pub fn run_cancellable(
        &self,
        queries: &[N],
        cancel: &CancelToken,
    ) -> Result<BatchResult<N, Vec<N>>, DispatchError> {
        self.execute(queries, &bfs::<N>, Some(cancel))
            .map(|(results, _)| results)
    }

    /// Run an arbitrary per-query kernel. Each invocation gets the shared
    /// graph and one start node; results are keyed by start node, and a
    /// duplicated query keeps the last result received.
    pub fn run_with<R, F>(
        &self,
        queries: &[N],
        kernel: F,
    ) -> Result<BatchResult<N, R>, DispatchError>
    where
        R: Send,
        F: Fn(&Graph<N>, &N) -> R + Sync,
    {
        self.execute(queries, &kernel, None)
            .map(|(results, _)| results)
    }

    fn execute<R, F>(
        &self,
        queries: &[N],
        kernel: &F,
        cancel: Option<&CancelToken>,
    ) -> Result<(BatchResult<N, R>, BatchReport), DispatchError>
    where
        R: Send,
        F: Fn(&Graph<N>, &N) -> R + Sync,
    {
        let started = Instant::now();
        let total = queries.len();
        let workers = self.config.resolved_workers();

        if is_cancelled(cancel) {
            info!(total, "graph_batch: batch cancelled before start");
            return Err(DispatchError::Cancelled {
                completed: 0,
                total,
            });
        }

        if queries.is_empty() {
            debug!("graph_batch: empty batch");
            return Ok((
                HashMap::new(),
                BatchReport {
                    queries: 0,
                    distinct: 0,
                    workers,
                    elapsed: started.elapsed(),
                    jobs_per_worker: vec![0; workers],
                },
            ));
        }

        let capacity = self.config.channel_capacity.for_batch(total);
        debug!(
            queries = total,
            workers,
            capacity,
            nodes = self.graph.node_count(),
            "graph_batch: dispatching batch"
        );

        let (job_tx, job_rx) = flume::bounded::<N>(capacity);
        let (result_tx, result_rx) = flume::bounded::<(N, R)>(capacity);
        let graph = self.graph;

        let outcome = thread::scope(|scope| -> Result<_, DispatchError> {
            let mut handles = Vec::with_capacity(workers);

            for worker in 0..workers {
                let jobs = job_rx.clone();
                let results = result_tx.clone();
                let spawned = thread::Builder::new()
                    .name(format!("graph-batch-{worker}"))
                    .spawn_scoped(scope, move || {
                        run_worker(worker, graph, jobs, results, kernel, cancel)
                    });

                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        // Closing the job channel lets already-running workers exit
                        drop(job_tx);
                        join_workers(handles)?;
                        return Err(DispatchError::Spawn(e));
                    }
                }
            }

            // Workers hold the only remaining receivers and result senders:
            // the result stream ends exactly when the last worker exits.
            drop(job_rx);
            drop(result_tx);

            let feeder = thread::Builder::new()
                .name("graph-batch-feed".to_string())
                .spawn_scoped(scope, move || feed(queries, job_tx, cancel));

            let feeder = match feeder {
                Ok(handle) => handle,
                Err(e) => {
                    // The unspawned closure owned the job sender, so workers see
                    // a closed channel and exit.
                    join_workers(handles)?;
                    return Err(DispatchError::Spawn(e));
                }
            };

            let mut aggregate: BatchResult<N, R> = HashMap::with_capacity(total);
            let mut completed = 0usize;
            for (start, result) in result_rx.iter() {
                aggregate.insert(start, result);
                completed += 1;
            }

            let jobs_per_worker = join_workers(handles)?;
            // The feeder is reported as the worker one past the last index.
            let published = feeder
                .join()
                .map_err(|_| DispatchError::WorkerPanicked { worker: workers })?;
            trace!(published, completed, "graph_batch: result stream closed");

            Ok((aggregate, completed, jobs_per_worker))
        });
        let (aggregate, completed, jobs_per_worker) = outcome?;

        if completed < total {
            info!(completed, total, "graph_batch: batch cancelled");
            return Err(DispatchError::Cancelled { completed, total });
        }

        let report = BatchReport {
            queries: total,
            distinct: aggregate.len(),
            workers,
            elapsed: started.elapsed(),
            jobs_per_worker,
        };
        debug!(
            distinct = report.distinct,
            elapsed_ms = report.elapsed.as_secs_f64() * 1000.0,
            "graph_batch: batch complete"
        );

        Ok((aggregate, report))
    }
}

/// BFS order for every query using `worker_count` threads.
///
/// A `worker_count` of 0 is clamped to 1. The returned map has one entry
/// per distinct query.
pub fn run_queries<N: NodeKey>(
    graph: &Graph<N>,
    queries: &[N],
    worker_count: usize,
) -> Result<BatchResult<N, Vec<N>>, DispatchError> {
    Dispatcher::new(graph, batch_config(worker_count)).run(queries)
}

/// Shortest-path table for every query using `worker_count` threads.
pub fn run_path_queries<N: NodeKey>(
    graph: &Graph<N>,
    queries: &[N],
    worker_count: usize,
) -> Result<BatchResult<N, PathTable<N>>, DispatchError> {
    Dispatcher::new(graph, batch_config(worker_count)).run_paths(queries)
}

/// Number of distinct start nodes in a batch.
pub fn distinct_queries<N: NodeKey>(queries: &[N]) -> usize {
    queries.iter().collect::<HashSet<_>>().len()
}

fn batch_config(workers: usize) -> DispatchConfig {
    DispatchConfig {
        workers,
        channel_capacity: ChannelCapacity::Batch,
    }
}

fn is_cancelled(cancel: Option<&CancelToken>) -> bool {
    cancel.is_some_and(CancelToken::is_cancelled)
}

/// Claim jobs until the job channel is closed and empty, or the batch is
/// cancelled. Returns the number of jobs completed.
fn run_worker<N, R, F>(
    worker: usize,
    graph: &Graph<N>,
    jobs: flume::Receiver<N>,
    results: flume::Sender<(N, R)>,
    kernel: &F,
    cancel: Option<&CancelToken>,
) -> usize
where
    N: NodeKey,
    F: Fn(&Graph<N>, &N) -> R,
{
    trace!(worker, "graph_batch: worker started");
    let mut processed = 0usize;

    while !is_cancelled(cancel) {
        let Ok(start) = jobs.recv() else {
            break;
        };
        let result = kernel(graph, &start);
        if results.send((start, result)).is_err() {
            break;
        }
        processed += 1;
    }

    trace!(worker, processed, "graph_batch: worker exiting");
    processed
}

/// Publish every query, then close the job channel by dropping the sender.
fn feed<N: NodeKey>(queries: &[N], jobs: flume::Sender<N>, cancel: Option<&CancelToken>) -> usize {
    let mut published = 0usize;
    for query in queries {
        if is_cancelled(cancel) || jobs.send(query.clone()).is_err() {
            break;
        }
        published += 1;
    }
    published
}

fn join_workers(
    handles: Vec<thread::ScopedJoinHandle<'_, usize>>,
) -> Result<Vec<usize>, DispatchError> {
    let mut counts = Vec::with_capacity(handles.len());
    let mut panicked = None;

    // Join every handle even after a failure so no worker outlives the batch.
    for (worker, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(n) => counts.push(n),
            Err(_) => {
                panicked.get_or_insert(worker);
                counts.push(0);
            }
        }
    }

    match panicked {
        Some(worker) => Err(DispatchError::WorkerPanicked { worker }),
        None => Ok(counts),
    }
}
