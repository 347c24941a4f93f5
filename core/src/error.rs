use thiserror::Error;

/// Failure to build a graph from an external representation.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("graph read error: {0}")]
    Io(#[from] std::io::Error),
}

/// A dispatch setting that was rejected by strict validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("workers must be between {min} and {max}, got {value}")]
    InvalidWorkerCount { value: usize, min: usize, max: usize },

    #[error("channel capacity must be positive")]
    InvalidChannelCapacity,

    #[error("invalid value '{value}' for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("config parse error: {0}")]
    Parse(String),
}

/// Failure of a batch run. A failed run never yields a partial mapping.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },

    #[error("batch cancelled after {completed} of {total} queries")]
    Cancelled { completed: usize, total: usize },
}
