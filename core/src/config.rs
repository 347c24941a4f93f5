use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const MIN_WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 1024;

pub const ENV_WORKERS: &str = "GRAPH_BATCH_WORKERS";
pub const ENV_CHANNEL_CAPACITY: &str = "GRAPH_BATCH_CHANNEL_CAPACITY";

/// Sizing of the job and result channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelCapacity {
    /// One slot per query in the batch. Nothing ever blocks on send.
    #[default]
    Batch,
    /// Fixed capacity. Senders block when full; the dispatcher drains
    /// results concurrently so a small capacity cannot deadlock.
    Bounded(usize),
}

impl ChannelCapacity {
    /// Concrete capacity for a batch of `batch_len` queries (at least 1).
    pub fn for_batch(self, batch_len: usize) -> usize {
        match self {
            ChannelCapacity::Batch => batch_len.max(1),
            ChannelCapacity::Bounded(n) => n.max(1),
        }
    }
}

/// Settings for a [`crate::Dispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Worker threads per batch. Out-of-range values are clamped by
    /// [`DispatchConfig::resolved_workers`].
    pub workers: usize,
    pub channel_capacity: ChannelCapacity,
}

impl DispatchConfig {
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    /// Worker count clamped to `MIN_WORKERS..=MAX_WORKERS`.
    pub fn resolved_workers(&self) -> usize {
        let resolved = self.workers.clamp(MIN_WORKERS, MAX_WORKERS);
        if resolved != self.workers {
            tracing::warn!(
                requested = self.workers,
                resolved,
                "graph_batch: worker count out of range, clamped"
            );
        }
        resolved
    }

    /// Reject out-of-range settings instead of clamping them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&self.workers) {
            return Err(ConfigError::InvalidWorkerCount {
                value: self.workers,
                min: MIN_WORKERS,
                max: MAX_WORKERS,
            });
        }
        if self.channel_capacity == ChannelCapacity::Bounded(0) {
            return Err(ConfigError::InvalidChannelCapacity);
        }
        Ok(())
    }

    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `GRAPH_BATCH_WORKERS` and `GRAPH_BATCH_CHANNEL_CAPACITY`
    /// from the process environment.
    pub fn overlay_env(self) -> Result<Self, ConfigError> {
        self.overlay(|key| std::env::var(key).ok())
    }

    /// Overlay settings from an arbitrary key lookup. Empty values are
    /// treated as unset. Capacity accepts `batch` or a positive integer.
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_WORKERS).filter(|s| !s.trim().is_empty()) {
            self.workers = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: ENV_WORKERS,
                value: raw.clone(),
            })?;
        }

        if let Some(raw) = lookup(ENV_CHANNEL_CAPACITY).filter(|s| !s.trim().is_empty()) {
            let value = raw.trim();
            self.channel_capacity = if value.eq_ignore_ascii_case("batch") {
                ChannelCapacity::Batch
            } else {
                value
                    .parse::<usize>()
                    .map(ChannelCapacity::Bounded)
                    .map_err(|_| ConfigError::InvalidEnv {
                        key: ENV_CHANNEL_CAPACITY,
                        value: raw.clone(),
                    })?
            };
        }

        self.validate()?;
        Ok(self)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(MIN_WORKERS),
            channel_capacity: ChannelCapacity::Batch,
        }
    }
}
