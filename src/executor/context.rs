//! Per-run execution state
//!
//! A RunContext is created at the start of each `execute` call and is never
//! shared across concurrent invocations. The metadata map is the only
//! mutable shared resource in a run: the coordinator owns exclusive write
//! access and serializes merges behind a mutex, while strategies only ever
//! see immutable snapshots. The result cache outlives the run so partial
//! results stay inspectable after a failure.

use crate::core::{Metadata, StrategyOutput};
use crate::StrategyName;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Lifecycle of the most recent pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// No run has been started yet
    NotStarted,
    /// A run is in progress
    Running,
    /// The most recent run completed successfully
    Completed,
    /// The most recent run aborted with an error
    Failed,
}

/// Mutable state of one `execute` invocation
pub(crate) struct RunContext {
    run_id: Uuid,
    content: Arc<str>,
    metadata: Mutex<Metadata>,
    results: DashMap<StrategyName, StrategyOutput>,
    started_at: DateTime<Utc>,
}

impl RunContext {
    pub(crate) fn new(content: Arc<str>, initial_metadata: Metadata) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            content,
            metadata: Mutex::new(initial_metadata),
            results: DashMap::new(),
            started_at: Utc::now(),
        }
    }

    pub(crate) fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub(crate) fn content(&self) -> &str {
        &self.content
    }

    pub(crate) fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Clones the metadata accumulated so far
    ///
    /// Strategies receive this snapshot; they never observe merges that
    /// happen after their start.
    pub(crate) fn snapshot_metadata(&self) -> Metadata {
        self.metadata
            .lock()
            .expect("run metadata mutex poisoned - unrecoverable state")
            .clone()
    }

    /// Merges a completed strategy's output metadata, last writer wins per key
    pub(crate) fn merge_metadata(&self, from: &Metadata) {
        if from.is_empty() {
            return;
        }
        let mut metadata = self
            .metadata
            .lock()
            .expect("run metadata mutex poisoned - unrecoverable state");
        for (key, value) in from {
            metadata.insert(key.clone(), value.clone());
        }
    }

    pub(crate) fn insert_result(&self, name: StrategyName, output: StrategyOutput) {
        self.results.insert(name, output);
    }

    pub(crate) fn result(&self, name: &StrategyName) -> Option<StrategyOutput> {
        self.results.get(name).map(|entry| entry.value().clone())
    }

    /// Clones the full result map for returning to the caller
    pub(crate) fn results_map(&self) -> HashMap<StrategyName, StrategyOutput> {
        self.results
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

/// Summary of the most recent run, for callers and log consumers
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique id of the run
    pub run_id: Uuid,
    /// Terminal state of the run
    pub state: RunState,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run settled
    pub finished_at: DateTime<Utc>,
    /// Strategies that completed and cached a result
    pub completed: Vec<StrategyName>,
    /// The strategy whose failure aborted the run, if any
    pub failed: Option<StrategyName>,
    /// Strategies that never ran because of a failure or cancellation
    pub skipped: Vec<StrategyName>,
}
