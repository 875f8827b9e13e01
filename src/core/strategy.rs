//! Strategy contract and output types
//!
//! A strategy is a named unit of processing with a `validate`/`process`
//! contract. The pipeline only ever sees this trait: concrete strategies
//! (tokenization, NER, sentiment, topic classification, chunking) live
//! outside the crate and are resolved at registration time, never via
//! runtime type inspection.

use crate::StrategyName;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A boxed error that can be sent across threads.
///
/// This is the standard error type used throughout async Rust ecosystems
/// (tokio, tower, axum, etc.). Any error implementing `std::error::Error`
/// can be automatically converted to this type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Per-run metadata, merged key-by-key as strategies complete.
///
/// Merge semantics are last-writer-wins per key; no deep merge.
pub type Metadata = HashMap<String, Value>;

/// A named unit of processing with a validate/process contract
///
/// Strategies must treat their output as immutable once returned: the
/// coordinator owns the shared metadata map and performs all merges itself.
///
/// # Example
///
/// ```
/// use praxis::{BoxError, Metadata, Strategy, StrategyName, StrategyOutput};
/// use async_trait::async_trait;
///
/// struct WordCount;
///
/// #[async_trait]
/// impl Strategy for WordCount {
///     fn name(&self) -> StrategyName {
///         StrategyName::new("word_count")
///     }
///
///     fn validate(&self, content: &str) -> Vec<String> {
///         if content.trim().is_empty() {
///             vec!["content is empty".to_string()]
///         } else {
///             Vec::new()
///         }
///     }
///
///     async fn process(&self, content: &str, _metadata: &Metadata) -> Result<StrategyOutput, BoxError> {
///         let count = content.split_whitespace().count();
///         Ok(StrategyOutput::new(count).with_metadata("word_count", count))
///     }
/// }
/// ```
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Returns the strategy's declared name
    fn name(&self) -> StrategyName;

    /// Checks the input before processing; an empty list means valid
    ///
    /// A non-empty list aborts this strategy with a validation failure,
    /// which aborts the whole run.
    fn validate(&self, content: &str) -> Vec<String> {
        let _ = content;
        Vec::new()
    }

    /// Processes the shared input with the metadata accumulated so far
    ///
    /// The metadata snapshot contains the merged output metadata of every
    /// dependency that completed before this strategy started.
    async fn process(&self, content: &str, metadata: &Metadata) -> Result<StrategyOutput, BoxError>;
}

/// The result of one strategy's `process` call
///
/// Carries the payload, the metadata to merge into the run for downstream
/// strategies, and an optional self-check that the coordinator runs after
/// `process` returns. A failing self-check aborts the run the same way a
/// strategy failure does.
#[derive(Clone, Default)]
pub struct StrategyOutput {
    data: Value,
    metadata: Metadata,
    check: Option<Arc<dyn Fn(&Value) -> Vec<String> + Send + Sync>>,
}

impl StrategyOutput {
    /// Creates an output with the given payload
    pub fn new(data: impl Into<Value>) -> Self {
        Self {
            data: data.into(),
            metadata: Metadata::new(),
            check: None,
        }
    }

    /// Adds one metadata entry to merge into the run on completion
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Extends the output metadata with all entries of `metadata`
    pub fn with_metadata_map(mut self, metadata: Metadata) -> Self {
        self.metadata.extend(metadata);
        self
    }

    /// Attaches a self-check run against the payload after `process`
    ///
    /// An empty message list passes; a non-empty one is treated as a
    /// validation failure of this strategy's result.
    pub fn with_check(
        mut self,
        check: impl Fn(&Value) -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        self.check = Some(Arc::new(check));
        self
    }

    /// Returns the payload
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Returns the metadata this output contributes to the run
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Runs the attached self-check, if any; empty means valid
    pub fn validate(&self) -> Vec<String> {
        match &self.check {
            Some(check) => check(&self.data),
            None => Vec::new(),
        }
    }
}

impl fmt::Debug for StrategyOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyOutput")
            .field("data", &self.data)
            .field("metadata", &self.metadata)
            .field("check", &self.check.as_ref().map(|_| "Fn(..)"))
            .finish()
    }
}
