//! Praxis: Dependency-Aware Strategy Pipeline
//!
//! `praxis` (πρᾶξις, Greek for "action") runs a set of named processing
//! steps ("strategies") over a shared input, respecting declared
//! dependencies between steps, detecting cyclic declarations before they
//! can deadlock, and propagating per-step results and metadata to
//! dependents.
//!
//! # Features
//!
//! - **Cycle-safe dependency declaration**: an edge that would close a
//!   cycle is rejected before it is applied, not rolled back after
//! - **Concurrent execution**: mutually-independent ready strategies run
//!   in parallel on a bounded worker pool; dependents block on per-node
//!   completion signals, never polling
//! - **Fail-fast with diagnostics**: the first failure stops the run,
//!   in-flight strategies finish, and partial results stay inspectable
//! - **Metadata propagation**: each strategy sees the merged output
//!   metadata of everything that completed before it started
//! - **Type-safe**: strategies implement one trait; no runtime type
//!   inspection
//!
//! # Quick Start
//!
//! ```ignore
//! use praxis::prelude::*;
//!
//! struct Tokenization;
//!
//! #[async_trait]
//! impl Strategy for Tokenization {
//!     fn name(&self) -> StrategyName {
//!         StrategyName::new("tokenization")
//!     }
//!
//!     async fn process(&self, content: &str, _metadata: &Metadata) -> Result<StrategyOutput, BoxError> {
//!         let tokens: Vec<&str> = content.split_whitespace().collect();
//!         Ok(StrategyOutput::new(serde_json::json!(tokens))
//!             .with_metadata("token_count", tokens.len()))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut pipeline = Pipeline::new();
//!     pipeline.add_dependency("ner", "tokenization")?;
//!     pipeline.add_dependency("sentiment", "tokenization")?;
//!
//!     let results = pipeline.execute(&strategies, "some document", Metadata::new()).await?;
//!     println!("ran {} strategies", results.len());
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! Each module hides a design decision that is likely to change:
//!
//! - [`core`](crate::core): Strategy contract and failure taxonomy (hides
//!   output shape)
//! - [`graph`](crate::graph): Dependency structures (hides graph
//!   representation)
//! - [`executor`](crate::executor): Execution engine (hides scheduling
//!   strategy)

pub mod core;
pub mod executor;
pub mod graph;

// Re-export commonly used types for convenience
pub use crate::core::{BoxError, ErrorKind, Metadata, Strategy, StrategyOutput};

pub use crate::executor::{
    ErrorClassifier, Pipeline, PipelineConfig, PipelineError, ProviderError,
    Result as ExecutionResult, RunReport, RunState, StaticProvider, StrategyProvider,
    ValidationStage,
};

pub use crate::graph::{DependencyGraph, GraphError, GraphResult, GraphSummary, StrategyName};

// Re-export dependencies used in public API so callers don't hit version
// mismatches
pub use async_trait::async_trait;
pub use serde_json;
pub use tokio_util::sync::CancellationToken;

/// Prelude module for convenient glob imports
///
/// # Example
///
/// ```ignore
/// use praxis::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{BoxError, ErrorKind, Metadata, Strategy, StrategyOutput};

    pub use crate::executor::{
        ErrorClassifier, Pipeline, PipelineConfig, PipelineError, ProviderError,
        Result as ExecutionResult, RunReport, RunState, StaticProvider, StrategyProvider,
    };

    pub use crate::graph::{DependencyGraph, GraphError, GraphResult, StrategyName};

    // Re-export commonly used external types
    pub use async_trait::async_trait;
    pub use std::sync::Arc;
    pub use tokio_util::sync::CancellationToken;
}
