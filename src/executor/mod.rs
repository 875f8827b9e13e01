//! Execution engine for strategy pipelines
//!
//! Module organization:
//! - `pipeline`: Hides the scheduling strategy (worker pool, completion
//!   signals, abort-on-first-failure)
//! - `context`: Hides per-run state (metadata map, result cache)
//! - `classifier`: Hides the log-versus-propagate decision
//! - `provider`: The narrow registry interface the engine consumes
//! - `error`: The execution-layer error type

mod classifier;
mod context;
mod error;
mod pipeline;
mod provider;

pub use classifier::ErrorClassifier;
pub use context::{RunReport, RunState};
pub use error::{PipelineError, Result, ValidationStage};
pub use pipeline::{Pipeline, PipelineConfig};
pub use provider::{ProviderError, StaticProvider, StrategyProvider};

// Re-export graph types for dependency management
pub use crate::graph::{DependencyGraph, GraphError, GraphResult, StrategyName};
