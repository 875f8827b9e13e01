//! Execution layer error type for the strategy pipeline
//!
//! Run-time failures abort the current run and are returned to the caller
//! wrapped with the originating strategy's name and its known dependents.
//! Graph-mutation errors are rejected synchronously at the mutating call
//! and only pass through here when the topological sort itself fails.

use super::provider::ProviderError;
use crate::core::BoxError;
use crate::graph::GraphError;
use crate::StrategyName;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type for pipeline execution
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Which validate check a strategy failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStage {
    /// The strategy rejected the run input before processing
    Input,
    /// The strategy's own output failed its self-check
    Output,
}

impl fmt::Display for ValidationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationStage::Input => write!(f, "input"),
            ValidationStage::Output => write!(f, "output"),
        }
    }
}

/// Errors that abort a pipeline run
///
/// Variants that originate at a single strategy carry that strategy's name
/// and the set of directly-dependent strategies, so consumers can reason
/// about blast radius without re-querying the graph after the failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// A graph operation failed (cycle detection at sort time)
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// An input or result failed a validate check
    #[error("{stage} validation failed for '{strategy}': {}", .messages.join("; "))]
    Validation {
        /// The strategy whose check failed
        strategy: StrategyName,
        /// Whether the input or the result was rejected
        stage: ValidationStage,
        /// The validation messages, never empty
        messages: Vec<String>,
        /// Strategies that depend on the failing one
        dependents: Vec<StrategyName>,
    },

    /// A strategy's process call failed
    #[error("strategy '{strategy}' failed: {source}")]
    Strategy {
        /// The failing strategy
        strategy: StrategyName,
        /// The underlying cause
        #[source]
        source: BoxError,
        /// Strategies that depend on the failing one
        dependents: Vec<StrategyName>,
    },

    /// The registry could not supply strategy instances
    #[error("strategy initialization failed: {source}")]
    Initialization {
        /// The strategy being constructed, when known
        strategy: Option<StrategyName>,
        /// The provider failure
        #[source]
        source: ProviderError,
    },

    /// A per-strategy timeout fired; behaves as cancellation scoped to one node
    #[error("strategy '{strategy}' timed out after {timeout:?}")]
    Timeout {
        /// The strategy that exceeded its deadline
        strategy: StrategyName,
        /// The configured limit
        timeout: Duration,
        /// Strategies that depend on the failing one
        dependents: Vec<StrategyName>,
    },

    /// The run was cancelled before completion
    #[error("execution cancelled, {} strategies never started", .pending.len())]
    Cancelled {
        /// Strategies that were skipped because of the cancellation
        pending: Vec<StrategyName>,
    },

    /// A strategy task panicked during execution
    #[error("a strategy task panicked: {detail}")]
    TaskPanic {
        /// The panic description from the join error
        detail: String,
    },
}

impl PipelineError {
    /// Creates a validation error for the given stage
    pub fn validation(
        strategy: StrategyName,
        stage: ValidationStage,
        messages: Vec<String>,
        dependents: Vec<StrategyName>,
    ) -> Self {
        Self::Validation {
            strategy,
            stage,
            messages,
            dependents,
        }
    }

    /// Creates a strategy execution failure
    pub fn strategy_failure(
        strategy: StrategyName,
        source: BoxError,
        dependents: Vec<StrategyName>,
    ) -> Self {
        Self::Strategy {
            strategy,
            source,
            dependents,
        }
    }

    /// Creates an initialization failure from a provider error
    pub fn initialization(strategy: Option<StrategyName>, source: ProviderError) -> Self {
        Self::Initialization { strategy, source }
    }

    /// Creates a per-strategy timeout failure
    pub fn timeout(strategy: StrategyName, timeout: Duration, dependents: Vec<StrategyName>) -> Self {
        Self::Timeout {
            strategy,
            timeout,
            dependents,
        }
    }

    /// Creates a cancellation error listing the strategies that never started
    pub fn cancelled(pending: Vec<StrategyName>) -> Self {
        Self::Cancelled { pending }
    }

    /// Creates a task panic error
    pub fn task_panic(detail: impl Into<String>) -> Self {
        Self::TaskPanic {
            detail: detail.into(),
        }
    }

    /// Returns the failing strategy's name, when the failure has one
    pub fn strategy(&self) -> Option<&StrategyName> {
        match self {
            Self::Validation { strategy, .. }
            | Self::Strategy { strategy, .. }
            | Self::Timeout { strategy, .. } => Some(strategy),
            Self::Initialization { strategy, .. } => strategy.as_ref(),
            _ => None,
        }
    }

    /// Returns the strategies known to be affected by this failure
    pub fn dependents(&self) -> &[StrategyName] {
        match self {
            Self::Validation { dependents, .. }
            | Self::Strategy { dependents, .. }
            | Self::Timeout { dependents, .. } => dependents,
            Self::Cancelled { pending } => pending,
            _ => &[],
        }
    }
}
