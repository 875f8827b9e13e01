//! Error types for graph operations
//!
//! This module hides error representation details and provides
//! a unified error type for all graph operations. Every cycle-shaped
//! failure surfaces here, whether caught proactively at edge insertion
//! or by the topological sort.

use crate::StrategyName;
use thiserror::Error;

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur during graph operations
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum GraphError {
    /// Adding the proposed edge would close a cycle in the existing graph
    #[error(
        "adding dependency '{strategy}' -> '{depends_on}' would create a cycle through [{}]",
        format_names(.participants)
    )]
    WouldCycle {
        /// The strategy that declared the dependency
        strategy: StrategyName,
        /// The proposed dependency
        depends_on: StrategyName,
        /// Nodes on the existing path from `depends_on` back to `strategy`
        participants: Vec<StrategyName>,
    },

    /// The graph already contains a cycle (caught by the topological sort)
    #[error("dependency graph contains a cycle among [{}]", format_names(.participants))]
    CycleDetected {
        /// Nodes that could not be ordered
        participants: Vec<StrategyName>,
    },

    /// Self-dependency detected (a degenerate 1-cycle)
    #[error("strategy '{strategy}' cannot depend on itself")]
    SelfDependency {
        /// The strategy with the self-dependency
        strategy: StrategyName,
    },
}

impl GraphError {
    /// Creates a would-cycle error for a rejected edge
    pub fn would_cycle(
        strategy: StrategyName,
        depends_on: StrategyName,
        participants: Vec<StrategyName>,
    ) -> Self {
        Self::WouldCycle {
            strategy,
            depends_on,
            participants,
        }
    }

    /// Creates a cycle-detected error from the unorderable node set
    pub fn cycle_detected(participants: Vec<StrategyName>) -> Self {
        Self::CycleDetected { participants }
    }

    /// Creates a self-dependency error
    pub fn self_dependency(strategy: StrategyName) -> Self {
        Self::SelfDependency { strategy }
    }
}

fn format_names(names: &[StrategyName]) -> String {
    names
        .iter()
        .map(StrategyName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
