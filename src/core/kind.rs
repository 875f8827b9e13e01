//! Error kind taxonomy
//!
//! The small, closed vocabulary the classifier maps failures into. Kinds
//! are data, not behavior: they drive log levels and caller-side handling,
//! never scheduling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a pipeline failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A dependency declaration would create (or the graph contains) a cycle
    CyclicDependency,
    /// An input or result failed a validate check
    ValidationFailure,
    /// A strategy's process call failed
    StrategyExecutionFailure,
    /// A strategy instance could not be constructed by the registry
    InitializationFailure,
    /// The run was cancelled, or a per-strategy timeout fired
    CancellationFailure,
    /// Fallback for failures outside the taxonomy
    Unclassified,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::CyclicDependency => "cyclic_dependency",
            ErrorKind::ValidationFailure => "validation_failure",
            ErrorKind::StrategyExecutionFailure => "strategy_execution_failure",
            ErrorKind::InitializationFailure => "initialization_failure",
            ErrorKind::CancellationFailure => "cancellation_failure",
            ErrorKind::Unclassified => "unclassified",
        };
        write!(f, "{}", label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_labels() {
        assert_eq!(ErrorKind::CyclicDependency.to_string(), "cyclic_dependency");
        assert_eq!(ErrorKind::Unclassified.to_string(), "unclassified");
    }
}
