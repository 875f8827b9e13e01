//! Error classification and reporting
//!
//! A thin, stateless facility that maps pipeline failures into the closed
//! [`ErrorKind`] taxonomy and decides what to log versus what to
//! propagate. It never alters scheduling: by the time the classifier sees
//! an error, the run's fate is already decided.

use super::error::PipelineError;
use crate::core::ErrorKind;
use crate::graph::DependencyGraph;
use crate::StrategyName;
use tracing::{error, info, warn};

/// Maps failures to error kinds and reports them
///
/// Holds no mutable state beyond an optional reference to the current
/// dependency graph, used only to enrich log messages with the set of
/// affected dependents.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier<'g> {
    graph: Option<&'g DependencyGraph>,
}

impl<'g> ErrorClassifier<'g> {
    /// Creates a classifier without graph enrichment
    pub fn new() -> ErrorClassifier<'static> {
        ErrorClassifier { graph: None }
    }

    /// Creates a classifier that enriches reports from the given graph
    pub fn with_graph(graph: &'g DependencyGraph) -> Self {
        Self { graph: Some(graph) }
    }

    /// Maps a failure to its kind
    pub fn classify(&self, err: &PipelineError) -> ErrorKind {
        match err {
            PipelineError::Graph(_) => ErrorKind::CyclicDependency,
            PipelineError::Validation { .. } => ErrorKind::ValidationFailure,
            PipelineError::Strategy { .. } => ErrorKind::StrategyExecutionFailure,
            PipelineError::Initialization { .. } => ErrorKind::InitializationFailure,
            PipelineError::Timeout { .. } | PipelineError::Cancelled { .. } => {
                ErrorKind::CancellationFailure
            }
            _ => ErrorKind::Unclassified,
        }
    }

    /// Logs the failure at a level chosen by its kind
    ///
    /// Validation failures are expected operator-fixable conditions and log
    /// at warn; cancellations are deliberate and log at info; everything
    /// else logs at error.
    pub fn report(&self, err: &PipelineError) {
        let kind = self.classify(err);
        let affected = self.affected(err);

        match kind {
            ErrorKind::ValidationFailure => {
                warn!(%kind, also_affects = %affected, "{err}");
            }
            ErrorKind::CancellationFailure => {
                info!(%kind, also_affects = %affected, "{err}");
            }
            _ => {
                error!(%kind, also_affects = %affected, "{err}");
            }
        }
    }

    /// Renders the affected dependents, preferring the live graph view
    fn affected(&self, err: &PipelineError) -> String {
        let names: Vec<StrategyName> = match (self.graph, err.strategy()) {
            (Some(graph), Some(strategy)) => {
                let mut names: Vec<_> = graph.dependents_of(strategy).into_iter().collect();
                names.sort();
                names
            }
            _ => err.dependents().to_vec(),
        };

        if names.is_empty() {
            "none".to_string()
        } else {
            names
                .iter()
                .map(StrategyName::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        }
    }
}
