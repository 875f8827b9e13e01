//! Registry adapter interface
//!
//! The pipeline consumes "a strategy instance with a name and a dependency
//! set" and does not care how it was constructed. This module defines the
//! narrow interface a registry/factory must implement, plus an in-memory
//! implementation for tests and simple callers. The pipeline calls the
//! provider once per execution and assumes nothing about instance caching
//! or registration-order stability.

use crate::core::Strategy;
use crate::StrategyName;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// Errors a strategy provider can surface
///
/// Provider failures are initialization failures from the pipeline's point
/// of view: they abort the run before any strategy starts.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum ProviderError {
    /// A strategy instance could not be constructed
    #[error("strategy '{name}' could not be constructed: {reason}")]
    Construction {
        /// The strategy that failed to construct
        name: StrategyName,
        /// Why construction failed
        reason: String,
    },

    /// The registry backing the provider is unavailable
    #[error("strategy registry unavailable: {reason}")]
    Unavailable {
        /// Why the registry could not be reached
        reason: String,
    },
}

impl ProviderError {
    /// Creates a construction error for a single strategy
    pub fn construction(name: StrategyName, reason: impl Into<String>) -> Self {
        Self::Construction {
            name,
            reason: reason.into(),
        }
    }

    /// Creates an unavailable error
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Source of strategy instances and their declared dependency sets
pub trait StrategyProvider: Send + Sync {
    /// Returns every strategy instance available for this run, by name
    fn strategies(&self) -> Result<HashMap<StrategyName, Arc<dyn Strategy>>, ProviderError>;

    /// Returns the declared dependency set of a strategy
    ///
    /// Unknown names yield an empty set.
    fn dependencies(&self, name: &StrategyName) -> HashSet<StrategyName>;
}

/// In-memory provider backed by plain maps
///
/// # Example
///
/// ```ignore
/// let provider = StaticProvider::new()
///     .with_strategy(Arc::new(Tokenization), [] as [&str; 0])
///     .with_strategy(Arc::new(Ner), ["tokenization"]);
/// ```
#[derive(Default, Clone)]
pub struct StaticProvider {
    strategies: HashMap<StrategyName, Arc<dyn Strategy>>,
    dependencies: HashMap<StrategyName, HashSet<StrategyName>>,
}

impl StaticProvider {
    /// Creates an empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a strategy with its declared dependency set
    ///
    /// The name is taken from the instance itself. Adding the same name
    /// twice replaces both the instance and its dependency set.
    pub fn with_strategy<I, N>(mut self, strategy: Arc<dyn Strategy>, depends_on: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<StrategyName>,
    {
        let name = strategy.name();
        self.dependencies
            .insert(name.clone(), depends_on.into_iter().map(Into::into).collect());
        self.strategies.insert(name, strategy);
        self
    }
}

impl StrategyProvider for StaticProvider {
    fn strategies(&self) -> Result<HashMap<StrategyName, Arc<dyn Strategy>>, ProviderError> {
        Ok(self.strategies.clone())
    }

    fn dependencies(&self, name: &StrategyName) -> HashSet<StrategyName> {
        self.dependencies.get(name).cloned().unwrap_or_default()
    }
}
