//! Strategy identifier type
//!
//! This module defines the StrategyName type which uniquely identifies a
//! strategy within a pipeline. Names are the only handle the pipeline has
//! on a strategy: dependency declarations, the result cache, and error
//! reports are all keyed by name.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Unique identifier for a strategy within a pipeline
///
/// A thin wrapper over the strategy's declared name. Using a dedicated type
/// instead of bare `String` keeps the graph, cache, and error APIs from
/// accepting arbitrary strings where a registered name is expected.
///
/// # Examples
///
/// ```
/// use praxis::StrategyName;
///
/// let name = StrategyName::new("tokenization");
/// assert_eq!(name.as_str(), "tokenization");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyName {
    name: String,
}

impl StrategyName {
    /// Creates a new StrategyName
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for StrategyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Debug for StrategyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StrategyName({})", self.name)
    }
}

impl From<&str> for StrategyName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StrategyName {
    fn from(s: String) -> Self {
        Self { name: s }
    }
}

impl Borrow<str> for StrategyName {
    fn borrow(&self) -> &str {
        &self.name
    }
}

impl AsRef<str> for StrategyName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}
