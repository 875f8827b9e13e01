//! Dependency graph for strategy pipelines
//!
//! This module provides the graph data structure and algorithms for
//! managing dependencies between strategies. It enables:
//!
//! - Explicit dependency declaration between strategies
//! - Topological sorting for a valid execution order
//! - Cycle detection before an invalid edge can be applied
//! - Blast-radius lookups (what depends on a failed strategy)
//!
//! # Design Principles
//!
//! The graph representation (two mirrored adjacency maps) is hidden behind
//! invariant-preserving mutators: `add_dependency`, `add_dependencies`,
//! `set_dependencies`. Raw map access is never exposed, so the
//! forward/reverse symmetry cannot be violated externally.

mod dependency_graph;
mod error;
mod strategy_name;

pub use dependency_graph::{DependencyGraph, GraphSummary};
pub use error::{GraphError, GraphResult};
pub use strategy_name::StrategyName;
