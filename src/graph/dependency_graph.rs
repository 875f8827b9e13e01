//! Dependency graph for strategy execution
//!
//! This module provides the core data structure for representing
//! dependencies between strategies as a directed acyclic graph (DAG).
//!
//! # Design
//!
//! The graph keeps two adjacency views over the same edge set:
//! - `forward`: what a strategy depends on (incoming work for it)
//! - `reverse`: what depends on a strategy
//!
//! The two maps are always exact inverses of each other, and every name
//! appearing in either map is a registered node. Only invariant-preserving
//! mutators are exposed; callers never touch the maps directly, so the
//! forward/reverse symmetry cannot be broken from outside.
//!
//! Acyclicity is enforced at the edge level: a prospective edge is checked
//! with a reachability search *before* insertion and rejected if it would
//! close a cycle, leaving the graph untouched. The topological sort
//! re-checks independently, which catches graphs reconstructed by bulk
//! loading edges from external data.

use super::error::{GraphError, GraphResult};
use super::StrategyName;
use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// A directed acyclic graph of strategy dependencies
///
/// An edge `strategy -> depends_on` means `depends_on` must complete before
/// `strategy` can run.
///
/// # Example
///
/// ```
/// use praxis::DependencyGraph;
///
/// let mut graph = DependencyGraph::new();
///
/// // ner and sentiment both require tokenization first
/// graph.add_dependency("ner", "tokenization").unwrap();
/// graph.add_dependency("sentiment", "tokenization").unwrap();
///
/// let order = graph.execution_order().unwrap();
/// assert_eq!(order[0].as_str(), "tokenization");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyGraph {
    /// What each strategy depends on
    forward: HashMap<StrategyName, HashSet<StrategyName>>,
    /// What depends on each strategy
    reverse: HashMap<StrategyName, HashSet<StrategyName>>,
    /// Node registration order, used for deterministic tie-breaking
    insertion_order: Vec<StrategyName>,
}

impl DependencyGraph {
    /// Creates a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered strategies
    pub fn len(&self) -> usize {
        self.insertion_order.len()
    }

    /// Returns true if the graph has no strategies
    pub fn is_empty(&self) -> bool {
        self.insertion_order.is_empty()
    }

    /// Returns true if the strategy is registered in the graph
    pub fn contains(&self, name: &StrategyName) -> bool {
        self.forward.contains_key(name)
    }

    /// Returns all registered strategy names in registration order
    pub fn node_names(&self) -> &[StrategyName] {
        &self.insertion_order
    }

    /// Registers a strategy with no dependencies
    ///
    /// Idempotent: registering an existing name keeps its current edges.
    /// Strategies are also registered implicitly by [`add_dependency`],
    /// so this is only needed for isolated nodes.
    ///
    /// [`add_dependency`]: DependencyGraph::add_dependency
    pub fn add_node(&mut self, name: impl Into<StrategyName>) {
        let name = name.into();
        if !self.forward.contains_key(&name) {
            self.insertion_order.push(name.clone());
            self.forward.insert(name.clone(), HashSet::new());
            self.reverse.insert(name, HashSet::new());
        }
    }

    /// Adds a dependency: `strategy` requires `depends_on` to complete first
    ///
    /// Both endpoints are registered if they are not yet known. Re-adding an
    /// existing edge is a no-op.
    ///
    /// # Errors
    ///
    /// - [`GraphError::SelfDependency`] if `strategy == depends_on`
    /// - [`GraphError::WouldCycle`] if `strategy` is already reachable from
    ///   `depends_on` along existing edges, so inserting the edge would close
    ///   a cycle. The check runs before insertion; on rejection the graph is
    ///   unchanged.
    pub fn add_dependency(
        &mut self,
        strategy: impl Into<StrategyName>,
        depends_on: impl Into<StrategyName>,
    ) -> GraphResult<()> {
        let strategy = strategy.into();
        let depends_on = depends_on.into();

        if strategy == depends_on {
            return Err(GraphError::self_dependency(strategy));
        }

        self.add_node(strategy.clone());
        self.add_node(depends_on.clone());

        if self.forward[&strategy].contains(&depends_on) {
            return Ok(()); // edge already present
        }

        // Reject before inserting: if `strategy` is reachable from
        // `depends_on` along forward edges, this edge closes a cycle.
        if let Some(participants) = self.path_between(&depends_on, &strategy) {
            return Err(GraphError::would_cycle(strategy, depends_on, participants));
        }

        if let Some(deps) = self.forward.get_mut(&strategy) {
            deps.insert(depends_on.clone());
        }
        if let Some(dependents) = self.reverse.get_mut(&depends_on) {
            dependents.insert(strategy);
        }

        Ok(())
    }

    /// Adds multiple dependencies for a strategy at once
    ///
    /// Applies [`add_dependency`] per element and stops at the first
    /// failure. Edges already applied by this call are kept; the graph is
    /// always internally consistent, there is never a partial edge.
    ///
    /// [`add_dependency`]: DependencyGraph::add_dependency
    pub fn add_dependencies<I, N>(
        &mut self,
        strategy: impl Into<StrategyName>,
        depends_on: I,
    ) -> GraphResult<()>
    where
        I: IntoIterator<Item = N>,
        N: Into<StrategyName>,
    {
        let strategy = strategy.into();
        for dep in depends_on {
            self.add_dependency(strategy.clone(), dep)?;
        }
        Ok(())
    }

    /// Replaces a strategy's dependency set wholesale
    ///
    /// Supports re-registering a name with a different dependency set: the
    /// old forward edges are dropped and the new set is validated for cycles
    /// against the rest of the graph. On rejection the prior edges remain.
    pub fn set_dependencies<I, N>(
        &mut self,
        strategy: impl Into<StrategyName>,
        depends_on: I,
    ) -> GraphResult<()>
    where
        I: IntoIterator<Item = N>,
        N: Into<StrategyName>,
    {
        let strategy = strategy.into();

        let mut staged = self.clone();
        staged.add_node(strategy.clone());
        staged.drop_forward_edges(&strategy);
        for dep in depends_on {
            staged.add_dependency(strategy.clone(), dep)?;
        }

        *self = staged;
        Ok(())
    }

    /// Returns what `name` depends on
    ///
    /// Pure lookup: unknown names yield an empty set.
    pub fn dependencies_of(&self, name: &StrategyName) -> HashSet<StrategyName> {
        self.forward.get(name).cloned().unwrap_or_default()
    }

    /// Returns what depends on `name`
    ///
    /// Pure lookup: unknown names yield an empty set.
    pub fn dependents_of(&self, name: &StrategyName) -> HashSet<StrategyName> {
        self.reverse.get(name).cloned().unwrap_or_default()
    }

    /// Returns a valid execution order for all registered strategies
    ///
    /// Uses Kahn's algorithm: seed a ready queue with zero-in-degree nodes,
    /// pop, append to the result, and decrement the in-degree of dependents,
    /// enqueueing any that reach zero. For every edge `a depends on b`, `b`
    /// appears before `a`. Isolated nodes appear exactly once.
    ///
    /// Ties among simultaneously-ready nodes break by registration order so
    /// an unchanged graph yields a repeatable plan. That order carries no
    /// dependency semantics; independent nodes are safe to run in any order
    /// or concurrently.
    ///
    /// # Errors
    ///
    /// [`GraphError::CycleDetected`] if not every node could be ordered.
    /// This is the authoritative cycle check and is required independently
    /// of the proactive check in [`add_dependency`], since a graph can be
    /// reconstructed from external data without going through it.
    ///
    /// [`add_dependency`]: DependencyGraph::add_dependency
    pub fn execution_order(&self) -> GraphResult<Vec<StrategyName>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let position: HashMap<&StrategyName, usize> = self
            .insertion_order
            .iter()
            .enumerate()
            .map(|(i, name)| (name, i))
            .collect();

        let mut in_degrees: HashMap<&StrategyName, usize> = self
            .forward
            .iter()
            .map(|(name, deps)| (name, deps.len()))
            .collect();

        let mut queue: VecDeque<&StrategyName> = self
            .insertion_order
            .iter()
            .filter(|name| in_degrees.get(*name) == Some(&0))
            .collect();

        let mut result = Vec::with_capacity(self.len());

        while let Some(node) = queue.pop_front() {
            result.push(node.clone());

            let mut newly_ready: Vec<&StrategyName> = Vec::new();
            if let Some(dependents) = self.reverse.get(node) {
                for dependent in dependents {
                    if let Some(degree) = in_degrees.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            newly_ready.push(dependent);
                        }
                    }
                }
            }
            // Registration order among equal candidates keeps the plan
            // repeatable for logs and tests.
            newly_ready.sort_by_key(|name| position.get(*name).copied().unwrap_or(usize::MAX));
            queue.extend(newly_ready);
        }

        if result.len() != self.len() {
            let ordered: HashSet<&StrategyName> = result.iter().collect();
            let participants = self
                .insertion_order
                .iter()
                .filter(|name| !ordered.contains(*name))
                .cloned()
                .collect();
            return Err(GraphError::cycle_detected(participants));
        }

        Ok(result)
    }

    /// Summarizes the graph structure: roots, leaves, and depth
    ///
    /// # Errors
    ///
    /// [`GraphError::CycleDetected`] if the graph cannot be ordered.
    pub fn summary(&self) -> GraphResult<GraphSummary> {
        let order = self.execution_order()?;

        let roots: Vec<StrategyName> = self
            .insertion_order
            .iter()
            .filter(|name| self.forward[*name].is_empty())
            .cloned()
            .collect();

        let leaves: Vec<StrategyName> = self
            .insertion_order
            .iter()
            .filter(|name| self.reverse[*name].is_empty())
            .cloned()
            .collect();

        // Depth per node falls out of a single pass over the topological
        // order: one more than the deepest dependency.
        let mut depths: HashMap<&StrategyName, usize> = HashMap::new();
        let mut max_depth = 0;
        for name in &order {
            let depth = self.forward[name]
                .iter()
                .filter_map(|dep| depths.get(dep).copied())
                .max()
                .map(|d| d + 1)
                .unwrap_or(0);
            max_depth = max_depth.max(depth);
            depths.insert(name, depth);
        }

        Ok(GraphSummary {
            total: self.len(),
            root_count: roots.len(),
            leaf_count: leaves.len(),
            max_depth,
            roots,
            leaves,
        })
    }

    /// Renders the graph in Graphviz DOT format
    ///
    /// Edges point from a dependency to its dependents, i.e. in execution
    /// direction. Render with `dot -Tpng graph.dot -o graph.png`.
    pub fn to_dot(&self) -> String {
        let mut graph = DiGraph::<String, ()>::new();
        let mut indices = HashMap::new();

        for name in &self.insertion_order {
            let idx = graph.add_node(name.to_string());
            indices.insert(name, idx);
        }

        for name in &self.insertion_order {
            for dep in &self.forward[name] {
                if let (Some(&from), Some(&to)) = (indices.get(dep), indices.get(name)) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        format!("{:?}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }

    /// Clears all strategies and edges
    ///
    /// Used between pipeline configurations, not between individual runs.
    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
        self.insertion_order.clear();
    }

    /// Finds a path `from -> ... -> to` along forward edges, if one exists
    fn path_between(&self, from: &StrategyName, to: &StrategyName) -> Option<Vec<StrategyName>> {
        let mut parent: HashMap<StrategyName, StrategyName> = HashMap::new();
        let mut visited: HashSet<&StrategyName> = HashSet::new();
        let mut queue: VecDeque<&StrategyName> = VecDeque::new();

        visited.insert(from);
        queue.push_back(from);

        while let Some(node) = queue.pop_front() {
            if node == to {
                let mut path = vec![to.clone()];
                let mut current = to;
                while let Some(prev) = parent.get(current) {
                    path.push(prev.clone());
                    current = prev;
                }
                path.reverse();
                return Some(path);
            }

            for dep in self.forward.get(node).into_iter().flatten() {
                if visited.insert(dep) {
                    parent.insert(dep.clone(), node.clone());
                    queue.push_back(dep);
                }
            }
        }

        None
    }

    /// Removes all forward edges of `strategy` and their reverse mirrors
    fn drop_forward_edges(&mut self, strategy: &StrategyName) {
        let old: Vec<StrategyName> = self
            .forward
            .get(strategy)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default();
        for dep in old {
            if let Some(dependents) = self.reverse.get_mut(&dep) {
                dependents.remove(strategy);
            }
        }
        if let Some(deps) = self.forward.get_mut(strategy) {
            deps.clear();
        }
    }
}

/// Summary information about a graph's structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSummary {
    /// Total number of registered strategies
    pub total: usize,
    /// Number of strategies with no dependencies
    pub root_count: usize,
    /// Number of strategies with no dependents
    pub leaf_count: usize,
    /// Length of the longest dependency chain, zero-based
    pub max_depth: usize,
    /// Strategies with no dependencies
    pub roots: Vec<StrategyName>,
    /// Strategies with no dependents
    pub leaves: Vec<StrategyName>,
}
