//! Pipeline coordinator
//!
//! This module hides the execution strategy: how ready strategies are
//! scheduled onto worker tasks, how dependents learn about completion, and
//! how the first failure stops the run. Callers see only `execute` and the
//! result cache.
//!
//! # How It Works
//!
//! 1. The dependency graph yields a topological order (the authoritative
//!    cycle check)
//! 2. Every strategy present for this run gets one spawned task and one
//!    completion signal (a `watch` channel)
//! 3. A task waits on the signals of its dependencies, never polling
//! 4. Ready tasks run concurrently, bounded by a semaphore sized to
//!    `min(cores, plan width)`
//! 5. The first failure cancels an internal token; in-flight strategies
//!    finish and cache their results, but nothing new starts
//!
//! Sequential execution falls out as the degenerate case of a linear
//! graph; independent branches genuinely overlap in time.

use super::classifier::ErrorClassifier;
use super::context::{RunContext, RunReport, RunState};
use super::error::{PipelineError, Result, ValidationStage};
use super::provider::StrategyProvider;
use crate::core::{Metadata, Strategy, StrategyOutput};
use crate::graph::{DependencyGraph, GraphResult, GraphSummary};
use crate::StrategyName;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, info, Instrument};

/// Tuning knobs for pipeline execution
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    max_concurrency: Option<usize>,
    strategy_timeout: Option<Duration>,
}

impl PipelineConfig {
    /// Creates a config with defaults: width bounded by CPU cores, no timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the CPU-core bound on strategies running at once
    ///
    /// Without this, the worker width is `min(cores, plan size)`. An
    /// explicit value replaces the core bound; the plan size still caps it.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max);
        self
    }

    /// Sets a per-strategy deadline
    ///
    /// A strategy exceeding it fails with a timeout error, which aborts the
    /// run like any other strategy failure.
    pub fn with_strategy_timeout(mut self, limit: Duration) -> Self {
        self.strategy_timeout = Some(limit);
        self
    }

    fn worker_width(&self, plan_size: usize) -> usize {
        let base = match self.max_concurrency {
            Some(cap) => cap,
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        };
        base.min(plan_size.max(1)).max(1)
    }
}

/// Terminal state a node broadcasts to its dependents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Pending,
    Succeeded,
    Failed,
    Skipped,
}

/// What actually happened to a node, reported back to the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeDisposition {
    Completed,
    Failed,
    Skipped,
}

/// Dependency-aware strategy executor
///
/// Owns the dependency graph and the result cache of the most recent run.
/// `execute` takes `&mut self`, so graph mutation and execution cannot
/// interleave and a pipeline is never shared across concurrent runs.
///
/// # Example
///
/// ```ignore
/// let mut pipeline = Pipeline::new();
/// pipeline.add_dependency("ner", "tokenization")?;
/// pipeline.add_dependency("sentiment", "tokenization")?;
///
/// let results = pipeline.execute(&strategies, document, Metadata::new()).await?;
/// ```
pub struct Pipeline {
    graph: DependencyGraph,
    config: PipelineConfig,
    state: RunState,
    last_run: Option<Arc<RunContext>>,
    report: Option<RunReport>,
}

impl Pipeline {
    /// Creates a pipeline with default configuration
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::new())
    }

    /// Creates a pipeline with the given configuration
    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            graph: DependencyGraph::new(),
            config,
            state: RunState::NotStarted,
            last_run: None,
            report: None,
        }
    }

    /// Returns the owned dependency graph
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Registers that `strategy` requires `depends_on` to complete first
    ///
    /// See [`DependencyGraph::add_dependency`] for the cycle contract.
    pub fn add_dependency(
        &mut self,
        strategy: impl Into<StrategyName>,
        depends_on: impl Into<StrategyName>,
    ) -> GraphResult<()> {
        self.graph.add_dependency(strategy, depends_on)
    }

    /// Registers several dependencies for one strategy
    ///
    /// See [`DependencyGraph::add_dependencies`].
    pub fn add_dependencies<I, N>(
        &mut self,
        strategy: impl Into<StrategyName>,
        depends_on: I,
    ) -> GraphResult<()>
    where
        I: IntoIterator<Item = N>,
        N: Into<StrategyName>,
    {
        self.graph.add_dependencies(strategy, depends_on)
    }

    /// Registers a strategy with no dependencies
    pub fn register(&mut self, name: impl Into<StrategyName>) {
        self.graph.add_node(name);
    }

    /// Returns a valid execution order for the registered strategies
    pub fn execution_order(&self) -> GraphResult<Vec<StrategyName>> {
        self.graph.execution_order()
    }

    /// Summarizes the graph structure
    pub fn graph_summary(&self) -> GraphResult<GraphSummary> {
        self.graph.summary()
    }

    /// Resets the dependency graph
    ///
    /// Used between pipeline configurations, not between individual runs.
    pub fn clear(&mut self) {
        self.graph.clear();
    }

    /// Returns the lifecycle state of the most recent run
    pub fn run_state(&self) -> RunState {
        self.state
    }

    /// Returns the report of the most recent settled run
    pub fn run_report(&self) -> Option<&RunReport> {
        self.report.as_ref()
    }

    /// Looks up a cached result from the most recent run
    pub fn get_result(&self, name: &StrategyName) -> Option<StrategyOutput> {
        self.last_run.as_ref().and_then(|run| run.result(name))
    }

    /// Drops all cached results; the dependency graph is untouched
    pub fn clear_cache(&mut self) {
        self.last_run = None;
    }

    /// Executes every registered strategy present in `strategies`
    ///
    /// Names registered in the graph but absent from the map are skipped,
    /// which supports partial pipelines where optional strategies are not
    /// wired in for a given run. Returns the result map on success; on
    /// failure the error names the failing strategy and its dependents,
    /// and results cached before the failure stay readable via
    /// [`get_result`].
    ///
    /// [`get_result`]: Pipeline::get_result
    pub async fn execute(
        &mut self,
        strategies: &HashMap<StrategyName, Arc<dyn Strategy>>,
        content: impl Into<Arc<str>>,
        initial_metadata: Metadata,
    ) -> Result<HashMap<StrategyName, StrategyOutput>> {
        self.execute_with_cancellation(strategies, content, initial_metadata, CancellationToken::new())
            .await
    }

    /// Fetches strategies and dependencies from a provider, then executes
    ///
    /// The provider is consulted exactly once per run. Provider failures
    /// surface as initialization errors; dependency declarations pass
    /// through the invariant-preserving graph mutators, so a cyclic
    /// registration is rejected before anything runs.
    pub async fn execute_from_provider(
        &mut self,
        provider: &dyn StrategyProvider,
        content: impl Into<Arc<str>>,
        initial_metadata: Metadata,
        cancellation: CancellationToken,
    ) -> Result<HashMap<StrategyName, StrategyOutput>> {
        let strategies = provider
            .strategies()
            .map_err(|source| PipelineError::initialization(None, source))?;

        let mut names: Vec<StrategyName> = strategies.keys().cloned().collect();
        names.sort();
        for name in names {
            let declared = provider.dependencies(&name);
            self.graph.set_dependencies(name, declared)?;
        }

        self.execute_with_cancellation(&strategies, content, initial_metadata, cancellation)
            .await
    }

    /// [`execute`] with an externally owned cancellation signal
    ///
    /// Once the token fires, no new strategy starts; strategies already in
    /// flight finish and cache their results, then the call returns a
    /// cancellation error.
    ///
    /// [`execute`]: Pipeline::execute
    pub async fn execute_with_cancellation(
        &mut self,
        strategies: &HashMap<StrategyName, Arc<dyn Strategy>>,
        content: impl Into<Arc<str>>,
        initial_metadata: Metadata,
        cancellation: CancellationToken,
    ) -> Result<HashMap<StrategyName, StrategyOutput>> {
        // Strategies supplied without any declared edges still run.
        for name in strategies.keys() {
            self.graph.add_node(name.clone());
        }

        let order = self.graph.execution_order()?;
        let plan: Vec<StrategyName> = order
            .into_iter()
            .filter(|name| strategies.contains_key(name))
            .collect();

        let ctx = Arc::new(RunContext::new(content.into(), initial_metadata));
        info!(
            run_id = %ctx.run_id(),
            planned = plan.len(),
            registered = self.graph.len(),
            "starting pipeline run"
        );
        self.state = RunState::Running;

        // One completion signal per node; dependents block on these instead
        // of polling.
        let mut senders: HashMap<StrategyName, watch::Sender<NodeState>> = HashMap::new();
        let mut receivers: HashMap<StrategyName, watch::Receiver<NodeState>> = HashMap::new();
        for name in &plan {
            let (tx, rx) = watch::channel(NodeState::Pending);
            senders.insert(name.clone(), tx);
            receivers.insert(name.clone(), rx);
        }

        let workers = Arc::new(Semaphore::new(self.config.worker_width(plan.len())));
        let abort = cancellation.child_token();
        let first_error: Arc<Mutex<Option<PipelineError>>> = Arc::new(Mutex::new(None));

        let mut tasks: JoinSet<(StrategyName, NodeDisposition)> = JoinSet::new();
        for name in &plan {
            let Some(done) = senders.remove(name) else {
                continue;
            };
            // Edges onto strategies absent from this run have no signal and
            // impose no wait.
            let dep_signals: Vec<(StrategyName, watch::Receiver<NodeState>)> = self
                .graph
                .dependencies_of(name)
                .into_iter()
                .filter_map(|dep| receivers.get(&dep).map(|rx| (dep.clone(), rx.clone())))
                .collect();
            let mut dependents: Vec<StrategyName> =
                self.graph.dependents_of(name).into_iter().collect();
            dependents.sort();

            let span = debug_span!("strategy", name = %name, run_id = %ctx.run_id());
            tasks.spawn(
                run_node(NodeTask {
                    name: name.clone(),
                    strategy: Arc::clone(&strategies[name]),
                    dep_signals,
                    done,
                    ctx: Arc::clone(&ctx),
                    workers: Arc::clone(&workers),
                    abort: abort.clone(),
                    first_error: Arc::clone(&first_error),
                    dependents,
                    strategy_timeout: self.config.strategy_timeout,
                })
                .instrument(span),
            );
        }
        drop(receivers);

        let mut completed: Vec<StrategyName> = Vec::new();
        let mut skipped: Vec<StrategyName> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, NodeDisposition::Completed)) => completed.push(name),
                Ok((name, NodeDisposition::Skipped)) => skipped.push(name),
                Ok((_, NodeDisposition::Failed)) => {}
                Err(join_err) => {
                    record_failure(&first_error, PipelineError::task_panic(join_err.to_string()));
                }
            }
        }

        let error = {
            let mut slot = first_error
                .lock()
                .expect("first_error mutex poisoned - unrecoverable state");
            slot.take()
        };
        let error = match error {
            Some(err) => Some(err),
            None if cancellation.is_cancelled() => {
                Some(PipelineError::cancelled(skipped.clone()))
            }
            None => None,
        };

        // Report node sets in plan order, not completion order.
        let position: HashMap<&StrategyName, usize> =
            plan.iter().enumerate().map(|(i, n)| (n, i)).collect();
        completed.sort_by_key(|n| position.get(n).copied().unwrap_or(usize::MAX));
        skipped.sort_by_key(|n| position.get(n).copied().unwrap_or(usize::MAX));

        self.state = if error.is_some() {
            RunState::Failed
        } else {
            RunState::Completed
        };
        self.report = Some(RunReport {
            run_id: ctx.run_id(),
            state: self.state,
            started_at: ctx.started_at(),
            finished_at: Utc::now(),
            completed,
            failed: error.as_ref().and_then(|e| e.strategy().cloned()),
            skipped,
        });
        self.last_run = Some(Arc::clone(&ctx));
        info!(run_id = %ctx.run_id(), state = ?self.state, "pipeline run settled");

        match error {
            Some(err) => {
                ErrorClassifier::with_graph(&self.graph).report(&err);
                Err(err)
            }
            None => Ok(ctx.results_map()),
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything one node task needs, bundled to keep the spawn site readable
struct NodeTask {
    name: StrategyName,
    strategy: Arc<dyn Strategy>,
    dep_signals: Vec<(StrategyName, watch::Receiver<NodeState>)>,
    done: watch::Sender<NodeState>,
    ctx: Arc<RunContext>,
    workers: Arc<Semaphore>,
    abort: CancellationToken,
    first_error: Arc<Mutex<Option<PipelineError>>>,
    dependents: Vec<StrategyName>,
    strategy_timeout: Option<Duration>,
}

async fn run_node(task: NodeTask) -> (StrategyName, NodeDisposition) {
    let NodeTask {
        name,
        strategy,
        dep_signals,
        done,
        ctx,
        workers,
        abort,
        first_error,
        dependents,
        strategy_timeout,
    } = task;

    // Block only on per-dependency completion signals.
    let waits = dep_signals.into_iter().map(|(dep, mut rx)| async move {
        let terminal = rx.wait_for(|state| *state != NodeState::Pending).await;
        let succeeded = matches!(terminal.as_deref(), Ok(NodeState::Succeeded));
        (dep, succeeded)
    });
    let settled = futures::future::join_all(waits).await;
    if let Some((dep, _)) = settled.iter().find(|(_, succeeded)| !succeeded) {
        // The dependency failed, was skipped, or its task died.
        debug!(strategy = %name, dependency = %dep, "skipped: dependency did not complete");
        let _ = done.send(NodeState::Skipped);
        return (name, NodeDisposition::Skipped);
    }

    // No new node starts once a failure or cancellation has been observed.
    let permit = tokio::select! {
        biased;
        _ = abort.cancelled() => {
            debug!(strategy = %name, "skipped: run aborted before start");
            let _ = done.send(NodeState::Skipped);
            return (name, NodeDisposition::Skipped);
        }
        permit = Arc::clone(&workers).acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => {
                let _ = done.send(NodeState::Skipped);
                return (name, NodeDisposition::Skipped);
            }
        },
    };

    let disposition = execute_node(
        &name,
        strategy.as_ref(),
        &ctx,
        dependents,
        strategy_timeout,
        &first_error,
    )
    .await;
    drop(permit);

    match disposition {
        NodeDisposition::Completed => {
            let _ = done.send(NodeState::Succeeded);
        }
        NodeDisposition::Failed => {
            // Stop starting new nodes; in-flight ones are left to finish.
            abort.cancel();
            let _ = done.send(NodeState::Failed);
        }
        NodeDisposition::Skipped => {
            let _ = done.send(NodeState::Skipped);
        }
    }
    (name, disposition)
}

/// Runs validate/process/self-check for one strategy and caches the result
async fn execute_node(
    name: &StrategyName,
    strategy: &dyn Strategy,
    ctx: &RunContext,
    dependents: Vec<StrategyName>,
    strategy_timeout: Option<Duration>,
    first_error: &Mutex<Option<PipelineError>>,
) -> NodeDisposition {
    let issues = strategy.validate(ctx.content());
    if !issues.is_empty() {
        record_failure(
            first_error,
            PipelineError::validation(name.clone(), ValidationStage::Input, issues, dependents),
        );
        return NodeDisposition::Failed;
    }

    let metadata = ctx.snapshot_metadata();
    let processed = match strategy_timeout {
        Some(limit) => match timeout(limit, strategy.process(ctx.content(), &metadata)).await {
            Ok(result) => result,
            Err(_) => {
                record_failure(
                    first_error,
                    PipelineError::timeout(name.clone(), limit, dependents),
                );
                return NodeDisposition::Failed;
            }
        },
        None => strategy.process(ctx.content(), &metadata).await,
    };

    let output = match processed {
        Ok(output) => output,
        Err(source) => {
            record_failure(
                first_error,
                PipelineError::strategy_failure(name.clone(), source, dependents),
            );
            return NodeDisposition::Failed;
        }
    };

    let issues = output.validate();
    if !issues.is_empty() {
        record_failure(
            first_error,
            PipelineError::validation(name.clone(), ValidationStage::Output, issues, dependents),
        );
        return NodeDisposition::Failed;
    }

    // Merge and cache before signalling, so dependents always observe both.
    ctx.merge_metadata(output.metadata());
    ctx.insert_result(name.clone(), output);
    debug!(strategy = %name, "completed");
    NodeDisposition::Completed
}

/// First failure wins; later failures from in-flight nodes are only logged
fn record_failure(first_error: &Mutex<Option<PipelineError>>, error: PipelineError) {
    let mut slot = first_error
        .lock()
        .expect("first_error mutex poisoned - unrecoverable state");
    if slot.is_none() {
        *slot = Some(error);
    } else {
        debug!(error = %error, "additional failure after run already aborted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BoxError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;
    use std::time::Instant;

    /// Shared recorder for observing execution from inside test strategies
    #[derive(Default)]
    struct Trace {
        spans: StdMutex<HashMap<String, (Instant, Instant)>>,
        observed_metadata: StdMutex<HashMap<String, Metadata>>,
    }

    impl Trace {
        fn record(&self, name: &str, start: Instant, end: Instant) {
            self.spans
                .lock()
                .unwrap()
                .insert(name.to_string(), (start, end));
        }

        fn ran(&self, name: &str) -> bool {
            self.spans.lock().unwrap().contains_key(name)
        }

        fn ended_before_started(&self, earlier: &str, later: &str) -> bool {
            let spans = self.spans.lock().unwrap();
            let (_, earlier_end) = spans[earlier];
            let (later_start, _) = spans[later];
            earlier_end <= later_start
        }

        fn overlapped(&self, a: &str, b: &str) -> bool {
            let spans = self.spans.lock().unwrap();
            let (a_start, a_end) = spans[a];
            let (b_start, b_end) = spans[b];
            a_start < b_end && b_start < a_end
        }

        fn metadata_seen_by(&self, name: &str) -> Metadata {
            self.observed_metadata
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .unwrap_or_default()
        }
    }

    /// Configurable strategy double
    struct Probe {
        name: &'static str,
        delay: Duration,
        fail: bool,
        reject_input: Vec<String>,
        failing_check: bool,
        emit: Metadata,
        trace: Arc<Trace>,
    }

    impl Probe {
        fn new(name: &'static str, trace: &Arc<Trace>) -> Self {
            Self {
                name,
                delay: Duration::ZERO,
                fail: false,
                reject_input: Vec::new(),
                failing_check: false,
                emit: Metadata::new(),
                trace: Arc::clone(trace),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        fn rejecting_input(mut self, message: &str) -> Self {
            self.reject_input.push(message.to_string());
            self
        }

        fn with_failing_check(mut self) -> Self {
            self.failing_check = true;
            self
        }

        fn emitting(mut self, key: &str, value: serde_json::Value) -> Self {
            self.emit.insert(key.to_string(), value);
            self
        }
    }

    #[async_trait]
    impl Strategy for Probe {
        fn name(&self) -> StrategyName {
            StrategyName::new(self.name)
        }

        fn validate(&self, _content: &str) -> Vec<String> {
            self.reject_input.clone()
        }

        async fn process(
            &self,
            _content: &str,
            metadata: &Metadata,
        ) -> std::result::Result<StrategyOutput, BoxError> {
            self.trace
                .observed_metadata
                .lock()
                .unwrap()
                .insert(self.name.to_string(), metadata.clone());

            let start = Instant::now();
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.trace.record(self.name, start, Instant::now());

            if self.fail {
                return Err("deliberate failure".into());
            }

            let mut output =
                StrategyOutput::new(json!(self.name)).with_metadata_map(self.emit.clone());
            if self.failing_check {
                output = output.with_check(|_| vec!["self-check failed".to_string()]);
            }
            Ok(output)
        }
    }

    fn strategies(
        probes: Vec<Probe>,
    ) -> HashMap<StrategyName, Arc<dyn Strategy>> {
        probes
            .into_iter()
            .map(|p| (StrategyName::new(p.name), Arc::new(p) as Arc<dyn Strategy>))
            .collect()
    }

    fn diamond_pipeline() -> Pipeline {
        // wide enough that independent branches are never serialized by the
        // core count of the test machine
        let mut pipeline =
            Pipeline::with_config(PipelineConfig::new().with_max_concurrency(4));
        pipeline.add_dependency("b", "a").unwrap();
        pipeline.add_dependency("c", "a").unwrap();
        pipeline.add_dependencies("d", ["b", "c"]).unwrap();
        pipeline
    }

    #[tokio::test]
    async fn test_diamond_produces_all_results_in_dependency_order() {
        let trace = Arc::new(Trace::default());
        let mut pipeline = diamond_pipeline();
        let delay = Duration::from_millis(30);

        let results = pipeline
            .execute(
                &strategies(vec![
                    Probe::new("a", &trace).with_delay(delay),
                    Probe::new("b", &trace).with_delay(delay),
                    Probe::new("c", &trace).with_delay(delay),
                    Probe::new("d", &trace).with_delay(delay),
                ]),
                "shared input",
                Metadata::new(),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        assert!(trace.ended_before_started("a", "b"));
        assert!(trace.ended_before_started("a", "c"));
        assert!(trace.ended_before_started("b", "d"));
        assert!(trace.ended_before_started("c", "d"));
        // independent branches genuinely overlap
        assert!(trace.overlapped("b", "c"));
        assert_eq!(pipeline.run_state(), RunState::Completed);
    }

    #[tokio::test]
    async fn test_failure_aborts_dependents_but_keeps_finished_results() {
        let trace = Arc::new(Trace::default());
        let mut pipeline = diamond_pipeline();

        let err = pipeline
            .execute(
                &strategies(vec![
                    Probe::new("a", &trace),
                    Probe::new("b", &trace).failing(),
                    Probe::new("c", &trace).with_delay(Duration::from_millis(20)),
                    Probe::new("d", &trace),
                ]),
                "shared input",
                Metadata::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.strategy().map(StrategyName::as_str), Some("b"));
        assert!(err.dependents().contains(&StrategyName::new("d")));
        assert_eq!(pipeline.run_state(), RunState::Failed);

        // a finished before the failure existed
        assert!(pipeline.get_result(&StrategyName::new("a")).is_some());
        // d never got a chance to run
        assert!(pipeline.get_result(&StrategyName::new("d")).is_none());
        assert!(!trace.ran("d"));

        let report = pipeline.run_report().unwrap();
        assert_eq!(report.failed, Some(StrategyName::new("b")));
        assert!(report.skipped.contains(&StrategyName::new("d")));
    }

    #[tokio::test]
    async fn test_metadata_flows_to_dependents_last_writer_wins() {
        let trace = Arc::new(Trace::default());
        let mut pipeline = Pipeline::new();
        pipeline.add_dependency("b", "a").unwrap();
        pipeline.add_dependency("c", "b").unwrap();

        pipeline
            .execute(
                &strategies(vec![
                    Probe::new("a", &trace)
                        .emitting("language", json!("en"))
                        .emitting("stage", json!("a")),
                    Probe::new("b", &trace).emitting("stage", json!("b")),
                    Probe::new("c", &trace),
                ]),
                "shared input",
                Metadata::from([("origin".to_string(), json!("caller"))]),
            )
            .await
            .unwrap();

        let seen_by_b = trace.metadata_seen_by("b");
        assert_eq!(seen_by_b["language"], json!("en"));
        assert_eq!(seen_by_b["origin"], json!("caller"));
        assert_eq!(seen_by_b["stage"], json!("a"));

        // b overwrote a's value before c started
        let seen_by_c = trace.metadata_seen_by("c");
        assert_eq!(seen_by_c["stage"], json!("b"));
    }

    #[tokio::test]
    async fn test_input_validation_aborts_run() {
        let trace = Arc::new(Trace::default());
        let mut pipeline = Pipeline::new();
        pipeline.add_dependency("b", "a").unwrap();

        let err = pipeline
            .execute(
                &strategies(vec![
                    Probe::new("a", &trace).rejecting_input("content too short"),
                    Probe::new("b", &trace),
                ]),
                "x",
                Metadata::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Validation {
                stage: ValidationStage::Input,
                ..
            }
        ));
        assert!(!trace.ran("a"));
        assert!(!trace.ran("b"));
    }

    #[tokio::test]
    async fn test_output_self_check_fails_like_strategy_failure() {
        let trace = Arc::new(Trace::default());
        let mut pipeline = Pipeline::new();
        pipeline.add_dependency("b", "a").unwrap();

        let err = pipeline
            .execute(
                &strategies(vec![
                    Probe::new("a", &trace).with_failing_check(),
                    Probe::new("b", &trace),
                ]),
                "shared input",
                Metadata::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Validation {
                stage: ValidationStage::Output,
                ..
            }
        ));
        // a's result never entered the cache, so b never ran
        assert!(pipeline.get_result(&StrategyName::new("a")).is_none());
        assert!(!trace.ran("b"));
    }

    #[tokio::test]
    async fn test_registered_but_absent_strategies_are_skipped() {
        let trace = Arc::new(Trace::default());
        let mut pipeline = Pipeline::new();
        pipeline.add_dependency("ner", "tokenization").unwrap();
        // registered in the graph, not wired in for this run
        pipeline.register("sentiment");

        let results = pipeline
            .execute(
                &strategies(vec![
                    Probe::new("tokenization", &trace),
                    Probe::new("ner", &trace),
                ]),
                "shared input",
                Metadata::new(),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(pipeline
            .get_result(&StrategyName::new("sentiment"))
            .is_none());
    }

    #[tokio::test]
    async fn test_dependency_on_absent_strategy_imposes_no_wait() {
        let trace = Arc::new(Trace::default());
        let mut pipeline = Pipeline::new();
        pipeline.add_dependency("ner", "tokenization").unwrap();

        // tokenization is not supplied; ner must still run
        let results = pipeline
            .execute(
                &strategies(vec![Probe::new("ner", &trace)]),
                "shared input",
                Metadata::new(),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(trace.ran("ner"));
    }

    #[tokio::test]
    async fn test_get_result_after_clear_cache_is_empty() {
        let trace = Arc::new(Trace::default());
        let mut pipeline = Pipeline::new();
        pipeline.register("a");

        pipeline
            .execute(
                &strategies(vec![Probe::new("a", &trace)]),
                "shared input",
                Metadata::new(),
            )
            .await
            .unwrap();
        assert!(pipeline.get_result(&StrategyName::new("a")).is_some());

        pipeline.clear_cache();
        assert!(pipeline.get_result(&StrategyName::new("a")).is_none());
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_runs_nothing() {
        let trace = Arc::new(Trace::default());
        let mut pipeline = Pipeline::new();
        pipeline.add_dependency("b", "a").unwrap();

        let token = CancellationToken::new();
        token.cancel();

        let err = pipeline
            .execute_with_cancellation(
                &strategies(vec![Probe::new("a", &trace), Probe::new("b", &trace)]),
                "shared input",
                Metadata::new(),
                token,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Cancelled { .. }));
        assert!(!trace.ran("a"));
        assert!(!trace.ran("b"));
        assert_eq!(pipeline.run_state(), RunState::Failed);
    }

    #[tokio::test]
    async fn test_strategy_timeout_aborts_run_as_node_failure() {
        let trace = Arc::new(Trace::default());
        let mut pipeline = Pipeline::with_config(
            PipelineConfig::new().with_strategy_timeout(Duration::from_millis(20)),
        );
        pipeline.add_dependency("b", "a").unwrap();

        let err = pipeline
            .execute(
                &strategies(vec![
                    Probe::new("a", &trace).with_delay(Duration::from_secs(5)),
                    Probe::new("b", &trace),
                ]),
                "shared input",
                Metadata::new(),
            )
            .await
            .unwrap_err();

        match err {
            PipelineError::Timeout { strategy, .. } => {
                assert_eq!(strategy.as_str(), "a");
            }
            other => panic!("expected Timeout, got {:?}", other),
        }
        assert!(!trace.ran("b"));
    }

    #[tokio::test]
    async fn test_cyclic_graph_never_reaches_execution() {
        let mut pipeline = Pipeline::new();
        pipeline.add_dependency("b", "a").unwrap();
        // rejected synchronously at the mutating call
        assert!(pipeline.add_dependency("a", "b").is_err());

        let trace = Arc::new(Trace::default());
        let results = pipeline
            .execute(
                &strategies(vec![Probe::new("a", &trace), Probe::new("b", &trace)]),
                "shared input",
                Metadata::new(),
            )
            .await
            .unwrap();
        // the surviving acyclic graph still executes
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_execute_returns_result_map_on_success() {
        let trace = Arc::new(Trace::default());
        let mut pipeline = Pipeline::new();
        pipeline.register("a");

        let results = pipeline
            .execute(
                &strategies(vec![Probe::new("a", &trace)]),
                "shared input",
                Metadata::new(),
            )
            .await
            .unwrap();

        assert_eq!(results[&StrategyName::new("a")].data(), &json!("a"));
    }
}
