//! Execution context for query execution.
//!
//! The context is passed explicitly to every compile call and captured by
//! the iterators that need it. Cloning is cheap: the dataset, evaluator,
//! extension registry, statistics and cancellation flag are shared. The
//! active graph is the only per-subtree field; [`ExecutionContext::with_active_graph`]
//! derives a scoped copy instead of mutating the caller's context.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use quarry_core::Term;
use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, EmptyDataset};
use crate::error::{ExecError, ExecResult};
use crate::eval::{ExprEvaluator, StandardEvaluator};

use super::extension::ExtensionRegistry;

/// The graph that basic graph patterns are matched against.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActiveGraph {
    /// The dataset's default graph.
    #[default]
    Default,
    /// A named graph.
    Named(Term),
}

/// Execution context for a query.
///
/// The context provides access to:
/// - The dataset being queried
/// - The expression evaluator used by filters and sort keys
/// - Registered extension realizations
/// - Cancellation support
/// - Execution statistics
/// - Runtime configuration
/// - The active graph scope
#[derive(Clone)]
pub struct ExecutionContext {
    dataset: Arc<dyn Dataset>,
    evaluator: Arc<dyn ExprEvaluator>,
    extensions: Arc<ExtensionRegistry>,
    cancellation: CancellationToken,
    stats: Arc<ExecutionStats>,
    config: ExecutionConfig,
    active_graph: ActiveGraph,
}

impl ExecutionContext {
    /// Creates a context over `dataset` with the standard evaluator and no
    /// extensions.
    #[must_use]
    pub fn new(dataset: Arc<dyn Dataset>) -> Self {
        Self {
            dataset,
            evaluator: Arc::new(StandardEvaluator::new()),
            extensions: Arc::new(ExtensionRegistry::new()),
            cancellation: CancellationToken::new(),
            stats: Arc::new(ExecutionStats::new()),
            config: ExecutionConfig::default(),
            active_graph: ActiveGraph::Default,
        }
    }

    /// Sets the expression evaluator.
    #[must_use]
    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExprEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Sets the extension registry.
    #[must_use]
    pub fn with_extensions(mut self, extensions: ExtensionRegistry) -> Self {
        self.extensions = Arc::new(extensions);
        self
    }

    /// Sets the execution configuration.
    #[must_use]
    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares an externally held cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns a copy of this context scoped to `graph`. Statistics and
    /// cancellation remain shared with `self`.
    #[must_use]
    pub fn with_active_graph(&self, graph: ActiveGraph) -> Self {
        Self { active_graph: graph, ..self.clone() }
    }

    /// Returns the dataset.
    #[inline]
    #[must_use]
    pub fn dataset(&self) -> &dyn Dataset {
        self.dataset.as_ref()
    }

    /// Returns the evaluator.
    #[inline]
    #[must_use]
    pub fn evaluator(&self) -> &dyn ExprEvaluator {
        self.evaluator.as_ref()
    }

    /// Returns the extension registry.
    #[inline]
    #[must_use]
    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    /// Returns the active graph.
    #[inline]
    #[must_use]
    pub const fn active_graph(&self) -> &ActiveGraph {
        &self.active_graph
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Cancels the query execution.
    #[inline]
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Checks if the query has been cancelled.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Returns `Err(Cancelled)` once cancellation was requested.
    #[inline]
    pub fn check_cancelled(&self) -> ExecResult<()> {
        if self.is_cancelled() {
            return Err(ExecError::Cancelled);
        }
        Ok(())
    }

    /// Returns the execution statistics.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    /// Returns the maximum rows in memory limit.
    ///
    /// Returns 0 if the limit is disabled.
    #[inline]
    #[must_use]
    pub const fn max_rows_in_memory(&self) -> usize {
        self.config.max_rows_in_memory
    }

    /// Records that quads were read from the dataset.
    #[inline]
    pub fn record_rows_scanned(&self, count: u64) {
        if self.config.collect_stats {
            self.stats.rows_scanned.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Records that rows were produced.
    #[inline]
    pub fn record_rows_produced(&self, count: u64) {
        if self.config.collect_stats {
            self.stats.rows_produced.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Records that rows were filtered.
    #[inline]
    pub fn record_rows_filtered(&self, count: u64) {
        if self.config.collect_stats {
            self.stats.rows_filtered.fetch_add(count, Ordering::Relaxed);
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(Arc::new(EmptyDataset))
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("dataset", &"<Dataset>")
            .field("extensions", &self.extensions)
            .field("cancelled", &self.is_cancelled())
            .field("stats", &self.stats)
            .field("config", &self.config)
            .field("active_graph", &self.active_graph)
            .finish_non_exhaustive()
    }
}

/// Execution statistics collected during query execution.
#[derive(Debug)]
pub struct ExecutionStats {
    /// When execution started.
    start_time: Instant,
    /// Number of quads read from the dataset.
    rows_scanned: AtomicU64,
    /// Number of rows produced by the query.
    rows_produced: AtomicU64,
    /// Number of rows rejected by filters.
    rows_filtered: AtomicU64,
}

impl ExecutionStats {
    /// Creates new execution statistics.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            rows_scanned: AtomicU64::new(0),
            rows_produced: AtomicU64::new(0),
            rows_filtered: AtomicU64::new(0),
        }
    }

    /// Returns the number of quads scanned.
    #[inline]
    #[must_use]
    pub fn rows_scanned(&self) -> u64 {
        self.rows_scanned.load(Ordering::Relaxed)
    }

    /// Returns the number of rows produced.
    #[inline]
    #[must_use]
    pub fn rows_produced(&self) -> u64 {
        self.rows_produced.load(Ordering::Relaxed)
    }

    /// Returns the number of rows filtered.
    #[inline]
    #[must_use]
    pub fn rows_filtered(&self) -> u64 {
        self.rows_filtered.load(Ordering::Relaxed)
    }

    /// Returns the elapsed execution time.
    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

impl Default for ExecutionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Default maximum rows in memory (1 million rows).
pub const DEFAULT_MAX_ROWS_IN_MEMORY: usize = 1_000_000;

/// How optional joins are realized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeftJoinStrategy {
    /// Probe the optional side per left binding when it is a plain pattern,
    /// otherwise evaluate it once and merge.
    #[default]
    Auto,
    /// Always evaluate the optional side once and merge.
    Exhaustive,
}

/// Configuration options for query execution.
///
/// Deserializes with missing fields taken from [`Default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Maximum number of rows that operators can buffer in memory.
    ///
    /// Applies to sorting, duplicate removal, the materialized side of a
    /// nested-loop join and the replay buffer shared by union branches.
    /// Exceeding it returns `QueryTooLarge`. Set to 0 to disable.
    /// Default: 1,000,000 rows.
    pub max_rows_in_memory: usize,
    /// Optional join realization.
    pub left_join_strategy: LeftJoinStrategy,
    /// Whether filters over a pattern are evaluated as soon as the pattern
    /// stages binding their variables have run.
    pub filter_placement: bool,
    /// Whether to collect statistics.
    pub collect_stats: bool,
}

impl ExecutionConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_rows_in_memory: DEFAULT_MAX_ROWS_IN_MEMORY,
            left_join_strategy: LeftJoinStrategy::Auto,
            filter_placement: true,
            collect_stats: true,
        }
    }

    /// Sets the maximum rows that can be buffered in memory.
    #[must_use]
    pub const fn with_max_rows_in_memory(mut self, limit: usize) -> Self {
        self.max_rows_in_memory = limit;
        self
    }

    /// Sets the optional join strategy.
    #[must_use]
    pub const fn with_left_join_strategy(mut self, strategy: LeftJoinStrategy) -> Self {
        self.left_join_strategy = strategy;
        self
    }

    /// Enables or disables filter placement into pattern scans.
    #[must_use]
    pub const fn with_filter_placement(mut self, enabled: bool) -> Self {
        self.filter_placement = enabled;
        self
    }

    /// Enables or disables statistics collection.
    #[must_use]
    pub const fn with_stats(mut self, enabled: bool) -> Self {
        self.collect_stats = enabled;
        self
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A handle for cancelling query execution.
///
/// Can be shared between threads to allow cancellation from outside
/// the query execution thread.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)) }
    }

    /// Cancels the associated query.
    #[inline]
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Checks if cancellation was requested.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_cancellation() {
        let ctx = ExecutionContext::default();
        assert!(!ctx.is_cancelled());
        assert!(ctx.check_cancelled().is_ok());
        ctx.cancel();
        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.check_cancelled(), Err(ExecError::Cancelled)));
    }

    #[test]
    fn config_from_json() {
        let config: ExecutionConfig =
            serde_json::from_str(r#"{"left_join_strategy": "exhaustive", "max_rows_in_memory": 10}"#)
                .unwrap();
        assert_eq!(config.left_join_strategy, LeftJoinStrategy::Exhaustive);
        assert_eq!(config.max_rows_in_memory, 10);
        assert!(config.filter_placement);
        assert!(config.collect_stats);
    }

    #[test]
    fn shared_token_cancels_context() {
        let token = CancellationToken::new();
        let ctx = ExecutionContext::default().with_cancellation(token.clone());
        token.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn context_stats() {
        let ctx = ExecutionContext::default();
        ctx.record_rows_scanned(100);
        ctx.record_rows_produced(50);
        ctx.record_rows_filtered(50);

        assert_eq!(ctx.stats().rows_scanned(), 100);
        assert_eq!(ctx.stats().rows_produced(), 50);
        assert_eq!(ctx.stats().rows_filtered(), 50);
    }

    #[test]
    fn stats_disabled() {
        let ctx = ExecutionContext::default().with_config(ExecutionConfig::new().with_stats(false));
        ctx.record_rows_produced(5);
        assert_eq!(ctx.stats().rows_produced(), 0);
    }

    #[test]
    fn scoped_graph_leaves_parent_untouched() {
        let ctx = ExecutionContext::default();
        let g = Term::iri("http://ex/g");
        let scoped = ctx.with_active_graph(ActiveGraph::Named(g.clone()));

        assert_eq!(ctx.active_graph(), &ActiveGraph::Default);
        assert_eq!(scoped.active_graph(), &ActiveGraph::Named(g.clone()));

        scoped.record_rows_produced(3);
        assert_eq!(ctx.stats().rows_produced(), 3);
    }

    #[test]
    fn config_builders() {
        let config = ExecutionConfig::new()
            .with_max_rows_in_memory(10)
            .with_left_join_strategy(LeftJoinStrategy::Exhaustive)
            .with_filter_placement(false);
        assert_eq!(config.max_rows_in_memory, 10);
        assert_eq!(config.left_join_strategy, LeftJoinStrategy::Exhaustive);
        assert!(!config.filter_placement);
    }
}
