//! Dataset access for query execution.
//!
//! This module provides the [`Dataset`] trait through which compiled scans
//! reach stored quads. The trait is object-safe and is held by the
//! execution context behind an `Arc`.

mod memory;

pub use memory::MemoryDataset;

use quarry_core::{Quad, Term};

/// Which graphs a scan looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphTarget<'a> {
    /// The default graph.
    Default,
    /// One named graph.
    Named(&'a Term),
    /// Every named graph (not the default graph).
    AnyNamed,
}

/// Dataset access error type.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DatasetError {
    /// The underlying storage failed.
    #[error("storage error: {0}")]
    Storage(String),
    /// The dataset refuses to scan the requested graph.
    #[error("graph not available: {0}")]
    GraphUnavailable(Term),
}

/// Result type for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// A lazy stream of matching quads. Dropping it releases the scan.
pub type QuadCursor = Box<dyn Iterator<Item = DatasetResult<Quad>> + Send>;

/// Pattern-matching access to a quad store.
pub trait Dataset: Send + Sync {
    /// Returns the quads in `graph` matching the given positions. `None`
    /// matches anything.
    ///
    /// Quads from named graphs carry their graph name; default-graph quads
    /// carry `None`.
    fn quads_for_pattern(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        graph: GraphTarget<'_>,
    ) -> DatasetResult<QuadCursor>;

    /// Names of all named graphs, in a stable order.
    fn graph_names(&self) -> DatasetResult<Vec<Term>>;
}

/// A dataset with no quads and no graphs.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyDataset;

impl Dataset for EmptyDataset {
    fn quads_for_pattern(
        &self,
        _subject: Option<&Term>,
        _predicate: Option<&Term>,
        _object: Option<&Term>,
        _graph: GraphTarget<'_>,
    ) -> DatasetResult<QuadCursor> {
        Ok(Box::new(std::iter::empty()))
    }

    fn graph_names(&self) -> DatasetResult<Vec<Term>> {
        Ok(Vec::new())
    }
}
