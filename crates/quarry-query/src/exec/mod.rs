//! Query execution.
//!
//! Compilation turns an [`Op`](crate::algebra::Op) tree into a chain of
//! pull-based [`QueryIterator`]s; [`QueryExecution`] drives the chain.
//!
//! # Architecture
//!
//! ```text
//! Op tree ──compile(op, seed, ctx)──▶ BoxedIter ──next()──▶ Binding
//!                                         │
//!                                         └── ExecutionContext (dataset, evaluator,
//!                                             extensions, cancellation, stats)
//! ```

pub mod compiler;
pub mod context;
pub mod executor;
pub mod extension;
pub mod iterator;
pub mod operators;

pub use compiler::{compile, Seed};
pub use context::{
    ActiveGraph, CancellationToken, ExecutionConfig, ExecutionContext, ExecutionStats,
    LeftJoinStrategy,
};
pub use executor::{execute, QueryExecution};
pub use extension::{ExtensionRealizer, ExtensionRegistry};
pub use iterator::{drain, BoxedIter, IterBase, IterState, QueryIterator};
