//! # quarry-query
//!
//! Operator-to-iterator compilation and execution for the quarry graph
//! query engine.
//!
//! An algebra tree ([`Op`]) is compiled into a chain of lazy, pull-based
//! [`QueryIterator`]s that produce [`Binding`]s against a [`Dataset`].
//!
//! ## Modules
//!
//! - [`algebra`] - operator and expression trees
//! - [`dataset`] - dataset access trait and an in-memory implementation
//! - [`eval`] - expression evaluation used by filters and sort keys
//! - [`exec`] - the compiler, the iterators it builds and the execution driver
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use quarry_query::{execute, ExecutionContext, Expr, MemoryDataset, Op};
//! use quarry_query::{Term, TriplePattern, Variable};
//!
//! let mut dataset = MemoryDataset::new();
//! dataset.insert(Term::iri("http://ex/a"), Term::iri("http://ex/age"), Term::integer(42));
//! dataset.insert(Term::iri("http://ex/b"), Term::iri("http://ex/age"), Term::integer(7));
//!
//! let op = Op::bgp(vec![TriplePattern::new(
//!     Variable::new("s"),
//!     Term::iri("http://ex/age"),
//!     Variable::new("age"),
//! )])
//! .filter(Expr::var("age").gt(Expr::integer(18)));
//!
//! let rows = execute(&op, ExecutionContext::new(Arc::new(dataset))).unwrap();
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].get(&Variable::new("s")), Some(&Term::iri("http://ex/a")));
//! ```

#![deny(clippy::unwrap_used)]

pub mod algebra;
pub mod dataset;
pub mod error;
pub mod eval;
pub mod exec;

pub use algebra::{CompareOp, Expr, Op, OpExtension, SortDirection, SortKey, Table};
pub use dataset::{
    Dataset, DatasetError, DatasetResult, EmptyDataset, GraphTarget, MemoryDataset, QuadCursor,
};
pub use error::{ExecError, ExecResult};
pub use eval::{EvalError, EvalResult, ExprEvaluator, StandardEvaluator};
pub use exec::{
    compile, execute, ActiveGraph, BoxedIter, CancellationToken, ExecutionConfig,
    ExecutionContext, ExecutionStats, ExtensionRealizer, ExtensionRegistry, IterState,
    LeftJoinStrategy, QueryExecution, QueryIterator, Seed,
};
pub use quarry_core::{Binding, Literal, Quad, Term, TermPattern, TriplePattern, Variable};
