//! Concrete iterator implementations.
//!
//! This module contains the iterators the compiler chains together.
//!
//! # Iterator Categories
//!
//! - **Seeds**: [`seed`] - Fixed bindings and shared replay buffers
//! - **Scans**: [`scan`] - Triple pattern matching against the dataset
//! - **Filters**: [`filter`] - Expression evaluation
//! - **Joins**: [`join`] - Nested loop and optional probe joins
//! - **Unions**: [`set_ops`] - Concatenation
//! - **Graphs**: [`graph`] - Named graph iteration and enumeration
//! - **Tables**: [`values`] - Inline bindings
//! - **Ordering**: [`sort`] - ORDER BY
//! - **Shaping**: [`project`], [`distinct`], [`limit`]

pub mod distinct;
pub mod filter;
pub mod graph;
pub mod join;
pub mod limit;
pub mod project;
pub mod scan;
pub mod seed;
pub mod set_ops;
pub mod sort;
pub mod values;

pub use distinct::DistinctIter;
pub use filter::FilterIter;
pub use graph::{DatasetNamesIter, GraphIter};
pub use join::{JoinKind, NestedLoopJoinIter, OptionalIndexIter};
pub use limit::SliceIter;
pub use project::ProjectIter;
pub use scan::{GraphSlot, PatternScanIter};
pub use seed::{BindingsIter, ReplayIter, SharedSeed};
pub use set_ops::ConcatIter;
pub use sort::{compare_terms, OrderIter};
pub use values::TableIter;
