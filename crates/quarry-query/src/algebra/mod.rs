//! Query algebra.
//!
//! The algebra is the compiler's input: an immutable tree of [`Op`] nodes
//! whose filters and sort keys are [`Expr`] trees.

pub mod expr;
pub mod op;

pub use expr::{CompareOp, Expr};
pub use op::{Op, OpExtension, SortDirection, SortKey, Table};
