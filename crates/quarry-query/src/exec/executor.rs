//! Query execution driver.
//!
//! This module provides [`QueryExecution`], which compiles an operator tree
//! at the root with the identity seed and pulls bindings from the result.

use quarry_core::Binding;
use tracing::{debug, trace};

use crate::algebra::Op;
use crate::error::{ExecError, ExecResult};

use super::compiler::{compile, Seed};
use super::context::ExecutionContext;
use super::iterator::{BoxedIter, IterState};

/// A running query.
///
/// Owns the root iterator and closes it when the results run out, when an
/// error surfaces, when cancellation is observed, or on drop.
pub struct QueryExecution {
    /// The root of the compiled iterator chain.
    root: BoxedIter,
    /// Execution context.
    ctx: ExecutionContext,
    /// Whether the root has been closed.
    closed: bool,
}

impl QueryExecution {
    /// Compiles `op` against the identity seed.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::UnsupportedOperator`] if the tree contains an
    /// extension without a registered realization.
    pub fn new(op: &Op, ctx: ExecutionContext) -> ExecResult<Self> {
        debug!(plan = %op.display_tree(), "compiling query");
        let root = compile(op, Seed::Identity, &ctx)?;
        Ok(Self { root, ctx, closed: false })
    }

    /// Returns the next binding, or `None` if there are no more.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Cancelled`] once the context is cancelled, and
    /// propagates dataset and resource errors. The pipeline is closed before
    /// any error is returned.
    pub fn next(&mut self) -> ExecResult<Option<Binding>> {
        if self.closed {
            return Ok(None);
        }

        if self.ctx.is_cancelled() {
            self.close();
            return Err(ExecError::Cancelled);
        }

        match self.root.next() {
            Ok(Some(row)) => {
                self.ctx.record_rows_produced(1);
                Ok(Some(row))
            }
            Ok(None) => {
                self.close();
                Ok(None)
            }
            Err(e) => {
                debug!(error = %e, "query failed");
                self.close();
                Err(e)
            }
        }
    }

    /// Closes the pipeline. Safe to call more than once.
    pub fn close(&mut self) {
        if !self.closed {
            trace!(root = self.root.name(), "closing query");
            self.root.close();
            self.closed = true;
        }
    }

    /// Returns the execution context.
    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Returns the state of the root iterator.
    #[must_use]
    pub fn state(&self) -> IterState {
        self.root.state()
    }

    /// Drives the query to completion and returns every binding.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while pulling.
    pub fn collect(&mut self) -> ExecResult<Vec<Binding>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Counts the result bindings without keeping them.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while pulling.
    pub fn count(&mut self) -> ExecResult<usize> {
        let mut count = 0;
        while self.next()?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    /// Returns the first binding, if any, and closes the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the error raised while pulling the first binding.
    pub fn first(&mut self) -> ExecResult<Option<Binding>> {
        let row = self.next()?;
        self.close();
        Ok(row)
    }
}

impl Drop for QueryExecution {
    fn drop(&mut self) {
        self.close();
    }
}

/// Compiles and runs `op`, collecting every binding.
///
/// # Errors
///
/// Returns compilation errors and the first error raised while pulling.
pub fn execute(op: &Op, ctx: ExecutionContext) -> ExecResult<Vec<Binding>> {
    QueryExecution::new(op, ctx)?.collect()
}
