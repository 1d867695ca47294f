//! Query iterator trait and base types.
//!
//! This module defines the [`QueryIterator`] trait that every compiled
//! operator implements.

use quarry_core::Binding;

use crate::error::{ExecError, ExecResult};

/// The state of a query iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterState {
    /// Built but no binding requested yet.
    Created,
    /// Producing bindings.
    Active,
    /// No more bindings; inputs have been released.
    Exhausted,
    /// Terminated by `close`.
    Closed,
}

impl IterState {
    /// Returns true if the iterator is producing bindings.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns true if the iterator ran out of bindings.
    #[must_use]
    pub const fn is_exhausted(self) -> bool {
        matches!(self, Self::Exhausted)
    }

    /// Returns true if the iterator was closed.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns true if no further bindings will be produced.
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Exhausted | Self::Closed)
    }
}

/// A single-use, pull-based stream of bindings.
///
/// # Lifecycle
///
/// 1. **Created**: after compilation
/// 2. **Active**: after the first `next()`
/// 3. **Exhausted**: after `next()` returns `None`; inputs are closed
/// 4. **Closed**: after `close()`; resources released
///
/// Once exhausted or closed, `next()` keeps returning `Ok(None)`. `close()`
/// is idempotent and always closes every input the iterator owns. An error
/// from `next()` leaves the iterator in place; its owner closes it.
///
/// # Thread Safety
///
/// The `Send` bound allows a pipeline to be moved to another thread, but
/// iterators are not `Sync`: they hold mutable cursor state.
pub trait QueryIterator: Send {
    /// Returns the next binding, or `None` if there are no more.
    fn next(&mut self) -> ExecResult<Option<Binding>>;

    /// Terminates the iterator and its inputs.
    fn close(&mut self);

    /// Returns the current state.
    fn state(&self) -> IterState;

    /// Returns the name of this iterator type.
    fn name(&self) -> &'static str;
}

/// A boxed query iterator for dynamic dispatch.
pub type BoxedIter = Box<dyn QueryIterator>;

/// Base bookkeeping shared by iterator implementations.
#[derive(Debug)]
pub struct IterBase {
    /// The current state.
    state: IterState,
    /// Number of bindings produced.
    rows_produced: u64,
}

impl IterBase {
    /// Creates a base in the `Created` state.
    #[must_use]
    pub const fn new() -> Self {
        Self { state: IterState::Created, rows_produced: 0 }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> IterState {
        self.state
    }

    /// Moves from `Created` to `Active`. Later states are kept.
    pub fn set_active(&mut self) {
        if self.state == IterState::Created {
            self.state = IterState::Active;
        }
    }

    /// Sets the state to exhausted unless already closed.
    pub fn set_exhausted(&mut self) {
        if self.state != IterState::Closed {
            self.state = IterState::Exhausted;
        }
    }

    /// Sets the state to closed.
    pub fn set_closed(&mut self) {
        self.state = IterState::Closed;
    }

    /// Returns true once no further bindings will be produced.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.state.is_done()
    }

    /// Increments the rows produced counter.
    pub fn inc_rows_produced(&mut self) {
        self.rows_produced += 1;
    }

    /// Returns the number of rows produced.
    #[must_use]
    pub const fn rows_produced(&self) -> u64 {
        self.rows_produced
    }
}

impl Default for IterBase {
    fn default() -> Self {
        Self::new()
    }
}

/// Fails once a buffer grows past `limit` rows (0 means no limit).
pub(crate) fn check_buffer_limit(len: usize, limit: usize) -> ExecResult<()> {
    if limit > 0 && len > limit {
        return Err(ExecError::QueryTooLarge { actual: len, limit });
    }
    Ok(())
}

/// Drains an iterator into a vector, closing it afterwards.
pub fn drain(iter: &mut dyn QueryIterator) -> ExecResult<Vec<Binding>> {
    let mut rows = Vec::new();
    let result = loop {
        match iter.next() {
            Ok(Some(row)) => rows.push(row),
            Ok(None) => break Ok(rows),
            Err(e) => break Err(e),
        }
    };
    iter.close();
    result
}
