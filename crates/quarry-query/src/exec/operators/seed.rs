//! Seed iterators.
//!
//! Every compiled pipeline starts from a seed: the identity row at the root,
//! a single binding when a subtree is re-evaluated per input row, or a
//! replayable buffer when two union branches consume the same input.

use std::sync::{Arc, Mutex};
use std::vec;

use quarry_core::Binding;
use tracing::trace;

use crate::error::{ExecError, ExecResult};
use crate::exec::iterator::{check_buffer_limit, BoxedIter, IterBase, IterState, QueryIterator};

/// Yields a fixed list of bindings.
pub struct BindingsIter {
    /// Base iterator state.
    base: IterBase,
    /// Remaining rows.
    rows: vec::IntoIter<Binding>,
}

impl BindingsIter {
    /// Creates an iterator over `rows`.
    #[must_use]
    pub fn new(rows: Vec<Binding>) -> Self {
        Self { base: IterBase::new(), rows: rows.into_iter() }
    }

    /// One row.
    #[must_use]
    pub fn singleton(row: Binding) -> Self {
        Self::new(vec![row])
    }

    /// The identity seed: one empty row.
    #[must_use]
    pub fn identity() -> Self {
        Self::singleton(Binding::empty())
    }
}

impl QueryIterator for BindingsIter {
    fn next(&mut self) -> ExecResult<Option<Binding>> {
        if self.base.is_done() {
            return Ok(None);
        }
        self.base.set_active();
        match self.rows.next() {
            Some(row) => {
                self.base.inc_rows_produced();
                Ok(Some(row))
            }
            None => {
                self.base.set_exhausted();
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.rows = Vec::new().into_iter();
        self.base.set_closed();
    }

    fn state(&self) -> IterState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "Bindings"
    }
}

struct SharedState {
    input: BoxedIter,
    buffer: Vec<Binding>,
    input_done: bool,
    open_readers: usize,
    max_rows_in_memory: usize,
}

/// An input stream that several readers replay from the start.
///
/// Rows are pulled from the input on demand and buffered; each reader keeps
/// its own position. The input is closed once every reader has closed.
pub struct SharedSeed {
    state: Arc<Mutex<SharedState>>,
}

impl SharedSeed {
    /// Wraps `input` for shared replay.
    #[must_use]
    pub fn new(input: BoxedIter, max_rows_in_memory: usize) -> Self {
        let state = SharedState {
            input,
            buffer: Vec::new(),
            input_done: false,
            open_readers: 0,
            max_rows_in_memory,
        };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    /// Creates a reader positioned at the first row.
    pub fn reader(&self) -> ExecResult<ReplayIter> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ExecError::Internal("shared seed lock poisoned".into()))?;
        state.open_readers += 1;
        Ok(ReplayIter { base: IterBase::new(), state: Arc::clone(&self.state), position: 0 })
    }
}

/// One reader of a [`SharedSeed`].
pub struct ReplayIter {
    /// Base iterator state.
    base: IterBase,
    /// Shared buffer and input.
    state: Arc<Mutex<SharedState>>,
    /// Index of the next buffered row.
    position: usize,
}

impl QueryIterator for ReplayIter {
    fn next(&mut self) -> ExecResult<Option<Binding>> {
        if self.base.is_done() {
            return Ok(None);
        }
        self.base.set_active();

        let mut state = self
            .state
            .lock()
            .map_err(|_| ExecError::Internal("shared seed lock poisoned".into()))?;

        if self.position >= state.buffer.len() && !state.input_done {
            match state.input.next()? {
                Some(row) => {
                    state.buffer.push(row);
                    check_buffer_limit(state.buffer.len(), state.max_rows_in_memory)?;
                }
                None => state.input_done = true,
            }
        }

        match state.buffer.get(self.position) {
            Some(row) => {
                self.position += 1;
                self.base.inc_rows_produced();
                Ok(Some(row.clone()))
            }
            None => {
                self.base.set_exhausted();
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        if self.base.state().is_closed() {
            return;
        }
        self.base.set_closed();
        if let Ok(mut state) = self.state.lock() {
            state.open_readers = state.open_readers.saturating_sub(1);
            if state.open_readers == 0 {
                trace!(buffered = state.buffer.len(), "closing shared seed");
                state.input.close();
                state.buffer.clear();
            }
        }
    }

    fn state(&self) -> IterState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "Replay"
    }
}
