//! Slice operator for OFFSET and LIMIT.

use quarry_core::Binding;

use crate::error::ExecResult;
use crate::exec::iterator::{BoxedIter, IterBase, IterState, QueryIterator};

/// Slice operator.
///
/// Skips the first `offset` bindings and returns at most `limit` more. Once
/// the limit is reached the input is closed straight away rather than
/// drained.
pub struct SliceIter {
    /// Base iterator state.
    base: IterBase,
    /// Maximum number of rows to return.
    limit: Option<usize>,
    /// Number of rows to skip.
    offset: usize,
    /// Input bindings.
    input: BoxedIter,
    /// Number of rows skipped so far.
    skipped: usize,
    /// Number of rows returned so far.
    returned: usize,
}

impl SliceIter {
    /// Creates a new slice operator.
    #[must_use]
    pub fn new(input: BoxedIter, offset: usize, limit: Option<usize>) -> Self {
        Self { base: IterBase::new(), limit, offset, input, skipped: 0, returned: 0 }
    }

    fn finish(&mut self) {
        self.input.close();
        self.base.set_exhausted();
    }
}

impl QueryIterator for SliceIter {
    fn next(&mut self) -> ExecResult<Option<Binding>> {
        if self.base.is_done() {
            return Ok(None);
        }
        self.base.set_active();

        if self.limit.is_some_and(|limit| self.returned >= limit) {
            self.finish();
            return Ok(None);
        }

        loop {
            match self.input.next()? {
                Some(row) => {
                    if self.skipped < self.offset {
                        self.skipped += 1;
                        continue;
                    }

                    self.returned += 1;
                    self.base.inc_rows_produced();
                    if self.limit.is_some_and(|limit| self.returned >= limit) {
                        // Release the input now; the caller may never ask again.
                        self.input.close();
                    }
                    return Ok(Some(row));
                }
                None => {
                    self.finish();
                    return Ok(None);
                }
            }
        }
    }

    fn close(&mut self) {
        self.input.close();
        self.base.set_closed();
    }

    fn state(&self) -> IterState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "Slice"
    }
}
