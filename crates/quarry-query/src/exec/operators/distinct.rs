//! Duplicate elimination operator.

use std::collections::HashSet;

use quarry_core::Binding;

use crate::error::ExecResult;
use crate::exec::iterator::{check_buffer_limit, BoxedIter, IterBase, IterState, QueryIterator};

/// Yields the first occurrence of each distinct binding, in input order.
///
/// Streams: a binding is emitted as soon as it is seen for the first time.
/// Every distinct binding is remembered, so the seen-set is bounded by
/// `max_rows_in_memory`.
pub struct DistinctIter {
    /// Base iterator state.
    base: IterBase,
    /// Input bindings.
    input: BoxedIter,
    /// Bindings already emitted.
    seen: HashSet<Binding>,
    /// Maximum rows allowed in memory (0 = no limit).
    max_rows_in_memory: usize,
}

impl DistinctIter {
    /// Creates a new distinct operator.
    #[must_use]
    pub fn new(input: BoxedIter, max_rows_in_memory: usize) -> Self {
        Self { base: IterBase::new(), input, seen: HashSet::new(), max_rows_in_memory }
    }
}

impl QueryIterator for DistinctIter {
    fn next(&mut self) -> ExecResult<Option<Binding>> {
        if self.base.is_done() {
            return Ok(None);
        }
        self.base.set_active();

        loop {
            match self.input.next()? {
                Some(row) => {
                    if self.seen.contains(&row) {
                        continue;
                    }
                    self.seen.insert(row.clone());
                    check_buffer_limit(self.seen.len(), self.max_rows_in_memory)?;
                    self.base.inc_rows_produced();
                    return Ok(Some(row));
                }
                None => {
                    self.input.close();
                    self.seen.clear();
                    self.base.set_exhausted();
                    return Ok(None);
                }
            }
        }
    }

    fn close(&mut self) {
        self.input.close();
        self.seen.clear();
        self.base.set_closed();
    }

    fn state(&self) -> IterState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "Distinct"
    }
}
