//! Inline table operator.

use quarry_core::Binding;

use crate::error::ExecResult;
use crate::exec::iterator::{BoxedIter, IterBase, IterState, QueryIterator};

/// Joins each input binding with the table rows it is compatible with.
///
/// Under the identity seed this yields the table rows in order.
pub struct TableIter {
    /// Base iterator state.
    base: IterBase,
    /// Input bindings.
    input: BoxedIter,
    /// Table rows.
    rows: Vec<Binding>,
    /// The input binding being joined.
    current: Option<Binding>,
    /// Next table row to try.
    position: usize,
}

impl TableIter {
    /// Creates a new table operator.
    #[must_use]
    pub fn new(input: BoxedIter, rows: Vec<Binding>) -> Self {
        Self { base: IterBase::new(), input, rows, current: None, position: 0 }
    }

    fn finish(&mut self) {
        self.input.close();
        self.current = None;
        self.base.set_exhausted();
    }
}

impl QueryIterator for TableIter {
    fn next(&mut self) -> ExecResult<Option<Binding>> {
        if self.base.is_done() {
            return Ok(None);
        }
        self.base.set_active();

        if self.rows.is_empty() {
            self.finish();
            return Ok(None);
        }

        loop {
            if let Some(seed) = &self.current {
                while self.position < self.rows.len() {
                    let row = &self.rows[self.position];
                    self.position += 1;
                    if let Ok(merged) = seed.merge(row) {
                        self.base.inc_rows_produced();
                        return Ok(Some(merged));
                    }
                }
                self.current = None;
            }

            match self.input.next()? {
                Some(seed) => {
                    self.current = Some(seed);
                    self.position = 0;
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
        self.current = None;
        self.base.set_closed();
    }

    fn state(&self) -> IterState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "Table"
    }
}
