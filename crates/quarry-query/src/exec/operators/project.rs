//! Projection operator.

use quarry_core::{Binding, Variable};

use crate::error::ExecResult;
use crate::exec::iterator::{BoxedIter, IterBase, IterState, QueryIterator};

/// Restricts each input binding to a list of variables.
///
/// Does not remove duplicates that the restriction creates.
pub struct ProjectIter {
    /// Base iterator state.
    base: IterBase,
    /// Variables to keep.
    vars: Vec<Variable>,
    /// Input bindings.
    input: BoxedIter,
}

impl ProjectIter {
    /// Creates a new projection operator.
    #[must_use]
    pub fn new(input: BoxedIter, vars: Vec<Variable>) -> Self {
        Self { base: IterBase::new(), vars, input }
    }
}

impl QueryIterator for ProjectIter {
    fn next(&mut self) -> ExecResult<Option<Binding>> {
        if self.base.is_done() {
            return Ok(None);
        }
        self.base.set_active();

        match self.input.next()? {
            Some(row) => {
                self.base.inc_rows_produced();
                Ok(Some(row.project(&self.vars)))
            }
            None => {
                self.input.close();
                self.base.set_exhausted();
                Ok(None)
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
        "Project"
    }
}
