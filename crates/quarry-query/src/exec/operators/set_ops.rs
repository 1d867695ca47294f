//! Union operator.

use quarry_core::Binding;

use crate::error::ExecResult;
use crate::exec::iterator::{BoxedIter, IterBase, IterState, QueryIterator};

/// Concatenates its inputs: all rows of the first, then the second, and so
/// on. Duplicates are kept. Each input is closed as soon as it runs dry.
pub struct ConcatIter {
    /// Base iterator state.
    base: IterBase,
    /// Inputs in output order.
    inputs: Vec<BoxedIter>,
    /// Index of the input being read.
    current: usize,
}

impl ConcatIter {
    /// Creates a new concatenation.
    #[must_use]
    pub fn new(inputs: Vec<BoxedIter>) -> Self {
        Self { base: IterBase::new(), inputs, current: 0 }
    }
}

impl QueryIterator for ConcatIter {
    fn next(&mut self) -> ExecResult<Option<Binding>> {
        if self.base.is_done() {
            return Ok(None);
        }
        self.base.set_active();

        while let Some(input) = self.inputs.get_mut(self.current) {
            if let Some(row) = input.next()? {
                self.base.inc_rows_produced();
                return Ok(Some(row));
            }
            input.close();
            self.current += 1;
        }

        self.base.set_exhausted();
        Ok(None)
    }

    fn close(&mut self) {
        for input in &mut self.inputs {
            input.close();
        }
        self.base.set_closed();
    }

    fn state(&self) -> IterState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "Concat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::iterator::drain;
    use crate::exec::operators::seed::BindingsIter;
    use quarry_core::{Term, Variable};

    fn row(n: i64) -> Binding {
        Binding::from_pairs([(Variable::new("n"), Term::integer(n))])
    }

    #[test]
    fn concat_keeps_order_and_duplicates() {
        let a = BindingsIter::new(vec![row(1), row(2)]);
        let b = BindingsIter::new(vec![row(2), row(3)]);
        let mut union = ConcatIter::new(vec![Box::new(a), Box::new(b)]);
        assert_eq!(drain(&mut union).unwrap(), vec![row(1), row(2), row(2), row(3)]);
    }

    #[test]
    fn empty_union() {
        let mut union = ConcatIter::new(vec![]);
        assert_eq!(union.next().unwrap(), None);
        assert!(union.state().is_exhausted());
    }

    #[test]
    fn close_closes_every_input() {
        let a = BindingsIter::new(vec![row(1)]);
        let b = BindingsIter::new(vec![row(2)]);
        let mut union = ConcatIter::new(vec![Box::new(a), Box::new(b)]);
        assert!(union.next().unwrap().is_some());
        union.close();
        assert!(union.inputs.iter().all(|i| i.state().is_closed()));
    }
}
