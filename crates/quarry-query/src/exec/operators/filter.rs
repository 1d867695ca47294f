//! Filter operator for expression evaluation.

use quarry_core::Binding;
use tracing::trace;

use crate::algebra::Expr;
use crate::error::ExecResult;
use crate::exec::context::ExecutionContext;
use crate::exec::iterator::{BoxedIter, IterBase, IterState, QueryIterator};

/// Filter operator.
///
/// Evaluates an expression for each input binding and only passes through
/// bindings where it evaluates to true. An evaluation error excludes the
/// binding; it never fails the pipeline.
pub struct FilterIter {
    /// Base iterator state.
    base: IterBase,
    /// The condition.
    expr: Expr,
    /// Input bindings.
    input: BoxedIter,
    /// Evaluator and statistics.
    ctx: ExecutionContext,
}

impl FilterIter {
    /// Creates a new filter operator.
    #[must_use]
    pub fn new(input: BoxedIter, expr: Expr, ctx: ExecutionContext) -> Self {
        Self { base: IterBase::new(), expr, input, ctx }
    }

    /// Returns the condition.
    #[must_use]
    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

/// Evaluates `expr` as a row condition: errors count as false.
pub(crate) fn passes(ctx: &ExecutionContext, expr: &Expr, row: &Binding) -> bool {
    match ctx.evaluator().evaluate_bool(expr, row) {
        Ok(keep) => keep,
        Err(e) => {
            trace!(error = %e, expr = %expr, "filter evaluation failed, excluding row");
            false
        }
    }
}

impl QueryIterator for FilterIter {
    fn next(&mut self) -> ExecResult<Option<Binding>> {
        if self.base.is_done() {
            return Ok(None);
        }
        self.base.set_active();

        loop {
            match self.input.next()? {
                Some(row) => {
                    if passes(&self.ctx, &self.expr, &row) {
                        self.base.inc_rows_produced();
                        return Ok(Some(row));
                    }
                    self.ctx.record_rows_filtered(1);
                }
                None => {
                    self.input.close();
                    self.base.set_exhausted();
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
        "Filter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::iterator::drain;
    use crate::exec::operators::seed::BindingsIter;
    use quarry_core::{Term, Variable};

    fn make_input() -> BoxedIter {
        let rows = vec![
            Binding::from_pairs([(Variable::new("n"), Term::integer(1))]),
            Binding::from_pairs([(Variable::new("n"), Term::integer(5))]),
            Binding::empty(),
            Binding::from_pairs([(Variable::new("n"), Term::integer(9))]),
        ];
        Box::new(BindingsIter::new(rows))
    }

    #[test]
    fn filter_keeps_true_rows() {
        let ctx = ExecutionContext::default();
        let mut filter =
            FilterIter::new(make_input(), Expr::var("n").gt(Expr::integer(3)), ctx.clone());
        let rows = drain(&mut filter).unwrap();

        assert_eq!(rows.len(), 2);
        assert!(filter.state().is_closed());
        // One false, one unbound.
        assert_eq!(ctx.stats().rows_filtered(), 2);
    }

    #[test]
    fn filter_error_excludes_row() {
        let ctx = ExecutionContext::default();
        let mut filter = FilterIter::new(make_input(), Expr::call("nope", vec![]), ctx);
        assert!(drain(&mut filter).unwrap().is_empty());
    }
}
