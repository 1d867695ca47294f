//! Join operators for combining bindings from two inputs.

use std::sync::Arc;

use quarry_core::Binding;

use crate::algebra::{Expr, Op};
use crate::error::ExecResult;
use crate::exec::compiler::{compile, Seed};
use crate::exec::context::ExecutionContext;
use crate::exec::iterator::{check_buffer_limit, BoxedIter, IterBase, IterState, QueryIterator};
use crate::exec::operators::filter::passes;
use crate::exec::operators::seed::BindingsIter;

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Only compatible pairs.
    Inner,
    /// Compatible pairs, plus each left row that has none.
    Left,
}

/// Nested loop join operator.
///
/// Materializes the right input once, then streams the left input and
/// merges every left binding with each compatible right binding. Pairs that
/// disagree on a shared variable produce nothing. For a left join, a left
/// binding with no surviving pair is emitted on its own.
pub struct NestedLoopJoinIter {
    /// Base iterator state.
    base: IterBase,
    /// Join type.
    kind: JoinKind,
    /// Condition over merged bindings.
    filter: Option<Expr>,
    /// Left (outer) input.
    left: BoxedIter,
    /// Right (inner) input.
    right: BoxedIter,
    /// Materialized right rows.
    right_rows: Vec<Binding>,
    /// Current left row.
    current_left: Option<Binding>,
    /// Current position in right rows.
    right_position: usize,
    /// Whether we've matched current left row.
    matched_left: bool,
    /// Whether right is materialized.
    right_materialized: bool,
    /// Evaluator and row limit.
    ctx: ExecutionContext,
}

impl NestedLoopJoinIter {
    /// Creates a new nested loop join operator.
    #[must_use]
    pub fn new(
        kind: JoinKind,
        filter: Option<Expr>,
        left: BoxedIter,
        right: BoxedIter,
        ctx: ExecutionContext,
    ) -> Self {
        Self {
            base: IterBase::new(),
            kind,
            filter,
            left,
            right,
            right_rows: Vec::new(),
            current_left: None,
            right_position: 0,
            matched_left: false,
            right_materialized: false,
            ctx,
        }
    }

    /// Returns the join type.
    #[must_use]
    pub const fn kind(&self) -> JoinKind {
        self.kind
    }

    fn materialize_right(&mut self) -> ExecResult<()> {
        let limit = self.ctx.max_rows_in_memory();
        while let Some(row) = self.right.next()? {
            self.right_rows.push(row);
            check_buffer_limit(self.right_rows.len(), limit)?;
        }
        self.right.close();
        self.right_materialized = true;
        Ok(())
    }

    fn finish(&mut self) {
        self.left.close();
        self.right.close();
        self.right_rows.clear();
        self.current_left = None;
        self.base.set_exhausted();
    }
}

impl QueryIterator for NestedLoopJoinIter {
    fn next(&mut self) -> ExecResult<Option<Binding>> {
        if self.base.is_done() {
            return Ok(None);
        }
        self.base.set_active();

        if !self.right_materialized {
            self.materialize_right()?;
            if self.kind == JoinKind::Inner && self.right_rows.is_empty() {
                self.finish();
                return Ok(None);
            }
        }

        loop {
            if self.current_left.is_none() {
                match self.left.next()? {
                    Some(row) => {
                        self.current_left = Some(row);
                        self.right_position = 0;
                        self.matched_left = false;
                    }
                    None => {
                        self.finish();
                        return Ok(None);
                    }
                }
            }

            if let Some(left_row) = &self.current_left {
                while self.right_position < self.right_rows.len() {
                    let right_row = &self.right_rows[self.right_position];
                    self.right_position += 1;

                    let Ok(merged) = left_row.merge(right_row) else {
                        continue;
                    };
                    if self.filter.as_ref().map_or(true, |f| passes(&self.ctx, f, &merged)) {
                        self.matched_left = true;
                        self.base.inc_rows_produced();
                        return Ok(Some(merged));
                    }
                }

                if self.kind == JoinKind::Left && !self.matched_left {
                    self.matched_left = true;
                    self.base.inc_rows_produced();
                    return Ok(Some(left_row.clone()));
                }
            }

            self.current_left = None;
        }
    }

    fn close(&mut self) {
        self.left.close();
        self.right.close();
        self.right_rows.clear();
        self.current_left = None;
        self.base.set_closed();
    }

    fn state(&self) -> IterState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "NestedLoopJoin"
    }
}

/// Optional join by per-binding probing.
///
/// For every left binding the optional pattern is compiled afresh with that
/// binding as its only seed, so the scan sees the left values as constants.
/// Probe results that pass the filter are emitted; when none do, the left
/// binding is emitted alone.
pub struct OptionalIndexIter {
    /// Base iterator state.
    base: IterBase,
    /// Left input.
    input: BoxedIter,
    /// The optional pattern.
    right: Arc<Op>,
    /// Condition over merged bindings.
    filter: Option<Expr>,
    /// Compilation context for probes.
    ctx: ExecutionContext,
    /// The left binding being probed.
    current: Option<Binding>,
    /// The open probe for `current`.
    probe: Option<BoxedIter>,
    /// Whether the current probe produced a row.
    matched: bool,
}

impl OptionalIndexIter {
    /// Creates a new optional probe join.
    #[must_use]
    pub fn new(
        input: BoxedIter,
        right: Arc<Op>,
        filter: Option<Expr>,
        ctx: ExecutionContext,
    ) -> Self {
        Self {
            base: IterBase::new(),
            input,
            right,
            filter,
            ctx,
            current: None,
            probe: None,
            matched: false,
        }
    }

    fn release(&mut self) {
        self.input.close();
        if let Some(probe) = self.probe.as_mut() {
            probe.close();
        }
        self.probe = None;
        self.current = None;
    }
}

impl QueryIterator for OptionalIndexIter {
    fn next(&mut self) -> ExecResult<Option<Binding>> {
        if self.base.is_done() {
            return Ok(None);
        }
        self.base.set_active();

        loop {
            if let Some(probe) = self.probe.as_mut() {
                match probe.next()? {
                    Some(row) => {
                        if self.filter.as_ref().map_or(true, |f| passes(&self.ctx, f, &row)) {
                            self.matched = true;
                            self.base.inc_rows_produced();
                            return Ok(Some(row));
                        }
                        continue;
                    }
                    None => {
                        probe.close();
                        self.probe = None;
                        let unmatched = self.current.take().filter(|_| !self.matched);
                        if let Some(left) = unmatched {
                            self.base.inc_rows_produced();
                            return Ok(Some(left));
                        }
                    }
                }
            }

            match self.input.next()? {
                Some(left) => {
                    let seed = Seed::Input(Box::new(BindingsIter::singleton(left.clone())));
                    self.probe = Some(compile(&self.right, seed, &self.ctx)?);
                    self.current = Some(left);
                    self.matched = false;
                }
                None => {
                    self.release();
                    self.base.set_exhausted();
                    return Ok(None);
                }
            }
        }
    }

    fn close(&mut self) {
        self.release();
        self.base.set_closed();
    }

    fn state(&self) -> IterState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "OptionalIndex"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MemoryDataset;
    use crate::error::ExecError;
    use crate::exec::context::ExecutionConfig;
    use crate::exec::iterator::drain;
    use quarry_core::{Term, TriplePattern, Variable};

    fn row(pairs: &[(&str, i64)]) -> Binding {
        pairs.iter().map(|(v, n)| (Variable::new(*v), Term::integer(*n))).collect()
    }

    fn input(rows: Vec<Binding>) -> BoxedIter {
        Box::new(BindingsIter::new(rows))
    }

    #[test]
    fn inner_join_merges_compatible_pairs() {
        let left = input(vec![row(&[("a", 1)]), row(&[("a", 2)])]);
        let right = input(vec![row(&[("a", 1), ("b", 10)]), row(&[("a", 3), ("b", 30)])]);
        let mut join =
            NestedLoopJoinIter::new(JoinKind::Inner, None, left, right, ExecutionContext::default());

        assert_eq!(drain(&mut join).unwrap(), vec![row(&[("a", 1), ("b", 10)])]);
        assert_eq!(join.kind(), JoinKind::Inner);
    }

    #[test]
    fn left_join_keeps_unmatched() {
        let left = input(vec![row(&[("a", 1)]), row(&[("a", 2)])]);
        let right = input(vec![row(&[("a", 1), ("b", 10)]), row(&[("a", 1), ("b", 11)])]);
        let mut join =
            NestedLoopJoinIter::new(JoinKind::Left, None, left, right, ExecutionContext::default());

        assert_eq!(
            drain(&mut join).unwrap(),
            vec![row(&[("a", 1), ("b", 10)]), row(&[("a", 1), ("b", 11)]), row(&[("a", 2)])]
        );
    }

    #[test]
    fn left_join_filter_applies_to_merged_rows() {
        let left = input(vec![row(&[("a", 1)])]);
        let right = input(vec![row(&[("b", 5)]), row(&[("b", 50)])]);
        let filter = Expr::var("b").gt(Expr::integer(10));
        let mut join = NestedLoopJoinIter::new(
            JoinKind::Left,
            Some(filter),
            left,
            right,
            ExecutionContext::default(),
        );
        assert_eq!(drain(&mut join).unwrap(), vec![row(&[("a", 1), ("b", 50)])]);
    }

    #[test]
    fn right_side_is_bounded() {
        let ctx = ExecutionContext::default()
            .with_config(ExecutionConfig::new().with_max_rows_in_memory(1));
        let left = input(vec![row(&[("a", 1)])]);
        let right = input(vec![row(&[("b", 1)]), row(&[("b", 2)])]);
        let mut join = NestedLoopJoinIter::new(JoinKind::Inner, None, left, right, ctx);
        assert!(matches!(join.next(), Err(ExecError::QueryTooLarge { .. })));
    }

    #[test]
    fn optional_probe() {
        let ex = |s: &str| Term::iri(format!("http://ex/{s}"));
        let mut ds = MemoryDataset::new();
        ds.insert(ex("a"), ex("p2"), ex("x"));
        let ctx = ExecutionContext::new(Arc::new(ds));

        let left = input(vec![
            Binding::from_pairs([(Variable::new("s"), ex("a"))]),
            Binding::from_pairs([(Variable::new("s"), ex("b"))]),
        ]);
        let right = Arc::new(Op::bgp(vec![TriplePattern::new(
            Variable::new("s"),
            ex("p2"),
            Variable::new("o"),
        )]));
        let mut join = OptionalIndexIter::new(left, right, None, ctx);
        let rows = drain(&mut join).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(&Variable::new("o")), Some(&ex("x")));
        assert_eq!(rows[1], Binding::from_pairs([(Variable::new("s"), ex("b"))]));
        assert!(join.state().is_closed());
    }
}
