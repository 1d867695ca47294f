//! Pattern scan operator.

use quarry_core::{Binding, Quad, Term, TermPattern, TriplePattern, Variable};
use tracing::trace;

use crate::dataset::{GraphTarget, QuadCursor};
use crate::error::ExecResult;
use crate::exec::context::{ActiveGraph, ExecutionContext};
use crate::exec::iterator::{BoxedIter, IterBase, IterState, QueryIterator};

/// Where a pattern scan looks for quads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphSlot {
    /// The default graph.
    Default,
    /// One fixed named graph.
    Named(Term),
    /// Any named graph, binding its name to the variable.
    Variable(Variable),
}

impl GraphSlot {
    /// The slot for a plain basic graph pattern under `active`.
    #[must_use]
    pub fn from_active(active: &ActiveGraph) -> Self {
        match active {
            ActiveGraph::Default => Self::Default,
            ActiveGraph::Named(name) => Self::Named(name.clone()),
        }
    }

    /// The slot for an explicit graph term or variable.
    #[must_use]
    pub fn from_pattern(graph: &TermPattern) -> Self {
        match graph {
            TermPattern::Term(name) => Self::Named(name.clone()),
            TermPattern::Variable(var) => Self::Variable(var.clone()),
        }
    }
}

/// Matches one triple pattern per input binding.
///
/// For each input binding the pattern's variables are substituted with
/// their bound values and the dataset is probed; every matching quad
/// extends the input binding. A basic graph pattern compiles to a chain of
/// these, one per triple pattern, each seeded by the previous one.
pub struct PatternScanIter {
    /// Base iterator state.
    base: IterBase,
    /// Input bindings.
    input: BoxedIter,
    /// The pattern to match.
    pattern: TriplePattern,
    /// Graph scope.
    graph: GraphSlot,
    /// Dataset access and statistics.
    ctx: ExecutionContext,
    /// The input binding being extended.
    current: Option<Binding>,
    /// Open dataset scan for `current`.
    cursor: Option<QuadCursor>,
}

impl PatternScanIter {
    /// Creates a scan of `pattern` seeded by `input`.
    #[must_use]
    pub fn new(
        input: BoxedIter,
        pattern: TriplePattern,
        graph: GraphSlot,
        ctx: ExecutionContext,
    ) -> Self {
        Self { base: IterBase::new(), input, pattern, graph, ctx, current: None, cursor: None }
    }

    fn open_cursor(&self, row: &Binding) -> ExecResult<QuadCursor> {
        let [s, p, o] = self.pattern.positions().map(|pos| resolve(pos, row));
        let target = match &self.graph {
            GraphSlot::Default => GraphTarget::Default,
            GraphSlot::Named(name) => GraphTarget::Named(name),
            GraphSlot::Variable(var) => row.get(var).map_or(GraphTarget::AnyNamed, GraphTarget::Named),
        };
        Ok(self.ctx.dataset().quads_for_pattern(s, p, o, target)?)
    }

    /// Extends the current binding with a matched quad. `None` when the
    /// quad conflicts with the binding or the pattern.
    fn bind(&self, quad: &Quad) -> Option<Binding> {
        let mut row = self.current.clone()?;
        for (pos, term) in self.pattern.positions().into_iter().zip(quad.spo()) {
            match pos {
                TermPattern::Variable(var) => row = row.extend(var.clone(), term.clone()).ok()?,
                TermPattern::Term(expected) if expected != term => return None,
                TermPattern::Term(_) => {}
            }
        }
        if let GraphSlot::Variable(var) = &self.graph {
            let name = quad.graph_name.clone()?;
            row = row.extend(var.clone(), name).ok()?;
        }
        Some(row)
    }

    fn release(&mut self) {
        self.input.close();
        self.cursor = None;
        self.current = None;
    }
}

fn resolve<'a>(pos: &'a TermPattern, row: &'a Binding) -> Option<&'a Term> {
    match pos {
        TermPattern::Term(term) => Some(term),
        TermPattern::Variable(var) => row.get(var),
    }
}

impl QueryIterator for PatternScanIter {
    fn next(&mut self) -> ExecResult<Option<Binding>> {
        if self.base.is_done() {
            return Ok(None);
        }
        self.base.set_active();

        loop {
            if let Some(cursor) = self.cursor.as_mut() {
                match cursor.next() {
                    Some(quad) => {
                        let quad = quad?;
                        self.ctx.record_rows_scanned(1);
                        if let Some(row) = self.bind(&quad) {
                            self.base.inc_rows_produced();
                            return Ok(Some(row));
                        }
                        continue;
                    }
                    None => {
                        self.cursor = None;
                        self.current = None;
                    }
                }
            }

            self.ctx.check_cancelled()?;
            match self.input.next()? {
                Some(row) => {
                    self.cursor = Some(self.open_cursor(&row)?);
                    self.current = Some(row);
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
        if !self.base.state().is_closed() {
            trace!(pattern = %self.pattern, produced = self.base.rows_produced(), "closing scan");
        }
        self.release();
        self.base.set_closed();
    }

    fn state(&self) -> IterState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "PatternScan"
    }
}
