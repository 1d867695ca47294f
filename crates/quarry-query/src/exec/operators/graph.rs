//! Named graph operators.

use std::sync::Arc;
use std::vec;

use quarry_core::{Binding, Term, TermPattern, Variable};

use crate::algebra::Op;
use crate::error::ExecResult;
use crate::exec::compiler::{compile, Seed};
use crate::exec::context::{ActiveGraph, ExecutionContext};
use crate::exec::iterator::{BoxedIter, IterBase, IterState, QueryIterator};
use crate::exec::operators::seed::BindingsIter;

/// Fetches the dataset's graph names once and caches them.
fn load_names<'a>(
    names: &'a mut Option<Vec<Term>>,
    ctx: &ExecutionContext,
) -> ExecResult<&'a [Term]> {
    if names.is_none() {
        *names = Some(ctx.dataset().graph_names()?);
    }
    Ok(names.as_deref().unwrap_or_default())
}

/// Evaluates a subtree once per named graph, binding the graph variable.
///
/// For every input binding the candidate graphs are the binding's value for
/// the variable when it is bound (if that names a graph), or every named
/// graph otherwise. The subtree is compiled per candidate with the input
/// binding plus the graph name as its seed, scoped to that graph.
pub struct GraphIter {
    /// Base iterator state.
    base: IterBase,
    /// Input bindings.
    input: BoxedIter,
    /// The graph variable.
    var: Variable,
    /// The scoped subtree.
    sub: Arc<Op>,
    /// Compilation context for the subtree.
    ctx: ExecutionContext,
    /// Cached graph names.
    names: Option<Vec<Term>>,
    /// The input binding being expanded.
    current: Option<Binding>,
    /// Graphs left to try for `current`.
    candidates: vec::IntoIter<Term>,
    /// The subtree evaluation for the current graph.
    inner: Option<BoxedIter>,
}

impl GraphIter {
    /// Creates a new graph operator.
    #[must_use]
    pub fn new(input: BoxedIter, var: Variable, sub: Arc<Op>, ctx: ExecutionContext) -> Self {
        Self {
            base: IterBase::new(),
            input,
            var,
            sub,
            ctx,
            names: None,
            current: None,
            candidates: Vec::new().into_iter(),
            inner: None,
        }
    }

    fn release(&mut self) {
        self.input.close();
        if let Some(inner) = self.inner.as_mut() {
            inner.close();
        }
        self.inner = None;
        self.current = None;
        self.candidates = Vec::new().into_iter();
    }
}

impl QueryIterator for GraphIter {
    fn next(&mut self) -> ExecResult<Option<Binding>> {
        if self.base.is_done() {
            return Ok(None);
        }
        self.base.set_active();

        loop {
            if let Some(inner) = self.inner.as_mut() {
                if let Some(row) = inner.next()? {
                    self.base.inc_rows_produced();
                    return Ok(Some(row));
                }
                inner.close();
                self.inner = None;
            }

            if let Some(row) = &self.current {
                if let Some(name) = self.candidates.next() {
                    let Ok(seeded) = row.extend(self.var.clone(), name.clone()) else {
                        continue;
                    };
                    let scoped = self.ctx.with_active_graph(ActiveGraph::Named(name));
                    let seed = Seed::Input(Box::new(BindingsIter::singleton(seeded)));
                    self.inner = Some(compile(&self.sub, seed, &scoped)?);
                    continue;
                }
                self.current = None;
            }

            self.ctx.check_cancelled()?;
            match self.input.next()? {
                Some(row) => {
                    let names = load_names(&mut self.names, &self.ctx)?;
                    let candidates: Vec<Term> = match row.get(&self.var) {
                        Some(bound) => names.iter().filter(|n| *n == bound).cloned().collect(),
                        None => names.to_vec(),
                    };
                    self.candidates = candidates.into_iter();
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
        self.release();
        self.base.set_closed();
    }

    fn state(&self) -> IterState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "Graph"
    }
}

/// Enumerates named graphs per input binding.
///
/// With a variable, each input binding is extended with every graph name
/// (only the matching one if the variable is already bound). With a
/// constant, the input binding passes through when that graph exists.
pub struct DatasetNamesIter {
    /// Base iterator state.
    base: IterBase,
    /// Input bindings.
    input: BoxedIter,
    /// Variable to bind or constant to test.
    name: TermPattern,
    /// Dataset access.
    ctx: ExecutionContext,
    /// Cached graph names.
    names: Option<Vec<Term>>,
    /// Output rows for the current input binding.
    pending: vec::IntoIter<Binding>,
}

impl DatasetNamesIter {
    /// Creates a new graph name enumeration.
    #[must_use]
    pub fn new(input: BoxedIter, name: TermPattern, ctx: ExecutionContext) -> Self {
        Self {
            base: IterBase::new(),
            input,
            name,
            ctx,
            names: None,
            pending: Vec::new().into_iter(),
        }
    }
}

impl QueryIterator for DatasetNamesIter {
    fn next(&mut self) -> ExecResult<Option<Binding>> {
        if self.base.is_done() {
            return Ok(None);
        }
        self.base.set_active();

        loop {
            if let Some(row) = self.pending.next() {
                self.base.inc_rows_produced();
                return Ok(Some(row));
            }

            match self.input.next()? {
                Some(row) => {
                    let names = load_names(&mut self.names, &self.ctx)?;
                    let out: Vec<Binding> = match &self.name {
                        TermPattern::Term(name) if names.contains(name) => vec![row],
                        TermPattern::Term(_) => Vec::new(),
                        TermPattern::Variable(var) => names
                            .iter()
                            .filter_map(|n| row.extend(var.clone(), n.clone()).ok())
                            .collect(),
                    };
                    self.pending = out.into_iter();
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
        self.pending = Vec::new().into_iter();
        self.base.set_closed();
    }

    fn state(&self) -> IterState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "DatasetNames"
    }
}
