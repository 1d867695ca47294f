//! Operator-to-iterator compiler.
//!
//! [`compile`] walks an [`Op`] tree and returns the iterator chain that
//! evaluates it. The input flowing into each node is passed down as a
//! [`Seed`]: at the root it is the identity (one empty binding); inside a
//! join it is the left side's output, so the right side is evaluated by
//! substitution. Nodes whose meaning depends on seeing their whole input
//! (see [`Op::is_seedable`]) are compiled against the identity instead and
//! joined with their seed afterwards.
//!
//! The context is passed explicitly; graph scoping derives a new context for
//! the scoped subtree and never mutates the caller's.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use quarry_core::{TermPattern, TriplePattern};
use tracing::{debug, trace, warn};

use crate::algebra::{Expr, Op, OpExtension};
use crate::error::{ExecError, ExecResult};

use super::context::{ActiveGraph, ExecutionContext, LeftJoinStrategy};
use super::iterator::BoxedIter;
use super::operators::{
    BindingsIter, ConcatIter, DatasetNamesIter, DistinctIter, FilterIter, GraphIter, GraphSlot,
    JoinKind, NestedLoopJoinIter, OptionalIndexIter, OrderIter, PatternScanIter, ProjectIter,
    SharedSeed, SliceIter, TableIter,
};

/// The input a subtree is compiled against.
pub enum Seed {
    /// A single empty binding.
    Identity,
    /// Bindings produced upstream.
    Input(BoxedIter),
}

impl Seed {
    /// Returns `true` for the identity seed.
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }

    /// Turns the seed into an iterator.
    #[must_use]
    pub fn into_boxed(self) -> BoxedIter {
        match self {
            Self::Identity => Box::new(BindingsIter::identity()),
            Self::Input(input) => input,
        }
    }

    /// Closes an input seed that will not be consumed.
    pub fn close(self) {
        if let Self::Input(mut input) = self {
            input.close();
        }
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => write!(f, "Identity"),
            Self::Input(input) => write!(f, "Input({})", input.name()),
        }
    }
}

/// Compiles `op` against `seed`.
///
/// Fails with [`ExecError::UnsupportedOperator`] when an extension has no
/// registered realization, or with whatever error a realization returns.
/// Iterators the compiler built before the failure are closed, and so is the
/// seed of an unrealized extension. A seed already handed to a realization
/// is that realization's to close.
pub fn compile(op: &Op, seed: Seed, ctx: &ExecutionContext) -> ExecResult<BoxedIter> {
    match seed {
        Seed::Input(mut input) if !op.is_seedable() => {
            debug!(operator = op.kind(), "evaluating independently and joining with input");
            match compile_op(op, Seed::Identity, ctx) {
                Ok(sub) => Ok(Box::new(NestedLoopJoinIter::new(
                    JoinKind::Inner,
                    None,
                    input,
                    sub,
                    ctx.clone(),
                ))),
                Err(e) => {
                    input.close();
                    Err(e)
                }
            }
        }
        seed => compile_op(op, seed, ctx),
    }
}

fn compile_op(op: &Op, seed: Seed, ctx: &ExecutionContext) -> ExecResult<BoxedIter> {
    trace!(operator = op.kind(), seed = ?seed, "compiling");
    match op {
        Op::Bgp(patterns) => {
            let graph = GraphSlot::from_active(ctx.active_graph());
            Ok(compile_patterns(patterns, graph, None, seed, ctx))
        }
        Op::QuadPattern { graph, patterns } => {
            Ok(compile_patterns(patterns, GraphSlot::from_pattern(graph), None, seed, ctx))
        }
        Op::Join { left, right } => {
            let left = compile(left, seed, ctx)?;
            compile(right, Seed::Input(left), ctx)
        }
        Op::LeftJoin { left, right, filter } => {
            compile_left_join(left, right, filter.as_ref(), seed, ctx)
        }
        Op::Union { left, right } => compile_union(left, right, seed, ctx),
        Op::Filter { expr, sub } => compile_filter(expr, sub, seed, ctx),
        Op::Graph { name, sub } => compile_graph(name, sub, seed, ctx),
        Op::DatasetNames { name } => {
            Ok(Box::new(DatasetNamesIter::new(seed.into_boxed(), name.clone(), ctx.clone())))
        }
        Op::Table(table) => Ok(Box::new(TableIter::new(seed.into_boxed(), table.rows.clone()))),
        Op::Extension(ext) => compile_extension(ext, seed, ctx),
        Op::Order { keys, sub } => {
            let input = compile(sub, seed, ctx)?;
            Ok(Box::new(OrderIter::new(input, keys.clone(), ctx.clone())))
        }
        Op::Project { vars, sub } => {
            let input = compile(sub, seed, ctx)?;
            Ok(Box::new(ProjectIter::new(input, vars.clone())))
        }
        Op::Distinct { sub } => {
            let input = compile(sub, seed, ctx)?;
            Ok(Box::new(DistinctIter::new(input, ctx.max_rows_in_memory())))
        }
        Op::Slice { offset, limit, sub } => {
            let input = compile(sub, seed, ctx)?;
            Ok(Box::new(SliceIter::new(input, *offset, *limit)))
        }
    }
}

/// Chains one scan per triple pattern onto the seed. With a filter, the
/// filter is placed right after the first stage that binds all of its
/// variables, or after the last stage.
fn compile_patterns(
    patterns: &[TriplePattern],
    graph: GraphSlot,
    filter: Option<&Expr>,
    seed: Seed,
    ctx: &ExecutionContext,
) -> BoxedIter {
    let mut iter = seed.into_boxed();
    let mut pending = filter.map(|expr| (expr, expr.variables()));
    let mut bound = BTreeSet::new();
    if let GraphSlot::Variable(var) = &graph {
        bound.insert(var.clone());
    }

    for (stage, pattern) in patterns.iter().enumerate() {
        iter = Box::new(PatternScanIter::new(iter, pattern.clone(), graph.clone(), ctx.clone()));
        bound.extend(pattern.variables().cloned());

        if pending.as_ref().is_some_and(|(_, vars)| vars.is_subset(&bound)) {
            if let Some((expr, _)) = pending.take() {
                trace!(stage, expr = %expr, "filter placed inside pattern");
                iter = Box::new(FilterIter::new(iter, expr.clone(), ctx.clone()));
            }
        }
    }

    if let Some((expr, _)) = pending {
        iter = Box::new(FilterIter::new(iter, expr.clone(), ctx.clone()));
    }
    iter
}

fn compile_filter(
    expr: &Expr,
    sub: &Op,
    seed: Seed,
    ctx: &ExecutionContext,
) -> ExecResult<BoxedIter> {
    if ctx.config().filter_placement {
        match sub {
            Op::Bgp(patterns) => {
                let graph = GraphSlot::from_active(ctx.active_graph());
                return Ok(compile_patterns(patterns, graph, Some(expr), seed, ctx));
            }
            Op::QuadPattern { graph, patterns } => {
                let graph = GraphSlot::from_pattern(graph);
                return Ok(compile_patterns(patterns, graph, Some(expr), seed, ctx));
            }
            _ => {}
        }
    }
    let input = compile(sub, seed, ctx)?;
    Ok(Box::new(FilterIter::new(input, expr.clone(), ctx.clone())))
}

fn compile_left_join(
    left: &Op,
    right: &Arc<Op>,
    filter: Option<&Expr>,
    seed: Seed,
    ctx: &ExecutionContext,
) -> ExecResult<BoxedIter> {
    let mut input = compile(left, seed, ctx)?;

    if ctx.config().left_join_strategy == LeftJoinStrategy::Auto && right.is_probeable() {
        debug!(strategy = "indexed", "compiling left join");
        return Ok(Box::new(OptionalIndexIter::new(
            input,
            Arc::clone(right),
            filter.cloned(),
            ctx.clone(),
        )));
    }

    debug!(strategy = "exhaustive", optional = right.kind(), "compiling left join");
    match compile(right, Seed::Identity, ctx) {
        Ok(rhs) => Ok(Box::new(NestedLoopJoinIter::new(
            JoinKind::Left,
            filter.cloned(),
            input,
            rhs,
            ctx.clone(),
        ))),
        Err(e) => {
            input.close();
            Err(e)
        }
    }
}

fn compile_union(
    left: &Op,
    right: &Op,
    seed: Seed,
    ctx: &ExecutionContext,
) -> ExecResult<BoxedIter> {
    let (left_seed, right_seed) = match seed {
        Seed::Identity => (Seed::Identity, Seed::Identity),
        Seed::Input(input) => {
            debug!("buffering union input for replay");
            let shared = SharedSeed::new(input, ctx.max_rows_in_memory());
            (Seed::Input(Box::new(shared.reader()?)), Seed::Input(Box::new(shared.reader()?)))
        }
    };

    let mut left = match compile(left, left_seed, ctx) {
        Ok(iter) => iter,
        Err(e) => {
            right_seed.close();
            return Err(e);
        }
    };
    match compile(right, right_seed, ctx) {
        Ok(right) => Ok(Box::new(ConcatIter::new(vec![left, right]))),
        Err(e) => {
            left.close();
            Err(e)
        }
    }
}

fn compile_graph(
    name: &TermPattern,
    sub: &Arc<Op>,
    seed: Seed,
    ctx: &ExecutionContext,
) -> ExecResult<BoxedIter> {
    match name {
        TermPattern::Term(graph) => {
            debug!(graph = %graph, "scoping subtree to named graph");
            let scoped = ctx.with_active_graph(ActiveGraph::Named(graph.clone()));
            compile(sub, seed, &scoped)
        }
        TermPattern::Variable(var) => Ok(Box::new(GraphIter::new(
            seed.into_boxed(),
            var.clone(),
            Arc::clone(sub),
            ctx.clone(),
        ))),
    }
}

fn compile_extension(
    ext: &OpExtension,
    seed: Seed,
    ctx: &ExecutionContext,
) -> ExecResult<BoxedIter> {
    let Some(realizer) = ctx.extensions().get(&ext.name) else {
        warn!(extension = %ext.name, "no realization registered for extension");
        seed.close();
        return Err(ExecError::unsupported(
            format!("Extension({})", ext.name),
            "no realization registered",
        ));
    };
    realizer.realize(ext, seed.into_boxed(), ctx)
}
