//! Order operator for ORDER BY.

use std::cmp::Ordering;
use std::vec;

use quarry_core::{xsd, Binding, Literal, Term};

use crate::algebra::{SortDirection, SortKey};
use crate::error::ExecResult;
use crate::exec::context::ExecutionContext;
use crate::exec::iterator::{check_buffer_limit, BoxedIter, IterBase, IterState, QueryIterator};

/// Order operator.
///
/// Sorts input bindings by the given keys. This is a blocking operator that
/// materializes all input rows. The sort is stable: rows with equal keys
/// keep their input order.
pub struct OrderIter {
    /// Base iterator state.
    base: IterBase,
    /// Sort keys, most significant first.
    keys: Vec<SortKey>,
    /// Input bindings.
    input: BoxedIter,
    /// Evaluator, cancellation and row limit.
    ctx: ExecutionContext,
    /// Iterator over sorted rows.
    sorted: vec::IntoIter<Binding>,
    /// Whether rows have been materialized.
    materialized: bool,
}

impl OrderIter {
    /// Creates a new order operator.
    #[must_use]
    pub fn new(input: BoxedIter, keys: Vec<SortKey>, ctx: ExecutionContext) -> Self {
        Self {
            base: IterBase::new(),
            keys,
            input,
            ctx,
            sorted: Vec::new().into_iter(),
            materialized: false,
        }
    }

    /// Materializes and sorts all input rows.
    fn materialize_and_sort(&mut self) -> ExecResult<()> {
        let mut keyed = Vec::new();
        while let Some(row) = self.input.next()? {
            self.ctx.check_cancelled()?;
            // Evaluation errors sort like unbound values.
            let key: Vec<Option<Term>> = self
                .keys
                .iter()
                .map(|k| self.ctx.evaluator().evaluate(&k.expr, &row).ok())
                .collect();
            keyed.push((key, row));
            check_buffer_limit(keyed.len(), self.ctx.max_rows_in_memory())?;
        }
        self.input.close();

        let keys = &self.keys;
        keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, keys));

        self.sorted = keyed.into_iter().map(|(_, row)| row).collect::<Vec<_>>().into_iter();
        self.materialized = true;
        Ok(())
    }
}

impl QueryIterator for OrderIter {
    fn next(&mut self) -> ExecResult<Option<Binding>> {
        if self.base.is_done() {
            return Ok(None);
        }
        self.base.set_active();

        if !self.materialized {
            self.materialize_and_sort()?;
        }

        match self.sorted.next() {
            Some(row) => {
                self.base.inc_rows_produced();
                Ok(Some(row))
            }
            None => {
                self.base.set_exhausted();
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.input.close();
        self.sorted = Vec::new().into_iter();
        self.base.set_closed();
    }

    fn state(&self) -> IterState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "Order"
    }
}

fn compare_keys(a: &[Option<Term>], b: &[Option<Term>], keys: &[SortKey]) -> Ordering {
    for ((va, vb), key) in a.iter().zip(b).zip(keys) {
        let cmp = compare_terms(va.as_ref(), vb.as_ref());
        let cmp = match key.direction {
            SortDirection::Ascending => cmp,
            SortDirection::Descending => cmp.reverse(),
        };
        if cmp != Ordering::Equal {
            return cmp;
        }
    }
    Ordering::Equal
}

/// Total order over optional terms used for sorting.
///
/// Unbound sorts first, then blank nodes, IRIs and literals. Numeric
/// literals compare by value (ties by lexical form), strings by lexical form
/// then language, booleans false before true, and any other literal by
/// datatype then lexical form. Numerics sort before strings, strings before
/// booleans, booleans before other datatypes.
#[must_use]
pub fn compare_terms(a: Option<&Term>, b: Option<&Term>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => term_rank(a).cmp(&term_rank(b)).then_with(|| match (a, b) {
            (Term::Literal(la), Term::Literal(lb)) => compare_literals(la, lb),
            _ => a.cmp(b),
        }),
    }
}

const fn term_rank(term: &Term) -> u8 {
    match term {
        Term::BlankNode(_) => 0,
        Term::Iri(_) => 1,
        Term::Literal(_) => 2,
    }
}

fn literal_class(lit: &Literal) -> (u8, Option<f64>) {
    if let Some(value) = lit.as_f64() {
        return (0, Some(value));
    }
    if lit.is_string() {
        return (1, None);
    }
    if lit.datatype() == xsd::BOOLEAN && lit.as_bool().is_some() {
        return (2, None);
    }
    (3, None)
}

fn compare_literals(a: &Literal, b: &Literal) -> Ordering {
    let (class_a, num_a) = literal_class(a);
    let (class_b, num_b) = literal_class(b);
    class_a.cmp(&class_b).then_with(|| {
        let by_value = match (num_a, num_b) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => match (a.as_bool(), b.as_bool()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => Ordering::Equal,
            },
        };
        by_value
            .then_with(|| a.datatype().cmp(b.datatype()))
            .then_with(|| a.lexical().cmp(b.lexical()))
            .then_with(|| a.language().cmp(&b.language()))
    })
}
