//! Expression evaluation.
//!
//! The compiler treats evaluation as a capability: filters and sort keys go
//! through an [`ExprEvaluator`] held by the execution context. A failed
//! evaluation is a per-row condition, so callers decide what an error means
//! (a filter drops the row, a sort key sorts it as unbound).

use std::cmp::Ordering;

use quarry_core::{xsd, Binding, Literal, Term, Variable};
use thiserror::Error;

use crate::algebra::{CompareOp, Expr};

/// Expression evaluation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// A referenced variable is not bound in the row.
    #[error("unbound variable {0}")]
    Unbound(Variable),

    /// Operand types do not fit the operation.
    #[error("type error: {0}")]
    TypeError(String),

    /// The function name is not known to the evaluator.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// A function was called with the wrong number of arguments.
    #[error("{name} expects {expected} argument(s), got {actual}")]
    Arity {
        /// Function name.
        name: String,
        /// Expected argument count.
        expected: usize,
        /// Supplied argument count.
        actual: usize,
    },
}

/// Result type for expression evaluation.
pub type EvalResult<T> = Result<T, EvalError>;

/// Evaluates expressions against bindings.
pub trait ExprEvaluator: Send + Sync {
    /// Evaluates `expr` to a term.
    fn evaluate(&self, expr: &Expr, binding: &Binding) -> EvalResult<Term>;

    /// Evaluates `expr` to its effective boolean value.
    fn evaluate_bool(&self, expr: &Expr, binding: &Binding) -> EvalResult<bool> {
        effective_boolean_value(&self.evaluate(expr, binding)?)
    }
}

/// Effective boolean value of a term.
///
/// Booleans are themselves, numerics are true when non-zero (and not NaN),
/// strings are true when non-empty. Anything else is a type error.
pub fn effective_boolean_value(term: &Term) -> EvalResult<bool> {
    let Term::Literal(lit) = term else {
        return Err(EvalError::TypeError(format!("no boolean value for {term}")));
    };
    if let Some(b) = lit.as_bool() {
        return Ok(b);
    }
    if lit.is_numeric() {
        return lit
            .as_f64()
            .map(|n| n != 0.0 && !n.is_nan())
            .ok_or_else(|| EvalError::TypeError(format!("malformed numeric {lit}")));
    }
    if lit.is_string() {
        return Ok(!lit.lexical().is_empty());
    }
    Err(EvalError::TypeError(format!("no boolean value for {lit}")))
}

/// Default evaluator: variables, constants, `bound`, boolean connectives,
/// comparisons and a handful of term functions.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEvaluator;

impl StandardEvaluator {
    /// Creates the evaluator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn compare(&self, op: CompareOp, left: &Term, right: &Term) -> EvalResult<bool> {
        match op {
            CompareOp::Eq => self.equals(left, right),
            CompareOp::NotEq => self.equals(left, right).map(|eq| !eq),
            _ => {
                let ordering = value_order(left, right).ok_or_else(|| {
                    EvalError::TypeError(format!("cannot order {left} and {right}"))
                })?;
                Ok(match op {
                    CompareOp::Lt => ordering == Ordering::Less,
                    CompareOp::LtEq => ordering != Ordering::Greater,
                    CompareOp::Gt => ordering == Ordering::Greater,
                    CompareOp::GtEq => ordering != Ordering::Less,
                    CompareOp::Eq => ordering == Ordering::Equal,
                    CompareOp::NotEq => ordering != Ordering::Equal,
                })
            }
        }
    }

    fn equals(&self, left: &Term, right: &Term) -> EvalResult<bool> {
        if let (Term::Literal(l), Term::Literal(r)) = (left, right) {
            if l.is_numeric() && r.is_numeric() {
                return numeric_pair(l, r).map(|(a, b)| a == b);
            }
        }
        Ok(left == right)
    }

    fn call(&self, name: &str, args: &[Expr], binding: &Binding) -> EvalResult<Term> {
        let lowered = name.to_ascii_lowercase();
        let unary = |expected_name: &str| -> EvalResult<Term> {
            match args {
                [arg] => self.evaluate(arg, binding),
                _ => Err(EvalError::Arity {
                    name: expected_name.to_owned(),
                    expected: 1,
                    actual: args.len(),
                }),
            }
        };
        match lowered.as_str() {
            "str" => match unary("str")? {
                Term::Iri(iri) => Ok(Term::string(iri)),
                Term::Literal(lit) => Ok(Term::string(lit.lexical())),
                Term::BlankNode(_) => Err(EvalError::TypeError("str() of blank node".into())),
            },
            "isiri" | "isuri" => Ok(Term::boolean(unary("isIRI")?.is_iri())),
            "isblank" => Ok(Term::boolean(unary("isBlank")?.is_blank())),
            "isliteral" => Ok(Term::boolean(unary("isLiteral")?.is_literal())),
            "lang" => match unary("lang")? {
                Term::Literal(lit) => Ok(Term::string(lit.language().unwrap_or_default())),
                other => Err(EvalError::TypeError(format!("lang() of {other}"))),
            },
            "datatype" => match unary("datatype")? {
                Term::Literal(lit) => Ok(Term::iri(lit.datatype())),
                other => Err(EvalError::TypeError(format!("datatype() of {other}"))),
            },
            _ => Err(EvalError::UnknownFunction(name.to_owned())),
        }
    }
}

impl ExprEvaluator for StandardEvaluator {
    fn evaluate(&self, expr: &Expr, binding: &Binding) -> EvalResult<Term> {
        match expr {
            Expr::Variable(var) => {
                binding.get(var).cloned().ok_or_else(|| EvalError::Unbound(var.clone()))
            }
            Expr::Constant(term) => Ok(term.clone()),
            Expr::Bound(var) => Ok(Term::boolean(binding.contains(var))),
            Expr::Not(inner) => Ok(Term::boolean(!self.evaluate_bool(inner, binding)?)),
            // Error-tolerant connectives: a definite answer on one side wins
            // over an error on the other.
            Expr::And(l, r) => {
                match (self.evaluate_bool(l, binding), self.evaluate_bool(r, binding)) {
                    (Ok(false), _) | (_, Ok(false)) => Ok(Term::boolean(false)),
                    (Ok(true), Ok(true)) => Ok(Term::boolean(true)),
                    (Err(e), _) | (_, Err(e)) => Err(e),
                }
            }
            Expr::Or(l, r) => {
                match (self.evaluate_bool(l, binding), self.evaluate_bool(r, binding)) {
                    (Ok(true), _) | (_, Ok(true)) => Ok(Term::boolean(true)),
                    (Ok(false), Ok(false)) => Ok(Term::boolean(false)),
                    (Err(e), _) | (_, Err(e)) => Err(e),
                }
            }
            Expr::Compare { op, left, right } => {
                let left = self.evaluate(left, binding)?;
                let right = self.evaluate(right, binding)?;
                self.compare(*op, &left, &right).map(Term::boolean)
            }
            Expr::Function { name, args } => self.call(name, args, binding),
        }
    }
}

fn numeric_pair(l: &Literal, r: &Literal) -> EvalResult<(f64, f64)> {
    match (l.as_f64(), r.as_f64()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(EvalError::TypeError(format!("malformed numeric in {l} / {r}"))),
    }
}

/// Value ordering used by `<`, `>` and friends.
///
/// Defined for numeric pairs, string pairs with the same language tag and
/// boolean pairs. `None` when the operands are not comparable.
#[must_use]
pub fn value_order(left: &Term, right: &Term) -> Option<Ordering> {
    let (Term::Literal(l), Term::Literal(r)) = (left, right) else {
        return None;
    };
    if l.is_numeric() && r.is_numeric() {
        return l.as_f64()?.partial_cmp(&r.as_f64()?);
    }
    if l.is_string() && r.is_string() && l.language() == r.language() {
        return Some(l.lexical().cmp(r.lexical()));
    }
    if l.datatype() == xsd::BOOLEAN && r.datatype() == xsd::BOOLEAN {
        return Some(l.as_bool()?.cmp(&r.as_bool()?));
    }
    if l.datatype() == r.datatype() && l.language() == r.language() {
        // Same unknown datatype: only identity is decidable.
        return (l.lexical() == r.lexical()).then_some(Ordering::Equal);
    }
    None
}
