//! Filter and sort-key expressions.

use std::collections::BTreeSet;
use std::fmt;

use quarry_core::{Term, Variable};

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        };
        f.write_str(s)
    }
}

/// An expression over the variables of a binding.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// The value of a variable.
    Variable(Variable),
    /// A constant term.
    Constant(Term),
    /// `bound(?v)`.
    Bound(Variable),
    /// Logical negation.
    Not(Box<Expr>),
    /// Logical conjunction.
    And(Box<Expr>, Box<Expr>),
    /// Logical disjunction.
    Or(Box<Expr>, Box<Expr>),
    /// Binary comparison.
    Compare {
        /// The operator.
        op: CompareOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// A named function call.
    Function {
        /// Function name, matched case-insensitively.
        name: String,
        /// Arguments.
        args: Vec<Expr>,
    },
}

impl Expr {
    /// A variable reference.
    pub fn var(name: impl Into<String>) -> Self {
        Self::Variable(Variable::new(name))
    }

    /// A constant.
    #[must_use]
    pub const fn constant(term: Term) -> Self {
        Self::Constant(term)
    }

    /// An integer constant.
    #[must_use]
    pub fn integer(value: i64) -> Self {
        Self::Constant(Term::integer(value))
    }

    /// An IRI constant.
    pub fn iri(iri: impl Into<String>) -> Self {
        Self::Constant(Term::iri(iri))
    }

    /// `bound(?name)`.
    pub fn bound(name: impl Into<String>) -> Self {
        Self::Bound(Variable::new(name))
    }

    /// A function call.
    pub fn call(name: impl Into<String>, args: Vec<Self>) -> Self {
        Self::Function { name: name.into(), args }
    }

    /// `!self`
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// `self && other`
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// `self || other`
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// `self = other`
    #[must_use]
    pub fn eq(self, other: Self) -> Self {
        self.compare(CompareOp::Eq, other)
    }

    /// `self != other`
    #[must_use]
    pub fn not_eq(self, other: Self) -> Self {
        self.compare(CompareOp::NotEq, other)
    }

    /// `self < other`
    #[must_use]
    pub fn lt(self, other: Self) -> Self {
        self.compare(CompareOp::Lt, other)
    }

    /// `self <= other`
    #[must_use]
    pub fn lt_eq(self, other: Self) -> Self {
        self.compare(CompareOp::LtEq, other)
    }

    /// `self > other`
    #[must_use]
    pub fn gt(self, other: Self) -> Self {
        self.compare(CompareOp::Gt, other)
    }

    /// `self >= other`
    #[must_use]
    pub fn gt_eq(self, other: Self) -> Self {
        self.compare(CompareOp::GtEq, other)
    }

    fn compare(self, op: CompareOp, other: Self) -> Self {
        Self::Compare { op, left: Box::new(self), right: Box::new(other) }
    }

    /// All variables the expression refers to, including under `bound`.
    #[must_use]
    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut vars = BTreeSet::new();
        self.collect_variables(&mut vars);
        vars
    }

    fn collect_variables(&self, vars: &mut BTreeSet<Variable>) {
        match self {
            Self::Variable(v) | Self::Bound(v) => {
                vars.insert(v.clone());
            }
            Self::Constant(_) => {}
            Self::Not(inner) => inner.collect_variables(vars),
            Self::And(l, r) | Self::Or(l, r) | Self::Compare { left: l, right: r, .. } => {
                l.collect_variables(vars);
                r.collect_variables(vars);
            }
            Self::Function { args, .. } => {
                for arg in args {
                    arg.collect_variables(vars);
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(v) => write!(f, "{v}"),
            Self::Constant(t) => write!(f, "{t}"),
            Self::Bound(v) => write!(f, "bound({v})"),
            Self::Not(inner) => write!(f, "!({inner})"),
            Self::And(l, r) => write!(f, "({l} && {r})"),
            Self::Or(l, r) => write!(f, "({l} || {r})"),
            Self::Compare { op, left, right } => write!(f, "({left} {op} {right})"),
            Self::Function { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_display() {
        let expr = Expr::var("age").gt(Expr::integer(21)).and(Expr::bound("name"));
        assert_eq!(
            expr.to_string(),
            "((?age > \"21\"^^<http://www.w3.org/2001/XMLSchema#integer>) && bound(?name))"
        );
    }

    #[test]
    fn collects_variables() {
        let expr = Expr::call("str", vec![Expr::var("a")]).eq(Expr::var("b")).or(Expr::bound("c"));
        let names: Vec<_> = expr.variables().iter().map(|v| v.name().to_owned()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(Expr::integer(1).variables().is_empty());
    }
}
