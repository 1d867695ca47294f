//! Triple patterns and quads.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Term, Variable};

/// A pattern position: either a concrete term or a variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TermPattern {
    /// A concrete term that must match exactly.
    Term(Term),
    /// A variable that binds to whatever matches.
    Variable(Variable),
}

impl TermPattern {
    /// Returns the variable, if this position is one.
    #[must_use]
    pub const fn as_variable(&self) -> Option<&Variable> {
        match self {
            Self::Variable(var) => Some(var),
            Self::Term(_) => None,
        }
    }
}

impl From<Term> for TermPattern {
    fn from(term: Term) -> Self {
        Self::Term(term)
    }
}

impl From<Variable> for TermPattern {
    fn from(var: Variable) -> Self {
        Self::Variable(var)
    }
}

impl fmt::Display for TermPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Term(term) => write!(f, "{term}"),
            Self::Variable(var) => write!(f, "{var}"),
        }
    }
}

/// A subject-predicate-object pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriplePattern {
    /// Subject position.
    pub subject: TermPattern,
    /// Predicate position.
    pub predicate: TermPattern,
    /// Object position.
    pub object: TermPattern,
}

impl TriplePattern {
    /// Creates a triple pattern.
    pub fn new(
        subject: impl Into<TermPattern>,
        predicate: impl Into<TermPattern>,
        object: impl Into<TermPattern>,
    ) -> Self {
        Self { subject: subject.into(), predicate: predicate.into(), object: object.into() }
    }

    /// The pattern positions in subject, predicate, object order.
    #[must_use]
    pub fn positions(&self) -> [&TermPattern; 3] {
        [&self.subject, &self.predicate, &self.object]
    }

    /// Variables mentioned by this pattern, in position order (may repeat).
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.positions().into_iter().filter_map(TermPattern::as_variable)
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

/// A stored quad. `graph_name` is `None` for the default graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quad {
    /// Subject.
    pub subject: Term,
    /// Predicate.
    pub predicate: Term,
    /// Object.
    pub object: Term,
    /// Graph name, `None` for the default graph.
    pub graph_name: Option<Term>,
}

impl Quad {
    /// Creates a quad.
    #[must_use]
    pub const fn new(subject: Term, predicate: Term, object: Term, graph_name: Option<Term>) -> Self {
        Self { subject, predicate, object, graph_name }
    }

    /// The quad's terms in subject, predicate, object order.
    #[must_use]
    pub const fn spo(&self) -> [&Term; 3] {
        [&self.subject, &self.predicate, &self.object]
    }
}
