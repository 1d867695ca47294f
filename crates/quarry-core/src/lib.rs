//! # quarry-core
//!
//! Core data model for the quarry graph query engine.
//!
//! This crate provides the values that flow through a query pipeline:
//!
//! - [`Term`] - RDF terms (IRIs, blank nodes, literals)
//! - [`Variable`] - query variables
//! - [`Binding`] - immutable variable-to-term mappings with merge and extend
//! - [`TriplePattern`], [`TermPattern`] and [`Quad`] - the pattern and data shapes
//!
//! ## Example
//!
//! ```
//! use quarry_core::{Binding, Term, Variable};
//!
//! let s = Variable::new("s");
//! let row = Binding::empty().extend(s.clone(), Term::iri("http://example.org/a")).unwrap();
//!
//! assert_eq!(row.get(&s), Some(&Term::iri("http://example.org/a")));
//! assert_eq!(row.len(), 1);
//! ```

#![deny(clippy::unwrap_used)]

pub mod error;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use types::{xsd, Binding, Literal, Quad, Term, TermPattern, TriplePattern, Variable};

#[cfg(test)]
mod tests {
    use crate::{xsd, Term};

    #[test]
    fn datatype_constants_at_root() {
        let Term::Literal(literal) = Term::integer(7) else {
            panic!("expected a literal");
        };
        assert_eq!(literal.datatype(), xsd::INTEGER);
        assert!(xsd::is_numeric(xsd::DOUBLE));
    }
}
