//! Data model types.

mod binding;
mod pattern;
mod term;
mod variable;

pub use binding::Binding;
pub use pattern::{Quad, TermPattern, TriplePattern};
pub use term::{xsd, Literal, Term};
pub use variable::Variable;
