//! Error types for the core crate.

use thiserror::Error;

use crate::types::{Term, Variable};

/// Errors that can occur in the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Two bindings disagree on the value of a shared variable.
    #[error("incompatible binding for {variable}: {left} vs {right}")]
    IncompatibleBinding {
        /// The variable bound on both sides.
        variable: Variable,
        /// The value already present.
        left: Term,
        /// The conflicting value.
        right: Term,
    },

    /// A variable name is not usable.
    #[error("invalid variable name: {0:?}")]
    InvalidVariable(String),
}

impl CoreError {
    /// Creates an incompatible binding error.
    #[must_use]
    pub fn incompatible(variable: &Variable, left: &Term, right: &Term) -> Self {
        Self::IncompatibleBinding {
            variable: variable.clone(),
            left: left.clone(),
            right: right.clone(),
        }
    }

    /// Returns `true` if this error reports a binding conflict.
    #[must_use]
    pub const fn is_incompatible(&self) -> bool {
        matches!(self, Self::IncompatibleBinding { .. })
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
