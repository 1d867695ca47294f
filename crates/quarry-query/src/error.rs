//! Error types for query compilation and execution.

use thiserror::Error;

use crate::dataset::DatasetError;

/// Errors that abort a compiled iterator chain.
///
/// Per-row conditions (incompatible bindings, expression evaluation
/// failures) never surface here; they are absorbed where they occur.
#[derive(Debug, Error)]
pub enum ExecError {
    /// An operator (or extension) has no realization.
    #[error("unsupported operator {operator}: {reason}")]
    UnsupportedOperator {
        /// The operator kind or extension name.
        operator: String,
        /// Why it cannot be realized.
        reason: String,
    },

    /// The dataset could not complete a scan.
    #[error("dataset access failed: {0}")]
    Dataset(#[from] DatasetError),

    /// Execution was cancelled through the context's cancellation token.
    #[error("query execution cancelled")]
    Cancelled,

    /// A buffering operator exceeded the configured row limit.
    #[error("query too large: {actual} rows buffered, limit is {limit}")]
    QueryTooLarge {
        /// Rows buffered when the limit was hit.
        actual: usize,
        /// The configured limit.
        limit: usize,
    },

    /// Internal invariant violation (for example a poisoned lock).
    #[error("internal execution error: {0}")]
    Internal(String),
}

impl ExecError {
    /// Creates an unsupported operator error.
    #[must_use]
    pub fn unsupported(operator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedOperator { operator: operator.into(), reason: reason.into() }
    }

    /// Returns `true` if this is an unsupported operator error.
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedOperator { .. })
    }
}

/// Result type for compilation and execution.
pub type ExecResult<T> = Result<T, ExecError>;
