//! Realizations for engine-specific operators.
//!
//! An [`Op::Extension`](crate::algebra::Op::Extension) node carries only a
//! name and an opaque payload. The compiler looks the name up in the
//! context's [`ExtensionRegistry`]; a missing entry is an unsupported
//! operator error.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::algebra::OpExtension;
use crate::error::ExecResult;

use super::context::ExecutionContext;
use super::iterator::BoxedIter;

/// Builds the iterator for one kind of extension node.
pub trait ExtensionRealizer: Send + Sync {
    /// Realizes `ext` over `seed`.
    ///
    /// The returned iterator takes ownership of the seed and must close it.
    /// On error the realization closes the seed before returning.
    /// Its output must be the seed's bindings joined with the extension's
    /// own solutions.
    fn realize(
        &self,
        ext: &OpExtension,
        seed: BoxedIter,
        ctx: &ExecutionContext,
    ) -> ExecResult<BoxedIter>;
}

/// Extension realizations keyed by extension name.
#[derive(Default, Clone)]
pub struct ExtensionRegistry {
    realizers: HashMap<String, Arc<dyn ExtensionRealizer>>,
}

impl ExtensionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a realization, replacing any previous one with that name.
    pub fn register(&mut self, name: impl Into<String>, realizer: Arc<dyn ExtensionRealizer>) {
        self.realizers.insert(name.into(), realizer);
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, realizer: Arc<dyn ExtensionRealizer>) -> Self {
        self.register(name, realizer);
        self
    }

    /// Looks up a realization.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ExtensionRealizer>> {
        self.realizers.get(name)
    }

    /// Number of registered realizations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.realizers.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.realizers.is_empty()
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.realizers.keys().collect();
        names.sort();
        f.debug_struct("ExtensionRegistry").field("realizers", &names).finish()
    }
}
