//! Variable bindings.
//!
//! A [`Binding`] is one solution row: an immutable map from variables to
//! terms. Bindings are cheap to clone; extending or merging copies the map
//! once and leaves the original untouched.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Term, Variable};
use crate::error::{CoreError, CoreResult};

/// An immutable mapping from variables to terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Binding {
    values: Arc<BTreeMap<Variable, Term>>,
}

impl Binding {
    /// The empty binding (the identity row).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a binding from pairs. Later duplicates overwrite earlier ones.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Variable, Term)>) -> Self {
        Self { values: Arc::new(pairs.into_iter().collect()) }
    }

    /// Returns the value bound to `var`.
    #[must_use]
    pub fn get(&self, var: &Variable) -> Option<&Term> {
        self.values.get(var)
    }

    /// Returns `true` if `var` is bound.
    #[must_use]
    pub fn contains(&self, var: &Variable) -> bool {
        self.values.contains_key(var)
    }

    /// Number of bound variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over the bound variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.values.iter()
    }

    /// Iterates over the bound variables.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.values.keys()
    }

    /// Returns a binding with `var` bound to `term`.
    ///
    /// Binding a variable to the value it already has is a no-op. Binding it
    /// to a different value fails with [`CoreError::IncompatibleBinding`].
    pub fn extend(&self, var: Variable, term: Term) -> CoreResult<Self> {
        match self.values.get(&var) {
            Some(existing) if *existing == term => Ok(self.clone()),
            Some(existing) => Err(CoreError::incompatible(&var, existing, &term)),
            None => {
                let mut values = BTreeMap::clone(&self.values);
                values.insert(var, term);
                Ok(Self { values: Arc::new(values) })
            }
        }
    }

    /// Returns `true` if the two bindings agree on every shared variable.
    #[must_use]
    pub fn is_compatible(&self, other: &Self) -> bool {
        let (small, large) = self.by_size(other);
        small.iter().all(|(var, term)| large.get(var).map_or(true, |t| t == term))
    }

    /// Returns the union of two compatible bindings.
    pub fn merge(&self, other: &Self) -> CoreResult<Self> {
        if other.is_empty() {
            return Ok(self.clone());
        }
        if self.is_empty() {
            return Ok(other.clone());
        }
        let (small, large) = self.by_size(other);
        let mut values = BTreeMap::clone(&large.values);
        for (var, term) in small.iter() {
            match values.get(var) {
                Some(existing) if existing != term => {
                    return Err(CoreError::incompatible(var, existing, term));
                }
                Some(_) => {}
                None => {
                    values.insert(var.clone(), term.clone());
                }
            }
        }
        Ok(Self { values: Arc::new(values) })
    }

    /// Returns a binding restricted to `vars`. Unbound names are skipped.
    #[must_use]
    pub fn project(&self, vars: &[Variable]) -> Self {
        let values = vars
            .iter()
            .filter_map(|var| self.values.get(var).map(|term| (var.clone(), term.clone())))
            .collect();
        Self { values: Arc::new(values) }
    }

    fn by_size<'a>(&'a self, other: &'a Self) -> (&'a Self, &'a Self) {
        if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (var, term)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{var}={term}")?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<(Variable, Term)> for Binding {
    fn from_iter<I: IntoIterator<Item = (Variable, Term)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(pairs: &[(&str, i64)]) -> Binding {
        pairs.iter().map(|(v, n)| (Variable::new(*v), Term::integer(*n))).collect()
    }

    #[test]
    fn extend_adds_and_checks() {
        let b = row(&[("x", 1)]);
        let ext = b.extend(Variable::new("y"), Term::integer(2)).unwrap();
        assert_eq!(ext.len(), 2);
        assert_eq!(b.len(), 1);

        let same = b.extend(Variable::new("x"), Term::integer(1)).unwrap();
        assert_eq!(same, b);

        let err = b.extend(Variable::new("x"), Term::integer(9)).unwrap_err();
        assert!(err.is_incompatible());
    }

    #[test]
    fn merge_compatible() {
        let a = row(&[("x", 1), ("y", 2)]);
        let b = row(&[("y", 2), ("z", 3)]);
        assert!(a.is_compatible(&b));
        assert_eq!(a.merge(&b).unwrap(), row(&[("x", 1), ("y", 2), ("z", 3)]));
    }

    #[test]
    fn merge_incompatible() {
        let a = row(&[("x", 1)]);
        let b = row(&[("x", 2)]);
        assert!(!a.is_compatible(&b));
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn empty_is_identity() {
        let a = row(&[("x", 1)]);
        assert_eq!(a.merge(&Binding::empty()).unwrap(), a);
        assert_eq!(Binding::empty().merge(&a).unwrap(), a);
        assert!(Binding::empty().is_compatible(&a));
    }

    #[test]
    fn project_keeps_listed_vars() {
        let a = row(&[("x", 1), ("y", 2)]);
        let p = a.project(&[Variable::new("y"), Variable::new("missing")]);
        assert_eq!(p, row(&[("y", 2)]));
    }

    #[test]
    fn display() {
        assert_eq!(Binding::empty().to_string(), "{}");
        let b = Binding::from_pairs([(Variable::new("s"), Term::iri("http://ex/a"))]);
        assert_eq!(b.to_string(), "{?s=<http://ex/a>}");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn merge_is_symmetric(
            left in proptest::collection::btree_map(0u8..6, 0i64..3, 0..5),
            right in proptest::collection::btree_map(0u8..6, 0i64..3, 0..5),
        ) {
            let to_binding = |m: &std::collections::BTreeMap<u8, i64>| -> Binding {
                m.iter().map(|(k, v)| (Variable::new(format!("v{k}")), Term::integer(*v))).collect()
            };
            let a = to_binding(&left);
            let b = to_binding(&right);
            prop_assert_eq!(a.is_compatible(&b), b.is_compatible(&a));
            match (a.merge(&b), b.merge(&a)) {
                (Ok(ab), Ok(ba)) => prop_assert_eq!(ab, ba),
                (Err(_), Err(_)) => {}
                _ => prop_assert!(false, "merge disagreed with itself"),
            }
        }
    }
}
