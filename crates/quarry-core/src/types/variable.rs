//! Query variables.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A query variable, identified by its name without the leading `?`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variable {
    name: String,
}

impl Variable {
    /// Creates a variable from a name.
    ///
    /// A leading `?` or `$` is stripped.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.strip_prefix(['?', '$']) {
            Some(stripped) => Self { name: stripped.to_owned() },
            None => Self { name },
        }
    }

    /// Creates a variable, rejecting empty names and names with whitespace.
    pub fn try_new(name: impl Into<String>) -> CoreResult<Self> {
        let var = Self::new(name);
        if var.name.is_empty() || var.name.chars().any(char::is_whitespace) {
            return Err(CoreError::InvalidVariable(var.name));
        }
        Ok(var)
    }

    /// The variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.name)
    }
}

impl From<&str> for Variable {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_sigil() {
        assert_eq!(Variable::new("?x"), Variable::new("x"));
        assert_eq!(Variable::new("$x").name(), "x");
        assert_eq!(Variable::new("x").to_string(), "?x");
    }

    #[test]
    fn try_new_rejects_bad_names() {
        assert!(Variable::try_new("?").is_err());
        assert!(Variable::try_new("a b").is_err());
        assert!(Variable::try_new("ok").is_ok());
    }
}
