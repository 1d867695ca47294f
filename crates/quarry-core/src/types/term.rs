//! RDF terms.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Well-known XML Schema datatype IRIs.
pub mod xsd {
    /// `xsd:string`.
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    /// `xsd:boolean`.
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    /// `xsd:integer`.
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    /// `xsd:decimal`.
    pub const DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
    /// `xsd:double`.
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    /// `xsd:float`.
    pub const FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
    /// `rdf:langString`, the datatype of language-tagged strings.
    pub const LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

    /// Returns `true` for the numeric datatypes understood by comparisons.
    #[must_use]
    pub fn is_numeric(datatype: &str) -> bool {
        matches!(datatype, INTEGER | DECIMAL | DOUBLE | FLOAT)
    }
}

/// A literal value: lexical form, datatype IRI and optional language tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    lexical: String,
    datatype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<String>,
}

impl Literal {
    /// Creates a typed literal.
    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self { lexical: lexical.into(), datatype: datatype.into(), language: None }
    }

    /// Creates a plain `xsd:string` literal.
    pub fn string(lexical: impl Into<String>) -> Self {
        Self::typed(lexical, xsd::STRING)
    }

    /// Creates a language-tagged string. The tag is lowercased.
    pub fn lang_string(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: xsd::LANG_STRING.to_owned(),
            language: Some(language.into().to_ascii_lowercase()),
        }
    }

    /// The lexical form.
    #[must_use]
    pub fn lexical(&self) -> &str {
        &self.lexical
    }

    /// The datatype IRI.
    #[must_use]
    pub fn datatype(&self) -> &str {
        &self.datatype
    }

    /// The language tag, if any.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Returns `true` if the datatype is numeric.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        xsd::is_numeric(&self.datatype)
    }

    /// Returns `true` for `xsd:string` and language-tagged strings.
    #[must_use]
    pub fn is_string(&self) -> bool {
        self.datatype == xsd::STRING || self.language.is_some()
    }

    /// Parses a numeric literal. Returns `None` for non-numeric or malformed values.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        if !self.is_numeric() {
            return None;
        }
        match self.lexical.trim() {
            "INF" | "+INF" => Some(f64::INFINITY),
            "-INF" => Some(f64::NEG_INFINITY),
            "NaN" => Some(f64::NAN),
            other => other.parse().ok(),
        }
    }

    /// Parses a boolean literal.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        if self.datatype != xsd::BOOLEAN {
            return None;
        }
        match self.lexical.as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.lexical.escape_default())?;
        if let Some(lang) = &self.language {
            write!(f, "@{lang}")
        } else if self.datatype == xsd::STRING {
            Ok(())
        } else {
            write!(f, "^^<{}>", self.datatype)
        }
    }
}

/// An RDF term.
///
/// Equality is term identity: two literals are equal only when lexical form,
/// datatype and language all match. Value-based comparison lives in the
/// expression evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Term {
    /// A blank node with a local label.
    BlankNode(String),
    /// An IRI.
    Iri(String),
    /// A literal.
    Literal(Literal),
}

impl Term {
    /// Creates an IRI term.
    pub fn iri(iri: impl Into<String>) -> Self {
        Self::Iri(iri.into())
    }

    /// Creates a blank node term.
    pub fn blank(label: impl Into<String>) -> Self {
        Self::BlankNode(label.into())
    }

    /// Creates a plain string literal.
    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(Literal::string(value))
    }

    /// Creates an `xsd:integer` literal.
    #[must_use]
    pub fn integer(value: i64) -> Self {
        Self::Literal(Literal::typed(value.to_string(), xsd::INTEGER))
    }

    /// Creates an `xsd:double` literal.
    #[must_use]
    pub fn double(value: f64) -> Self {
        Self::Literal(Literal::typed(value.to_string(), xsd::DOUBLE))
    }

    /// Creates an `xsd:boolean` literal.
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::Literal(Literal::typed(if value { "true" } else { "false" }, xsd::BOOLEAN))
    }

    /// Returns the literal, if this term is one.
    #[must_use]
    pub const fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// Returns `true` if this term is an IRI.
    #[must_use]
    pub const fn is_iri(&self) -> bool {
        matches!(self, Self::Iri(_))
    }

    /// Returns `true` if this term is a blank node.
    #[must_use]
    pub const fn is_blank(&self) -> bool {
        matches!(self, Self::BlankNode(_))
    }

    /// Returns `true` if this term is a literal.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "<{iri}>"),
            Self::BlankNode(label) => write!(f, "_:{label}"),
            Self::Literal(lit) => write!(f, "{lit}"),
        }
    }
}

impl From<Literal> for Term {
    fn from(lit: Literal) -> Self {
        Self::Literal(lit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        assert_eq!(Term::iri("http://ex/a").to_string(), "<http://ex/a>");
        assert_eq!(Term::blank("b0").to_string(), "_:b0");
        assert_eq!(Term::string("hi").to_string(), "\"hi\"");
        assert_eq!(
            Term::integer(7).to_string(),
            "\"7\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );
        assert_eq!(Term::Literal(Literal::lang_string("chat", "FR")).to_string(), "\"chat\"@fr");
    }

    #[test]
    fn numeric_parsing() {
        assert_eq!(Term::integer(42).as_literal().and_then(Literal::as_f64), Some(42.0));
        assert_eq!(Term::string("42").as_literal().and_then(Literal::as_f64), None);
        assert_eq!(Literal::typed("abc", xsd::INTEGER).as_f64(), None);
    }

    #[test]
    fn term_identity_is_lexical() {
        let a = Term::Literal(Literal::typed("01", xsd::INTEGER));
        let b = Term::integer(1);
        assert_ne!(a, b);
    }

    #[test]
    fn serde_roundtrip() {
        let term = Term::Literal(Literal::lang_string("hello", "en"));
        let json = serde_json::to_string(&term).unwrap();
        let back: Term = serde_json::from_str(&json).unwrap();
        assert_eq!(term, back);
    }
}
