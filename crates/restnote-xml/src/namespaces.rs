//! Prefix to namespace URI tables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Mapping from short prefix to XML namespace URI.
///
/// The table is used to resolve prefixed names in XPath expressions and
/// when adding new elements. It is fixed once an instance is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespaces(BTreeMap<String, String>);

impl Namespaces {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(prefix, uri)` pairs.
    pub fn from_pairs<I, P, U>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, U)>,
        P: Into<String>,
        U: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(p, u)| (p.into(), u.into()))
                .collect(),
        )
    }

    /// Add or replace a binding.
    pub fn insert(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.0.insert(prefix.into(), uri.into());
    }

    /// Look up the URI for `prefix`. The `xml` prefix is always bound.
    pub fn get(&self, prefix: &str) -> Option<&str> {
        match self.0.get(prefix) {
            Some(uri) => Some(uri.as_str()),
            None if prefix == "xml" => Some(XML_NAMESPACE),
            None => None,
        }
    }

    /// Iterate over the bindings in prefix order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<P: Into<String>, U: Into<String>> FromIterator<(P, U)> for Namespaces {
    fn from_iter<T: IntoIterator<Item = (P, U)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}
