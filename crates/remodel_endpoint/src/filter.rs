//! Filter criteria and sort direction.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::form_urlencoded;

/// One filter criterion: a field name and the value to match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterTerm {
    /// Field the criterion applies to.
    pub field: String,
    /// Value to match.
    pub value: String,
}

/// Structured query criteria for a server-filtered listing.
///
/// Terms keep their insertion order. The whole filter encodes to a
/// single percent-encoded string that travels as one query-parameter
/// value; an empty filter encodes to the empty string and is dropped
/// from query strings entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    terms: Vec<FilterTerm>,
}

impl Filter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a criterion, builder style.
    pub fn term(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(field, value);
        self
    }

    /// Adds a criterion in place.
    pub fn push(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.terms.push(FilterTerm {
            field: field.into(),
            value: value.into(),
        });
    }

    /// Returns the criteria in insertion order.
    pub fn terms(&self) -> &[FilterTerm] {
        &self.terms
    }

    /// True if no criteria are set.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Number of criteria.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Removes all criteria.
    pub fn clear(&mut self) {
        self.terms.clear();
    }

    /// Encodes the criteria to a single query-parameter value.
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for term in &self.terms {
            serializer.append_pair(&term.field, &term.value);
        }
        serializer.finish()
    }
}

/// Sort direction for a server-sorted listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl Order {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }

    /// Returns the opposite direction.
    pub fn toggled(self) -> Self {
        match self {
            Order::Asc => Order::Desc,
            Order::Desc => Order::Asc,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
