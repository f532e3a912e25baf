//! Query-string construction.

use url::form_urlencoded;

/// An ordered query-string builder.
///
/// Pairs keep their insertion order; setting a name that is already
/// present overwrites its value in place. Any pair whose value is the
/// empty string is omitted from the encoded output entirely, so
/// unset request parameters never reach the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryString {
    pairs: Vec<(String, String)>,
}

impl QueryString {
    /// Creates an empty query string.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or overwrites a parameter, builder style.
    pub fn pair(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Adds or overwrites a parameter in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(n, _)| *n == name) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((name, value)),
        }
    }

    /// Returns the value currently set for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// True if no parameters are set.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Encodes the non-empty parameters in insertion order.
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.pairs {
            if !value.is_empty() {
                serializer.append_pair(name, value);
            }
        }
        serializer.finish()
    }

    /// Appends the encoded parameters to a URL.
    ///
    /// Returns the URL unchanged when every parameter is empty.
    pub fn append_to(&self, url: &str) -> String {
        let encoded = self.encode();
        if encoded.is_empty() {
            url.to_string()
        } else {
            format!("{url}?{encoded}")
        }
    }
}
