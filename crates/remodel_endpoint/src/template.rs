//! Endpoint templates and placeholder resolution.

use crate::error::{EndpointError, EndpointResult};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::error;

/// A function producing the value for one endpoint placeholder.
///
/// Bindings are established at configuration time; resolution only
/// calls them with the per-request [`ResolveOptions`].
pub type PlaceholderFn = Arc<dyn Fn(&ResolveOptions) -> String + Send + Sync>;

/// Per-request inputs to endpoint resolution.
#[derive(Default, Clone)]
pub struct ResolveOptions {
    extra: BTreeMap<String, String>,
    ignore_key: bool,
}

impl ResolveOptions {
    /// Creates empty resolve options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a named value placeholder functions may consult.
    pub fn with_extra(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// Suppresses appending the record key even for persisted records.
    pub fn ignore_key(mut self, ignore: bool) -> Self {
        self.ignore_key = ignore;
        self
    }

    /// Looks up a named value attached to this request.
    pub fn extra(&self, name: &str) -> Option<&str> {
        self.extra.get(name).map(String::as_str)
    }

    /// Whether key appending is suppressed for this request.
    pub fn ignores_key(&self) -> bool {
        self.ignore_key
    }
}

impl fmt::Debug for ResolveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveOptions")
            .field("extra", &self.extra)
            .field("ignore_key", &self.ignore_key)
            .finish()
    }
}

/// A URL template with named `:placeholder` segments.
///
/// Each placeholder is bound to a resolver function when the endpoint
/// is configured. Resolution substitutes every bound placeholder and
/// fails if any `:name` survives, so misconfiguration is caught at the
/// call site instead of producing a broken URL.
///
/// ```
/// use remodel_endpoint::{Endpoint, ResolveOptions};
///
/// let endpoint = Endpoint::new("apps/:app/items")
///     .placeholder("app", |_| "mail".to_string());
/// let url = endpoint.resolve(&ResolveOptions::new()).unwrap();
/// assert_eq!(url, "apps/mail/items");
/// ```
#[derive(Clone)]
pub struct Endpoint {
    template: String,
    placeholders: BTreeMap<String, PlaceholderFn>,
    ignore_key: bool,
}

impl Endpoint {
    /// Creates an endpoint from a template path.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            placeholders: BTreeMap::new(),
            ignore_key: false,
        }
    }

    /// Binds a placeholder to a resolver function.
    pub fn placeholder(
        mut self,
        name: impl Into<String>,
        resolver: impl Fn(&ResolveOptions) -> String + Send + Sync + 'static,
    ) -> Self {
        self.placeholders.insert(name.into(), Arc::new(resolver));
        self
    }

    /// Binds a placeholder to a constant value.
    pub fn fixed(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        self.placeholder(name, move |_| value.clone())
    }

    /// Never append the record key, even for persisted records.
    ///
    /// Used for creation-style endpoints that address the collection.
    pub fn ignore_key(mut self, ignore: bool) -> Self {
        self.ignore_key = ignore;
        self
    }

    /// Returns the raw template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Whether this endpoint suppresses key appending.
    pub fn ignores_key(&self) -> bool {
        self.ignore_key
    }

    /// Resolves the template to a collection-style path.
    ///
    /// Substitutes every bound placeholder, calling its resolver with
    /// `options`. Fails if a `:name` placeholder remains afterwards.
    pub fn resolve(&self, options: &ResolveOptions) -> EndpointResult<String> {
        let mut path = self.template.clone();

        for (name, resolver) in &self.placeholders {
            let needle = format!(":{name}");
            if path.contains(&needle) {
                path = path.replace(&needle, &resolver(options));
            }
        }

        if let Some(name) = leftover_placeholder(&path) {
            error!(template = %self.template, placeholder = %name, "endpoint placeholder has no resolver");
            return Err(EndpointError::UnresolvedPlaceholder { name });
        }

        Ok(path)
    }

    /// Resolves the template for a single record.
    ///
    /// A record without a key (never persisted) resolves to the
    /// collection-style path, used for creation. Otherwise the key is
    /// appended as one extra path segment with exactly one separator,
    /// unless key appending is suppressed on the endpoint or in
    /// `options`.
    pub fn resolve_for_key(
        &self,
        key: Option<&str>,
        options: &ResolveOptions,
    ) -> EndpointResult<String> {
        let path = self.resolve(options)?;

        match key {
            Some(key) if !self.ignore_key && !options.ignores_key() => {
                let slash = if path.ends_with('/') { "" } else { "/" };
                Ok(format!("{path}{slash}{key}"))
            }
            _ => Ok(path),
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("template", &self.template)
            .field("placeholders", &self.placeholders.keys().collect::<Vec<_>>())
            .field("ignore_key", &self.ignore_key)
            .finish()
    }
}

/// Finds the first `:name` placeholder still present in a path.
fn leftover_placeholder(path: &str) -> Option<String> {
    let bytes = path.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b':' {
            continue;
        }
        let rest = &path[i + 1..];
        let name: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        if name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        {
            return Some(name);
        }
    }
    None
}
