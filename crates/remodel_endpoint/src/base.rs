//! Base URL composition.

/// Root path configuration for all resolved URLs.
///
/// Bundles the application base path with an optional locale prefix
/// (e.g. `"en"` on a multi-language deployment). Passed explicitly to
/// the components that build URLs; there is no global settings store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl {
    base_path: String,
    locale_prefix: Option<String>,
}

impl BaseUrl {
    /// Creates a base URL from an application base path.
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            locale_prefix: None,
        }
    }

    /// Sets the locale prefix inserted between base path and resource path.
    pub fn with_locale_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.locale_prefix = Some(prefix.into());
        self
    }

    /// Returns the base path.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Returns the locale prefix, if any.
    pub fn locale_prefix(&self) -> Option<&str> {
        self.locale_prefix.as_deref()
    }

    /// Joins a resource path under the base, locale prefix included.
    pub fn join(&self, path: &str) -> String {
        match &self.locale_prefix {
            Some(prefix) => join_segments(&join_segments(&self.base_path, prefix), path),
            None => join_segments(&self.base_path, path),
        }
    }

    /// Joins a resource path under the bare base path, skipping the
    /// locale prefix.
    pub fn join_base_only(&self, path: &str) -> String {
        join_segments(&self.base_path, path)
    }
}

impl Default for BaseUrl {
    fn default() -> Self {
        Self::new("/")
    }
}

/// Joins two path segments with exactly one `/` between them,
/// regardless of whether `base` already ends or `path` already starts
/// with one.
pub fn join_segments(base: &str, path: &str) -> String {
    let base = base.strip_suffix('/').unwrap_or(base);
    let path = path.strip_prefix('/').unwrap_or(path);
    format!("{base}/{path}")
}
