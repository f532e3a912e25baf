//! Error types for endpoint resolution.

use thiserror::Error;

/// Result type for endpoint resolution.
pub type EndpointResult<T> = Result<T, EndpointError>;

/// Errors raised while building a URL.
///
/// These are configuration errors: the endpoint template or its
/// placeholder map is wrong, and no URL can be produced. Callers abort
/// the operation and surface the error; nothing is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// The requesting resource has no endpoint configured.
    #[error("no endpoint specified")]
    Missing,

    /// A `:name` placeholder was still present after substitution.
    #[error("endpoint placeholder \":{name}\" has no resolver")]
    UnresolvedPlaceholder {
        /// Placeholder name as written in the template.
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(EndpointError::Missing.to_string(), "no endpoint specified");

        let err = EndpointError::UnresolvedPlaceholder { name: "id".into() };
        assert!(err.to_string().contains(":id"));
    }
}
