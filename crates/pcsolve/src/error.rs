//! Error types for pcsolve.

use std::io;

/// Result type alias for pcsolve operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, resolving, or rendering.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A requested or transitively required component has no descriptor.
    #[error("Package '{name}' was not found in the pkg-config search path")]
    ComponentNotFound { name: String },

    /// A version comparator on a dependency edge was not satisfied.
    #[error(
        "Package '{name}' version '{found}' does not satisfy constraint '{comparator} {required}'"
    )]
    VersionMismatch {
        name: String,
        found: String,
        comparator: String,
        required: String,
    },

    /// The traversal depth bound was hit.
    #[error("Maximum traversal depth ({depth}) exceeded: {}", .chain.join(" -> "))]
    DepthExceeded { depth: usize, chain: Vec<String> },

    /// A fragment could not be turned into flag text.
    #[error("Cannot render fragment '{fragment}': {reason}")]
    FragmentRenderFailure { fragment: String, reason: String },

    /// An unrecognized or contradictory filter/configuration option.
    #[error("Invalid option '{option}': {message}")]
    ConfigurationError { option: String, message: String },

    /// A variable expanded into itself (directly or indirectly).
    #[error("Circular variable reference detected for '{variable}'")]
    CircularVariableReference { variable: String },

    /// An invalid comparator operator was encountered.
    #[error("Invalid comparator operator: '{operator}'")]
    InvalidComparator { operator: String },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether this error means "the component does not exist".
    ///
    /// Best-effort queries (versions, variables) turn these into "no value"
    /// instead of failing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ComponentNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::ComponentNotFound {
            name: "zlib".to_string(),
        };
        assert!(err.to_string().contains("zlib"));

        let err = Error::VersionMismatch {
            name: "glib".to_string(),
            found: "2.0".to_string(),
            comparator: ">=".to_string(),
            required: "3.0".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("glib"));
        assert!(msg.contains("2.0"));
        assert!(msg.contains(">= 3.0"));
    }

    #[test]
    fn depth_exceeded_lists_chain() {
        let err = Error::DepthExceeded {
            depth: 2,
            chain: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("(2)"));
        assert!(msg.contains("a -> b -> c"));
    }

    #[test]
    fn not_found_classification() {
        assert!(Error::ComponentNotFound { name: "x".into() }.is_not_found());
        assert!(
            !Error::ConfigurationError {
                option: "only_X".into(),
                message: "unknown".into(),
            }
            .is_not_found()
        );
    }

    #[test]
    fn io_error_converts() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("nope"));
    }
}
