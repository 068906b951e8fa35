//! Error types for typed error handling.
//!
//! Every variant here is a contract-level failure: the operation did not
//! complete. Statement-level failures reported by a backend (invalid SQL,
//! constraint violations, unsupported settings) are not errors; they come
//! back as an [`Envelope`](crate::Envelope) with `success == false`.

use uuid::Uuid;

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Session errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Missing or invalid configuration detected at construction time.
    #[error("configuration error: {0}")]
    Config(String),

    /// The HTTP request could not be completed (DNS, TLS, timeout, ...).
    #[error("transport error in {context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: Box<ureq::Error>,
    },

    /// The remote service answered with a body that is not an envelope.
    #[error("malformed response (HTTP {status}): {source}")]
    MalformedResponse {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// No open database is addressed by this identifier.
    #[error("database not found: {id}")]
    DatabaseNotFound { id: Uuid },

    /// No identifier is registered under this name.
    #[error("no database registered under name '{name}'")]
    NameNotFound { name: String },

    /// The embedded engine failed outside of statement execution.
    #[error("sqlite error in {context}: {source}")]
    Sqlite {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    /// IO error with context.
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a transport error with context.
    pub fn transport(context: impl Into<String>, source: ureq::Error) -> Self {
        Self::Transport {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Create a sqlite error with context.
    pub fn sqlite(context: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Sqlite {
            context: context.into(),
            source,
        }
    }

    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns true if the error means the addressed database does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::DatabaseNotFound { .. } | Self::NameNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(Error::DatabaseNotFound { id: Uuid::nil() }.is_not_found());
        assert!(
            Error::NameNotFound {
                name: "t1".to_string()
            }
            .is_not_found()
        );
        assert!(!Error::config("missing token").is_not_found());
    }

    #[test]
    fn test_display_includes_context() {
        let err = Error::io(
            "removing database file",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            err.to_string(),
            "IO error in removing database file: denied"
        );
    }
}
