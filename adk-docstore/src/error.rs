//! Error types for the `adk-docstore` crate.

use thiserror::Error;

/// Errors raised while compiling a metadata filter.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FilterError {
    /// The filter used an operator that is unknown or not enabled.
    #[error("unknown filter operator '{0}'")]
    UnknownOperator(String),

    /// An operand had the wrong shape or type for its operator.
    #[error("invalid operand for '{operator}' on key '{key}': {message}")]
    InvalidOperand {
        /// The metadata key the operand applies to.
        key: String,
        /// The operator the operand was given to (`eq` for plain entries).
        operator: String,
        /// A description of the mismatch.
        message: String,
    },
}

/// Errors that can occur in document store operations.
#[derive(Debug, Error)]
pub enum DocStoreError {
    /// Malformed input from the caller.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The metadata filter could not be compiled.
    #[error("Filter error: {0}")]
    FilterError(#[from] FilterError),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the backing store.
    #[error("Storage error ({backend}): {message}")]
    StorageError {
        /// The backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// The broad category of a [`DocStoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller input was rejected.
    Validation,
    /// The filter expression was rejected.
    Filter,
    /// The embedding provider failed.
    Embedding,
    /// The backing store failed.
    Storage,
    /// The store configuration was rejected.
    Config,
}

impl DocStoreError {
    /// Return the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationError(_) => ErrorKind::Validation,
            Self::FilterError(_) => ErrorKind::Filter,
            Self::EmbeddingError { .. } => ErrorKind::Embedding,
            Self::StorageError { .. } => ErrorKind::Storage,
            Self::ConfigError(_) => ErrorKind::Config,
        }
    }

    /// Whether the error came from infrastructure (embedding provider or
    /// backing store) rather than from the caller's input.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Embedding | ErrorKind::Storage)
    }

    pub(crate) fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingError { provider: provider.into(), message: message.into() }
    }

    pub(crate) fn storage(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StorageError { backend: backend.into(), message: message.into() }
    }
}

/// A convenience result type for document store operations.
pub type Result<T> = std::result::Result<T, DocStoreError>;
