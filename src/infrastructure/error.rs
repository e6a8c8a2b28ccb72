//! Infrastructure-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;

/// Infrastructure errors wrap application errors and add I/O-level concerns.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("tree dump {path}: {message}")]
    Dump { path: String, message: String },
}

impl InfraError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Raw failure reported by a remote tree source.
///
/// Only tree managers see these; they translate them into fetch errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("connection lost: {0}")]
    Disconnected(String),

    #[error("request timed out after {0} ms")]
    Timeout(u64),

    #[error("node {node_id} not found in tree {tree_id}")]
    NodeNotFound { tree_id: i64, node_id: i64 },

    #[error("tree {0} not found")]
    TreeNotFound(i64),
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;
