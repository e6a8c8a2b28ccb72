//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::lazy::NodeId;
use crate::domain::step::StepId;

/// Structured outcome of a failed child fetch, produced at the manager boundary.
///
/// Raw data-source errors never cross the manager; they are folded into one of
/// these variants so the tree can decide between "retry later" and "give up".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Source unreachable or timed out. The node stays unpopulated.
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    /// Payload cannot be interpreted. Retrying will not help.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// Backing state is unusable (e.g. a poisoned lock).
    #[error("backing state corrupted: {0}")]
    Corrupted(String),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Unavailable(_))
    }
}

/// Domain errors represent tree and strategy violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown tree node: {0:?}")]
    UnknownNode(NodeId),

    #[error("unknown step: {0:?}")]
    UnknownStep(StepId),

    #[error("cannot load children of '{node}': {source}")]
    Fetch {
        node: String,
        #[source]
        source: FetchError,
    },

    #[error("cannot open tree root: {0}")]
    Root(#[source] FetchError),

    #[error("strategy lock poisoned")]
    LockPoisoned,

    #[error("invalid step definition: {0}")]
    InvalidStep(String),
}

impl DomainError {
    /// True if asking again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            DomainError::Fetch { source, .. } | DomainError::Root(source) => source.is_retryable(),
            _ => false,
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
