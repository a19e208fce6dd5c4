//! Error kinds surfaced to synchronous callers

use thiserror::Error;

/// Failure of a request-driven query (hourly lookup, current weather).
///
/// The variants are kept apart so the boundary layer can tell a bad request
/// from an unsatisfiable one and from a broken upstream.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream failure: {0}")]
    Upstream(String),
}

impl QueryError {
    /// Wrap a provider error, keeping the whole context chain in the message.
    pub fn upstream(err: &anyhow::Error) -> Self {
        QueryError::Upstream(format!("{err:#}"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, QueryError::NotFound(_))
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
