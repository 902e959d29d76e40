//! Error types shared across ports and adapters.

use thiserror::Error;

/// Infrastructure-level errors surfaced by the persistence ports.
///
/// Adapters translate driver-specific failures into these variants so the
/// application layer can decide on retryability without knowing which store
/// backs a port.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// The underlying store rejected or failed the operation.
    #[error("Database error: {0}")]
    Database(String),

    /// A record expected to exist was not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A concurrent write invalidated this operation.
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    /// Creates a database error from any displayable cause.
    pub fn database(cause: impl std::fmt::Display) -> Self {
        DomainError::Database(cause.to_string())
    }

    /// Creates a not-found error for the given entity and identifier.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        DomainError::NotFound {
            entity,
            id: id.into(),
        }
    }
}
