//! Service error taxonomy with stable wire codes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use domain::{Forbidden, OrderError};
use store::StoreError;

/// Stable error codes the presentation layer can branch on without parsing
/// message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    Forbidden,
    Unauthorized,
    Conflict,
    InternalError,
}

impl ErrorCode {
    /// Returns the wire name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors returned by the order service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or missing required input, or a reference to an entity
    /// that does not exist or is inactive.
    #[error("{0}")]
    Validation(String),

    /// The requested entity is absent or soft-deleted.
    #[error("{0}")]
    NotFound(String),

    /// The actor's role lacks permission for the operation.
    #[error(transparent)]
    Forbidden(#[from] Forbidden),

    /// No or invalid actor identity. Authentication lives in the transport
    /// layer; the code is surfaced here for a complete taxonomy.
    #[error("{0}")]
    Unauthorized(String),

    /// Illegal state transition, exhausted order-number sequence, or a
    /// concurrent-modification race that outlived its retries.
    #[error("{0}")]
    Conflict(String),

    /// Unclassified storage failure. Never swallowed; logged for operator
    /// attention and surfaced as an internal failure.
    #[error("storage failure: {0}")]
    Storage(#[source] StoreError),
}

impl ServiceError {
    /// Returns the stable wire code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Validation(_) => ErrorCode::ValidationError,
            ServiceError::NotFound(_) => ErrorCode::NotFound,
            ServiceError::Forbidden(_) => ErrorCode::Forbidden,
            ServiceError::Unauthorized(_) => ErrorCode::Unauthorized,
            ServiceError::Conflict(_) => ErrorCode::Conflict,
            ServiceError::Storage(_) => ErrorCode::InternalError,
        }
    }
}

impl From<OrderError> for ServiceError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::TerminalStatus { .. }
            | OrderError::IllegalTransition { .. }
            | OrderError::SequenceExhausted { .. } => ServiceError::Conflict(e.to_string()),
            OrderError::MalformedOrderNumber { .. } => ServiceError::Validation(e.to_string()),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            // allocation and revision races reaching this conversion have
            // exhausted their retries
            StoreError::DuplicateOrderNumber { .. } | StoreError::RevisionConflict { .. } => {
                ServiceError::Conflict(e.to_string())
            }
            other => {
                tracing::error!(error = %other, "storage failure");
                ServiceError::Storage(other)
            }
        }
    }
}
