// crates/proctor-server/src/error.rs
// ============================================================================
// Module: API Errors
// Description: HTTP error taxonomy and response mapping.
// Purpose: Render every handler failure as `{"detail": ...}` with a status.
// Dependencies: axum, proctor-core, proctor-storage, thiserror
// ============================================================================

//! ## Overview
//! [`ApiError`] is the single error type returned by handlers. Record store and
//! storage errors convert into it at the handler seam; the status code follows
//! the variant and the message becomes the `detail` field.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use proctor_core::ReportError;
use proctor_core::StoreError;
use proctor_core::TimestampError;
use proctor_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Handler error taxonomy.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Requested record or artifact is absent.
    #[error("{0}")]
    NotFound(String),
    /// Request body failed to decode.
    #[error("{0}")]
    Validation(String),
    /// Request carried an unsafe key or inconsistent data.
    #[error("{0}")]
    BadRequest(String),
    /// Storage backend or record store failed.
    #[error("{0}")]
    Storage(String),
    /// Unexpected internal failure.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Standard not-found error for a missing session.
    #[must_use]
    pub fn session_not_found() -> Self {
        Self::NotFound("Session not found".to_string())
    }

    /// Returns the HTTP status for the error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    /// Human-readable failure description.
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(ErrorBody {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<TimestampError> for ApiError {
    fn from(error: TimestampError) -> Self {
        Self::Validation(error.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Invalid(_) => Self::BadRequest(error.to_string()),
            StoreError::Io(_) | StoreError::Corrupt(_) | StoreError::Store(_) => {
                Self::Storage(error.to_string())
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound(_) => Self::NotFound(error.to_string()),
            StorageError::Invalid(_) => Self::BadRequest(error.to_string()),
            StorageError::Io(_)
            | StorageError::Backend(_)
            | StorageError::TooLarge { .. }
            | StorageError::Startup(_) => Self::Storage(error.to_string()),
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(error: ReportError) -> Self {
        Self::Internal(error.to_string())
    }
}
