use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::engine::EngineError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Engine(e) => match e {
                EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                EngineError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
                EngineError::Validation(_)
                | EngineError::InsufficientBalance { .. }
                | EngineError::ShiftNotAvailable
                | EngineError::ShiftInUse
                | EngineError::PastDateImmutable
                | EngineError::PastCancelDeadline { .. }
                | EngineError::AlreadyTerminal(_)
                | EngineError::LessonNotFinished => StatusCode::BAD_REQUEST,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Engine(e) => e.code(),
        }
    }

    fn log(&self) {
        match self {
            AppError::Engine(EngineError::Persistence(e)) => {
                error!(error = ?e, "Persistence failure");
            }
            other => {
                warn!(code = other.code(), message = %other, "Request rejected");
            }
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Engine(EngineError::InsufficientBalance {
                balance, requested, ..
            }) => Some(json!({ "balance": balance, "requested": requested })),
            AppError::Engine(EngineError::PastCancelDeadline { deadline }) => {
                Some(json!({ "deadline": deadline }))
            }
            _ => None,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        self.log();

        // Persistence failures are reported without internals.
        let public_message = match &self {
            AppError::Engine(EngineError::Persistence(_)) => {
                "A database error occurred, please retry".to_string()
            }
            AppError::ValidationError(msg)
            | AppError::Unauthenticated(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::Engine(e) => e.to_string(),
        };

        error_response(code, public_message, self.details(), status)
    }
}
