use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::BookingStatus;
use crate::store::StoreError;

/// Everything a booking, ledger, shift or report operation can fail with.
///
/// All variants except [`EngineError::Persistence`] are final answers for the caller and
/// leave no state behind. Persistence failures roll the whole unit back and may be retried.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Not enough tickets")]
    InsufficientBalance {
        holder_id: Uuid,
        balance: i64,
        requested: i64,
    },

    #[error("This time slot is no longer available")]
    ShiftNotAvailable,

    #[error("This shift has a confirmed booking and cannot be withdrawn")]
    ShiftInUse,

    #[error("Shifts dated before yesterday can no longer be changed")]
    PastDateImmutable,

    #[error("The cancellation deadline ({deadline}) has passed")]
    PastCancelDeadline { deadline: DateTime<Utc> },

    #[error("Booking is already {0:?}")]
    AlreadyTerminal(BookingStatus),

    #[error("A report can only be written after the lesson date")]
    LessonNotFinished,

    #[error("Persistence failure")]
    Persistence(#[from] StoreError),
}

impl EngineError {
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::Forbidden(_) => "FORBIDDEN",
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            EngineError::ShiftNotAvailable => "SHIFT_NOT_AVAILABLE",
            EngineError::ShiftInUse => "SHIFT_IN_USE",
            EngineError::PastDateImmutable => "PAST_DATE_IMMUTABLE",
            EngineError::PastCancelDeadline { .. } => "PAST_CANCEL_DEADLINE",
            EngineError::AlreadyTerminal(_) => "ALREADY_TERMINAL",
            EngineError::LessonNotFinished => "LESSON_NOT_FINISHED",
            EngineError::Persistence(_) => "PERSISTENCE_FAILURE",
        }
    }

    pub fn not_found(resource: &str, id: Uuid) -> Self {
        EngineError::NotFound(format!("{resource} with id '{id}' was not found"))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
