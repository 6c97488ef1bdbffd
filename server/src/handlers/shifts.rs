use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use uuid::Uuid;

use super::auth::Caller;
use crate::engine::{EngineError, SetShiftRequest};
use crate::models::{Role, TimeSlot};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

/// Days shown when the caller gives no `to`.
const DEFAULT_WINDOW_DAYS: i64 = 13;

#[derive(Debug, Deserialize)]
pub struct OpenShiftsQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

pub async fn set_shift(
    State(state): State<AppState>,
    Caller(caller): Caller,
    payload: Result<Json<SetShiftRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    if caller.role != Role::Tutor {
        return Err(EngineError::Forbidden("Only tutors can set shifts".to_string()).into());
    }
    let time_slot = request
        .time_slot
        .parse::<TimeSlot>()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let shift = state
        .engine
        .shifts()
        .set_availability(
            caller.id,
            request.date,
            time_slot,
            request.is_available,
            state.clock.now(),
        )
        .await?;
    Ok(success(shift, "Shift saved"))
}

pub async fn open_shifts(
    State(state): State<AppState>,
    Caller(_caller): Caller,
    tutor_id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<OpenShiftsQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Path(tutor_id) = tutor_id?;
    let Query(query) = query?;
    let now = state.clock.now();

    let from = query
        .from
        .unwrap_or_else(|| state.engine.policy().local_today(now));
    let to = match query.to {
        Some(to) => to,
        None => from
            .checked_add_signed(Duration::days(DEFAULT_WINDOW_DAYS))
            .ok_or_else(|| {
                AppError::ValidationError(format!("'from' date {from} is out of range"))
            })?,
    };

    let shifts = state
        .engine
        .shifts()
        .open_shifts(tutor_id, from, to, now)
        .await?;
    let message = format!("{} open shift(s)", shifts.len());
    Ok(success(shifts, message))
}
