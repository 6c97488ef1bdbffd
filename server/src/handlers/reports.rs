use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use uuid::Uuid;

use super::auth::Caller;
use crate::engine::ReportRequest;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn file_report(
    State(state): State<AppState>,
    Caller(caller): Caller,
    booking_id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Path(booking_id) = booking_id?;
    let Json(request) = payload?;
    let report = state
        .engine
        .reports()
        .file(booking_id, &caller, request, state.clock.now())
        .await?;
    Ok(success(report, "Report filed"))
}

pub async fn edit_report(
    State(state): State<AppState>,
    Caller(caller): Caller,
    report_id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Path(report_id) = report_id?;
    let Json(request) = payload?;
    let report = state
        .engine
        .reports()
        .edit(report_id, &caller, request, state.clock.now())
        .await?;
    Ok(success(report, "Report updated"))
}

pub async fn view_report(
    State(state): State<AppState>,
    Caller(caller): Caller,
    booking_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(booking_id) = booking_id?;
    let view = state.engine.reports().view(booking_id, &caller).await?;
    Ok(success(view, "Report found"))
}
