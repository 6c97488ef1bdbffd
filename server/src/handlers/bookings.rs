use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use uuid::Uuid;

use super::auth::Caller;
use crate::engine::CreateBookingRequest;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub async fn create_booking(
    State(state): State<AppState>,
    Caller(caller): Caller,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let booking = state
        .engine
        .create_booking(&caller, request, state.clock.now())
        .await?;
    Ok(created(booking, "Booking confirmed"))
}

pub async fn list_bookings(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Response, AppError> {
    let bookings = state.engine.list_bookings(&caller, state.clock.now()).await?;
    let message = format!("{} booking(s)", bookings.len());
    Ok(success(bookings, message))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Caller(caller): Caller,
    booking_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(booking_id) = booking_id?;
    let booking = state
        .engine
        .booking(booking_id, &caller, state.clock.now())
        .await?;
    Ok(success(booking, "Booking found"))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    Caller(caller): Caller,
    booking_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(booking_id) = booking_id?;
    let booking = state
        .engine
        .cancel_booking(booking_id, &caller, state.clock.now())
        .await?;
    Ok(success(booking, "Booking cancelled and ticket refunded"))
}
