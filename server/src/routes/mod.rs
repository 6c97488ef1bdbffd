use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{bookings, health_check, reports, shifts, tickets};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/bookings",
            post(bookings::create_booking).get(bookings::list_bookings),
        )
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/cancel", post(bookings::cancel_booking))
        .route(
            "/bookings/:id/report",
            post(reports::file_report).get(reports::view_report),
        )
        .route("/reports/:id", put(reports::edit_report))
        .route("/tickets/purchase", post(tickets::purchase_tickets))
        .route("/tickets/balance", get(tickets::ticket_balance))
        .route("/tutor/shifts", post(shifts::set_shift))
        .route("/tutors/:id/shifts", get(shifts::open_shifts))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
}
