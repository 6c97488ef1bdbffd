use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::config::cors::USER_ID_HEADER;
use crate::engine::EngineError;
use crate::models::Profile;
use crate::state::AppState;
use crate::utils::error::AppError;

/// Resolved profile of the caller.
///
/// Authentication happens upstream; the gateway forwards the verified user id in
/// `X-User-Id`. A missing or malformed id is a 401, an unknown one a 404.
#[derive(Debug, Clone)]
pub struct Caller(pub Profile);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthenticated("Missing caller identity".to_string()))?;
        let id = raw
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or_else(|| AppError::Unauthenticated("Malformed caller identity".to_string()))?;

        let profile = state.engine.profile(id).await.map_err(|e| match e {
            EngineError::NotFound(_) => AppError::NotFound(format!("Profile '{id}' was not found")),
            other => AppError::from(other),
        })?;
        Ok(Caller(profile))
    }
}
