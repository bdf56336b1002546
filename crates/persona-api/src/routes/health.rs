use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{error::ApiResult, extract::ClientIp, state::AppState};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub reply: String,
}

/// Health check endpoint
///
/// Counted against the caller's IP like every other route.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
        (status = 429, description = "Rate limit exceeded", body = crate::error::ErrorBody)
    ),
    tag = "health"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
) -> ApiResult<Json<HealthResponse>> {
    state.rate_limiter.check(ip, None)?;

    Ok(Json(HealthResponse {
        reply: "Server is running".to_string(),
    }))
}
