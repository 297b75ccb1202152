use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::permissions::{Capability, Role};

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub capabilities: Vec<Capability>,
}

/// GET /api/auth/whoami - identity plus resolved role and capabilities.
///
/// A role lookup failure degrades to no role rather than an error.
pub async fn whoami(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<WhoAmI> {
    let resolver = state.roles.resolver_for(user.user_id).await;

    Ok(ApiResponse::success(WhoAmI {
        user_id: user.user_id,
        email: user.email,
        role: resolver.role(),
        capabilities: resolver.capabilities(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CanRequest {
    pub capabilities: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CanResponse {
    pub allowed: bool,
    pub granted: Vec<Capability>,
}

/// POST /api/auth/can - true when the caller holds any of the listed capabilities
pub async fn can(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CanRequest>, JsonRejection>,
) -> ApiResult<CanResponse> {
    let Json(payload) = payload?;
    let requested = payload
        .capabilities
        .iter()
        .map(|name| name.parse::<Capability>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(ApiError::bad_request)?;

    let resolver = state.roles.resolver_for(user.user_id).await;
    let granted = requested
        .iter()
        .copied()
        .filter(|capability| resolver.can(*capability))
        .collect();

    Ok(ApiResponse::success(CanResponse {
        allowed: resolver.can_any(&requested),
        granted,
    }))
}
