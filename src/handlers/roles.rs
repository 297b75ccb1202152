use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::permissions::{Capability, Role};
use crate::services::RoleAssignment;

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role: String,
}

fn parse_role(raw: &str) -> Result<Role, ApiError> {
    raw.parse::<Role>().map_err(ApiError::bad_request)
}

/// GET /api/roles/:user_id
pub async fn roles_get(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<RoleAssignment> {
    state.roles.authorize(actor.user_id, Capability::ManageRoles).await?;
    Ok(ApiResponse::success(state.roles.assignment(user_id).await?))
}

/// PUT /api/roles/:user_id - replace the user's role rows with one role
pub async fn roles_put(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    payload: Result<Json<AssignRoleRequest>, JsonRejection>,
) -> ApiResult<RoleAssignment> {
    state.roles.authorize(actor.user_id, Capability::ManageRoles).await?;
    let Json(payload) = payload?;
    let role = parse_role(&payload.role)?;

    let assignment = state.roles.assign(user_id, role).await?;
    Ok(ApiResponse::success(assignment).with_message(format!("Assigned role {}", role)))
}

/// DELETE /api/roles/:user_id/:role
pub async fn roles_delete(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path((user_id, role)): Path<(Uuid, String)>,
) -> ApiResult<RoleAssignment> {
    state.roles.authorize(actor.user_id, Capability::ManageRoles).await?;
    let role = parse_role(&role)?;

    let assignment = state.roles.revoke(user_id, role).await?;
    Ok(ApiResponse::success(assignment).with_message(format!("Revoked role {}", role)))
}
