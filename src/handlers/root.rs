use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::app::AppState;

pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Flock API",
            "version": version,
            "description": "Member directory sync and role-based permissions",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/api/auth/whoami, /api/auth/can (protected)",
                "sync": "/api/sync (protected, administrator)",
                "roles": "/api/roles/:user_id[/:role] (protected, manage_roles)",
            }
        }
    }))
}

/// Liveness plus reachability of both stores
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    let (primary, secondary) = futures::future::join(state.primary.ping(), state.secondary.ping()).await;
    let status_of = |result: &Result<(), crate::database::DatabaseError>| match result {
        Ok(()) => json!("ok"),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            json!("unavailable")
        }
    };
    let stores = json!({
        "primary": status_of(&primary),
        "secondary": status_of(&secondary),
    });

    if primary.is_ok() && secondary.is_ok() {
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "stores": stores
                }
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "code": "SERVICE_UNAVAILABLE",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "stores": stores
                }
            })),
        )
    }
}
