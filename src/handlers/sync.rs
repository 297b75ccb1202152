use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::sync::{Leg, SyncDirection, SyncReport};

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub direction: String,
}

#[derive(Debug, Serialize)]
pub struct LegSummary {
    pub leg: Leg,
    pub read: usize,
    pub written: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
pub struct SyncSummary {
    pub direction: SyncDirection,
    pub legs: Vec<LegSummary>,
}

impl From<&SyncReport> for SyncSummary {
    fn from(report: &SyncReport) -> Self {
        Self {
            direction: report.direction,
            legs: report
                .legs
                .iter()
                .map(|leg| LegSummary {
                    leg: leg.leg,
                    read: leg.read,
                    written: leg.written,
                    failed: leg.failed.len(),
                })
                .collect(),
        }
    }
}

/// POST /api/sync - run a directory sync as the calling administrator
///
/// ```json
/// { "direction": "bidirectional" | "source-to-dest" | "dest-to-source" }
/// ```
pub async fn sync_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<SyncRequest>, JsonRejection>,
) -> ApiResult<SyncSummary> {
    let Json(payload) = payload?;
    let direction: SyncDirection = payload.direction.parse().map_err(ApiError::bad_request)?;

    let report = state.sync.trigger(user.user_id, direction).await?;

    Ok(ApiResponse::success(SyncSummary::from(&report)).with_message(report.message()))
}
