//! `GET /changes?targetId=…` — lists a target's snapshot history, newest
//! first. Each entry reports what changed at that version, not the full
//! HTML payload.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sitewatch_core::errors::{ErrorKind, WatchError};
use sitewatch_core_types::{ChangeType, Severity};

use crate::error::ApiError;
use crate::handlers::targets::parse_target_id;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChangesQuery {
    #[serde(rename = "targetId")]
    pub target_id: String,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ChangeEntry {
    pub id: String,
    pub version_number: u64,
    pub is_full: bool,
    pub change_count: u32,
    pub change_percentage: f64,
    pub severity: Severity,
    pub change_type: ChangeType,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChangesQuery>,
) -> Result<Json<Vec<ChangeEntry>>, ApiError> {
    let target_id = parse_target_id(&query.target_id)?;
    if query.target_id.trim().is_empty() {
        return Err(ApiError(
            WatchError::new(ErrorKind::Validation)
                .with_op("list_changes")
                .with_message("targetId is required"),
        ));
    }

    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let offset = query.offset.unwrap_or(0).max(0);

    let snapshots = {
        let guard = state.core.snapshots.lock().await;
        guard.list(&target_id, limit, offset)?
    };

    Ok(Json(
        snapshots
            .into_iter()
            .map(|s| ChangeEntry {
                id: s.id.as_str().to_string(),
                version_number: s.version_number,
                is_full: s.is_full,
                change_count: s.change_count,
                change_percentage: s.change_percentage,
                severity: s.severity,
                change_type: s.change_type,
                summary: s.summary,
                created_at: s.created_at,
            })
            .collect(),
    ))
}
