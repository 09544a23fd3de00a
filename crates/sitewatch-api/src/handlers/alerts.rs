//! `GET /alerts` and `PUT /alerts/{id}` for status transitions.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sitewatch_core_types::{AlertId, AlertStatus, ChangeType, Severity, TargetId};

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    #[serde(rename = "targetId")]
    pub target_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AlertBody {
    pub id: String,
    pub target_id: String,
    pub snapshot_id: String,
    pub title: String,
    pub message: String,
    pub change_type: ChangeType,
    pub severity: Severity,
    pub change_count: u32,
    pub version_number: u64,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
}

impl From<sitewatch_core::models::Alert> for AlertBody {
    fn from(a: sitewatch_core::models::Alert) -> Self {
        Self {
            id: a.id.as_str().to_string(),
            target_id: a.target_id.as_str().to_string(),
            snapshot_id: a.snapshot_id.as_str().to_string(),
            title: a.title,
            message: a.message,
            change_type: a.change_type,
            severity: a.severity,
            change_count: a.change_count,
            version_number: a.version_number,
            status: a.status,
            created_at: a.created_at,
        }
    }
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<Vec<AlertBody>>, ApiError> {
    let alerts = state.core.alerts.lock().await;
    let rows = match query.target_id {
        Some(raw) => alerts.list_for_target(&TargetId::from_string(raw))?,
        None => alerts.list_all()?,
    };
    Ok(Json(rows.into_iter().map(AlertBody::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateAlertBody {
    pub status: AlertStatus,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateAlertBody>,
) -> Result<Json<AlertBody>, ApiError> {
    let alert_id = AlertId::from_string(id);
    let alerts = state.core.alerts.lock().await;
    alerts.set_status(&alert_id, body.status)?;
    Ok(Json(alerts.get(&alert_id)?.into()))
}
