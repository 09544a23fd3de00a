//! Handlers for `/targets` and its sub-resources.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use sitewatch_core::errors::{ErrorKind, WatchError};
use sitewatch_core::models::Target;
use sitewatch_core_types::TargetId;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTargetBody {
    pub owner_user_id: String,
    pub url: String,
    pub name: String,
    pub check_interval_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct TargetBody {
    pub id: String,
    pub url: String,
    pub name: String,
    pub monitoring_enabled: bool,
    pub check_interval_secs: u64,
    pub priority: i32,
    pub total_versions: u64,
}

impl From<Target> for TargetBody {
    fn from(t: Target) -> Self {
        Self {
            id: t.id.as_str().to_string(),
            url: t.url,
            name: t.name,
            monitoring_enabled: t.monitoring_enabled,
            check_interval_secs: t.check_interval_secs,
            priority: t.priority,
            total_versions: t.total_versions,
        }
    }
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTargetBody>,
) -> Result<(StatusCode, Json<TargetBody>), ApiError> {
    let mut target = Target::new(body.owner_user_id, body.url, body.name);
    if let Some(interval) = body.check_interval_secs {
        target.check_interval_secs = interval;
    }
    let targets = state.core.targets.lock().await;
    targets.create(&target)?;
    Ok((StatusCode::CREATED, Json(target.into())))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTargetBody {
    pub name: Option<String>,
    pub url: Option<String>,
    pub priority: Option<i32>,
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateTargetBody>,
) -> Result<Json<TargetBody>, ApiError> {
    let target_id = parse_target_id(&id)?;
    let targets = state.core.targets.lock().await;
    targets.update(&target_id, body.name.as_deref(), body.url.as_deref(), body.priority)?;
    Ok(Json(targets.get(&target_id)?.into()))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let target_id = parse_target_id(&id)?;
    state.core.delete_target(&target_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Default)]
pub struct CaptureOptions {
    pub html: Option<String>,
    pub simulate: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CaptureBody {
    #[serde(default)]
    pub options: CaptureOptions,
}

#[derive(Debug, Serialize)]
pub struct CaptureAccepted {
    pub accepted: bool,
    pub target_id: String,
}

pub async fn capture(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<CaptureBody>,
) -> Result<Json<CaptureAccepted>, ApiError> {
    let target_id = parse_target_id(&id)?;
    let url = {
        let targets = state.core.targets.lock().await;
        targets.get(&target_id)?.url
    };

    let accepted = state
        .core
        .scheduler
        .submit_manual(target_id.clone(), url, body.options.html)
        .await;

    if !accepted {
        return Err(ApiError(
            WatchError::new(ErrorKind::TargetLocked)
                .with_op("capture")
                .with_target_id(target_id.as_str()),
        ));
    }

    Ok(Json(CaptureAccepted {
        accepted: true,
        target_id: target_id.as_str().to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct StartMonitoringBody {
    pub interval: Option<u64>,
}

pub async fn start_monitoring(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<StartMonitoringBody>,
) -> Result<StatusCode, ApiError> {
    let target_id = parse_target_id(&id)?;
    let targets = state.core.targets.lock().await;
    targets.get(&target_id)?;
    targets.set_monitoring(&target_id, true, body.interval)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn disable_monitoring(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let target_id = parse_target_id(&id)?;
    let targets = state.core.targets.lock().await;
    targets.get(&target_id)?;
    targets.set_monitoring(&target_id, false, None)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringStatus {
    pub monitoring_enabled: bool,
    pub status: &'static str,
    pub last_checked_at: Option<chrono::DateTime<Utc>>,
    pub next_capture: Option<chrono::DateTime<Utc>>,
}

pub async fn monitoring_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MonitoringStatus>, ApiError> {
    let target_id = parse_target_id(&id)?;
    let targets = state.core.targets.lock().await;
    let target = targets.get(&target_id)?;

    let status = if !target.monitoring_enabled {
        "paused"
    } else if target.last_checked_at.is_none() {
        "never"
    } else {
        "active"
    };

    let next_capture = target
        .last_checked_at
        .map(|last| last + chrono::Duration::seconds(target.check_interval_secs as i64));

    Ok(Json(MonitoringStatus {
        monitoring_enabled: target.monitoring_enabled,
        status,
        last_checked_at: target.last_checked_at,
        next_capture,
    }))
}

pub(crate) fn parse_target_id(raw: &str) -> Result<TargetId, ApiError> {
    Ok(TargetId::from_string(raw.to_string()))
}
