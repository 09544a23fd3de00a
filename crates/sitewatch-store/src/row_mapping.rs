//! Row <-> domain type conversions shared by the snapshot, target, and
//! alert stores.

use chrono::{DateTime, Utc};
use rusqlite::Row;

use sitewatch_core::differ::ReplayOp;
use sitewatch_core::errors::{ErrorKind, WatchError};
use sitewatch_core::models::{Alert, ChangeRecord, Snapshot, SnapshotDiff, Target};
use sitewatch_core_types::{AlertId, AlertStatus, ChangeType};

pub fn parse_severity(s: &str) -> sitewatch_core::errors::Result<sitewatch_core_types::Severity> {
    use sitewatch_core_types::Severity::*;
    Ok(match s {
        "low" => Low,
        "medium" => Medium,
        "high" => High,
        "critical" => Critical,
        other => {
            return Err(WatchError::new(ErrorKind::Serialization)
                .with_message(format!("unknown severity in database row: {other}")))
        }
    })
}

pub fn parse_change_type(s: &str) -> sitewatch_core::errors::Result<ChangeType> {
    use ChangeType::*;
    Ok(match s {
        "content" => Content,
        "design" => Design,
        "pricing" => Pricing,
        "feature" => Feature,
        "other" => Other,
        other => {
            return Err(WatchError::new(ErrorKind::Serialization)
                .with_message(format!("unknown change_type in database row: {other}")))
        }
    })
}

pub fn parse_alert_status(s: &str) -> sitewatch_core::errors::Result<AlertStatus> {
    use AlertStatus::*;
    Ok(match s {
        "unread" => Unread,
        "read" => Read,
        "archived" => Archived,
        other => {
            return Err(WatchError::new(ErrorKind::Serialization)
                .with_message(format!("unknown alert status in database row: {other}")))
        }
    })
}

pub fn timestamp_to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}

pub fn target_from_row(row: &Row) -> rusqlite::Result<Target> {
    Ok(Target {
        id: sitewatch_core_types::TargetId::from_string(row.get::<_, String>("id")?),
        owner_user_id: row.get("owner_user_id")?,
        url: row.get("url")?,
        name: row.get("name")?,
        monitoring_enabled: row.get::<_, i64>("monitoring_enabled")? != 0,
        check_interval_secs: row.get::<_, i64>("check_interval_secs")? as u64,
        priority: row.get("priority")?,
        deleted: row.get::<_, i64>("deleted")? != 0,
        total_versions: row.get::<_, i64>("total_versions")? as u64,
        last_checked_at: row
            .get::<_, Option<i64>>("last_checked_at")?
            .map(timestamp_to_datetime),
        last_change_at: row
            .get::<_, Option<i64>>("last_change_at")?
            .map(timestamp_to_datetime),
        last_error: row.get("last_error")?,
        created_at: timestamp_to_datetime(row.get("created_at")?),
        updated_at: timestamp_to_datetime(row.get("updated_at")?),
    })
}

pub fn snapshot_from_row(row: &Row) -> rusqlite::Result<Snapshot> {
    let severity_raw: String = row.get("severity")?;
    let change_type_raw: String = row.get("change_type")?;
    let metadata_raw: String = row.get("metadata")?;

    Ok(Snapshot {
        id: sitewatch_core_types::SnapshotId::from_string(row.get::<_, String>("id")?),
        target_id: sitewatch_core_types::TargetId::from_string(row.get::<_, String>("target_id")?),
        version_number: row.get::<_, i64>("version_number")? as u64,
        is_full: row.get::<_, i64>("is_full")? != 0,
        is_current: row.get::<_, i64>("is_current")? != 0,
        full_html: row.get("full_html")?,
        title: row.get("title")?,
        html_byte_len: row.get::<_, i64>("html_byte_len")? as usize,
        change_count: row.get::<_, i64>("change_count")? as u32,
        change_percentage: row.get("change_percentage")?,
        severity: parse_severity(&severity_raw).unwrap_or(sitewatch_core_types::Severity::Low),
        change_type: parse_change_type(&change_type_raw).unwrap_or(ChangeType::Other),
        summary: row.get("summary")?,
        metadata: serde_json::from_str(&metadata_raw).unwrap_or(serde_json::json!({})),
        created_at: timestamp_to_datetime(row.get("created_at")?),
    })
}

pub fn snapshot_diff_from_row(row: &Row) -> rusqlite::Result<SnapshotDiff> {
    let records_raw: String = row.get("records")?;
    let records: Vec<ChangeRecord> = serde_json::from_str(&records_raw).unwrap_or_default();
    let replay_ops_raw: String = row.get("replay_ops")?;
    let replay_ops: Vec<ReplayOp> = serde_json::from_str(&replay_ops_raw).unwrap_or_default();

    Ok(SnapshotDiff {
        id: sitewatch_core_types::SnapshotDiffId::from_string(row.get::<_, String>("id")?),
        from_snapshot_id: sitewatch_core_types::SnapshotId::from_string(
            row.get::<_, String>("from_snapshot_id")?,
        ),
        to_snapshot_id: sitewatch_core_types::SnapshotId::from_string(
            row.get::<_, String>("to_snapshot_id")?,
        ),
        records,
        replay_ops,
        added_chars: row.get::<_, i64>("added_chars")? as u64,
        removed_chars: row.get::<_, i64>("removed_chars")? as u64,
        summary: row.get("summary")?,
    })
}

pub fn alert_from_row(row: &Row) -> rusqlite::Result<Alert> {
    let severity_raw: String = row.get("severity")?;
    let change_type_raw: String = row.get("change_type")?;
    let status_raw: String = row.get("status")?;
    let enrichment_raw: Option<String> = row.get("enrichment")?;

    Ok(Alert {
        id: AlertId::from_string(row.get::<_, String>("id")?),
        target_id: sitewatch_core_types::TargetId::from_string(row.get::<_, String>("target_id")?),
        snapshot_id: sitewatch_core_types::SnapshotId::from_string(
            row.get::<_, String>("snapshot_id")?,
        ),
        title: row.get("title")?,
        message: row.get("message")?,
        change_type: parse_change_type(&change_type_raw).unwrap_or(ChangeType::Other),
        severity: parse_severity(&severity_raw).unwrap_or(sitewatch_core_types::Severity::Low),
        change_count: row.get::<_, i64>("change_count")? as u32,
        version_number: row.get::<_, i64>("version_number")? as u64,
        status: parse_alert_status(&status_raw).unwrap_or(AlertStatus::Unread),
        enrichment: enrichment_raw.and_then(|s| serde_json::from_str(&s).ok()),
        created_at: timestamp_to_datetime(row.get("created_at")?),
    })
}
