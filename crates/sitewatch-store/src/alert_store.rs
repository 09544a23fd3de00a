//! Persistence for `Alert` rows, materialized by `AlertWriter`.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use sitewatch_core::models::Alert;
use sitewatch_core_types::{AlertId, AlertStatus, TargetId};

use crate::errors::{from_rusqlite, not_found, Result};
use crate::row_mapping::alert_from_row;

pub struct AlertStore {
    conn: Connection,
}

impl AlertStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Inserts an alert. Deduplicated on `(target_id, snapshot_id)`: a
    /// duplicate insert is silently ignored and `false` is returned instead
    /// of erroring, matching the at-least-once delivery contract upstream.
    pub fn insert(&self, alert: &Alert) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO alerts (
                    id, target_id, snapshot_id, title, message, change_type, severity,
                    change_count, version_number, status, enrichment, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    alert.id.as_str(),
                    alert.target_id.as_str(),
                    alert.snapshot_id.as_str(),
                    alert.title,
                    alert.message,
                    alert.change_type.to_string(),
                    alert.severity.to_string(),
                    alert.change_count as i64,
                    alert.version_number as i64,
                    alert.status.to_string(),
                    alert.enrichment.as_ref().map(|v| v.to_string()),
                    alert.created_at.timestamp(),
                ],
            )
            .map_err(from_rusqlite)?;
        Ok(changed > 0)
    }

    pub fn get(&self, alert_id: &AlertId) -> Result<Alert> {
        self.conn
            .query_row(
                "SELECT * FROM alerts WHERE id = ?1",
                params![alert_id.as_str()],
                alert_from_row,
            )
            .optional()
            .map_err(from_rusqlite)?
            .ok_or_else(|| not_found("get_alert", alert_id.as_str()))
    }

    pub fn set_status(&self, alert_id: &AlertId, status: AlertStatus) -> Result<()> {
        self.conn
            .execute(
                "UPDATE alerts SET status = ?1 WHERE id = ?2",
                params![status.to_string(), alert_id.as_str()],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn set_enrichment(&self, alert_id: &AlertId, enrichment: serde_json::Value) -> Result<()> {
        self.conn
            .execute(
                "UPDATE alerts SET enrichment = ?1 WHERE id = ?2",
                params![enrichment.to_string(), alert_id.as_str()],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn list_for_target(&self, target_id: &TargetId) -> Result<Vec<Alert>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM alerts WHERE target_id = ?1 ORDER BY created_at DESC")
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map(params![target_id.as_str()], alert_from_row)
            .map_err(from_rusqlite)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(from_rusqlite)
    }

    pub fn list_all(&self) -> Result<Vec<Alert>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM alerts ORDER BY created_at DESC")
            .map_err(from_rusqlite)?;
        let rows = stmt.query_map([], alert_from_row).map_err(from_rusqlite)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(from_rusqlite)
    }

    /// Removes every alert for `target_id`. Part of the cascade a target
    /// soft-delete triggers; unlike the target itself, alerts have no
    /// independent lifecycle worth preserving once their target is gone.
    pub fn delete_by_target(&self, target_id: &TargetId) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM alerts WHERE target_id = ?1",
                params![target_id.as_str()],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::migrations::apply_migrations;
    use sitewatch_core_types::{ChangeType, Severity, SnapshotId};

    fn store() -> AlertStore {
        let mut conn = db::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        AlertStore::new(conn)
    }

    fn sample_alert(target_id: TargetId, snapshot_id: SnapshotId) -> Alert {
        Alert {
            id: AlertId::new(),
            target_id,
            snapshot_id,
            title: "Pricing changed".to_string(),
            message: "price dropped".to_string(),
            change_type: ChangeType::Pricing,
            severity: Severity::High,
            change_count: 1,
            version_number: 2,
            status: AlertStatus::Unread,
            enrichment: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_then_duplicate_is_ignored() {
        let store = store();
        let target_id = TargetId::new();
        let snapshot_id = SnapshotId::new();
        let alert = sample_alert(target_id.clone(), snapshot_id.clone());

        assert!(store.insert(&alert).unwrap());

        let mut duplicate = sample_alert(target_id, snapshot_id);
        duplicate.id = AlertId::new();
        assert!(!store.insert(&duplicate).unwrap());

        assert_eq!(store.list_all().unwrap().len(), 1);
    }

    #[test]
    fn set_status_updates_row() {
        let store = store();
        let alert = sample_alert(TargetId::new(), SnapshotId::new());
        store.insert(&alert).unwrap();
        store.set_status(&alert.id, AlertStatus::Read).unwrap();
        assert_eq!(store.get(&alert.id).unwrap().status, AlertStatus::Read);
    }

    #[test]
    fn delete_by_target_removes_only_that_targets_alerts() {
        let store = store();
        let target_a = TargetId::new();
        let target_b = TargetId::new();
        store.insert(&sample_alert(target_a.clone(), SnapshotId::new())).unwrap();
        store.insert(&sample_alert(target_b.clone(), SnapshotId::new())).unwrap();

        store.delete_by_target(&target_a).unwrap();

        assert!(store.list_for_target(&target_a).unwrap().is_empty());
        assert_eq!(store.list_for_target(&target_b).unwrap().len(), 1);
    }
}
