//! CRUD and stats-mutation operations for `Target` rows.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use sitewatch_core::models::Target;
use sitewatch_core_types::TargetId;

use crate::errors::{from_rusqlite, not_found, Result};
use crate::row_mapping::target_from_row;

pub struct TargetStore {
    conn: Connection,
}

impl TargetStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }

    pub fn create(&self, target: &Target) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO targets (
                    id, owner_user_id, url, name, monitoring_enabled, check_interval_secs,
                    priority, deleted, total_versions, last_checked_at, last_change_at,
                    last_error, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    target.id.as_str(),
                    target.owner_user_id,
                    target.url,
                    target.name,
                    target.monitoring_enabled as i64,
                    target.check_interval_secs as i64,
                    target.priority,
                    target.deleted as i64,
                    target.total_versions as i64,
                    target.last_checked_at.map(|t| t.timestamp()),
                    target.last_change_at.map(|t| t.timestamp()),
                    target.last_error,
                    target.created_at.timestamp(),
                    target.updated_at.timestamp(),
                ],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn get(&self, target_id: &TargetId) -> Result<Target> {
        self.conn
            .query_row(
                "SELECT * FROM targets WHERE id = ?1 AND deleted = 0",
                params![target_id.as_str()],
                target_from_row,
            )
            .optional()
            .map_err(from_rusqlite)?
            .ok_or_else(|| not_found("get_target", target_id.as_str()))
    }

    /// Updates the caller-editable fields of a target: name, url, and
    /// priority. Monitoring state is changed only through `set_monitoring`.
    pub fn update(
        &self,
        target_id: &TargetId,
        name: Option<&str>,
        url: Option<&str>,
        priority: Option<i32>,
    ) -> Result<()> {
        let mut target = self.get(target_id)?;
        if let Some(name) = name {
            target.name = name.to_string();
        }
        if let Some(url) = url {
            target.url = url.to_string();
        }
        if let Some(priority) = priority {
            target.priority = priority;
        }
        let now = Utc::now().timestamp();
        self.conn
            .execute(
                "UPDATE targets SET name = ?1, url = ?2, priority = ?3, updated_at = ?4 WHERE id = ?5",
                params![target.name, target.url, target.priority, now, target_id.as_str()],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn set_monitoring(&self, target_id: &TargetId, enabled: bool, interval_secs: Option<u64>) -> Result<()> {
        let now = Utc::now().timestamp();
        if let Some(interval) = interval_secs {
            self.conn
                .execute(
                    "UPDATE targets SET monitoring_enabled = ?1, check_interval_secs = ?2, updated_at = ?3 WHERE id = ?4",
                    params![enabled as i64, interval as i64, now, target_id.as_str()],
                )
                .map_err(from_rusqlite)?;
        } else {
            self.conn
                .execute(
                    "UPDATE targets SET monitoring_enabled = ?1, updated_at = ?2 WHERE id = ?3",
                    params![enabled as i64, now, target_id.as_str()],
                )
                .map_err(from_rusqlite)?;
        }
        Ok(())
    }

    /// Records a successful capture's effect on running stats: bumps
    /// `total_versions` by one (unless `NoChange`), stamps `last_checked_at`,
    /// and stamps `last_change_at` only when a new version was written.
    pub fn record_capture_success(&self, target_id: &TargetId, wrote_new_version: bool) -> Result<()> {
        let now = Utc::now().timestamp();
        if wrote_new_version {
            self.conn
                .execute(
                    "UPDATE targets SET
                        total_versions = total_versions + 1,
                        last_checked_at = ?1,
                        last_change_at = ?1,
                        last_error = NULL
                     WHERE id = ?2",
                    params![now, target_id.as_str()],
                )
                .map_err(from_rusqlite)?;
        } else {
            self.conn
                .execute(
                    "UPDATE targets SET last_checked_at = ?1, last_error = NULL WHERE id = ?2",
                    params![now, target_id.as_str()],
                )
                .map_err(from_rusqlite)?;
        }
        Ok(())
    }

    /// Render/retry exhaustion: advance `last_checked_at` so the next
    /// scheduled tick is honored, but do not touch `total_versions`.
    pub fn record_render_failure(&self, target_id: &TargetId, error_message: &str) -> Result<()> {
        let now = Utc::now().timestamp();
        self.conn
            .execute(
                "UPDATE targets SET last_checked_at = ?1, last_error = ?2 WHERE id = ?3",
                params![now, error_message, target_id.as_str()],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn soft_delete(&self, target_id: &TargetId) -> Result<()> {
        let now = Utc::now().timestamp();
        self.conn
            .execute(
                "UPDATE targets SET deleted = 1, updated_at = ?1 WHERE id = ?2",
                params![now, target_id.as_str()],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn list_enabled(&self) -> Result<Vec<Target>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM targets WHERE deleted = 0 AND monitoring_enabled = 1")
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([], target_from_row)
            .map_err(from_rusqlite)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(from_rusqlite)
    }

    /// Every non-deleted target, regardless of monitoring state. Not used by
    /// the REST surface (spec.md §6 names no target-listing endpoint) but
    /// needed by the CLI's `target list` for operator visibility.
    pub fn list_all(&self) -> Result<Vec<Target>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM targets WHERE deleted = 0 ORDER BY created_at DESC")
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([], target_from_row)
            .map_err(from_rusqlite)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(from_rusqlite)
    }
}
