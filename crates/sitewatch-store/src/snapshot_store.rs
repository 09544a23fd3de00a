//! `SnapshotStore` — persists a target's version chain and reconstructs
//! any snapshot in it.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use sitewatch_core::config::Config;
use sitewatch_core::errors::{ErrorKind, WatchError};
use sitewatch_core::models::{Snapshot, SnapshotDiff};
use sitewatch_core::pipeline::ComputedChange;
use sitewatch_core_types::{Severity, SnapshotDiffId, SnapshotId, TargetId};

use crate::errors::{from_rusqlite, not_found, Result};
use crate::row_mapping::{snapshot_diff_from_row, snapshot_from_row};

/// Owns a SQLite connection and implements the snapshot chain's append,
/// read, and reconstruction operations.
pub struct SnapshotStore {
    conn: Connection,
}

impl SnapshotStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Creates version 1 of a target's chain. Fails with
    /// `ErrorKind::AlreadyInitialized` if a snapshot already exists.
    pub fn append_initial(&mut self, target_id: &TargetId, html: &str) -> Result<Snapshot> {
        if self.current_version_number(target_id)?.is_some() {
            return Err(WatchError::new(ErrorKind::AlreadyInitialized)
                .with_op("append_initial")
                .with_target_id(target_id.as_str()));
        }

        let tx = self.conn.transaction().map_err(from_rusqlite)?;
        let now = Utc::now();
        let snapshot = Snapshot {
            id: SnapshotId::new(),
            target_id: target_id.clone(),
            version_number: 1,
            is_full: true,
            is_current: true,
            full_html: Some(html.to_string()),
            title: None,
            html_byte_len: html.len(),
            change_count: 0,
            change_percentage: 0.0,
            severity: Severity::Low,
            change_type: sitewatch_core_types::ChangeType::Other,
            summary: "initial capture".to_string(),
            metadata: serde_json::json!({}),
            created_at: now,
        };

        insert_snapshot(&tx, &snapshot).map_err(from_rusqlite)?;
        tx.commit().map_err(from_rusqlite)?;
        Ok(snapshot)
    }

    /// Atomically flips the prior current snapshot, inserts the new one,
    /// and inserts the `SnapshotDiff` linking them. Applies the
    /// full-vs-differential storage policy.
    pub fn append_change(
        &mut self,
        target_id: &TargetId,
        html: &str,
        computed: &ComputedChange,
        config: &Config,
    ) -> Result<(Snapshot, SnapshotDiff)> {
        let tx = self.conn.transaction().map_err(from_rusqlite)?;

        let current = query_current(&tx, target_id)
            .map_err(from_rusqlite)?
            .ok_or_else(|| not_found("append_change", target_id.as_str()))?;

        let diff_bytes_since_full =
            diff_bytes_since_last_full(&tx, target_id, current.version_number)
                .map_err(from_rusqlite)?;
        let projected_diff_bytes =
            diff_bytes_since_full + computed.stats.added_chars + computed.stats.removed_chars;

        let is_full = decide_is_full(
            current.version_number + 1,
            computed.severity,
            projected_diff_bytes,
            html.len(),
            config,
        );

        tx.execute(
            "UPDATE snapshots SET is_current = 0 WHERE id = ?1",
            params![current.id.as_str()],
        )
        .map_err(from_rusqlite)?;

        let now = Utc::now();
        let summary = summarize(computed);
        let new_snapshot = Snapshot {
            id: SnapshotId::new(),
            target_id: target_id.clone(),
            version_number: current.version_number + 1,
            is_full,
            is_current: true,
            full_html: if is_full { Some(html.to_string()) } else { None },
            title: None,
            html_byte_len: html.len(),
            change_count: computed.stats.records.len() as u32,
            change_percentage: computed.stats.change_percentage,
            severity: computed.severity,
            change_type: computed.change_type,
            summary,
            metadata: serde_json::json!({}),
            created_at: now,
        };
        insert_snapshot(&tx, &new_snapshot).map_err(from_rusqlite)?;

        let diff = SnapshotDiff {
            id: SnapshotDiffId::new(),
            from_snapshot_id: current.id.clone(),
            to_snapshot_id: new_snapshot.id.clone(),
            records: computed.stats.records.clone(),
            replay_ops: computed.replay_ops.clone(),
            added_chars: computed.stats.added_chars,
            removed_chars: computed.stats.removed_chars,
            summary: None,
        };
        insert_diff(&tx, &diff).map_err(from_rusqlite)?;

        tx.commit().map_err(from_rusqlite)?;
        Ok((new_snapshot, diff))
    }

    pub fn get_current(&self, target_id: &TargetId) -> Result<Snapshot> {
        query_current(&self.conn, target_id)
            .map_err(from_rusqlite)?
            .ok_or_else(|| not_found("get_current", target_id.as_str()))
    }

    /// Reconstructs the HTML originally supplied to the capture that
    /// created `snapshot_id`. Full snapshots return their stored HTML
    /// directly; differential ones replay diffs forward from the nearest
    /// preceding full snapshot.
    pub fn reconstruct(&self, snapshot_id: &SnapshotId) -> Result<String> {
        let target = self.snapshot_by_id(snapshot_id)?;
        if target.is_full {
            return target
                .full_html
                .ok_or_else(|| {
                    WatchError::new(ErrorKind::StorageFailure)
                        .with_op("reconstruct")
                        .with_message("full snapshot missing its html payload")
                });
        }

        let chain = self.chain_from_last_full(&target)?;
        let mut html = chain
            .first()
            .and_then(|s| s.full_html.clone())
            .ok_or_else(|| {
                WatchError::new(ErrorKind::StorageFailure)
                    .with_op("reconstruct")
                    .with_message("no preceding full snapshot found")
            })?;

        for window in chain.windows(2) {
            let (from, to) = (&window[0], &window[1]);
            let diff = self.diff_between(&from.id, &to.id)?;
            html = replay(&html, &diff);
        }

        Ok(html)
    }

    /// Merges `patch` into a snapshot's `metadata` JSON object, used to
    /// record out-of-band results (enrichment narratives, oversized-input
    /// warnings) that must never block the capture transaction itself.
    pub fn merge_metadata(&self, snapshot_id: &SnapshotId, patch: serde_json::Value) -> Result<()> {
        let mut snapshot = self.snapshot_by_id(snapshot_id)?;
        if let (serde_json::Value::Object(existing), serde_json::Value::Object(incoming)) =
            (&mut snapshot.metadata, patch)
        {
            existing.extend(incoming);
        } else {
            snapshot.metadata = patch;
        }
        self.conn
            .execute(
                "UPDATE snapshots SET metadata = ?1 WHERE id = ?2",
                params![
                    serde_json::to_string(&snapshot.metadata).unwrap_or_else(|_| "{}".to_string()),
                    snapshot_id.as_str(),
                ],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn list(&self, target_id: &TargetId, limit: i64, offset: i64) -> Result<Vec<Snapshot>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT * FROM snapshots WHERE target_id = ?1
                 ORDER BY version_number DESC LIMIT ?2 OFFSET ?3",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map(params![target_id.as_str(), limit, offset], snapshot_from_row)
            .map_err(from_rusqlite)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(from_rusqlite)
    }

    /// Removes every snapshot and snapshot diff belonging to `target_id`.
    /// Part of the cascade a target soft-delete triggers (spec §"Target"
    /// lifecycle).
    pub fn delete_by_target(&mut self, target_id: &TargetId) -> Result<()> {
        let tx = self.conn.transaction().map_err(from_rusqlite)?;
        tx.execute(
            "DELETE FROM snapshot_diffs WHERE to_snapshot_id IN
                (SELECT id FROM snapshots WHERE target_id = ?1)",
            params![target_id.as_str()],
        )
        .map_err(from_rusqlite)?;
        tx.execute(
            "DELETE FROM snapshots WHERE target_id = ?1",
            params![target_id.as_str()],
        )
        .map_err(from_rusqlite)?;
        tx.commit().map_err(from_rusqlite)?;
        Ok(())
    }

    fn current_version_number(&self, target_id: &TargetId) -> Result<Option<u64>> {
        Ok(query_current(&self.conn, target_id)
            .map_err(from_rusqlite)?
            .map(|s| s.version_number))
    }

    fn snapshot_by_id(&self, snapshot_id: &SnapshotId) -> Result<Snapshot> {
        self.conn
            .query_row(
                "SELECT * FROM snapshots WHERE id = ?1",
                params![snapshot_id.as_str()],
                snapshot_from_row,
            )
            .optional()
            .map_err(from_rusqlite)?
            .ok_or_else(|| not_found("reconstruct", snapshot_id.as_str()))
    }

    fn chain_from_last_full(&self, target: &Snapshot) -> Result<Vec<Snapshot>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT * FROM snapshots WHERE target_id = ?1 AND version_number <= ?2
                 ORDER BY version_number ASC",
            )
            .map_err(from_rusqlite)?;
        let rows: Vec<Snapshot> = stmt
            .query_map(
                params![target.target_id.as_str(), target.version_number as i64],
                snapshot_from_row,
            )
            .map_err(from_rusqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(from_rusqlite)?;

        let last_full_idx = rows
            .iter()
            .rposition(|s| s.is_full)
            .ok_or_else(|| {
                WatchError::new(ErrorKind::StorageFailure)
                    .with_op("reconstruct")
                    .with_message("snapshot chain has no full snapshot")
            })?;
        Ok(rows[last_full_idx..].to_vec())
    }

    fn diff_between(&self, from: &SnapshotId, to: &SnapshotId) -> Result<SnapshotDiff> {
        self.conn
            .query_row(
                "SELECT * FROM snapshot_diffs WHERE from_snapshot_id = ?1 AND to_snapshot_id = ?2",
                params![from.as_str(), to.as_str()],
                snapshot_diff_from_row,
            )
            .optional()
            .map_err(from_rusqlite)?
            .ok_or_else(|| {
                WatchError::new(ErrorKind::StorageFailure)
                    .with_op("reconstruct")
                    .with_message("missing snapshot_diff row between adjacent snapshots")
            })
    }
}

fn insert_snapshot(conn: &Connection, snapshot: &Snapshot) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO snapshots (
            id, target_id, version_number, is_full, is_current, full_html, title,
            html_byte_len, change_count, change_percentage, severity, change_type,
            summary, metadata, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            snapshot.id.as_str(),
            snapshot.target_id.as_str(),
            snapshot.version_number as i64,
            snapshot.is_full as i64,
            snapshot.is_current as i64,
            snapshot.full_html,
            snapshot.title,
            snapshot.html_byte_len as i64,
            snapshot.change_count as i64,
            snapshot.change_percentage,
            snapshot.severity.to_string(),
            snapshot.change_type.to_string(),
            snapshot.summary,
            serde_json::to_string(&snapshot.metadata).unwrap_or_else(|_| "{}".to_string()),
            snapshot.created_at.timestamp(),
        ],
    )?;
    Ok(())
}

fn insert_diff(conn: &Connection, diff: &SnapshotDiff) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO snapshot_diffs (
            id, from_snapshot_id, to_snapshot_id, records, replay_ops,
            added_chars, removed_chars, summary
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            diff.id.as_str(),
            diff.from_snapshot_id.as_str(),
            diff.to_snapshot_id.as_str(),
            serde_json::to_string(&diff.records).unwrap_or_else(|_| "[]".to_string()),
            serde_json::to_string(&diff.replay_ops).unwrap_or_else(|_| "[]".to_string()),
            diff.added_chars as i64,
            diff.removed_chars as i64,
            diff.summary,
        ],
    )?;
    Ok(())
}

fn query_current(conn: &Connection, target_id: &TargetId) -> rusqlite::Result<Option<Snapshot>> {
    conn.query_row(
        "SELECT * FROM snapshots WHERE target_id = ?1 AND is_current = 1",
        params![target_id.as_str()],
        snapshot_from_row,
    )
    .optional()
}

fn diff_bytes_since_last_full(
    conn: &Connection,
    target_id: &TargetId,
    current_version: u64,
) -> rusqlite::Result<u64> {
    let last_full_version: Option<i64> = conn
        .query_row(
            "SELECT max(version_number) FROM snapshots
             WHERE target_id = ?1 AND is_full = 1 AND version_number <= ?2",
            params![target_id.as_str(), current_version as i64],
            |row| row.get(0),
        )
        .optional()?
        .flatten();

    let since = last_full_version.unwrap_or(0);

    conn.query_row(
        "SELECT COALESCE(sum(d.added_chars + d.removed_chars), 0)
         FROM snapshot_diffs d
         JOIN snapshots s ON s.id = d.to_snapshot_id
         WHERE s.target_id = ?1 AND s.version_number > ?2",
        params![target_id.as_str(), since],
        |row| row.get::<_, i64>(0).map(|v| v as u64),
    )
}

/// Storage policy: force a full snapshot on a consolidation period, on
/// critical severity, or when accumulated diff bytes since the last full
/// snapshot exceed the configured ratio of the new HTML's size.
fn decide_is_full(
    version_number: u64,
    severity: Severity,
    diff_bytes_since_full: u64,
    new_html_len: usize,
    config: &Config,
) -> bool {
    if config.full_period > 0 && version_number % config.full_period as u64 == 1 {
        return true;
    }
    if severity == Severity::Critical {
        return true;
    }
    let ratio = diff_bytes_since_full as f64 / (new_html_len.max(1) as f64);
    ratio > config.full_if_diff_ratio
}

fn summarize(computed: &ComputedChange) -> String {
    format!(
        "{} changes ({:.2}% delta), severity {}",
        computed.stats.records.len(),
        computed.stats.change_percentage,
        computed.severity
    )
}

fn replay(html: &str, diff: &SnapshotDiff) -> String {
    sitewatch_core::differ::replay(html, &diff.replay_ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::migrations::apply_migrations;
    use sitewatch_core::pipeline::compute_change;

    fn store() -> SnapshotStore {
        let mut conn = db::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        SnapshotStore::new(conn)
    }

    #[test]
    fn append_initial_creates_version_one_full_current() {
        let mut store = store();
        let target_id = TargetId::new();
        let snapshot = store
            .append_initial(&target_id, "<html><body><h1>Hi</h1></body></html>")
            .unwrap();
        assert_eq!(snapshot.version_number, 1);
        assert!(snapshot.is_full);
        assert!(snapshot.is_current);
        assert_eq!(snapshot.change_count, 0);
    }

    #[test]
    fn append_initial_twice_fails_already_initialized() {
        let mut store = store();
        let target_id = TargetId::new();
        store.append_initial(&target_id, "<html></html>").unwrap();
        let err = store.append_initial(&target_id, "<html></html>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyInitialized);
    }

    #[test]
    fn append_change_flips_current_and_increments_version() {
        let mut store = store();
        let target_id = TargetId::new();
        let v1_html = r#"<html><body><section id="pricing"><p class="price">$29/month</p></section></body></html>"#;
        let v2_html = r#"<html><body><section id="pricing"><p class="price">$19/month</p></section></body></html>"#;

        store.append_initial(&target_id, v1_html).unwrap();
        let computed = compute_change(v1_html, v2_html).unwrap();
        let config = Config::default();
        let (snapshot, diff) = store
            .append_change(&target_id, v2_html, &computed, &config)
            .unwrap();

        assert_eq!(snapshot.version_number, 2);
        assert!(snapshot.is_current);
        assert_eq!(diff.to_snapshot_id, snapshot.id);

        let prior = store
            .list(&target_id, 10, 0)
            .unwrap()
            .into_iter()
            .find(|s| s.version_number == 1)
            .unwrap();
        assert!(!prior.is_current);
        assert_eq!(diff.from_snapshot_id, prior.id);
    }

    #[test]
    fn merge_metadata_adds_keys_without_clobbering_existing_ones() {
        let mut store = store();
        let target_id = TargetId::new();
        let snapshot = store.append_initial(&target_id, "<html></html>").unwrap();

        store
            .merge_metadata(&snapshot.id, serde_json::json!({"oversized": true}))
            .unwrap();
        store
            .merge_metadata(&snapshot.id, serde_json::json!({"enrichment_status": "pending"}))
            .unwrap();

        let reloaded = store.snapshot_by_id(&snapshot.id).unwrap();
        assert_eq!(reloaded.metadata["oversized"], serde_json::json!(true));
        assert_eq!(reloaded.metadata["enrichment_status"], serde_json::json!("pending"));
    }

    #[test]
    fn delete_by_target_removes_snapshots_and_diffs_for_that_target_only() {
        let mut store = store();
        let target_a = TargetId::new();
        let target_b = TargetId::new();

        let v1 = store.append_initial(&target_a, "<html><body>v1</body></html>").unwrap();
        let computed =
            compute_change("<html><body>v1</body></html>", "<html><body>v2</body></html>").unwrap();
        store
            .append_change(&target_a, "<html><body>v2</body></html>", &computed, &Config::default())
            .unwrap();
        store.append_initial(&target_b, "<html></html>").unwrap();

        store.delete_by_target(&target_a).unwrap();

        assert!(store.list(&target_a, 10, 0).unwrap().is_empty());
        assert!(store.snapshot_by_id(&v1.id).is_err());
        assert_eq!(store.list(&target_b, 10, 0).unwrap().len(), 1);
    }

    /// S3 (spec.md §8): v1 full, v2..v4 small differential edits; each
    /// reconstructs to exactly the HTML supplied to the capture that
    /// created it, not just to something with the same word set.
    #[test]
    fn reconstruct_replays_a_chain_of_differential_snapshots_exactly() {
        let mut config = Config::default();
        config.full_period = 5;
        let mut store = store();
        let target_id = TargetId::new();

        let generations = [
            r#"<html><body><section id="pricing"><h2>Plans</h2><p class="price">$29/month</p></section></body></html>"#,
            r#"<html><body><section id="pricing"><h2>Plans</h2><p class="price">$24/month</p></section></body></html>"#,
            r#"<html><body><section id="pricing"><h2>Our Plans</h2><p class="price">$24/month</p></section></body></html>"#,
            r#"<html><body><section id="pricing"><h2>Our Plans</h2><p class="price">$19/month</p><p>limited time</p></section></body></html>"#,
        ];

        let v1 = store.append_initial(&target_id, generations[0]).unwrap();
        assert!(v1.is_full);

        let mut snapshots = vec![v1];
        for window in generations.windows(2) {
            let (prior, next) = (window[0], window[1]);
            let computed = compute_change(prior, next).unwrap();
            let (snapshot, _diff) = store
                .append_change(&target_id, next, &computed, &config)
                .unwrap();
            snapshots.push(snapshot);
        }

        assert!(!snapshots[1].is_full);
        assert!(!snapshots[2].is_full);
        assert!(!snapshots[3].is_full);

        for (snapshot, original_html) in snapshots.iter().zip(generations.iter()) {
            let reconstructed = store.reconstruct(&snapshot.id).unwrap();
            // Reconstruction matches "modulo the declared whitespace
            // normalization" (spec.md §8 invariant 4).
            let expected = reconstructed_against(original_html);
            assert_eq!(reconstructed, expected, "version {}", snapshot.version_number);
        }
    }

    fn reconstructed_against(html: &str) -> String {
        // Mirrors differ::normalize_whitespace's contract without reaching
        // into a private function: collapse whitespace runs, trim ends.
        let collapsed: String = html
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        collapsed
    }
}
