//! Domain entities: `Target`, `Snapshot`, `SnapshotDiff`, `ChangeEvent`, `Alert`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sitewatch_core_types::{
    AlertId, AlertStatus, CaptureSource, ChangeType, SectionType, Severity, SnapshotDiffId,
    SnapshotId, TargetId,
};

/// A monitored competitor site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub owner_user_id: String,
    pub url: String,
    pub name: String,
    pub monitoring_enabled: bool,
    pub check_interval_secs: u64,
    pub priority: i32,
    pub deleted: bool,
    pub total_versions: u64,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_change_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Target {
    pub fn new(owner_user_id: impl Into<String>, url: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: TargetId::new(),
            owner_user_id: owner_user_id.into(),
            url: url.into(),
            name: name.into(),
            monitoring_enabled: false,
            check_interval_secs: 3600,
            priority: 0,
            deleted: false,
            total_versions: 0,
            last_checked_at: None,
            last_change_at: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A single semantic section a change was located within, with the
/// confidence `SectionLocator` assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatedSection {
    pub selector: String,
    pub section_type: SectionType,
    pub confidence: f64,
}

/// One version in a target's chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub target_id: TargetId,
    pub version_number: u64,
    pub is_full: bool,
    pub is_current: bool,
    pub full_html: Option<String>,
    pub title: Option<String>,
    pub html_byte_len: usize,
    pub change_count: u32,
    pub change_percentage: f64,
    pub severity: Severity,
    pub change_type: ChangeType,
    pub summary: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// One add/remove record in a `SnapshotDiff`'s structured payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum ChangeRecordKind {
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub kind: ChangeRecordKind,
    pub value: String,
    pub path_hint: Option<String>,
}

/// The delta payload linking two consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDiff {
    pub id: SnapshotDiffId,
    pub from_snapshot_id: SnapshotId,
    pub to_snapshot_id: SnapshotId,
    pub records: Vec<ChangeRecord>,
    /// The reconstructable edit script (see `differ::replay`/`replay_ops`).
    /// Kept separate from `records`: `records` is the semantic change list
    /// `SectionLocator`/`ChangeClassifier` consume, `replay_ops` is the
    /// space-efficient payload `SnapshotStore::reconstruct` replays.
    pub replay_ops: Vec<crate::differ::ReplayOp>,
    pub added_chars: u64,
    pub removed_chars: u64,
    pub summary: Option<String>,
}

/// In-memory message published by `ChangeDetector` for each non-trivial
/// capture; never persisted directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub target_id: TargetId,
    pub snapshot_id: SnapshotId,
    pub version_number: u64,
    pub change_count: u32,
    pub change_percentage: f64,
    pub severity: Severity,
    pub change_type: ChangeType,
    pub sections: Vec<LocatedSection>,
    pub timestamp: DateTime<Utc>,
}

/// A materialized notification derived from a `ChangeEvent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub target_id: TargetId,
    pub snapshot_id: SnapshotId,
    pub title: String,
    pub message: String,
    pub change_type: ChangeType,
    pub severity: Severity,
    pub change_count: u32,
    pub version_number: u64,
    pub status: AlertStatus,
    pub enrichment: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of `ChangeDetector::capture`.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Captured {
        snapshot: Snapshot,
        diff: SnapshotDiff,
        event: ChangeEvent,
    },
    Initial {
        snapshot: Snapshot,
        event: ChangeEvent,
    },
    NoChange,
}

/// Why a capture was requested; threaded through from the REST/CLI layer.
#[derive(Debug, Clone, Copy)]
pub struct CaptureRequest {
    pub source: CaptureSource,
}
