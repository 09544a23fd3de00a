//! Core types shared across the change-detection facilities.
//!
//! This crate provides the foundational vocabulary used by both the domain
//! logic (`sitewatch-core`), the persistence layer (`sitewatch-store`), and
//! the orchestration layer (`sitewatch-engine`):
//!
//! - **Identity types**: `TargetId`, `SnapshotId`, `SnapshotDiffId`, `AlertId`
//! - **Correlation types**: `RequestId`, `TraceId`
//! - **Closed enumerations**: `Severity`, `ChangeType`, `SectionType`,
//!   `CaptureSource`, `AlertStatus`

pub mod correlation;
pub mod ids;
pub mod taxonomy;

pub use correlation::{RequestContext, RequestId, TraceId};
pub use ids::{AlertId, SnapshotDiffId, SnapshotId, TargetId};
pub use taxonomy::{AlertStatus, CaptureSource, ChangeType, SectionType, Severity};
