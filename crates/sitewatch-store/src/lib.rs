//! SQLite-backed persistence for targets, the snapshot version chain, and
//! alerts, plus the embedded migration framework that creates their schema.

pub mod alert_store;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod row_mapping;
pub mod snapshot_store;
pub mod target_store;

pub use alert_store::AlertStore;
pub use snapshot_store::SnapshotStore;
pub use target_store::TargetStore;
