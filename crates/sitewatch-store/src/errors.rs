//! Store-specific error helpers, wrapping `sitewatch_core::WatchError`.

use sitewatch_core::errors::{ErrorKind, WatchError};

pub type Result<T> = std::result::Result<T, WatchError>;

pub fn migration_error(migration_id: &str, reason: &str) -> WatchError {
    WatchError::new(ErrorKind::StorageFailure)
        .with_op("migration")
        .with_message(format!("migration {migration_id} failed: {reason}"))
}

pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> WatchError {
    WatchError::new(ErrorKind::StorageFailure)
        .with_op("migration_checksum")
        .with_message(format!(
            "checksum mismatch for migration {migration_id}: expected {expected}, got {actual}"
        ))
}

pub fn not_found(op: &str, entity_id: &str) -> WatchError {
    WatchError::new(ErrorKind::NotFound)
        .with_op(op)
        .with_message(format!("no row for id {entity_id}"))
}

pub fn from_rusqlite(err: rusqlite::Error) -> WatchError {
    WatchError::new(ErrorKind::StorageFailure)
        .with_op("sqlite")
        .with_message(err.to_string())
}
