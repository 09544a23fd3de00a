//! Canonical error type for the change-detection engine.
//!
//! A single `WatchError` carries a stable [`ErrorKind`], the operation that
//! raised it, and whichever entity ids were in scope, so a REST handler or a
//! CLI command can map it to a status code or exit code without re-deriving
//! context from a message string.

use std::fmt;

/// Closed set of error kinds the engine can raise. Each has a stable
/// `code()` string suitable for machine consumption (REST error bodies,
/// CLI exit diagnostics) that must not change once shipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Upstream HTML rendering failed after exhausting retries.
    RenderUnavailable,
    /// Attempted `append_initial` when a snapshot chain already exists.
    AlreadyInitialized,
    /// A capture for this target is already in progress.
    TargetLocked,
    /// The persistence layer rejected or failed a read/write.
    StorageFailure,
    /// Input HTML exceeded the configured size cap.
    OversizedInput,
    /// The enrichment call failed; never fatal to the core pipeline.
    EnrichmentFailure,
    /// The referenced entity does not exist.
    NotFound,
    /// Caller-supplied input failed validation (e.g. check interval out of range).
    Validation,
    /// A computed result that must be reproducible broke its own round-trip check.
    DeterminismViolation,
    /// Lower-level I/O failure (filesystem, network transport).
    Io,
    /// (De)serialization failure for a stored JSON payload.
    Serialization,
    /// An internal invariant was violated; should not happen in correct operation.
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable code. Never rename an existing code.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::RenderUnavailable => "ERR_RENDER_UNAVAILABLE",
            ErrorKind::AlreadyInitialized => "ERR_ALREADY_INITIALIZED",
            ErrorKind::TargetLocked => "ERR_TARGET_LOCKED",
            ErrorKind::StorageFailure => "ERR_STORAGE_FAILURE",
            ErrorKind::OversizedInput => "ERR_OVERSIZED_INPUT",
            ErrorKind::EnrichmentFailure => "ERR_ENRICHMENT_FAILURE",
            ErrorKind::NotFound => "ERR_NOT_FOUND",
            ErrorKind::Validation => "ERR_VALIDATION",
            ErrorKind::DeterminismViolation => "ERR_DETERMINISM_VIOLATION",
            ErrorKind::Io => "ERR_IO",
            ErrorKind::Serialization => "ERR_SERIALIZATION",
            ErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Canonical error carried across every crate in this workspace.
#[derive(Debug)]
pub struct WatchError {
    kind: ErrorKind,
    op: Option<String>,
    target_id: Option<String>,
    snapshot_id: Option<String>,
    message: Option<String>,
    source: Option<Box<WatchError>>,
}

impl WatchError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            op: None,
            target_id: None,
            snapshot_id: None,
            message: None,
            source: None,
        }
    }

    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    pub fn with_target_id(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn with_snapshot_id(mut self, snapshot_id: impl Into<String>) -> Self {
        self.snapshot_id = Some(snapshot_id.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_source(mut self, source: WatchError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn target_id(&self) -> Option<&str> {
        self.target_id.as_deref()
    }

    pub fn snapshot_id(&self) -> Option<&str> {
        self.snapshot_id.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// `NoChange` is informational in spec terms, not an error kind; callers
    /// model it as `Ok(CaptureOutcome::NoChange)` instead of this type.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::RenderUnavailable | ErrorKind::StorageFailure
        )
    }
}

impl fmt::Display for WatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.code(), self.kind)?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{op}'")?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(target_id) = &self.target_id {
            write!(f, " (target_id: {target_id})")?;
        }
        if let Some(snapshot_id) = &self.snapshot_id {
            write!(f, " (snapshot_id: {snapshot_id})")?;
        }
        Ok(())
    }
}

impl std::error::Error for WatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as &dyn std::error::Error)
    }
}

impl From<serde_json::Error> for WatchError {
    fn from(err: serde_json::Error) -> Self {
        WatchError::new(ErrorKind::Serialization).with_message(err.to_string())
    }
}

impl From<std::io::Error> for WatchError {
    fn from(err: std::io::Error) -> Self {
        WatchError::new(ErrorKind::Io).with_message(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_stable_for_known_kinds() {
        assert_eq!(ErrorKind::TargetLocked.code(), "ERR_TARGET_LOCKED");
        assert_eq!(ErrorKind::AlreadyInitialized.code(), "ERR_ALREADY_INITIALIZED");
    }

    #[test]
    fn builder_chain_populates_fields() {
        let err = WatchError::new(ErrorKind::StorageFailure)
            .with_op("append_change")
            .with_target_id("t1")
            .with_message("connection reset");
        assert_eq!(err.op(), Some("append_change"));
        assert_eq!(err.target_id(), Some("t1"));
        assert!(err.to_string().contains("ERR_STORAGE_FAILURE"));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn retryable_kinds_are_render_and_storage_only() {
        assert!(WatchError::new(ErrorKind::RenderUnavailable).is_retryable());
        assert!(WatchError::new(ErrorKind::StorageFailure).is_retryable());
        assert!(!WatchError::new(ErrorKind::Validation).is_retryable());
    }
}
