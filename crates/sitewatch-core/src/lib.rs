//! Domain logic for the change-detection and versioning engine: diffing,
//! section location, classification, configuration, and the canonical
//! error type. Orchestration (locking, scheduling, persistence wiring)
//! lives in `sitewatch-engine`; this crate has no I/O beyond parsing HTML
//! already held in memory.

pub mod classifier;
pub mod config;
pub mod differ;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod section_locator;

pub use config::Config;
pub use errors::{ErrorKind, Result, WatchError};
pub use pipeline::{compute_change, ComputedChange};
