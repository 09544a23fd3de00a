//! Embedded, checksummed, idempotent SQL migration framework.

mod checksums;
mod embedded;
mod runner;

pub use runner::apply_migrations;
