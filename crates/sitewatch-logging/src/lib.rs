//! Structured logging facility.
//!
//! Provides a single initialization point via [`init`] plus the
//! `log_op_start!` / `log_op_end!` / `log_op_error!` macros used by the
//! orchestration layer to emit consistent start/end/error spans around
//! every capture and store operation.
//!
//! # Usage
//!
//! ```
//! use sitewatch_logging::{init, Profile};
//!
//! init(Profile::Development);
//! ```

mod macros;
pub mod test_capture;

use std::sync::Once;

use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};

/// Selects the subscriber wiring for the process's deployment context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output for local development.
    Development,
    /// JSON structured output for production deployments.
    Production,
    /// Capture mode for deterministic test assertions; see [`init_test_capture`].
    Test,
}

static INIT_ONCE: Once = Once::new();

/// Initializes the logging facility. Safe to call more than once — only the
/// first call takes effect, so library code and binaries can both call it
/// without coordinating.
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| match profile {
        Profile::Development => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new("sitewatch=debug")),
                )
                .init();
        }
        Profile::Production => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new("sitewatch=info")),
                )
                .init();
        }
        Profile::Test => {
            tracing_subscriber::registry().init();
        }
    });
}

pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init(Profile::Test);
        init(Profile::Test);
    }

    #[test]
    fn profile_equality() {
        assert_eq!(Profile::Development, Profile::Development);
        assert_ne!(Profile::Development, Profile::Production);
    }
}
