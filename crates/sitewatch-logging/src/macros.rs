//! Canonical logging macros used around capture/store operations.

/// Logs the start of an operation.
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::EVENT_START,
            $($field)*
        );
    };
}

/// Logs the successful end of an operation.
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Logs an operation error. `$err` must implement `Display`.
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::EVENT_END_ERROR,
            duration_ms = $duration,
            error = %$err,
        );
    };
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::EVENT_END_ERROR,
            duration_ms = $duration,
            error = %$err,
            $($field)*
        );
    };
}
