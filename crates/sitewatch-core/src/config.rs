//! Typed configuration, loaded from `watch.toml` with `WATCH_`-prefixed
//! environment variable overrides and built-in defaults for every field.

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorKind, Result, WatchError};

/// Every tunable knob enumerated for the engine, with the defaults it falls
/// back to when neither a config file nor an environment variable sets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capture concurrency. Defaults to `2 * num_cpus`.
    pub worker_count: usize,
    /// Every Kth snapshot (by version number) is forced full.
    pub full_period: u32,
    /// Force a full snapshot when cumulative diff bytes exceed this fraction
    /// of the new HTML's byte length.
    pub full_if_diff_ratio: f64,
    /// Smallest allowed `check_interval`, in seconds.
    pub min_check_interval: u64,
    /// Largest allowed `check_interval`, in seconds.
    pub max_check_interval: u64,
    /// Deadline for a single capture job, in seconds.
    pub render_timeout: u64,
    /// Max render retry attempts before giving up.
    pub render_retries: u32,
    /// Base delay for render retry exponential backoff, in seconds.
    pub render_backoff_base: u64,
    /// Backoff cap, in seconds.
    pub render_backoff_max: u64,
    /// Bounded buffer depth per EventBus subscriber.
    pub event_buffer_per_subscriber: usize,
    /// Maximum accepted HTML size, in bytes; larger input is truncated and flagged.
    pub html_size_cap: usize,
    /// Threshold below which a capture is considered to have produced no
    /// effective change.
    pub no_change_epsilon: f64,
    /// Base URL of the external Renderer service.
    pub renderer_url: Option<String>,
    /// Bearer token used to authenticate against the Renderer service.
    pub renderer_token: Option<String>,
    /// Base URL of the external Enricher service.
    pub enricher_url: Option<String>,
    /// Path to the SQLite database file. `:memory:` for an ephemeral store.
    pub database_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_count: 2 * num_cpus(),
            full_period: 5,
            full_if_diff_ratio: 0.8,
            min_check_interval: 300,
            max_check_interval: 86_400,
            render_timeout: 60,
            render_retries: 5,
            render_backoff_base: 2,
            render_backoff_max: 300,
            event_buffer_per_subscriber: 1024,
            html_size_cap: 4 * 1024 * 1024,
            no_change_epsilon: 0.01,
            renderer_url: None,
            renderer_token: None,
            enricher_url: None,
            database_path: "watch.sqlite3".to_string(),
        }
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Config {
    /// Loads configuration by layering, in increasing priority:
    /// built-in defaults → `watch.toml` (if present) → `WATCH_*` environment
    /// variables.
    pub fn load() -> Result<Self> {
        Self::load_from(Some("watch.toml"))
    }

    /// Like [`Config::load`] but with an explicit (or absent) config file
    /// path, for tests and alternate deployment layouts.
    pub fn load_from(path: Option<&str>) -> Result<Self> {
        let defaults = Config::default();
        let mut builder = config::Config::builder().add_source(
            config::Config::try_from(&defaults)
                .map_err(|e| WatchError::new(ErrorKind::Validation).with_message(e.to_string()))?,
        );

        if let Some(path) = path {
            if std::path::Path::new(path).exists() {
                builder = builder.add_source(config::File::with_name(path));
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix("WATCH")
                .separator("__")
                .try_parsing(true),
        );

        let built = builder
            .build()
            .map_err(|e| WatchError::new(ErrorKind::Validation).with_message(e.to_string()))?;

        let cfg: Config = built
            .try_deserialize()
            .map_err(|e| WatchError::new(ErrorKind::Validation).with_message(e.to_string()))?;

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.min_check_interval > self.max_check_interval {
            return Err(WatchError::new(ErrorKind::Validation)
                .with_op("Config::validate")
                .with_message("min_check_interval must not exceed max_check_interval"));
        }
        if self.worker_count == 0 {
            return Err(WatchError::new(ErrorKind::Validation)
                .with_op("Config::validate")
                .with_message("worker_count must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.full_if_diff_ratio) {
            return Err(WatchError::new(ErrorKind::Validation)
                .with_op("Config::validate")
                .with_message("full_if_diff_ratio must be within [0, 1]"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.full_period, 5);
        assert_eq!(cfg.min_check_interval, 300);
        assert_eq!(cfg.max_check_interval, 86_400);
        assert_eq!(cfg.html_size_cap, 4 * 1024 * 1024);
    }

    #[test]
    fn load_from_missing_file_falls_back_to_defaults() {
        let cfg = Config::load_from(Some("/nonexistent/watch.toml")).unwrap();
        assert_eq!(cfg.full_period, Config::default().full_period);
    }

    #[test]
    fn validate_rejects_inverted_interval_bounds() {
        let mut cfg = Config::default();
        cfg.min_check_interval = 1000;
        cfg.max_check_interval = 500;
        assert!(cfg.validate().is_err());
    }
}
