//! Composes `HtmlDiffer` → `SectionLocator` → `ChangeClassifier` into the
//! single pure computation `ChangeDetector` runs under its per-target lock.

use scraper::Html;

use crate::classifier;
use crate::differ::{self, DiffStats, ReplayOp};
use crate::errors::{ErrorKind, Result, WatchError};
use crate::models::LocatedSection;
use sitewatch_core_types::{ChangeType, Severity};

/// Result of running the full diff → locate → classify pipeline once.
#[derive(Debug, Clone)]
pub struct ComputedChange {
    pub stats: DiffStats,
    /// The reconstructable edit script `SnapshotStore` persists alongside
    /// `stats.records` so a differential snapshot can be replayed exactly.
    pub replay_ops: Vec<ReplayOp>,
    pub sections: Vec<LocatedSection>,
    pub change_type: ChangeType,
    pub severity: Severity,
}

/// Runs the pipeline over `before`/`after` HTML. Parses `after` once and
/// reuses the parsed DOM for every change record's section lookup.
///
/// Guards its own determinism: classification must depend only on `stats`
/// and `sections`, so recomputing from the same stats/sections must yield
/// the same `(change_type, severity)` pair every time. A mismatch indicates
/// a bug in the classifier (e.g. reliance on iteration order over an
/// unordered collection) rather than bad input, so it is reported as an
/// internal error rather than propagated as a user-facing diff failure.
pub fn compute_change(before: &str, after: &str) -> Result<ComputedChange> {
    let stats = differ::diff(before, after);
    let replay_ops = differ::replay_ops(before, after);

    let dom = Html::parse_document(after);
    let sections: Vec<LocatedSection> = stats
        .records
        .iter()
        .map(|record| crate::section_locator::locate(&dom, record))
        .collect();

    let (change_type, severity) = classifier::classify(&stats, &sections);
    let (change_type_again, severity_again) = classifier::classify(&stats, &sections);
    if change_type != change_type_again || severity != severity_again {
        return Err(WatchError::new(ErrorKind::DeterminismViolation)
            .with_op("compute_change")
            .with_message("classification was not stable across repeated invocation"));
    }

    Ok(ComputedChange {
        stats,
        replay_ops,
        sections,
        change_type,
        severity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_capture_style_input_has_no_records() {
        let html = "<html><body><h1>Hi</h1></body></html>";
        let computed = compute_change(html, html).unwrap();
        assert!(computed.stats.records.is_empty());
        assert_eq!(computed.severity, Severity::Low);
    }

    #[test]
    fn pricing_change_is_classified_as_pricing() {
        let before = r#"<html><body><section id="pricing"><p class="price">$29/month</p></section></body></html>"#;
        let after = r#"<html><body><section id="pricing"><p class="price">$19/month</p></section></body></html>"#;
        let computed = compute_change(before, after).unwrap();
        assert_eq!(computed.change_type, ChangeType::Pricing);
    }
}
