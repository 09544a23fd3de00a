//! `ChangeClassifier` — aggregates per-change records and located sections
//! into a single `change_type` and `severity`.

use std::collections::HashMap;

use sitewatch_core_types::{ChangeType, SectionType, Severity};

use crate::differ::DiffStats;
use crate::models::{ChangeRecordKind, LocatedSection};

const NOISE_CONFIDENCE_FLOOR: f64 = 0.5;

fn section_type_to_change_type(section_type: SectionType) -> ChangeType {
    match section_type {
        SectionType::Pricing => ChangeType::Pricing,
        SectionType::Hero => ChangeType::Design,
        SectionType::Features | SectionType::Cta => ChangeType::Feature,
        SectionType::Navigation
        | SectionType::Header
        | SectionType::Footer
        | SectionType::Testimonials
        | SectionType::Form
        | SectionType::About
        | SectionType::Team
        | SectionType::Content => ChangeType::Content,
    }
}

/// A record "looks like" a pricing delta when it carries a currency symbol
/// alongside a digit; used to force `ChangeType::Pricing` regardless of
/// which section it located to.
fn has_pricing_signal(records: &[crate::models::ChangeRecord]) -> bool {
    let is_money = |s: &str| {
        s.chars().any(|c| matches!(c, '$' | '€' | '£')) && s.chars().any(|c| c.is_ascii_digit())
    };
    let added = records
        .iter()
        .any(|r| matches!(r.kind, ChangeRecordKind::Added) && is_money(&r.value));
    let removed = records
        .iter()
        .any(|r| matches!(r.kind, ChangeRecordKind::Removed) && is_money(&r.value));
    added && removed
}

fn has_semantic_section(sections: &[LocatedSection]) -> bool {
    sections.iter().any(|s| s.confidence >= NOISE_CONFIDENCE_FLOOR)
}

fn dominant_change_type(sections: &[LocatedSection]) -> ChangeType {
    let mut cumulative: HashMap<SectionType, f64> = HashMap::new();
    for section in sections {
        *cumulative.entry(section.section_type).or_insert(0.0) += section.confidence;
    }
    cumulative
        .into_iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(section_type, _)| section_type_to_change_type(section_type))
        .unwrap_or(ChangeType::Other)
}

fn critical_section_pricing_delta(stats: &DiffStats, sections: &[LocatedSection]) -> bool {
    has_pricing_signal(&stats.records)
        && sections
            .iter()
            .any(|s| s.section_type == SectionType::Pricing && s.confidence >= NOISE_CONFIDENCE_FLOOR)
}

fn severity_for(stats: &DiffStats, sections: &[LocatedSection]) -> Severity {
    if stats.change_percentage > 30.0 || critical_section_pricing_delta(stats, sections) {
        return Severity::Critical;
    }
    if stats.change_percentage > 20.0 {
        return Severity::High;
    }
    if stats.change_percentage > 10.0 || stats.records.len() > 10 {
        return Severity::Medium;
    }
    Severity::Low
}

/// Classifies a capture's diff stats and located sections into a
/// `(change_type, severity)` pair.
pub fn classify(stats: &DiffStats, sections: &[LocatedSection]) -> (ChangeType, Severity) {
    if !has_semantic_section(sections) {
        return (ChangeType::Other, Severity::Low);
    }

    let change_type = if has_pricing_signal(&stats.records) {
        ChangeType::Pricing
    } else {
        dominant_change_type(sections)
    };

    (change_type, severity_for(stats, sections))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangeRecord;

    fn stats(records: Vec<ChangeRecord>, change_percentage: f64) -> DiffStats {
        DiffStats {
            records,
            added_chars: 0,
            removed_chars: 0,
            change_percentage,
        }
    }

    fn pricing_record(kind: ChangeRecordKind, value: &str) -> ChangeRecord {
        ChangeRecord {
            kind,
            value: value.to_string(),
            path_hint: None,
        }
    }

    #[test]
    fn severity_ladder_is_monotonic_in_change_percentage() {
        let sections = vec![];
        let low = severity_for(&stats(vec![], 5.0), &sections);
        let medium = severity_for(&stats(vec![], 15.0), &sections);
        let high = severity_for(&stats(vec![], 25.0), &sections);
        let critical = severity_for(&stats(vec![], 35.0), &sections);
        assert!(low < medium);
        assert!(medium < high);
        assert!(high < critical);
    }

    #[test]
    fn pricing_signal_forces_pricing_change_type() {
        let records = vec![
            pricing_record(ChangeRecordKind::Removed, "$29/month"),
            pricing_record(ChangeRecordKind::Added, "$19/month"),
        ];
        let sections = vec![LocatedSection {
            selector: "p.price".to_string(),
            section_type: SectionType::Pricing,
            confidence: 0.9,
        }];
        let (change_type, _) = classify(&stats(records, 12.0), &sections);
        assert_eq!(change_type, ChangeType::Pricing);
    }

    #[test]
    fn technical_noise_caps_severity_at_low_and_type_other() {
        let sections = vec![LocatedSection {
            selector: "div.wrapper".to_string(),
            section_type: SectionType::Content,
            confidence: 0.3,
        }];
        let (change_type, severity) = classify(&stats(vec![], 25.0), &sections);
        assert_eq!(change_type, ChangeType::Other);
        assert_eq!(severity, Severity::Low);
    }

    #[test]
    fn critical_section_pricing_delta_forces_critical_regardless_of_percentage() {
        let records = vec![
            pricing_record(ChangeRecordKind::Removed, "$29/month"),
            pricing_record(ChangeRecordKind::Added, "$9/month"),
        ];
        let sections = vec![LocatedSection {
            selector: "p.price".to_string(),
            section_type: SectionType::Pricing,
            confidence: 0.9,
        }];
        let (_, severity) = classify(&stats(records, 2.0), &sections);
        assert_eq!(severity, Severity::Critical);
    }
}
