//! Closed enumerations shared by the diffing, classification, storage, and
//! alerting facilities. Kept in one place so a new variant is a single-point
//! change visible to every downstream `match`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity ladder, ordered low to critical so `Ord` comparisons express
/// "is this at least as severe" directly (`Severity::High >= Severity::Medium`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// Dominant kind of a classified change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Content,
    Design,
    Pricing,
    Feature,
    Other,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeType::Content => "content",
            ChangeType::Design => "design",
            ChangeType::Pricing => "pricing",
            ChangeType::Feature => "feature",
            ChangeType::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// The closed set of semantic DOM regions `SectionLocator` resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Hero,
    Pricing,
    Features,
    Navigation,
    Header,
    Footer,
    Testimonials,
    Cta,
    Form,
    About,
    Team,
    Content,
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SectionType::Hero => "hero",
            SectionType::Pricing => "pricing",
            SectionType::Features => "features",
            SectionType::Navigation => "navigation",
            SectionType::Header => "header",
            SectionType::Footer => "footer",
            SectionType::Testimonials => "testimonials",
            SectionType::Cta => "cta",
            SectionType::Form => "form",
            SectionType::About => "about",
            SectionType::Team => "team",
            SectionType::Content => "content",
        };
        write!(f, "{s}")
    }
}

/// Why a capture happened, threaded through `ChangeDetector::capture` so the
/// scheduler's interval logic and manual/initial captures share one code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    Scheduled,
    Manual,
    Initial,
}

impl fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CaptureSource::Scheduled => "scheduled",
            CaptureSource::Manual => "manual",
            CaptureSource::Initial => "initial",
        };
        write!(f, "{s}")
    }
}

/// Alert lifecycle status, mutated by the owning user after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Unread,
    Read,
    Archived,
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertStatus::Unread => "unread",
            AlertStatus::Read => "read",
            AlertStatus::Archived => "archived",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ladder_orders_low_to_critical() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
    }

    #[test]
    fn section_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SectionType::Testimonials).unwrap(),
            "\"testimonials\""
        );
    }

    #[test]
    fn change_type_display_matches_serde_rename() {
        for (ty, expected) in [
            (ChangeType::Content, "content"),
            (ChangeType::Pricing, "pricing"),
            (ChangeType::Other, "other"),
        ] {
            assert_eq!(ty.to_string(), expected);
        }
    }
}
