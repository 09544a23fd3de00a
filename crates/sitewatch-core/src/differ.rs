//! `HtmlDiffer` — computes low-level additions/removals between two HTML
//! documents. Deterministic, pure, and tolerant of malformed markup: it
//! never parses the DOM itself, so ill-formed HTML simply diffs as text.

use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

use crate::models::{ChangeRecord, ChangeRecordKind};

/// One step of a reconstructable edit script between two normalized texts.
/// Unlike `ChangeRecord`, `Keep`/`Delete` carry only a token count rather
/// than the kept/removed text itself — that is what keeps a differential
/// snapshot's stored payload smaller than the document it reconstructs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "op")]
pub enum ReplayOp {
    Keep { count: usize },
    Delete { count: usize },
    Insert { value: String },
}

/// Splits normalized text into alternating whitespace/non-whitespace runs.
/// Used only for replay-op bookkeeping; `HtmlDiffer`'s reported change
/// records use `similar`'s own word tokenizer instead.
fn tokenize(s: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut chars = s.char_indices().peekable();
    let mut in_space = match chars.peek() {
        Some((_, ch)) => ch.is_whitespace(),
        None => return tokens,
    };
    for (i, ch) in s.char_indices() {
        let is_space = ch.is_whitespace();
        if i > 0 && is_space != in_space {
            tokens.push(&s[start..i]);
            start = i;
            in_space = is_space;
        }
    }
    if start < s.len() {
        tokens.push(&s[start..]);
    }
    tokens
}

/// Aggregate statistics produced alongside the change records.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffStats {
    pub records: Vec<ChangeRecord>,
    pub added_chars: u64,
    pub removed_chars: u64,
    pub change_percentage: f64,
}

impl DiffStats {
    /// `true` when the diff carries no effective change, within `epsilon`.
    pub fn is_no_change(&self, epsilon: f64) -> bool {
        self.records.is_empty() && self.change_percentage < epsilon
    }
}

/// Collapses runs of ASCII whitespace to a single space and trims
/// tag-boundary whitespace, so two documents differing only in
/// indentation or line endings compare as identical. Must be stable:
/// the same input always normalizes to the same output.
fn normalize_whitespace(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last_was_space = false;
    for ch in html.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

/// Computes the diff between `before` and `after`. Same inputs always
/// produce the same output, in the same order.
pub fn diff(before: &str, after: &str) -> DiffStats {
    let normalized_before = normalize_whitespace(before);
    let normalized_after = normalize_whitespace(after);

    let text_diff = TextDiff::from_words(&normalized_before, &normalized_after);

    let mut records = Vec::new();
    let mut added_chars: u64 = 0;
    let mut removed_chars: u64 = 0;

    for change in text_diff.iter_all_changes() {
        let value = change.value().to_string();
        match change.tag() {
            ChangeTag::Insert => {
                added_chars += value.chars().count() as u64;
                records.push(ChangeRecord {
                    kind: ChangeRecordKind::Added,
                    value,
                    path_hint: None,
                });
            }
            ChangeTag::Delete => {
                removed_chars += value.chars().count() as u64;
                records.push(ChangeRecord {
                    kind: ChangeRecordKind::Removed,
                    value,
                    path_hint: None,
                });
            }
            ChangeTag::Equal => {}
        }
    }

    let denominator = normalized_before.chars().count().max(1) as f64;
    let change_percentage = ((added_chars + removed_chars) as f64 / denominator) * 100.0;

    DiffStats {
        records,
        added_chars,
        removed_chars,
        change_percentage,
    }
}

/// Builds the reconstructable edit script from `before` to `after`, for
/// `SnapshotDiff::replay_ops`. Computed independently of `diff()`'s
/// word-level records: this one tokenizes on whitespace runs so `Keep`
/// spans can be expressed as a count rather than copied text.
pub fn replay_ops(before: &str, after: &str) -> Vec<ReplayOp> {
    let normalized_before = normalize_whitespace(before);
    let normalized_after = normalize_whitespace(after);
    let before_tokens = tokenize(&normalized_before);
    let after_tokens = tokenize(&normalized_after);

    let text_diff = TextDiff::from_slices(&before_tokens, &after_tokens);
    let mut ops: Vec<ReplayOp> = Vec::new();
    for change in text_diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Equal => match ops.last_mut() {
                Some(ReplayOp::Keep { count }) => *count += 1,
                _ => ops.push(ReplayOp::Keep { count: 1 }),
            },
            ChangeTag::Delete => match ops.last_mut() {
                Some(ReplayOp::Delete { count }) => *count += 1,
                _ => ops.push(ReplayOp::Delete { count: 1 }),
            },
            ChangeTag::Insert => match ops.last_mut() {
                Some(ReplayOp::Insert { value }) => value.push_str(change.value()),
                _ => ops.push(ReplayOp::Insert {
                    value: change.value().to_string(),
                }),
            },
        }
    }
    ops
}

/// Replays `ops` against `before` to reproduce the normalized `after` text
/// the ops were computed from. `before` is retokenized identically to how
/// `replay_ops` tokenized it, so `Keep`/`Delete` counts index consistently.
pub fn replay(before: &str, ops: &[ReplayOp]) -> String {
    let normalized_before = normalize_whitespace(before);
    let before_tokens = tokenize(&normalized_before);

    let mut result = String::new();
    let mut idx = 0usize;
    for op in ops {
        match op {
            ReplayOp::Keep { count } => {
                for token in before_tokens.iter().skip(idx).take(*count) {
                    result.push_str(token);
                }
                idx += count;
            }
            ReplayOp::Delete { count } => {
                idx += count;
            }
            ReplayOp::Insert { value } => {
                result.push_str(value);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_yield_no_records() {
        let stats = diff("<p>hi</p>", "<p>hi</p>");
        assert!(stats.records.is_empty());
        assert_eq!(stats.change_percentage, 0.0);
    }

    #[test]
    fn whitespace_only_difference_is_no_change() {
        let stats = diff("<p>hi  there</p>", "<p>hi\n there</p>");
        assert!(stats.is_no_change(0.01));
    }

    #[test]
    fn is_deterministic_across_repeated_calls() {
        let before = "<p class=\"price\">$29/month</p>";
        let after = "<p class=\"price\">$19/month</p>";
        let first = diff(before, after);
        let second = diff(before, after);
        assert_eq!(first, second);
    }

    #[test]
    fn pricing_change_produces_added_and_removed_records() {
        let before = "<p class=\"price\">$29/month</p>";
        let after = "<p class=\"price\">$19/month</p>";
        let stats = diff(before, after);
        assert!(!stats.records.is_empty());
        assert!(stats.change_percentage > 0.0);
    }

    #[test]
    fn malformed_html_degrades_to_opaque_text_diff() {
        let before = "<div><p>unterminated";
        let after = "<div><p>unterminated and changed";
        let stats = diff(before, after);
        assert!(!stats.records.is_empty());
    }

    #[test]
    fn replay_reconstructs_a_mid_document_insertion_exactly() {
        let before = "<section><h2>Plans</h2><p>Starter tier available now</p></section>";
        let after = "<section><h2>Plans</h2><p>Starter and Pro tiers available now</p></section>";
        let ops = replay_ops(before, after);
        assert_eq!(replay(before, &ops), normalize_whitespace(after));
    }

    #[test]
    fn replay_reconstructs_a_removal_without_reordering_surrounding_text() {
        let before = "one two three four five";
        let after = "one two four five";
        let ops = replay_ops(before, after);
        assert_eq!(replay(before, &ops), normalize_whitespace(after));
    }

    #[test]
    fn replay_handles_a_duplicated_token_correctly() {
        let before = "apple banana apple cherry";
        let after = "apple grape apple cherry";
        let ops = replay_ops(before, after);
        assert_eq!(replay(before, &ops), normalize_whitespace(after));
    }

    #[test]
    fn replay_ops_keep_spans_store_counts_not_text() {
        let before = "word ".repeat(500) + "changed";
        let after = "word ".repeat(500) + "different";
        let ops = replay_ops(&before, &after);
        let keep_chars: usize = ops
            .iter()
            .filter_map(|op| match op {
                ReplayOp::Keep { count } => Some(count),
                _ => None,
            })
            .sum();
        assert!(keep_chars > 0);
        let serialized = serde_json::to_string(&ops).unwrap();
        assert!(serialized.len() < before.len());
        assert_eq!(replay(&before, &ops), normalize_whitespace(&after));
    }

    #[test]
    fn replay_chains_across_multiple_generations() {
        let v1 = "<p>Welcome to our service</p>";
        let v2 = "<p>Welcome to our great service</p>";
        let v3 = "<p>Welcome to our great new service</p>";

        let ops_1_2 = replay_ops(v1, v2);
        let reconstructed_v2 = replay(v1, &ops_1_2);
        assert_eq!(reconstructed_v2, normalize_whitespace(v2));

        let ops_2_3 = replay_ops(&reconstructed_v2, v3);
        let reconstructed_v3 = replay(&reconstructed_v2, &ops_2_3);
        assert_eq!(reconstructed_v3, normalize_whitespace(v3));
    }
}
