//! Score report and its human-readable rendering.

use crate::align::AlignmentAmbiguity;
use crate::schema::ValidationDefect;
use crate::score::FieldGroup;
use crate::synonym::{SynonymCase, SynonymHit};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;

pub const SCORE_REPORT_KIND: &str = "esgrade.score_report.v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldStatus {
    Match,
    Miss,
    /// Expected is null, candidate is not. Carries no signal.
    NullExpected,
    NullBoth,
}

impl FieldStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::Miss => "miss",
            Self::NullExpected => "null-expected",
            Self::NullBoth => "null-both",
        }
    }

    /// Whether the field counts toward correctness and coverage.
    pub fn is_scored(self) -> bool {
        matches!(self, Self::Match | Self::Miss)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDiagnostic {
    pub field_path: String,
    pub group: FieldGroup,
    pub comparator: String,
    pub status: FieldStatus,
    pub candidate_value: Value,
    pub expected_value: Value,
    /// Candidate is non-null, well-typed, and expected is non-null.
    pub covered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub parsing_correctness: f64,
    pub coverage: f64,
    pub robustness: f64,
    pub output_hygiene: f64,
}

impl ScoreBreakdown {
    pub fn sum(&self) -> f64 {
        self.parsing_correctness + self.coverage + self.robustness + self.output_hygiene
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub matched: usize,
    pub missed: usize,
    pub null_expected: usize,
    pub null_both: usize,
}

impl GroupSummary {
    pub fn record(&mut self, status: FieldStatus) {
        match status {
            FieldStatus::Match => self.matched += 1,
            FieldStatus::Miss => self.missed += 1,
            FieldStatus::NullExpected => self.null_expected += 1,
            FieldStatus::NullBoth => self.null_both += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSummary {
    pub expected_fields: usize,
    pub matched_fields: usize,
    pub covered_fields: usize,
    pub defect_count: usize,
    pub synonym_cases: usize,
    pub synonyms_resolved: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPair {
    pub candidate_index: usize,
    pub expected_index: usize,
    pub candidate_name: String,
    pub expected_name: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardAlignmentReport {
    pub pairs: Vec<MemberPair>,
    /// Expected members with no candidate counterpart; their fields are misses.
    pub unmatched_expected: Vec<String>,
    /// Extra candidate members: unscored, flagged as low-confidence noise.
    pub unmatched_candidate: Vec<String>,
    pub ambiguities: Vec<AlignmentAmbiguity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynonymReport {
    pub cases: Vec<SynonymCase>,
    pub hits: Vec<SynonymHit>,
    pub unresolved_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub schema: u32,
    pub report_kind: String,
    pub total_score: f64,
    pub breakdown: ScoreBreakdown,
    pub summary: ScoreSummary,
    /// Keyed by field group name (company, year, board, ghg, policies).
    pub groups: BTreeMap<String, GroupSummary>,
    pub fields: Vec<FieldDiagnostic>,
    pub board_alignment: BoardAlignmentReport,
    pub synonyms: SynonymReport,
    pub defects: Vec<ValidationDefect>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expected_defects: Vec<ValidationDefect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_digest: Option<String>,
}

impl ScoreReport {
    pub fn is_fatal(&self) -> bool {
        self.fatal.is_some()
    }

    pub fn field(&self, path: &str) -> Option<&FieldDiagnostic> {
        self.fields.iter().find(|field| field.field_path == path)
    }

    pub fn incorrect_fields(&self) -> impl Iterator<Item = &FieldDiagnostic> {
        self.fields
            .iter()
            .filter(|field| field.status == FieldStatus::Miss)
    }
}

/// Render a report as an indented plain-text breakdown.
pub fn render_report(report: &ScoreReport) -> String {
    let mut out = String::new();
    let b = &report.breakdown;
    let _ = writeln!(out, "esgrade score report");
    if let Some(fatal) = &report.fatal {
        let _ = writeln!(out, "  FATAL: {fatal}");
    }
    let _ = writeln!(out, "  Total: {:.1}/100", report.total_score);
    let _ = writeln!(out, "  Parsing correctness: {:.1}/60", b.parsing_correctness);
    let _ = writeln!(out, "  Coverage: {:.1}/20", b.coverage);
    let _ = writeln!(out, "  Robustness: {:.1}/10", b.robustness);
    let _ = writeln!(out, "  Output hygiene: {:.1}/10", b.output_hygiene);
    let _ = writeln!(
        out,
        "  Fields: {} matched, {} covered, {} expected",
        report.summary.matched_fields, report.summary.covered_fields, report.summary.expected_fields
    );

    let _ = writeln!(out, "  Groups:");
    for (group, summary) in &report.groups {
        let _ = writeln!(
            out,
            "    {group}: {} match, {} miss, {} null-expected, {} null-both",
            summary.matched, summary.missed, summary.null_expected, summary.null_both
        );
    }

    let alignment = &report.board_alignment;
    if !alignment.pairs.is_empty()
        || !alignment.unmatched_expected.is_empty()
        || !alignment.unmatched_candidate.is_empty()
    {
        let _ = writeln!(out, "  Board members:");
        for pair in &alignment.pairs {
            let _ = writeln!(
                out,
                "    - {} -> {} ({:.3})",
                pair.candidate_name, pair.expected_name, pair.similarity
            );
        }
        for name in &alignment.unmatched_expected {
            let _ = writeln!(out, "    - missing: {name}");
        }
        for name in &alignment.unmatched_candidate {
            let _ = writeln!(out, "    - extra (low confidence, unscored): {name}");
        }
        if !alignment.ambiguities.is_empty() {
            let _ = writeln!(
                out,
                "    - {} ambiguous tie(s) resolved by index order",
                alignment.ambiguities.len()
            );
        }
    }

    if !report.synonyms.cases.is_empty() {
        let _ = writeln!(
            out,
            "  Synonyms: {}/{} resolved",
            report.summary.synonyms_resolved, report.summary.synonym_cases
        );
        for case in &report.synonyms.cases {
            let via = case
                .alias
                .as_deref()
                .map(|alias| format!(" via \"{alias}\""))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "    - {}{via}: {}",
                case.key,
                if case.resolved { "resolved" } else { "unresolved" }
            );
        }
    }

    if !report.defects.is_empty() {
        let _ = writeln!(out, "  Schema defects:");
        for defect in &report.defects {
            let _ = writeln!(out, "    - {defect}");
        }
    }

    let misses: Vec<&FieldDiagnostic> = report.incorrect_fields().collect();
    if !misses.is_empty() {
        let _ = writeln!(out, "  Issues:");
        for field in misses {
            let _ = writeln!(
                out,
                "    \u{2717} {}: {} (expected {}, got {})",
                field.field_path,
                field.detail.as_deref().unwrap_or("mismatch"),
                field.expected_value,
                field.candidate_value
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::Scorer;
    use serde_json::json;

    #[test]
    fn renders_malformed_year() {
        let report = Scorer::default()
            .score_raw(
                &json!({"year": "twenty twenty four"}),
                &json!({"year": 2024}),
                None,
            )
            .expect("expected record is valid");
        insta::assert_snapshot!(render_report(&report).trim_end(), @r#"
        esgrade score report
          Total: 17.5/100
          Parsing correctness: 0.0/60
          Coverage: 0.0/20
          Robustness: 10.0/10
          Output hygiene: 7.5/10
          Fields: 0 matched, 0 covered, 1 expected
          Groups:
            board: 0 match, 0 miss, 0 null-expected, 6 null-both
            company: 0 match, 0 miss, 0 null-expected, 1 null-both
            ghg: 0 match, 0 miss, 0 null-expected, 7 null-both
            policies: 0 match, 0 miss, 0 null-expected, 6 null-both
            year: 0 match, 1 miss, 0 null-expected, 0 null-both
          Schema defects:
            - year: expected an integer, found string "twenty twenty four"
          Issues:
            ✗ year: candidate value is not a valid integer (expected 2024, got "twenty twenty four")
        "#);
    }

    #[test]
    fn renders_alignment_and_synonyms() {
        let candidate = json!({
            "board": {"members": [{"name": "J. Smith"}, {"name": "Pierre Martin"}]},
            "policies": {"Speak-Up Policy": true}
        });
        let expected = json!({
            "board": {"members": [{"name": "John Smith"}, {"name": "Jane Doe"}]},
            "policies": {"whistleblowing": true}
        });
        let report = Scorer::default()
            .score_raw(&candidate, &expected, Some("Our speak-up channel is open."))
            .expect("expected record is valid");
        let rendered = render_report(&report);

        assert!(rendered.contains("    - J. Smith -> John Smith (0.950)"));
        assert!(rendered.contains("    - missing: Jane Doe"));
        assert!(rendered.contains("    - extra (low confidence, unscored): Pierre Martin"));
        assert!(rendered.contains("  Synonyms: 1/1 resolved"));
        assert!(rendered.contains("    - whistleblowing via \"speak up\": resolved"));
        assert!(rendered.contains("✗ board.members[1].name: missing value"));
        assert!(!rendered.contains("FATAL"));
    }

    #[test]
    fn renders_fatal_banner() {
        let report = Scorer::default()
            .score_raw(&json!(42), &json!({}), None)
            .expect("expected record is valid");
        let rendered = render_report(&report);
        assert!(rendered.starts_with("esgrade score report\n  FATAL: record must be an object"));
        assert!(rendered.contains("  Total: 0.0/100"));
    }

    #[test]
    fn status_labels_are_kebab_case() {
        for status in [
            FieldStatus::Match,
            FieldStatus::Miss,
            FieldStatus::NullExpected,
            FieldStatus::NullBoth,
        ] {
            assert_eq!(
                serde_json::to_value(status).expect("status serializes"),
                json!(status.as_str())
            );
        }
    }
}
