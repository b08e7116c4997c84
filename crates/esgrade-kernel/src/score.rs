//! Scoring engine.
//!
//! Walks both records through a field-classification table, compares each
//! leaf with its comparator, aligns board members by name, and folds the
//! outcomes into four weighted sub-scores:
//!
//! | sub-score           | weight | basis                                        |
//! |---------------------|--------|----------------------------------------------|
//! | parsing correctness | 60     | matched / expected non-null                  |
//! | coverage            | 20     | candidate non-null / expected non-null       |
//! | robustness          | 10     | synonym cases resolved / synonym cases       |
//! | output hygiene      | 10     | 10 minus a per-defect penalty, floor 0       |

use crate::align::align_members;
use crate::compare::{ComparatorKind, Comparison, NameMeasure, compare_field};
use crate::config::ScoringConfig;
use crate::digest::content_digest;
use crate::error::ScoreError;
use crate::record::{BoardMember, EsgRecord, FieldValue, PolicyKey};
use crate::report::{
    BoardAlignmentReport, FieldDiagnostic, FieldStatus, GroupSummary, MemberPair,
    SCORE_REPORT_KIND, ScoreBreakdown, ScoreReport, ScoreSummary, SynonymReport,
};
use crate::schema::{ValidationDefect, validate_lenient};
use crate::similarity::PersonNameSimilarity;
use crate::synonym::{SynonymCase, SynonymHit, SynonymTable, default_table};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const PARSING_WEIGHT: f64 = 60.0;
pub const COVERAGE_WEIGHT: f64 = 20.0;
pub const ROBUSTNESS_WEIGHT: f64 = 10.0;
pub const HYGIENE_WEIGHT: f64 = 10.0;

const REPORT_SCHEMA: u32 = 1;

/// Policies that have synonym phrasings in the alias table.
const SYNONYM_KEYS: [PolicyKey; 4] = [
    PolicyKey::AntiCorruption,
    PolicyKey::Whistleblowing,
    PolicyKey::HumanRights,
    PolicyKey::DeiPolicy,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldGroup {
    Company,
    Year,
    Board,
    Ghg,
    Policies,
}

impl FieldGroup {
    pub const ALL: [FieldGroup; 5] = [
        FieldGroup::Company,
        FieldGroup::Year,
        FieldGroup::Board,
        FieldGroup::Ghg,
        FieldGroup::Policies,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Year => "year",
            Self::Board => "board",
            Self::Ghg => "ghg",
            Self::Policies => "policies",
        }
    }
}

/// One row of the field-classification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub path: &'static str,
    pub group: FieldGroup,
    pub kind: ComparatorKind,
}

const fn field(path: &'static str, group: FieldGroup, kind: ComparatorKind) -> FieldSpec {
    FieldSpec { path, group, kind }
}

const TEXT: ComparatorKind = ComparatorKind::FuzzyString(NameMeasure::Text);
const PERSON: ComparatorKind = ComparatorKind::FuzzyString(NameMeasure::PersonName);
const NUMBER: ComparatorKind = ComparatorKind::NumericTolerance;
const INT: ComparatorKind = ComparatorKind::ExactInt;
const BOOL: ComparatorKind = ComparatorKind::ExactBool;

/// Every scalar leaf outside the member list, in report order.
pub const SCALAR_FIELDS: &[FieldSpec] = &[
    field("company", FieldGroup::Company, TEXT),
    field("year", FieldGroup::Year, INT),
    field("board.chair.name", FieldGroup::Board, PERSON),
    field("board.chair.role", FieldGroup::Board, TEXT),
    field("board.chair.independence", FieldGroup::Board, TEXT),
    field("board.counts.total", FieldGroup::Board, INT),
    field("board.counts.independent", FieldGroup::Board, INT),
    field("board.counts.women", FieldGroup::Board, INT),
    field("ghg.base_year", FieldGroup::Ghg, INT),
    field("ghg.scope1_tco2e", FieldGroup::Ghg, NUMBER),
    field("ghg.scope2_market_tco2e", FieldGroup::Ghg, NUMBER),
    field("ghg.scope2_location_tco2e", FieldGroup::Ghg, NUMBER),
    field("ghg.scope3_tco2e", FieldGroup::Ghg, NUMBER),
    field("ghg.total_tco2e", FieldGroup::Ghg, NUMBER),
    field("ghg.intensity_tco2e_per_eur_m", FieldGroup::Ghg, NUMBER),
    field("policies.anti_corruption", FieldGroup::Policies, BOOL),
    field("policies.whistleblowing", FieldGroup::Policies, BOOL),
    field("policies.human_rights", FieldGroup::Policies, BOOL),
    field("policies.climate_policy", FieldGroup::Policies, BOOL),
    field("policies.dei_policy", FieldGroup::Policies, BOOL),
    field("policies.assurance", FieldGroup::Policies, TEXT),
];

/// Per-member attributes, compared once members are aligned.
pub const MEMBER_FIELDS: &[(&str, ComparatorKind)] =
    &[("name", PERSON), ("role", TEXT), ("independence", TEXT)];

/// Everything the evaluation pass needs besides the two records.
#[derive(Default)]
struct Context<'a> {
    invalid_values: BTreeMap<String, Value>,
    defects: Vec<ValidationDefect>,
    expected_defects: Vec<ValidationDefect>,
    hits: Vec<SynonymHit>,
    unresolved_tags: Vec<String>,
    source_text: Option<&'a str>,
    candidate_digest: Option<String>,
    expected_digest: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Scorer {
    config: ScoringConfig,
    synonyms: &'static SynonymTable,
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

impl Scorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            synonyms: default_table(),
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Validate, normalize and score two raw mappings.
    ///
    /// A malformed candidate never fails: it degrades to a report with
    /// defects (or a fatal zero report). Only an expected mapping that is
    /// not a record at all is an error.
    pub fn score_raw(
        &self,
        candidate: &Value,
        expected: &Value,
        source_text: Option<&str>,
    ) -> Result<ScoreReport, ScoreError> {
        let expected_validation = validate_lenient(expected);
        let Some(mut expected_record) = expected_validation.record else {
            let reason = expected_validation
                .defects
                .first()
                .map(|defect| defect.message.clone())
                .unwrap_or_else(|| "not an ESG record".to_string());
            return Err(ScoreError::InvalidExpected(reason));
        };
        for defect in &expected_validation.defects {
            tracing::warn!(path = %defect.path, message = %defect.message, "expected record defect");
        }
        expected_record.policies = self
            .synonyms
            .normalize(&expected_record.policies, &expected_validation.policy_tags)
            .policies;

        let candidate_validation = validate_lenient(candidate);
        let mut context = Context {
            expected_defects: expected_validation.defects,
            source_text,
            candidate_digest: Some(content_digest(candidate)),
            expected_digest: Some(content_digest(expected)),
            ..Context::default()
        };

        let Some(mut candidate_record) = candidate_validation.record else {
            let fatal = candidate_validation
                .defects
                .first()
                .map(|defect| defect.message.clone())
                .unwrap_or_else(|| "candidate is not an ESG record".to_string());
            tracing::warn!(reason = %fatal, "candidate record is fatally malformed");
            context.defects = candidate_validation.defects;
            return Ok(self.fatal_report(&expected_record, context, fatal));
        };

        let normalized = self
            .synonyms
            .normalize(&candidate_record.policies, &candidate_validation.policy_tags);
        candidate_record.policies = normalized.policies;
        context.invalid_values = candidate_validation.invalid_values;
        context.defects = candidate_validation.defects;
        context.hits = normalized.hits;
        context.unresolved_tags = normalized.unresolved;

        Ok(self.evaluate(&candidate_record, &expected_record, context))
    }

    /// Score two already-validated records.
    pub fn score_records(&self, candidate: &EsgRecord, expected: &EsgRecord) -> ScoreReport {
        self.score_records_with_source(candidate, expected, None)
    }

    pub fn score_records_with_source(
        &self,
        candidate: &EsgRecord,
        expected: &EsgRecord,
        source_text: Option<&str>,
    ) -> ScoreReport {
        let context = Context {
            source_text,
            candidate_digest: serde_json::to_value(candidate).ok().map(|v| content_digest(&v)),
            expected_digest: serde_json::to_value(expected).ok().map(|v| content_digest(&v)),
            ..Context::default()
        };
        self.evaluate(candidate, expected, context)
    }

    fn fatal_report(&self, expected: &EsgRecord, context: Context<'_>, fatal: String) -> ScoreReport {
        let mut report = self.evaluate(&EsgRecord::default(), expected, context);
        report.breakdown = ScoreBreakdown::default();
        report.total_score = 0.0;
        report.fatal = Some(fatal);
        report
    }

    fn evaluate(
        &self,
        candidate: &EsgRecord,
        expected: &EsgRecord,
        context: Context<'_>,
    ) -> ScoreReport {
        let mut fields = Vec::new();

        for spec in SCALAR_FIELDS {
            let candidate_value = match context.invalid_values.get(spec.path) {
                Some(raw) => FieldValue::Invalid(raw.clone()),
                None => candidate.field_value(spec.path),
            };
            let expected_value = expected.field_value(spec.path);
            fields.push(self.diagnose(
                spec.path.to_string(),
                spec.group,
                spec.kind,
                &candidate_value,
                &expected_value,
            ));
        }

        let alignment = align_members(
            &candidate.board.members,
            &expected.board.members,
            &PersonNameSimilarity,
            self.config.similarity_threshold,
        );
        for (expected_index, expected_member) in expected.board.members.iter().enumerate() {
            let candidate_member = alignment
                .candidate_for(expected_index)
                .and_then(|pair| candidate.board.members.get(pair.candidate_index));
            for (attribute, kind) in MEMBER_FIELDS {
                let candidate_value = candidate_member
                    .map_or(FieldValue::Null, |member| member.field_value(attribute));
                fields.push(self.diagnose(
                    format!("board.members[{expected_index}].{attribute}"),
                    FieldGroup::Board,
                    *kind,
                    &candidate_value,
                    &expected_member.field_value(attribute),
                ));
            }
        }

        let board_alignment = BoardAlignmentReport {
            pairs: alignment
                .pairs
                .iter()
                .map(|pair| MemberPair {
                    candidate_index: pair.candidate_index,
                    expected_index: pair.expected_index,
                    candidate_name: member_name(&candidate.board.members, pair.candidate_index),
                    expected_name: member_name(&expected.board.members, pair.expected_index),
                    similarity: pair.similarity,
                })
                .collect(),
            unmatched_expected: alignment
                .unmatched_expected
                .iter()
                .map(|idx| member_name(&expected.board.members, *idx))
                .collect(),
            unmatched_candidate: alignment
                .unmatched_candidate
                .iter()
                .map(|idx| member_name(&candidate.board.members, *idx))
                .collect(),
            ambiguities: alignment.ambiguities,
        };

        let mut groups: BTreeMap<String, GroupSummary> = FieldGroup::ALL
            .iter()
            .map(|group| (group.as_str().to_string(), GroupSummary::default()))
            .collect();
        for diagnostic in &fields {
            if let Some(summary) = groups.get_mut(diagnostic.group.as_str()) {
                summary.record(diagnostic.status);
            }
        }

        let expected_fields = fields.iter().filter(|f| f.status.is_scored()).count();
        let matched_fields = fields
            .iter()
            .filter(|f| f.status == FieldStatus::Match)
            .count();
        let covered_fields = fields.iter().filter(|f| f.covered).count();

        let cases = self.synonym_cases(candidate, expected, context.source_text);
        let synonyms_resolved = cases.iter().filter(|case| case.resolved).count();

        let breakdown = ScoreBreakdown {
            parsing_correctness: weighted(PARSING_WEIGHT, matched_fields, expected_fields),
            coverage: weighted(COVERAGE_WEIGHT, covered_fields, expected_fields),
            robustness: weighted(ROBUSTNESS_WEIGHT, synonyms_resolved, cases.len()),
            output_hygiene: (HYGIENE_WEIGHT
                - self.config.hygiene_penalty_per_defect * context.defects.len() as f64)
                .max(0.0),
        };
        let total_score = breakdown.sum().clamp(0.0, 100.0);
        tracing::debug!(
            total = total_score,
            matched = matched_fields,
            expected = expected_fields,
            defects = context.defects.len(),
            "scored record"
        );

        ScoreReport {
            schema: REPORT_SCHEMA,
            report_kind: SCORE_REPORT_KIND.to_string(),
            total_score,
            breakdown,
            summary: ScoreSummary {
                expected_fields,
                matched_fields,
                covered_fields,
                defect_count: context.defects.len(),
                synonym_cases: cases.len(),
                synonyms_resolved,
            },
            groups,
            fields,
            board_alignment,
            synonyms: SynonymReport {
                cases,
                hits: context.hits,
                unresolved_tags: context.unresolved_tags,
            },
            defects: context.defects,
            expected_defects: context.expected_defects,
            fatal: None,
            candidate_digest: context.candidate_digest,
            expected_digest: context.expected_digest,
        }
    }

    fn diagnose(
        &self,
        field_path: String,
        group: FieldGroup,
        kind: ComparatorKind,
        candidate: &FieldValue,
        expected: &FieldValue,
    ) -> FieldDiagnostic {
        let comparison = compare_field(kind, candidate, expected, &self.config);
        let status = if expected.is_null() {
            if candidate.is_null() {
                FieldStatus::NullBoth
            } else {
                FieldStatus::NullExpected
            }
        } else if comparison.is_match() {
            FieldStatus::Match
        } else {
            FieldStatus::Miss
        };
        tracing::debug!(
            field = %field_path,
            comparator = kind.as_str(),
            status = status.as_str(),
            "compared field"
        );
        FieldDiagnostic {
            field_path,
            group,
            comparator: kind.as_str().to_string(),
            status,
            candidate_value: candidate.to_json(),
            expected_value: expected.to_json(),
            covered: !expected.is_null() && candidate.is_present(),
            similarity: comparison.similarity(),
            detail: match &comparison {
                Comparison::Miss { reason, .. } if status == FieldStatus::Miss => {
                    Some(reason.describe())
                }
                _ => None,
            },
        }
    }

    fn synonym_cases(
        &self,
        candidate: &EsgRecord,
        expected: &EsgRecord,
        source_text: Option<&str>,
    ) -> Vec<SynonymCase> {
        // Resolved means the normalized flag agrees with the reference,
        // null included.
        let resolved =
            |key: PolicyKey| candidate.policies.get(key) == expected.policies.get(key);
        match source_text {
            Some(text) => self
                .synonyms
                .scan_text(text)
                .into_iter()
                .map(|(key, alias)| SynonymCase {
                    key,
                    alias: Some(alias.to_string()),
                    resolved: resolved(key),
                })
                .collect(),
            None => SYNONYM_KEYS
                .iter()
                .filter(|key| expected.policies.get(**key).is_some())
                .map(|key| SynonymCase {
                    key: *key,
                    alias: None,
                    resolved: resolved(*key),
                })
                .collect(),
        }
    }
}

/// Score two records with the default configuration.
pub fn score(candidate: &EsgRecord, expected: &EsgRecord) -> ScoreReport {
    Scorer::default().score_records(candidate, expected)
}

/// `weight * numerator / denominator`, full weight when nothing is at stake.
fn weighted(weight: f64, numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return weight;
    }
    weight * numerator as f64 / denominator as f64
}

fn member_name(members: &[BoardMember], index: usize) -> String {
    members
        .get(index)
        .map(|member| member.name.clone())
        .unwrap_or_default()
}
