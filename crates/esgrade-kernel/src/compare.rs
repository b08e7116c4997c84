//! Typed field comparators.
//!
//! | kind              | rule                                               |
//! |-------------------|----------------------------------------------------|
//! | numeric-tolerance | `|c - e| <= tolerance * |e|`, or `|c| <= eps` if e = 0 |
//! | fuzzy-string      | similarity(c, e) >= threshold                      |
//! | exact-bool        | c == e                                             |
//! | exact-int         | c == e                                             |
//!
//! Both sides null is a match; exactly one side null is a miss. A value of
//! the wrong type is a miss with [`MissReason::InvalidInput`], never a panic.

use crate::config::ScoringConfig;
use crate::record::FieldValue;
use crate::similarity::{PersonNameSimilarity, Similarity, TextSimilarity};
use serde::{Deserialize, Serialize};

/// Slack for float rounding at the exact tolerance boundary, relative to |e|.
const BOUNDARY_SLACK: f64 = 8.0 * f64::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMeasure {
    Text,
    PersonName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparatorKind {
    NumericTolerance,
    FuzzyString(NameMeasure),
    ExactBool,
    ExactInt,
}

impl ComparatorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NumericTolerance => "numeric_tolerance",
            Self::FuzzyString(_) => "fuzzy_string",
            Self::ExactBool => "exact_bool",
            Self::ExactInt => "exact_int",
        }
    }

    fn type_label(self) -> &'static str {
        match self {
            Self::NumericTolerance => "number",
            Self::FuzzyString(_) => "string",
            Self::ExactBool => "boolean",
            Self::ExactInt => "integer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum MissReason {
    /// Expected a value, candidate is null.
    MissingCandidate,
    /// Candidate has a value where none was expected.
    UnexpectedCandidate,
    OutOfTolerance { difference: f64, allowed: f64 },
    BelowThreshold { similarity: f64, threshold: f64 },
    NotEqual,
    /// A side failed the comparator's type check.
    InvalidInput { side: String, expected_type: String },
}

impl MissReason {
    pub fn describe(&self) -> String {
        match self {
            Self::MissingCandidate => "missing value".to_string(),
            Self::UnexpectedCandidate => "value present where none was expected".to_string(),
            Self::OutOfTolerance {
                difference,
                allowed,
            } => format!("numeric mismatch: off by {difference}, allowed {allowed}"),
            Self::BelowThreshold {
                similarity,
                threshold,
            } => format!("string mismatch: similarity {similarity:.3} below {threshold:.2}"),
            Self::NotEqual => "value mismatch".to_string(),
            Self::InvalidInput {
                side,
                expected_type,
            } => format!("{side} value is not a valid {expected_type}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Match {
        similarity: Option<f64>,
    },
    Miss {
        reason: MissReason,
        similarity: Option<f64>,
    },
}

impl Comparison {
    fn matched() -> Self {
        Self::Match { similarity: None }
    }

    fn miss(reason: MissReason) -> Self {
        Self::Miss {
            reason,
            similarity: None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }

    pub fn similarity(&self) -> Option<f64> {
        match self {
            Self::Match { similarity } | Self::Miss { similarity, .. } => *similarity,
        }
    }

    pub fn reason(&self) -> Option<&MissReason> {
        match self {
            Self::Match { .. } => None,
            Self::Miss { reason, .. } => Some(reason),
        }
    }
}

/// Compare two leaf values with the comparator selected by `kind`.
pub fn compare_field(
    kind: ComparatorKind,
    candidate: &FieldValue,
    expected: &FieldValue,
    config: &ScoringConfig,
) -> Comparison {
    if let Some(settled) = settle_nulls(kind, candidate, expected) {
        return settled;
    }
    match kind {
        ComparatorKind::NumericTolerance => compare_numeric(candidate, expected, config),
        ComparatorKind::FuzzyString(NameMeasure::Text) => compare_fuzzy(
            candidate,
            expected,
            &TextSimilarity,
            config.similarity_threshold,
        ),
        ComparatorKind::FuzzyString(NameMeasure::PersonName) => compare_fuzzy(
            candidate,
            expected,
            &PersonNameSimilarity,
            config.similarity_threshold,
        ),
        ComparatorKind::ExactBool => compare_exact(kind, candidate, expected, |v| match v {
            FieldValue::Bool(flag) => Some(i64::from(*flag)),
            _ => None,
        }),
        ComparatorKind::ExactInt => compare_exact(kind, candidate, expected, |v| match v {
            FieldValue::Int(n) => Some(*n),
            _ => None,
        }),
    }
}

/// Null and invalid-input handling shared by every comparator.
fn settle_nulls(
    kind: ComparatorKind,
    candidate: &FieldValue,
    expected: &FieldValue,
) -> Option<Comparison> {
    let invalid = |side: &str| {
        Comparison::miss(MissReason::InvalidInput {
            side: side.to_string(),
            expected_type: kind.type_label().to_string(),
        })
    };
    match (candidate, expected) {
        (FieldValue::Null, FieldValue::Null) => Some(Comparison::matched()),
        (FieldValue::Invalid(_), _) => Some(invalid("candidate")),
        (_, FieldValue::Invalid(_)) => Some(invalid("expected")),
        (FieldValue::Null, _) => Some(Comparison::miss(MissReason::MissingCandidate)),
        (_, FieldValue::Null) => Some(Comparison::miss(MissReason::UnexpectedCandidate)),
        _ => None,
    }
}

/// Relative-tolerance equality; an expected zero uses the absolute epsilon.
pub fn within_tolerance(candidate: f64, expected: f64, tolerance: f64, zero_epsilon: f64) -> bool {
    if expected == 0.0 {
        return candidate.abs() <= zero_epsilon;
    }
    let allowed = tolerance * expected.abs();
    (candidate - expected).abs() <= allowed + BOUNDARY_SLACK * expected.abs()
}

fn compare_numeric(
    candidate: &FieldValue,
    expected: &FieldValue,
    config: &ScoringConfig,
) -> Comparison {
    let (Some(c), Some(e)) = (candidate.as_f64(), expected.as_f64()) else {
        let side = if candidate.as_f64().is_none() {
            "candidate"
        } else {
            "expected"
        };
        return Comparison::miss(MissReason::InvalidInput {
            side: side.to_string(),
            expected_type: "number".to_string(),
        });
    };
    if within_tolerance(c, e, config.tolerance, config.zero_epsilon) {
        return Comparison::matched();
    }
    let allowed = if e == 0.0 {
        config.zero_epsilon
    } else {
        config.tolerance * e.abs()
    };
    Comparison::miss(MissReason::OutOfTolerance {
        difference: (c - e).abs(),
        allowed,
    })
}

fn compare_fuzzy(
    candidate: &FieldValue,
    expected: &FieldValue,
    measure: &dyn Similarity,
    threshold: f64,
) -> Comparison {
    let (FieldValue::Text(c), FieldValue::Text(e)) = (candidate, expected) else {
        let side = if matches!(candidate, FieldValue::Text(_)) {
            "expected"
        } else {
            "candidate"
        };
        return Comparison::miss(MissReason::InvalidInput {
            side: side.to_string(),
            expected_type: "string".to_string(),
        });
    };
    let similarity = measure.similarity(c, e);
    if similarity >= threshold {
        Comparison::Match {
            similarity: Some(similarity),
        }
    } else {
        Comparison::Miss {
            reason: MissReason::BelowThreshold {
                similarity,
                threshold,
            },
            similarity: Some(similarity),
        }
    }
}

fn compare_exact(
    kind: ComparatorKind,
    candidate: &FieldValue,
    expected: &FieldValue,
    project: impl Fn(&FieldValue) -> Option<i64>,
) -> Comparison {
    match (project(candidate), project(expected)) {
        (Some(c), Some(e)) if c == e => Comparison::matched(),
        (Some(_), Some(_)) => Comparison::miss(MissReason::NotEqual),
        (None, _) => Comparison::miss(MissReason::InvalidInput {
            side: "candidate".to_string(),
            expected_type: kind.type_label().to_string(),
        }),
        (_, None) => Comparison::miss(MissReason::InvalidInput {
            side: "expected".to_string(),
            expected_type: kind.type_label().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn numeric(c: f64, e: f64) -> Comparison {
        compare_field(
            ComparatorKind::NumericTolerance,
            &FieldValue::Float(c),
            &FieldValue::Float(e),
            &ScoringConfig::default(),
        )
    }

    #[test]
    fn numeric_boundary_is_inclusive() {
        for e in [1.0, 100.0, 1250.5, 48_213.7, -320.0, 0.37] {
            assert!(numeric(1.05 * e, e).is_match(), "1.05 * {e} should match");
            assert!(numeric(0.95 * e, e).is_match(), "0.95 * {e} should match");
            assert!(!numeric(1.051 * e, e).is_match(), "1.051 * {e} should miss");
            assert!(!numeric(0.949 * e, e).is_match(), "0.949 * {e} should miss");
        }
    }

    #[test]
    fn scope1_within_five_percent_matches() {
        assert!(numeric(1300.0, 1250.5).is_match());
        assert!(
            compare_field(
                ComparatorKind::NumericTolerance,
                &FieldValue::Int(1300),
                &FieldValue::Float(1250.5),
                &ScoringConfig::default(),
            )
            .is_match()
        );
    }

    #[test]
    fn expected_zero_uses_absolute_epsilon() {
        assert!(numeric(0.005, 0.0).is_match());
        assert!(!numeric(0.02, 0.0).is_match());
    }

    #[test]
    fn nulls_settle_before_type_checks() {
        let config = ScoringConfig::default();
        for kind in [
            ComparatorKind::NumericTolerance,
            ComparatorKind::FuzzyString(NameMeasure::Text),
            ComparatorKind::ExactBool,
            ComparatorKind::ExactInt,
        ] {
            assert!(compare_field(kind, &FieldValue::Null, &FieldValue::Null, &config).is_match());
            let miss = compare_field(kind, &FieldValue::Null, &FieldValue::Int(1), &config);
            assert_eq!(miss.reason(), Some(&MissReason::MissingCandidate));
        }
    }

    #[test]
    fn wrong_types_are_input_errors() {
        let config = ScoringConfig::default();
        let result = compare_field(
            ComparatorKind::NumericTolerance,
            &FieldValue::Text("lots".to_string()),
            &FieldValue::Float(10.0),
            &config,
        );
        assert!(matches!(
            result.reason(),
            Some(MissReason::InvalidInput { side, .. }) if side == "candidate"
        ));

        let invalid = compare_field(
            ComparatorKind::ExactInt,
            &FieldValue::Invalid(json!("twenty twenty four")),
            &FieldValue::Int(2024),
            &config,
        );
        assert!(matches!(
            invalid.reason(),
            Some(MissReason::InvalidInput { .. })
        ));
    }

    #[test]
    fn exact_comparators_require_equality() {
        let config = ScoringConfig::default();
        assert!(
            compare_field(
                ComparatorKind::ExactBool,
                &FieldValue::Bool(false),
                &FieldValue::Bool(false),
                &config
            )
            .is_match()
        );
        assert!(
            !compare_field(
                ComparatorKind::ExactBool,
                &FieldValue::Bool(true),
                &FieldValue::Bool(false),
                &config
            )
            .is_match()
        );
        assert!(
            !compare_field(
                ComparatorKind::ExactInt,
                &FieldValue::Int(2023),
                &FieldValue::Int(2024),
                &config
            )
            .is_match()
        );
        assert!(
            !compare_field(
                ComparatorKind::ExactBool,
                &FieldValue::Int(1),
                &FieldValue::Bool(true),
                &config
            )
            .is_match()
        );
    }

    #[test]
    fn fuzzy_threshold_is_configurable() {
        let strict = ScoringConfig::default().with_similarity_threshold(1.0);
        let candidate = FieldValue::Text("Acme Corp.".to_string());
        let expected = FieldValue::Text("Acme Corp".to_string());
        assert!(
            compare_field(
                ComparatorKind::FuzzyString(NameMeasure::Text),
                &candidate,
                &expected,
                &ScoringConfig::default()
            )
            .is_match()
        );
        let result = compare_field(
            ComparatorKind::FuzzyString(NameMeasure::Text),
            &candidate,
            &expected,
            &strict,
        );
        assert!(!result.is_match());
        assert!(result.similarity().is_some());
    }

    #[test]
    fn person_names_tolerate_initials() {
        let result = compare_field(
            ComparatorKind::FuzzyString(NameMeasure::PersonName),
            &FieldValue::Text("J. Smith".to_string()),
            &FieldValue::Text("John Smith".to_string()),
            &ScoringConfig::default(),
        );
        assert!(result.is_match());
    }
}
