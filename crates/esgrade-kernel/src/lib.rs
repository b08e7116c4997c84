//! # esgrade kernel
//!
//! Scores an extracted ESG record against a reference record.
//!
//! The kernel is **producer-agnostic**: it does not care how either record
//! was built (PDF text service, regex extractor, remote model). It only
//! prescribes how two records are validated, normalized, aligned and
//! compared, and how the comparison is turned into a 0–100 score.
//!
//! ## Pipeline
//!
//! ```text
//! raw candidate ─┐                         ┌─ expected (validated)
//!                ▼                         ▼
//!         schema::validate_lenient   schema::validate_lenient
//!                │
//!         synonym::normalize_policies
//!                │
//!                ▼
//!         score::Scorer ── compare (numeric / fuzzy / bool / int)
//!                │    └── align::align_members (board members)
//!                ▼
//!         report::ScoreReport ──► report::render_report
//! ```

pub mod align;
pub mod compare;
pub mod config;
pub mod digest;
pub mod error;
pub mod record;
pub mod report;
pub mod schema;
pub mod score;
pub mod similarity;
pub mod synonym;

pub use align::{AlignedPair, Alignment, AlignmentAmbiguity, align_members};
pub use compare::{Comparison, ComparatorKind, MissReason, NameMeasure, compare_field};
pub use config::ScoringConfig;
pub use error::{ConfigError, ScoreError};
pub use record::{
    BoardCounts, BoardInfo, BoardMember, EsgRecord, FieldValue, GhgInfo, Independence,
    PolicyInfo, PolicyKey,
};
pub use report::{
    FieldDiagnostic, FieldStatus, GroupSummary, ScoreBreakdown, ScoreReport, ScoreSummary,
    render_report,
};
pub use schema::{DefectKind, Validation, ValidationDefect, validate, validate_lenient};
pub use score::{FieldGroup, FieldSpec, MEMBER_FIELDS, SCALAR_FIELDS, Scorer, score};
pub use similarity::{PersonNameSimilarity, Similarity, TextSimilarity};
pub use synonym::{
    PolicyNormalization, PolicyTag, SynonymCase, SynonymHit, SynonymTable, normalize_policies,
};
