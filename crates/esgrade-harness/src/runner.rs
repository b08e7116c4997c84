//! Batch runner: text source, extractor, dataset lookup, scoring.
//!
//! Documents are processed by a fixed pool of scoped worker threads pulling
//! from a shared cursor. Each document is independent; outcomes are put
//! back in document order before the run is returned.

use crate::collab::{Document, ExtractError, Extractor, TextSource};
use crate::dataset::{ExpectedDataset, MatchedBy};
use esgrade_kernel::{ScoreError, ScoreReport, Scorer};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};

pub const BATCH_RUN_KIND: &str = "esgrade.batch_run.v1";

const BATCH_RUN_SCHEMA: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Processed,
    NoText,
    NotImplemented,
    ExtractionError,
    NoExpected,
    TextError,
    InvalidExpected,
}

impl DocumentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::NoText => "no_text",
            Self::NotImplemented => "not_implemented",
            Self::ExtractionError => "extraction_error",
            Self::NoExpected => "no_expected",
            Self::TextError => "text_error",
            Self::InvalidExpected => "invalid_expected",
        }
    }

    /// Human label used in the batch table.
    pub fn label(self) -> &'static str {
        match self {
            Self::Processed => "Processed",
            Self::NoText => "No text extracted",
            Self::NotImplemented => "Not implemented",
            Self::ExtractionError => "Extraction error",
            Self::NoExpected => "No expected results",
            Self::TextError => "Text error",
            Self::InvalidExpected => "Invalid expected results",
        }
    }

    pub fn is_scored(self) -> bool {
        self == Self::Processed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOutcome {
    pub document: String,
    pub status: DocumentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_by: Option<MatchedBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<ScoreReport>,
}

impl DocumentOutcome {
    fn unscored(document: &Document, status: DocumentStatus, error: Option<String>) -> Self {
        Self {
            document: document.name.clone(),
            status,
            expected_key: None,
            matched_by: None,
            error,
            report: None,
        }
    }

    pub fn total_score(&self) -> Option<f64> {
        self.report.as_ref().map(|report| report.total_score)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub processed: usize,
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[DocumentOutcome]) -> Self {
        let scores: Vec<f64> = outcomes.iter().filter_map(DocumentOutcome::total_score).collect();
        let average_score =
            (!scores.is_empty()).then(|| scores.iter().sum::<f64>() / scores.len() as f64);
        Self {
            processed: scores.len(),
            total: outcomes.len(),
            average_score,
            interpretation: average_score.map(|avg| interpret_score(avg).to_string()),
        }
    }
}

/// Qualitative band for an average score.
pub fn interpret_score(average: f64) -> &'static str {
    if average >= 90.0 {
        "Excellent performance!"
    } else if average >= 70.0 {
        "Good performance!"
    } else if average >= 50.0 {
        "Needs improvement"
    } else {
        "Significant issues found"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRun {
    pub schema: u32,
    pub run_kind: String,
    pub generated_at: String,
    pub outcomes: Vec<DocumentOutcome>,
    pub summary: BatchSummary,
}

pub struct BatchRunner<'a> {
    scorer: Scorer,
    text_source: &'a dyn TextSource,
    extractor: &'a dyn Extractor,
    dataset: &'a ExpectedDataset,
    jobs: usize,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        scorer: Scorer,
        text_source: &'a dyn TextSource,
        extractor: &'a dyn Extractor,
        dataset: &'a ExpectedDataset,
    ) -> Self {
        Self {
            scorer,
            text_source,
            extractor,
            dataset,
            jobs: default_jobs(),
        }
    }

    /// Worker count; zero is treated as one.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    pub fn run(&self, documents: &[Document]) -> BatchRun {
        let mut ordered: Vec<&Document> = documents.iter().collect();
        ordered.sort();

        let cursor = AtomicUsize::new(0);
        let slots: Mutex<Vec<Option<DocumentOutcome>>> = Mutex::new(vec![None; ordered.len()]);
        let workers = self.jobs.min(ordered.len()).max(1);
        tracing::debug!(documents = ordered.len(), workers, "starting batch run");

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        let index = cursor.fetch_add(1, Ordering::Relaxed);
                        let Some(document) = ordered.get(index) else {
                            break;
                        };
                        let outcome = self.process(document);
                        store_outcome(&slots, index, outcome);
                    }
                });
            }
        });

        let filled = slots.into_inner().unwrap_or_else(PoisonError::into_inner);
        let outcomes: Vec<DocumentOutcome> = ordered
            .iter()
            .zip(filled)
            .map(|(document, outcome)| {
                outcome.unwrap_or_else(|| {
                    DocumentOutcome::unscored(
                        document,
                        DocumentStatus::ExtractionError,
                        Some("document was not processed".to_string()),
                    )
                })
            })
            .collect();

        BatchRun {
            schema: BATCH_RUN_SCHEMA,
            run_kind: BATCH_RUN_KIND.to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            summary: BatchSummary::from_outcomes(&outcomes),
            outcomes,
        }
    }

    /// Run one document through every stage, mapping each failure to its
    /// own unscored status.
    pub fn process(&self, document: &Document) -> DocumentOutcome {
        let text = match self.text_source.extract_text(document) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(document = %document.name, error = %err, "text unavailable");
                return DocumentOutcome::unscored(
                    document,
                    DocumentStatus::TextError,
                    Some(err.to_string()),
                );
            }
        };
        if text.trim().is_empty() {
            tracing::warn!(document = %document.name, "no text extracted");
            return DocumentOutcome::unscored(document, DocumentStatus::NoText, None);
        }

        let candidate = match self.extractor.extract_esg_info(&text) {
            Ok(candidate) => candidate,
            Err(ExtractError::NotImplemented) => {
                tracing::warn!(document = %document.name, "extractor not implemented; skipping");
                return DocumentOutcome::unscored(document, DocumentStatus::NotImplemented, None);
            }
            Err(err) => {
                tracing::warn!(document = %document.name, error = %err, "extraction failed");
                return DocumentOutcome::unscored(
                    document,
                    DocumentStatus::ExtractionError,
                    Some(err.to_string()),
                );
            }
        };

        let Some(lookup) = self.dataset.lookup(&document.name, Some(&candidate)) else {
            tracing::warn!(document = %document.name, "no expected results");
            return DocumentOutcome::unscored(document, DocumentStatus::NoExpected, None);
        };

        let mut outcome = DocumentOutcome {
            document: document.name.clone(),
            status: DocumentStatus::Processed,
            expected_key: Some(lookup.key.to_string()),
            matched_by: Some(lookup.matched_by),
            error: None,
            report: None,
        };
        match self.scorer.score_raw(&candidate, lookup.expected, Some(&text)) {
            Ok(report) => {
                tracing::info!(
                    document = %document.name,
                    score = report.total_score,
                    "processed document"
                );
                outcome.report = Some(report);
            }
            Err(ScoreError::InvalidExpected(reason)) => {
                tracing::warn!(document = %document.name, %reason, "expected record unusable");
                outcome.status = DocumentStatus::InvalidExpected;
                outcome.error = Some(reason);
            }
        }
        outcome
    }
}

/// Slots stay usable after a worker panic; a finished outcome is never lost.
fn store_outcome(
    slots: &Mutex<Vec<Option<DocumentOutcome>>>,
    index: usize,
    outcome: DocumentOutcome,
) {
    let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(slot) = slots.get_mut(index) {
        *slot = Some(outcome);
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{NullExtractor, PendingExtractor, TextSourceError};
    use serde_json::{Value, json};
    use std::collections::BTreeMap;

    struct MapSource(BTreeMap<&'static str, &'static str>);

    impl TextSource for MapSource {
        fn extract_text(&self, document: &Document) -> Result<String, TextSourceError> {
            self.0
                .get(document.name.as_str())
                .map(|text| text.to_string())
                .ok_or_else(|| TextSourceError::Missing {
                    document: document.name.clone(),
                    path: document.path.clone(),
                })
        }
    }

    /// Echoes a fixed record per document, keyed by the first line of text.
    struct ScriptedExtractor(BTreeMap<&'static str, Value>);

    impl Extractor for ScriptedExtractor {
        fn extract_esg_info(&self, text: &str) -> Result<Value, ExtractError> {
            let key = text.lines().next().unwrap_or_default();
            self.0.get(key).cloned().ok_or(ExtractError::Failed {
                program: "scripted".to_string(),
                status: "exit status: 1".to_string(),
                message: format!("no script for {key}"),
            })
        }
    }

    fn documents(names: &[&str]) -> Vec<Document> {
        names
            .iter()
            .map(|name| Document::new(format!("data/{name}")))
            .collect()
    }

    fn source() -> MapSource {
        MapSource(BTreeMap::from([
            ("alpha.pdf", "alpha\nAcme report"),
            ("beta.pdf", "beta\nBorealis report"),
            ("blank.pdf", "   \n"),
            ("broken.pdf", "broken\n"),
            ("orphan.pdf", "orphan\n"),
            ("bad-expected.pdf", "bad\n"),
        ]))
    }

    fn dataset() -> ExpectedDataset {
        ExpectedDataset::from_value(json!({
            "alpha.pdf": {"company": "Acme", "year": 2024},
            "beta.pdf": {"company": "Borealis", "year": 2023},
            "bad-expected.pdf": "not a record"
        }))
        .expect("object dataset")
    }

    #[test]
    fn every_failure_mode_maps_to_its_status() {
        let extractor = ScriptedExtractor(BTreeMap::from([
            ("alpha", json!({"company": "Acme", "year": 2024})),
            ("beta", json!({"company": "Borealis", "year": "2021"})),
            ("orphan", json!({"company": "Nobody", "year": 2020})),
            ("bad", json!({})),
        ]));
        let source = source();
        let dataset = dataset();
        let runner = BatchRunner::new(Scorer::default(), &source, &extractor, &dataset).with_jobs(3);

        let run = runner.run(&documents(&[
            "orphan.pdf",
            "beta.pdf",
            "missing.pdf",
            "alpha.pdf",
            "broken.pdf",
            "blank.pdf",
            "bad-expected.pdf",
        ]));

        let statuses: Vec<(&str, DocumentStatus)> = run
            .outcomes
            .iter()
            .map(|o| (o.document.as_str(), o.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("alpha.pdf", DocumentStatus::Processed),
                ("bad-expected.pdf", DocumentStatus::InvalidExpected),
                ("beta.pdf", DocumentStatus::Processed),
                ("blank.pdf", DocumentStatus::NoText),
                ("broken.pdf", DocumentStatus::ExtractionError),
                ("missing.pdf", DocumentStatus::TextError),
                ("orphan.pdf", DocumentStatus::NoExpected),
            ]
        );
        assert!(run.outcomes.iter().filter(|o| !o.status.is_scored()).all(|o| o.report.is_none()));

        assert_eq!(run.summary.processed, 2);
        assert_eq!(run.summary.total, 7);
        assert_eq!(run.outcomes[0].total_score(), Some(100.0));
        assert_eq!(run.run_kind, BATCH_RUN_KIND);
        assert!(chrono::DateTime::parse_from_rfc3339(&run.generated_at).is_ok());
    }

    #[test]
    fn pending_extractor_marks_documents_not_implemented() {
        let source = source();
        let dataset = dataset();
        let runner = BatchRunner::new(Scorer::default(), &source, &PendingExtractor, &dataset);
        let run = runner.run(&documents(&["alpha.pdf"]));
        assert_eq!(run.outcomes[0].status, DocumentStatus::NotImplemented);
        assert_eq!(run.summary.average_score, None);
        assert_eq!(run.summary.interpretation, None);
    }

    #[test]
    fn null_baseline_scores_low_but_is_processed() {
        let source = source();
        let dataset = dataset();
        let runner = BatchRunner::new(Scorer::default(), &source, &NullExtractor, &dataset).with_jobs(1);
        let run = runner.run(&documents(&["alpha.pdf", "beta.pdf"]));
        assert_eq!(run.summary.processed, 2);
        // Nothing extracted: only robustness and hygiene remain.
        assert_eq!(run.summary.average_score, Some(20.0));
        assert_eq!(run.summary.interpretation.as_deref(), Some("Significant issues found"));
    }

    #[test]
    fn interpretation_bands() {
        assert_eq!(interpret_score(95.0), "Excellent performance!");
        assert_eq!(interpret_score(90.0), "Excellent performance!");
        assert_eq!(interpret_score(70.0), "Good performance!");
        assert_eq!(interpret_score(50.0), "Needs improvement");
        assert_eq!(interpret_score(49.9), "Significant issues found");
    }

    #[test]
    fn outcomes_survive_a_poisoned_slot_table() {
        let slots: Mutex<Vec<Option<DocumentOutcome>>> = Mutex::new(vec![None, None]);
        let _ = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _guard = slots.lock().expect("lock should be free");
                    panic!("worker died holding the slots");
                })
                .join()
        });
        assert!(slots.is_poisoned());

        let document = Document::new("data/alpha.pdf");
        let outcome = DocumentOutcome::unscored(&document, DocumentStatus::NoText, None);
        store_outcome(&slots, 1, outcome.clone());

        let filled = slots.into_inner().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(filled[0], None);
        assert_eq!(filled[1], Some(outcome));
    }

    #[test]
    fn zero_jobs_still_runs() {
        let source = source();
        let dataset = dataset();
        let runner = BatchRunner::new(Scorer::default(), &source, &NullExtractor, &dataset).with_jobs(0);
        assert_eq!(runner.jobs(), 1);
        assert!(runner.run(&[]).outcomes.is_empty());
    }
}
