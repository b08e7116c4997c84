//! Plain-text rendering of a batch run.

use crate::runner::{BatchRun, BatchSummary, DocumentOutcome, DocumentStatus};
use std::fmt::Write as _;

const RULE_WIDE: usize = 80;
const RULE_NARROW: usize = 40;

/// Results table, summary, and per-document issues.
pub fn render_batch(run: &BatchRun) -> String {
    let mut out = String::new();
    render_table(&mut out, &run.outcomes);
    render_summary(&mut out, &run.summary);
    render_issues(&mut out, &run.outcomes);
    out
}

fn render_table(out: &mut String, outcomes: &[DocumentOutcome]) {
    let _ = writeln!(out, "ESG Extraction Results:");
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDE));
    let _ = writeln!(
        out,
        "{:<40} {:<8} {:<8} {:<8} {:<10} {:<8} Status",
        "File", "Score", "Parsing", "Coverage", "Robustness", "Schema"
    );
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDE));
    for outcome in outcomes {
        let _ = writeln!(out, "{}", table_row(outcome));
    }
}

fn table_row(outcome: &DocumentOutcome) -> String {
    let cells: [String; 5] = match &outcome.report {
        Some(report) => {
            let b = &report.breakdown;
            [
                format!("{:.1}", report.total_score),
                format!("{:.1}", b.parsing_correctness),
                format!("{:.1}", b.coverage),
                format!("{:.1}", b.robustness),
                format!("{:.1}", b.output_hygiene),
            ]
        }
        None => {
            let filler = match outcome.status {
                DocumentStatus::NotImplemented | DocumentStatus::NoExpected => "N/A",
                _ => "0",
            };
            std::array::from_fn(|_| filler.to_string())
        }
    };
    format!(
        "{:<40} {:<8} {:<8} {:<8} {:<10} {:<8} {}",
        outcome.document,
        cells[0],
        cells[1],
        cells[2],
        cells[3],
        cells[4],
        outcome.status.label()
    )
}

fn render_summary(out: &mut String, summary: &BatchSummary) {
    let _ = writeln!(out);
    let _ = writeln!(out, "Summary:");
    let _ = writeln!(out, "{}", "-".repeat(RULE_NARROW));
    let _ = writeln!(out, "Files processed: {}/{}", summary.processed, summary.total);
    match (summary.average_score, summary.interpretation.as_deref()) {
        (Some(average), Some(interpretation)) => {
            let _ = writeln!(out, "Average score: {average:.1}/100");
            let _ = writeln!(out, "{interpretation}");
        }
        _ => {
            let _ = writeln!(out, "No files were successfully processed");
        }
    }
}

fn render_issues(out: &mut String, outcomes: &[DocumentOutcome]) {
    let with_issues: Vec<&DocumentOutcome> = outcomes
        .iter()
        .filter(|outcome| {
            outcome.report.as_ref().is_some_and(|report| {
                !report.defects.is_empty() || report.incorrect_fields().next().is_some()
            })
        })
        .collect();
    if with_issues.is_empty() {
        return;
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Detailed Issues:");
    let _ = writeln!(out, "{}", "-".repeat(RULE_NARROW));
    for outcome in with_issues {
        let Some(report) = &outcome.report else {
            continue;
        };
        let _ = writeln!(out);
        let _ = writeln!(out, "Issues in {}:", outcome.document);
        if let Some(fatal) = &report.fatal {
            let _ = writeln!(out, "  Candidate is not a record: {fatal}");
        } else if !report.defects.is_empty() {
            let defects: Vec<String> = report.defects.iter().map(ToString::to_string).collect();
            let _ = writeln!(out, "  Schema validation failed: {}", defects.join("; "));
        }
        for field in report.incorrect_fields() {
            let _ = writeln!(
                out,
                "  \u{2717} {}: {}",
                field.field_path,
                field.detail.as_deref().unwrap_or("mismatch")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::BATCH_RUN_KIND;
    use esgrade_kernel::Scorer;
    use serde_json::json;

    fn outcome(document: &str, status: DocumentStatus) -> DocumentOutcome {
        DocumentOutcome {
            document: document.to_string(),
            status,
            expected_key: None,
            matched_by: None,
            error: None,
            report: None,
        }
    }

    fn run(outcomes: Vec<DocumentOutcome>) -> BatchRun {
        BatchRun {
            schema: 1,
            run_kind: BATCH_RUN_KIND.to_string(),
            generated_at: "2026-01-01T00:00:00+00:00".to_string(),
            summary: BatchSummary::from_outcomes(&outcomes),
            outcomes,
        }
    }

    #[test]
    fn unscored_rows_use_na_or_zero() {
        let rendered = render_batch(&run(vec![
            outcome("a.pdf", DocumentStatus::NotImplemented),
            outcome("b.pdf", DocumentStatus::ExtractionError),
        ]));
        let rows: Vec<&str> = rendered.lines().filter(|l| l.contains(".pdf")).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("a.pdf"));
        assert!(rows[0].contains(&format!("{:<8} {:<8}", "N/A", "N/A")));
        assert!(rows[0].ends_with("Not implemented"));
        assert!(rows[1].contains(&format!("{:<8} {:<8}", "0", "0")));
        assert!(rows[1].ends_with("Extraction error"));
        assert!(rendered.contains("Files processed: 0/2"));
        assert!(rendered.contains("No files were successfully processed"));
        assert!(!rendered.contains("Detailed Issues"));
    }

    #[test]
    fn processed_rows_and_issues() {
        let report = Scorer::default()
            .score_raw(
                &json!({"year": "twenty twenty four"}),
                &json!({"year": 2024}),
                None,
            )
            .expect("expected record is valid");
        let mut processed = outcome("acme.pdf", DocumentStatus::Processed);
        processed.report = Some(report);

        let rendered = render_batch(&run(vec![processed]));
        let row = rendered
            .lines()
            .find(|line| line.starts_with("acme.pdf"))
            .expect("row for acme.pdf");
        assert!(row.contains("17.5"));
        assert!(row.ends_with("Processed"));
        assert!(rendered.contains("Average score: 17.5/100"));
        assert!(rendered.contains("Significant issues found"));
        assert!(rendered.contains("Issues in acme.pdf:"));
        assert!(rendered.contains("  Schema validation failed: year: expected an integer"));
        assert!(rendered.contains("  \u{2717} year: candidate value is not a valid integer"));
    }
}
