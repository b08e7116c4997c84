use crate::support::{load_config_or_exit, print_json_or_exit, read_json_or_exit, read_text_or_exit};
use esgrade_kernel::{Scorer, render_report};
use serde_json::Value;
use std::path::PathBuf;

pub struct Args {
    pub candidate: String,
    pub expected: String,
    pub source_text: Option<String>,
    pub config: Option<String>,
    pub tolerance: Option<f64>,
    pub similarity_threshold: Option<f64>,
    pub min_score: Option<f64>,
    pub json: bool,
}

pub fn run(args: Args) {
    let config = load_config_or_exit(
        args.config.as_deref(),
        args.tolerance,
        args.similarity_threshold,
    );

    // A candidate that is not JSON at all is still scored, as a fatal record.
    let candidate_path = PathBuf::from(&args.candidate);
    let candidate_text = read_text_or_exit(&candidate_path, "candidate");
    let candidate: Value = serde_json::from_str(&candidate_text).unwrap_or_else(|err| {
        tracing::warn!(path = %candidate_path.display(), error = %err, "candidate is not JSON");
        Value::String(candidate_text.clone())
    });
    let expected = read_json_or_exit(&PathBuf::from(&args.expected), "expected record");
    let source_text = args
        .source_text
        .as_ref()
        .map(|path| read_text_or_exit(&PathBuf::from(path), "source text"));

    let report = Scorer::new(config)
        .score_raw(&candidate, &expected, source_text.as_deref())
        .unwrap_or_else(|err| {
            eprintln!("error: score failed: {err}");
            std::process::exit(2);
        });

    if args.json {
        print_json_or_exit(&report, "score report");
    } else {
        print!("{}", render_report(&report));
    }

    if let Some(min_score) = args.min_score {
        if report.total_score < min_score {
            eprintln!(
                "score {:.1} is below the minimum of {min_score:.1}",
                report.total_score
            );
            std::process::exit(1);
        }
    }
}
