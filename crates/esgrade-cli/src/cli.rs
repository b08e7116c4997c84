use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "esgrade",
    about = "esgrade: score ESG record extractions against reference records",
    version
)]
pub struct Cli {
    /// Tracing filter for diagnostics on stderr (overrides RUST_LOG)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score one extracted record against its reference record
    Score {
        /// Path to the extracted (candidate) record JSON
        #[arg(long)]
        candidate: String,

        /// Path to the reference (expected) record JSON
        #[arg(long)]
        expected: String,

        /// Document text; synonym cases are taken from it when given
        #[arg(long)]
        source_text: Option<String>,

        /// Scoring config TOML
        #[arg(long)]
        config: Option<String>,

        /// Relative numeric tolerance (overrides config)
        #[arg(long)]
        tolerance: Option<f64>,

        /// Fuzzy string match threshold in (0, 1] (overrides config)
        #[arg(long)]
        similarity_threshold: Option<f64>,

        /// Exit 1 when the total score is below this value
        #[arg(long)]
        min_score: Option<f64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a record and list every schema defect
    Validate {
        /// Path to the record JSON
        input: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve policy phrase tags onto canonical policy flags
    Policies {
        /// Phrase tag such as "Speak-Up Policy: true" (repeatable)
        #[arg(long = "tag", required = true)]
        tags: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract and score every document in a data directory
    Run {
        /// Directory holding documents and their text files
        #[arg(long, default_value = "data")]
        data: String,

        /// Expected results JSON (default: <data>/expected_results.json)
        #[arg(long)]
        expected: Option<String>,

        /// Extractor program: document text on stdin, record JSON on stdout
        #[arg(long)]
        extractor_cmd: Option<String>,

        /// Argument passed to the extractor program (repeatable)
        #[arg(long = "extractor-arg", allow_hyphen_values = true, requires = "extractor_cmd")]
        extractor_args: Vec<String>,

        /// Seconds before a running extractor program is killed
        #[arg(long, requires = "extractor_cmd")]
        extractor_timeout: Option<f64>,

        /// Score an all-null extraction as a baseline
        #[arg(long, conflicts_with = "extractor_cmd")]
        null_baseline: bool,

        /// Worker threads (default: available parallelism)
        #[arg(long)]
        jobs: Option<usize>,

        /// Scoring config TOML
        #[arg(long)]
        config: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
