use crate::support::{load_config_or_exit, print_json_or_exit};
use esgrade_harness::{
    BatchRunner, CommandExtractor, DEFAULT_DATASET_FILE, ExpectedDataset, Extractor,
    NullExtractor, PendingExtractor, PlainTextSource, discover_documents, render_batch,
};
use esgrade_kernel::Scorer;
use std::path::PathBuf;
use std::time::Duration;

pub struct Args {
    pub data: String,
    pub expected: Option<String>,
    pub extractor_cmd: Option<String>,
    pub extractor_args: Vec<String>,
    pub extractor_timeout: Option<f64>,
    pub null_baseline: bool,
    pub jobs: Option<usize>,
    pub config: Option<String>,
    pub json: bool,
}

pub fn run(args: Args) {
    let data_dir = PathBuf::from(&args.data);
    if !data_dir.is_dir() {
        eprintln!("error: data directory not found: {}", data_dir.display());
        std::process::exit(2);
    }

    let config = load_config_or_exit(args.config.as_deref(), None, None);

    let dataset_path = args
        .expected
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.join(DEFAULT_DATASET_FILE));
    let dataset = ExpectedDataset::load(&dataset_path).unwrap_or_else(|err| {
        eprintln!("error: {err}");
        std::process::exit(2);
    });

    let documents = discover_documents(&data_dir).unwrap_or_else(|err| {
        eprintln!("error: {err}");
        std::process::exit(2);
    });
    if documents.is_empty() {
        tracing::warn!(data = %data_dir.display(), "no documents found");
    }

    let timeout = args.extractor_timeout.map(|secs| {
        Duration::try_from_secs_f64(secs).unwrap_or_else(|err| {
            eprintln!("error: invalid --extractor-timeout `{secs}`: {err}");
            std::process::exit(2);
        })
    });
    let extractor: Box<dyn Extractor> = match args.extractor_cmd {
        Some(program) => {
            let command = CommandExtractor::new(program, args.extractor_args);
            Box::new(match timeout {
                Some(timeout) => command.with_timeout(timeout),
                None => command,
            })
        }
        None if args.null_baseline => Box::new(NullExtractor),
        None => Box::new(PendingExtractor),
    };

    let text_source = PlainTextSource;
    let mut runner =
        BatchRunner::new(Scorer::new(config), &text_source, extractor.as_ref(), &dataset);
    if let Some(jobs) = args.jobs {
        runner = runner.with_jobs(jobs);
    }
    tracing::info!(
        documents = documents.len(),
        expected = dataset.len(),
        jobs = runner.jobs(),
        "starting batch run"
    );
    let batch = runner.run(&documents);

    if args.json {
        print_json_or_exit(&batch, "batch run");
    } else {
        print!("{}", render_batch(&batch));
    }
}
