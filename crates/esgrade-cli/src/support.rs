use esgrade_kernel::ScoringConfig;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Install the stderr subscriber. `--log-level` wins over `RUST_LOG`.
pub fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|err| {
            eprintln!("error: invalid --log-level `{level}`: {err}");
            std::process::exit(2);
        }),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn read_text_or_exit(path: &Path, label: &str) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|err| {
        eprintln!("error: failed to read {label} {}: {err}", path.display());
        std::process::exit(2);
    })
}

pub fn read_json_or_exit(path: &Path, label: &str) -> Value {
    let text = read_text_or_exit(path, label);
    serde_json::from_str(&text).unwrap_or_else(|err| {
        eprintln!("error: invalid JSON in {label} {}: {err}", path.display());
        std::process::exit(2);
    })
}

/// Config file (if any) with flag overrides applied, validated.
pub fn load_config_or_exit(
    config: Option<&str>,
    tolerance: Option<f64>,
    similarity_threshold: Option<f64>,
) -> ScoringConfig {
    let mut loaded = match config {
        Some(path) => ScoringConfig::load(path).unwrap_or_else(|err| {
            eprintln!("error: {err}");
            std::process::exit(2);
        }),
        None => ScoringConfig::default(),
    };
    if let Some(tolerance) = tolerance {
        loaded = loaded.with_tolerance(tolerance);
    }
    if let Some(threshold) = similarity_threshold {
        loaded = loaded.with_similarity_threshold(threshold);
    }
    loaded.validated().unwrap_or_else(|err| {
        eprintln!("error: {err}");
        std::process::exit(2);
    })
}

pub fn print_json_or_exit<T: Serialize>(value: &T, label: &str) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|err| {
        eprintln!("error: failed to render {label} JSON: {err}");
        std::process::exit(2);
    });
    println!("{rendered}");
}
