//! Collaborator seams: where document text comes from and what produces the
//! candidate record.
//!
//! Both collaborators may fail outright. Their failures are document-level
//! outcomes, reported separately from scoring.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "txt"];

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A source document in the data directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Document {
    /// File name, used as the dataset lookup key.
    pub name: String,
    pub path: PathBuf,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TextSourceError {
    #[error("failed to list documents in {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no text available for {document} (looked for {path})")]
    Missing { document: String, path: PathBuf },

    #[error("failed to read text for {document}: {path}: {source}")]
    Read {
        document: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The extractor exists as a seam but has no implementation yet.
    #[error("extractor is not implemented")]
    NotImplemented,

    #[error("failed to launch extractor `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("extractor `{program}` failed ({status}): {message}")]
    Failed {
        program: String,
        status: String,
        message: String,
    },

    #[error("extractor `{program}` timed out after {:.1}s", .timeout.as_secs_f64())]
    TimedOut { program: String, timeout: Duration },

    #[error("extractor `{program}` produced invalid JSON: {source}")]
    InvalidOutput {
        program: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("extractor i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns a document into its raw text.
pub trait TextSource: Send + Sync {
    fn extract_text(&self, document: &Document) -> Result<String, TextSourceError>;
}

/// The extractor under test: raw text in, raw record mapping out.
pub trait Extractor: Send + Sync {
    fn extract_esg_info(&self, text: &str) -> Result<Value, ExtractError>;
}

/// Reads the UTF-8 text written next to each document.
///
/// A `.txt` document is read as-is; any other document is read from the
/// sibling file with the same stem and a `.txt` extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextSource;

impl PlainTextSource {
    pub fn text_path(document: &Document) -> PathBuf {
        if is_text(&document.path) {
            document.path.clone()
        } else {
            document.path.with_extension("txt")
        }
    }
}

impl TextSource for PlainTextSource {
    fn extract_text(&self, document: &Document) -> Result<String, TextSourceError> {
        let path = Self::text_path(document);
        if !path.is_file() {
            return Err(TextSourceError::Missing {
                document: document.name.clone(),
                path,
            });
        }
        std::fs::read_to_string(&path).map_err(|source| TextSourceError::Read {
            document: document.name.clone(),
            path,
            source,
        })
    }
}

/// Placeholder for an extractor that has not been written.
#[derive(Debug, Clone, Copy, Default)]
pub struct PendingExtractor;

impl Extractor for PendingExtractor {
    fn extract_esg_info(&self, _text: &str) -> Result<Value, ExtractError> {
        Err(ExtractError::NotImplemented)
    }
}

/// Baseline extractor: every field null.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullExtractor;

impl Extractor for NullExtractor {
    fn extract_esg_info(&self, _text: &str) -> Result<Value, ExtractError> {
        Ok(esgrade_kernel::EsgRecord::empty_mapping())
    }
}

/// Runs an external program per document: text on stdin, JSON on stdout.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandExtractor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: None,
        }
    }

    /// Kill the program when it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// `None` when the deadline passed and the program was killed.
    fn wait(&self, child: &mut Child) -> std::io::Result<Option<ExitStatus>> {
        let Some(timeout) = self.timeout else {
            return child.wait().map(Some);
        };
        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if started.elapsed() >= timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(None);
            }
            std::thread::sleep(WAIT_POLL_INTERVAL);
        }
    }
}

impl Extractor for CommandExtractor {
    fn extract_esg_info(&self, text: &str) -> Result<Value, ExtractError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExtractError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Pipes are serviced on their own threads so a program that writes
        // before draining its input cannot deadlock against us. They are
        // detached: after a kill, a grandchild may still hold a pipe open.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = text.to_owned();
            std::thread::spawn(move || stdin.write_all(input.as_bytes()))
        });
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let Some(status) = self.wait(&mut child)? else {
            return Err(ExtractError::TimedOut {
                program: self.program.clone(),
                timeout: self.timeout.unwrap_or_default(),
            });
        };

        // Programs may exit without draining stdin.
        if let Some(Ok(Err(err))) = writer.map(JoinHandle::join) {
            if err.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(ExtractError::Io(err));
            }
        }
        let stdout = collect(stdout)?;
        let stderr = collect(stderr)?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
            return Err(ExtractError::Failed {
                program: self.program.clone(),
                status: status.to_string(),
                message: if stderr.is_empty() {
                    "unknown error".to_string()
                } else {
                    stderr
                },
            });
        }

        serde_json::from_slice(&stdout).map_err(|source| ExtractError::InvalidOutput {
            program: self.program.clone(),
            source,
        })
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(reader: Option<JoinHandle<std::io::Result<Vec<u8>>>>) -> std::io::Result<Vec<u8>> {
    match reader.map(JoinHandle::join) {
        Some(Ok(read)) => read,
        Some(Err(_)) => Err(std::io::Error::other("pipe reader panicked")),
        None => Ok(Vec::new()),
    }
}

/// Documents in `dir`, one per stem, sorted by name.
///
/// When both `report.pdf` and `report.txt` exist the PDF names the
/// document and the text file supplies its content.
pub fn discover_documents(dir: &Path) -> Result<Vec<Document>, TextSourceError> {
    let scan_error = |source: std::io::Error| TextSourceError::Scan {
        path: dir.to_path_buf(),
        source,
    };
    let mut by_stem: std::collections::BTreeMap<String, Document> = Default::default();
    for entry in std::fs::read_dir(dir).map_err(scan_error)? {
        let path = entry.map_err(scan_error)?.path();
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if !path.is_file() || !DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
            continue;
        }
        let document = Document::new(&path);
        let stem = document.stem().to_string();
        let replace = match by_stem.get(&stem) {
            None => true,
            Some(existing) => is_text(&existing.path) && ext != "txt",
        };
        if replace {
            by_stem.insert(stem, document);
        }
    }
    let mut documents: Vec<Document> = by_stem.into_values().collect();
    documents.sort();
    Ok(documents)
}

fn is_text(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(label: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!(
            "esgrade-harness-{label}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        path
    }

    #[test]
    fn discovery_prefers_pdf_names_and_skips_other_files() {
        let dir = temp_dir("discover");
        fs::write(dir.join("beta.pdf"), b"%PDF").expect("write pdf");
        fs::write(dir.join("beta.txt"), "beta text").expect("write txt");
        fs::write(dir.join("alpha.txt"), "alpha text").expect("write txt");
        fs::write(dir.join("expected_results.json"), "{}").expect("write json");

        let documents = discover_documents(&dir).expect("discovery should succeed");
        let names: Vec<&str> = documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["alpha.txt", "beta.pdf"]);

        let text = PlainTextSource
            .extract_text(&documents[1])
            .expect("sibling text should be read");
        assert_eq!(text, "beta text");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn pdf_without_text_is_missing() {
        let dir = temp_dir("missing");
        fs::write(dir.join("gamma.pdf"), b"%PDF").expect("write pdf");
        let err = PlainTextSource
            .extract_text(&Document::new(dir.join("gamma.pdf")))
            .expect_err("no sibling text");
        assert!(matches!(err, TextSourceError::Missing { .. }));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn pending_and_null_extractors() {
        assert!(matches!(
            PendingExtractor.extract_esg_info("text"),
            Err(ExtractError::NotImplemented)
        ));
        let record = NullExtractor
            .extract_esg_info("text")
            .expect("null extractor never fails");
        assert!(record["company"].is_null());
        assert!(record["ghg"]["scope1_tco2e"].is_null());
    }

    #[cfg(unix)]
    #[test]
    fn command_extractor_round_trips_through_a_program() {
        let extractor = CommandExtractor::new(
            "sh",
            vec![
                "-c".to_string(),
                "cat > /dev/null; printf '{\"company\":\"Acme\"}'".to_string(),
            ],
        );
        let value = extractor
            .extract_esg_info("Acme annual report")
            .expect("program should succeed");
        assert_eq!(value["company"], "Acme");
    }

    #[cfg(unix)]
    #[test]
    fn command_extractor_reports_failures() {
        let failing = CommandExtractor::new(
            "sh",
            vec!["-c".to_string(), "echo boom >&2; exit 3".to_string()],
        );
        match failing.extract_esg_info("text") {
            Err(ExtractError::Failed { message, .. }) => assert_eq!(message, "boom"),
            other => panic!("expected a failure, got {other:?}"),
        }

        let garbage = CommandExtractor::new("sh", vec!["-c".to_string(), "echo nope".to_string()]);
        assert!(matches!(
            garbage.extract_esg_info("text"),
            Err(ExtractError::InvalidOutput { .. })
        ));

        let missing = CommandExtractor::new("esgrade-no-such-extractor", Vec::new());
        assert!(matches!(
            missing.extract_esg_info("text"),
            Err(ExtractError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn command_extractor_kills_a_hung_program() {
        let hung = CommandExtractor::new("sh", vec!["-c".to_string(), "exec sleep 30".to_string()])
            .with_timeout(Duration::from_millis(200));
        let started = Instant::now();
        match hung.extract_esg_info("text") {
            Err(ExtractError::TimedOut { program, timeout }) => {
                assert_eq!(program, "sh");
                assert_eq!(timeout, Duration::from_millis(200));
            }
            other => panic!("expected a timeout, got {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(10));

        let quick = CommandExtractor::new(
            "sh",
            vec!["-c".to_string(), "cat > /dev/null; printf '{}'".to_string()],
        )
        .with_timeout(Duration::from_secs(30));
        let value = quick
            .extract_esg_info("text")
            .expect("program should succeed");
        assert_eq!(value, serde_json::json!({}));
    }
}
