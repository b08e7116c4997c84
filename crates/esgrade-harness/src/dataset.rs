//! Expected-results dataset: reference records keyed by document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATASET_FILE: &str = "expected_results.json";

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read expected results: {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid expected results JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected results in {path} must be an object keyed by document")]
    NotAnObject { path: PathBuf },
}

/// How a document found its reference record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedBy {
    ExactKey,
    FileName,
    PdfName,
    Stem,
    CompanyYear,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lookup<'a> {
    pub key: &'a str,
    pub expected: &'a Value,
    pub matched_by: MatchedBy,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpectedDataset {
    entries: Map<String, Value>,
}

impl ExpectedDataset {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|source| DatasetError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_value(value).ok_or_else(|| DatasetError::NotAnObject {
            path: path.to_path_buf(),
        })
    }

    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(entries) => Some(Self { entries }),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Find the reference record for `document_name`.
    ///
    /// Tries, in order: the exact key, a key whose file name equals the
    /// document name, `<stem>.pdf`, the bare stem. When `candidate` is
    /// given and nothing matched by name, a unique entry with the same
    /// company and year as the candidate is used.
    pub fn lookup(&self, document_name: &str, candidate: Option<&Value>) -> Option<Lookup<'_>> {
        if let Some(found) = self.by_key(document_name, MatchedBy::ExactKey) {
            return Some(found);
        }
        if let Some((key, expected)) = self
            .entries
            .iter()
            .find(|(key, _)| file_name(key) == Some(document_name))
        {
            return Some(Lookup {
                key,
                expected,
                matched_by: MatchedBy::FileName,
            });
        }
        let stem = Path::new(document_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(document_name);
        if let Some(found) = self.by_key(&format!("{stem}.pdf"), MatchedBy::PdfName) {
            return Some(found);
        }
        if let Some(found) = self.by_key(stem, MatchedBy::Stem) {
            return Some(found);
        }
        candidate.and_then(|candidate| self.by_company_year(document_name, candidate))
    }

    fn by_key(&self, key: &str, matched_by: MatchedBy) -> Option<Lookup<'_>> {
        self.entries.get_key_value(key).map(|(key, expected)| Lookup {
            key,
            expected,
            matched_by,
        })
    }

    fn by_company_year(&self, document_name: &str, candidate: &Value) -> Option<Lookup<'_>> {
        let company = candidate.get("company").and_then(Value::as_str).map(company_key)?;
        let year = candidate.get("year").and_then(year_of)?;
        let mut matches = self.entries.iter().filter(|(_, expected)| {
            let expected_company = expected.get("company").and_then(Value::as_str).map(company_key);
            expected_company.as_deref() == Some(company.as_str())
                && expected.get("year").and_then(year_of) == Some(year)
        });
        let (key, expected) = matches.next()?;
        if matches.next().is_some() {
            tracing::warn!(
                document = document_name,
                company = %company,
                year,
                "several expected records share company and year; not guessing"
            );
            return None;
        }
        Some(Lookup {
            key,
            expected,
            matched_by: MatchedBy::CompanyYear,
        })
    }
}

fn file_name(key: &str) -> Option<&str> {
    Path::new(key).file_name().and_then(|name| name.to_str())
}

/// Lowercase alphanumerics only, so "ACME S.A." and "Acme SA" agree.
fn company_key(company: &str) -> String {
    company
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn year_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
