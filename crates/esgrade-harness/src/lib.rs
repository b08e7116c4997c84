//! # esgrade harness
//!
//! Runs the kernel over a directory of documents: reads each document's
//! text, hands it to the extractor under test, finds the reference record,
//! and scores the extraction.
//!
//! Collaborator failures (unreadable text, an extractor that crashes or is
//! not written yet, a missing or unusable reference record) become
//! *unscored* outcomes with their own status, never a silent zero.

pub mod collab;
pub mod dataset;
pub mod render;
pub mod runner;

pub use collab::{
    CommandExtractor, Document, ExtractError, Extractor, NullExtractor, PendingExtractor,
    PlainTextSource, TextSource, TextSourceError, discover_documents,
};
pub use dataset::{DEFAULT_DATASET_FILE, DatasetError, ExpectedDataset, Lookup, MatchedBy};
pub use render::render_batch;
pub use runner::{
    BatchRun, BatchRunner, BatchSummary, DocumentOutcome, DocumentStatus, interpret_score,
};
