//! Pipeline error kinds.
//!
//! Every error here is recoverable at the unit that produced it: one URL,
//! one file, one progression, one store batch. Collectors log the error and
//! move on; nothing escapes the orchestrator's run.

#[derive(Debug)]
pub enum IngestError {
    /// Network failure, timeout, or a non-success HTTP status.
    Fetch(String),
    /// Malformed input: tab export, score export, PDF, JSON, or a token
    /// window that no longer decodes.
    Parse(String),
    /// Extraction produced no usable text for the named unit.
    ExtractionEmpty(String),
    /// Invalid configuration, including a missing credential.
    Config(String),
    /// An index batch insert failed.
    StoreWrite(String),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::Fetch(e) => write!(f, "fetch failed: {}", e),
            IngestError::Parse(e) => write!(f, "parse failed: {}", e),
            IngestError::ExtractionEmpty(unit) => write!(f, "no usable text in {}", unit),
            IngestError::Config(e) => write!(f, "configuration error: {}", e),
            IngestError::StoreWrite(e) => write!(f, "store write failed: {}", e),
        }
    }
}

impl std::error::Error for IngestError {}
