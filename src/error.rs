use std::path::PathBuf;
use thiserror::Error;

/// Failures of the inbound adapters. None of them are fatal to the dashboard;
/// the runtime logs them and the source retries or stops.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("event stream error: {0}")]
    Stream(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unknown event `{0}`")]
    UnknownEvent(String),

    #[error("replay file not found: {}", .0.display())]
    ReplayMissing(PathBuf),
}

pub type Result<T, E = SourceError> = std::result::Result<T, E>;
