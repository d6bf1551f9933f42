//! Errors returned by the history parsing core.
//!
//! Malformed log lines and invalid user category patterns are not errors:
//! both are skipped (and logged) so noisy or hand-edited inputs still load.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    /// The history log could not be opened or read.
    #[error("History source unavailable: {path}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    pub fn source_unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ParseError::SourceUnavailable {
            path: path.into(),
            source,
        }
    }
}
