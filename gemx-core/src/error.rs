use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a [`crate::view::ChatView`] capability.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("view is detached: {0}")]
    Detached(String),

    #[error("unknown scroll target: {0}")]
    UnknownTarget(String),

    #[error("view query failed: {0}")]
    Query(String),
}

#[derive(Debug, Error)]
pub enum GemxError {
    #[error("no messages found in conversation")]
    NoContentFound,

    #[error("extraction failed while {context}: {source}")]
    ExtractionFailure {
        context: String,
        #[source]
        source: ViewError,
    },

    #[error("not a Gemini conversation page: {0}")]
    HostMismatch(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("cannot determine home directory")]
    HomeDirectoryNotFound,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("snapshot file is empty: {path}")]
    EmptySnapshot { path: PathBuf },

    #[error("no .html snapshots found in {path}")]
    NoSnapshots { path: PathBuf },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GemxError {
    pub(crate) fn extraction(context: impl Into<String>, source: ViewError) -> Self {
        Self::ExtractionFailure {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, GemxError>;
