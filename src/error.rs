use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unknown edition: {}. Expected one of: {}", .0, crate::config::Edition::allowed())]
    InvalidEdition(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Required input file is missing: {}", .0.display())]
    MissingInput(PathBuf),
    #[error("Malformed JSON in {}: {}", .path.display(), .source)]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Serializing JSON failed: {0}")]
    JsonWrite(#[from] serde_json::Error),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),
    #[error("Semaphore was closed before all pages were requested.")]
    RuntimeSemaphoreClosed,

    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Request to {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("{failed} pages failed to download, run again to fill the gaps")]
    IncompleteDownload { failed: usize },

    #[error("Sqlite Error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<tokio::sync::AcquireError> for Error {
    fn from(_value: tokio::sync::AcquireError) -> Self {
        Error::RuntimeSemaphoreClosed
    }
}

impl Error {
    /// Wraps a `serde_json` parse error with the file it came from.
    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::Json { path: path.into(), source }
    }
}
