use std::io;

use thiserror::Error;

use crate::archive::ExtractError;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("failed to download chart, status code: {0}")]
    UnexpectedStatus(u16),
    #[error("failed to download chart: {0}")]
    HTTPError(#[from] reqwest::Error),
    #[error("chart archive is larger than the {0} bytes download limit")]
    DownloadTooLarge(u64),
    #[error("{context}: {source}")]
    StorageError {
        context: &'static str,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    ExtractionFailed(#[from] ExtractError),
    #[error("could not find a valid chart directory in the tarball")]
    ChartNotFound,
    #[error("tarball contains several top-level directories: {}", .0.join(", "))]
    AmbiguousChartRoot(Vec<String>),
}

/// Coarse classification used when reporting a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RetrievalFailed,
    StorageError,
    ExtractionFailed,
    ChartNotFound,
}

impl ChartError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChartError::UnexpectedStatus(_)
            | ChartError::HTTPError(_)
            | ChartError::DownloadTooLarge(_) => ErrorKind::RetrievalFailed,
            ChartError::StorageError { .. } => ErrorKind::StorageError,
            ChartError::ExtractionFailed(_) => ErrorKind::ExtractionFailed,
            ChartError::ChartNotFound | ChartError::AmbiguousChartRoot(_) => {
                ErrorKind::ChartNotFound
            }
        }
    }

    pub(crate) fn storage(context: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| ChartError::StorageError { context, source }
    }
}
