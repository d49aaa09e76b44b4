use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chart_client::ChartError;
use thiserror::Error;
use tracing::{error, warn};

use crate::{engine::RenderError, request::RequestError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    MethodNotAllowed,
    RetrievalFailed,
    StorageError,
    ExtractionFailed,
    ChartNotFound,
    RenderFailed,
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("Error downloading chart: {0}")]
    Download(#[source] ChartError),
    #[error("Error extracting chart: {0}")]
    Extract(#[source] ChartError),
    #[error("Error locating chart: {0}")]
    Locate(#[source] ChartError),
    #[error("Error loading chart: {0}")]
    Load(#[source] RenderError),
    #[error("Error templating chart: {0}")]
    Render(#[source] RenderError),
}

impl TemplateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TemplateError::Request(RequestError::MethodNotAllowed) => ErrorKind::MethodNotAllowed,
            TemplateError::Request(_) => ErrorKind::InvalidRequest,
            TemplateError::Download(err)
            | TemplateError::Extract(err)
            | TemplateError::Locate(err) => match err.kind() {
                chart_client::ErrorKind::RetrievalFailed => ErrorKind::RetrievalFailed,
                chart_client::ErrorKind::StorageError => ErrorKind::StorageError,
                chart_client::ErrorKind::ExtractionFailed => ErrorKind::ExtractionFailed,
                chart_client::ErrorKind::ChartNotFound => ErrorKind::ChartNotFound,
            },
            TemplateError::Load(_) | TemplateError::Render(_) => ErrorKind::RenderFailed,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TemplateError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = ?self.kind(), err = %self, "Templating failed");
        } else {
            warn!(kind = ?self.kind(), err = %self, "Rejected templating request");
        }
        (status, format!("{self}\n")).into_response()
    }
}
