use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::llm::provider::LlmError;
use crate::neighborhood::DatasetError;
use crate::protocol::ErrorBody;

/// Terminal failure of a chat request. The display text is the `error` field
/// returned to the caller.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request body")]
    InvalidBody,
    #[error("Message is required")]
    MissingMessage,
    #[error("Groq API key not set")]
    MissingApiKey,
    #[error("Failed to load neighborhood data")]
    Dataset(#[source] DatasetError),
    #[error("No response from model")]
    EmptyResponse,
    #[error("Error communicating with Groq API")]
    Upstream(#[source] LlmError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBody | Self::MissingMessage => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Only upstream failures expose their cause to the caller.
    pub fn details(&self) -> Option<String> {
        match self {
            Self::Upstream(err) => Some(err.to_string()),
            _ => None,
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingApiKey => Self::MissingApiKey,
            LlmError::EmptyResponse => Self::EmptyResponse,
            other => Self::Upstream(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Dataset(err) => error!(error = %err, "neighborhood dataset unavailable"),
            Self::Upstream(err) => error!(error = %err, "completion request failed"),
            other if status.is_server_error() => error!("{other}"),
            other => warn!("rejected chat request: {other}"),
        }

        let body = ErrorBody {
            error: self.to_string(),
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}
