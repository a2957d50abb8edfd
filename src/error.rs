//! Error type for the fetch / flatten / aggregate pipeline.
//!
//! Route handlers return these directly; the [`IntoResponse`] impl picks the
//! status code so the handlers stay free of error-mapping boilerplate.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

// ---

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    // ---
    #[error("token request failed: {0}")]
    TokenRequest(#[source] reqwest::Error),

    #[error("token response did not contain an access_token")]
    MissingAccessToken,

    #[error("generation request for {start} .. {end} failed: {source}")]
    Fetch {
        start: String,
        end: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },

    #[error("end date {end} is before start date {start}")]
    InvalidRange { start: String, end: String },

    #[error("range {start} .. {end} is longer than {max_days} days")]
    RangeTooLong {
        start: String,
        end: String,
        max_days: u32,
    },

    #[error("no generation records in the requested range")]
    EmptyDataset,

    #[error("failed to render template: {0}")]
    Template(#[from] askama::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    // ---
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidDate { .. } | Self::InvalidRange { .. } | Self::RangeTooLong { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::EmptyDataset => StatusCode::NOT_FOUND,
            Self::TokenRequest(_) | Self::MissingAccessToken | Self::Fetch { .. } => {
                StatusCode::BAD_GATEWAY
            }
            Self::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        // ---
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::info!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
