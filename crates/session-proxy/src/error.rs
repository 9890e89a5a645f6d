use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use meetai_call_core::ErrorBody;

/// Failures of `POST /api/session`, each rendered as `{"error": ...}`
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("OpenAI API key not configured")]
    MissingApiKey,

    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error("OpenAI API error: {status}")]
    Upstream { status: u16 },

    #[error("{0}")]
    Transport(String),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        ProxyError::Transport(e.to_string())
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.to_string() };
        (self.status_code(), Json(body)).into_response()
    }
}
