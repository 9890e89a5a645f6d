//! # Meet with AI session proxy
//!
//! Keeps the voice provider's API key off the device. The app asks the proxy
//! for a realtime session and receives the provider's session object,
//! including the short-lived client secret used for the SDP exchange.
//!
//! | Method | Path           | Response                                         |
//! |--------|----------------|--------------------------------------------------|
//! | GET    | `/api/test`    | `{"message": "Hello from Meet with AI Server!"}` |
//! | POST   | `/api/session` | upstream session JSON, or 500 `{"error": ...}`   |

pub mod config;
pub mod error;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use meetai_call_core::{HealthResponse, SessionRequest};

pub use config::ProxyConfig;
pub use error::ProxyError;

/// Greeting returned by the health check
pub const HEALTH_MESSAGE: &str = "Hello from Meet with AI Server!";

/// Agent name used when the request carries none
pub const DEFAULT_AGENT_NAME: &str = "AIエージェント";

/// Prompt used when the request carries none
pub const DEFAULT_PROMPT: &str = "ユーザーの質問に答え、会話を続けてください。日本語で話してください。";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    config: Arc<ProxyConfig>,
    http: reqwest::Client,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

#[derive(Debug, Serialize)]
struct UpstreamSessionRequest<'a> {
    model: &'a str,
    instructions: String,
    voice: &'a str,
}

/// Build the proxy's router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/test", get(health))
        .route("/api/session", post(create_session))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Persona instructions sent upstream. Missing or empty values fall back to defaults.
pub fn format_instructions(agent_name: Option<&str>, prompt: Option<&str>) -> String {
    let name = agent_name.filter(|s| !s.is_empty()).unwrap_or(DEFAULT_AGENT_NAME);
    let prompt = prompt.filter(|s| !s.is_empty()).unwrap_or(DEFAULT_PROMPT);
    format!(
        "あなたは{}という名前のAIエージェントです。以下の指示に従ってください。{}",
        name, prompt
    )
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: HEALTH_MESSAGE.to_string(),
    })
}

async fn create_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ProxyError> {
    let Some(api_key) = state.config.api_key() else {
        tracing::error!("session requested but no API key is configured");
        return Err(ProxyError::MissingApiKey);
    };

    let request: SessionRequest = if body.is_empty() {
        SessionRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ProxyError::BadRequest(e.to_string()))?
    };

    let upstream = UpstreamSessionRequest {
        model: &state.config.model,
        instructions: format_instructions(request.agent_name.as_deref(), request.instructions.as_deref()),
        voice: &state.config.voice,
    };
    tracing::debug!(agent_name = ?request.agent_name, "creating upstream session");

    let response = state
        .http
        .post(&state.config.upstream_url)
        .header(AUTHORIZATION, format!("Bearer {}", api_key))
        .json(&upstream)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "session creation error");
            ProxyError::from(e)
        })?;

    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        tracing::error!(status = status.as_u16(), body = %detail, "upstream API error");
        return Err(ProxyError::Upstream { status: status.as_u16() });
    }

    let session: serde_json::Value = response.json().await?;
    tracing::info!(session_id = ?session.get("id"), "session created");
    Ok(Json(session))
}
