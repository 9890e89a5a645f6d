//! HTTP collaborators of a call attempt
//!
//! A call needs two HTTP exchanges before media flows:
//!
//! ```text
//! ┌──────────┐  POST {base}/api/session      ┌──────────────┐
//! │  client  │ ────────────────────────────▶ │ session proxy│──▶ voice provider
//! │          │ ◀──── { id, client_secret } ── └──────────────┘
//! │          │
//! │          │  POST {realtime}?model=...    ┌──────────────┐
//! │          │ ────── SDP offer (bearer) ──▶ │ realtime API │
//! │          │ ◀───── SDP answer (text) ──── └──────────────┘
//! └──────────┘
//! ```
//!
//! Both sides sit behind traits ([`SessionBootstrap`], [`RealtimeEndpoint`]) so the
//! call session can be driven against fakes. The wire types are shared with the
//! proxy crate.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{CallError, CallResult};

/// Body of `POST /api/session`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
}

impl SessionRequest {
    pub fn new(instructions: impl Into<String>, agent_name: impl Into<String>) -> Self {
        Self {
            instructions: Some(instructions.into()),
            agent_name: Some(agent_name.into()),
        }
    }
}

/// Ephemeral credential for the realtime endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSecret {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

/// Session object returned by the proxy, passed through from the voice provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeSessionInfo {
    pub id: String,
    pub client_secret: ClientSecret,
    /// Remaining provider fields, kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Error body of a failed proxy request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Body of `GET /api/test`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
}

/// Mints ephemeral realtime credentials
#[async_trait]
pub trait SessionBootstrap: Send + Sync {
    async fn create_session(&self, request: &SessionRequest) -> CallResult<RealtimeSessionInfo>;
}

/// Exchanges an SDP offer for the remote answer
#[async_trait]
pub trait RealtimeEndpoint: Send + Sync {
    async fn exchange_sdp(&self, offer_sdp: &str, client_secret: &str) -> CallResult<String>;
}

fn build_http(config: &ClientConfig) -> CallResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| CallError::InvalidConfiguration {
            field: "http_client".to_string(),
            reason: e.to_string(),
        })
}

/// Session proxy client
#[derive(Debug, Clone)]
pub struct HttpBootstrapClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBootstrapClient {
    pub fn new(base_url: impl Into<String>, config: &ClientConfig) -> CallResult<Self> {
        Ok(Self {
            http: build_http(config)?,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> CallResult<Url> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(CallError::bootstrap_failure("server URL is not configured"));
        }
        let joined = format!("{}{}", base.trim_end_matches('/'), path);
        Url::parse(&joined)
            .map_err(|e| CallError::bootstrap_failure(format!("invalid server URL '{}': {}", base, e)))
    }

    /// `GET /api/test`, returning the greeting
    pub async fn health_check(&self) -> CallResult<String> {
        let url = self.endpoint("/api/test")?;
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| CallError::bootstrap_failure(format!("cannot reach {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(CallError::bootstrap_failure(format!("HTTP error! status: {}", response.status().as_u16())));
        }

        let body: HealthResponse = response
            .json()
            .await
            .map_err(|e| CallError::bootstrap_failure(format!("malformed health response: {}", e)))?;
        Ok(body.message)
    }
}

#[async_trait]
impl SessionBootstrap for HttpBootstrapClient {
    async fn create_session(&self, request: &SessionRequest) -> CallResult<RealtimeSessionInfo> {
        let url = self.endpoint("/api/session")?;
        tracing::debug!(%url, agent_name = ?request.agent_name, "requesting realtime session");

        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| CallError::bootstrap_failure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ErrorBody>()
                .await
                .map(|body| format!(": {}", body.error))
                .unwrap_or_default();
            return Err(CallError::bootstrap_failure(format!(
                "HTTP error! status: {}{}",
                status.as_u16(),
                detail
            )));
        }

        let session: RealtimeSessionInfo = response
            .json()
            .await
            .map_err(|e| CallError::bootstrap_failure(format!("malformed session response: {}", e)))?;
        tracing::info!(session_id = %session.id, "realtime session created");
        Ok(session)
    }
}

/// Realtime voice endpoint accepting `application/sdp` offers
#[derive(Debug, Clone)]
pub struct HttpRealtimeEndpoint {
    http: reqwest::Client,
    url: Url,
}

impl HttpRealtimeEndpoint {
    pub fn new(config: &ClientConfig) -> CallResult<Self> {
        let mut url = Url::parse(&config.realtime_url).map_err(|e| CallError::InvalidConfiguration {
            field: "realtime_url".to_string(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut().append_pair("model", &config.model);

        Ok(Self {
            http: build_http(config)?,
            url,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl RealtimeEndpoint for HttpRealtimeEndpoint {
    async fn exchange_sdp(&self, offer_sdp: &str, client_secret: &str) -> CallResult<String> {
        let response = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/sdp")
            .header(AUTHORIZATION, format!("Bearer {}", client_secret))
            .body(offer_sdp.to_string())
            .send()
            .await
            .map_err(|e| CallError::negotiation_failure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "realtime endpoint rejected offer");
            return Err(CallError::negotiation_failure(format!(
                "Failed to connect to realtime API: {}",
                describe(status)
            )));
        }

        response
            .text()
            .await
            .map_err(|e| CallError::negotiation_failure(format!("unreadable SDP answer: {}", e)))
    }
}

fn describe(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}
