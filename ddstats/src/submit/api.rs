//! Submission RPC
//!
//! [`SubmissionApi`] is the seam the dispatcher talks through; [`HttpApi`]
//! is the JSON-over-HTTP implementation used against the real server.

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::payload::GamePayload;
use crate::domain::{GameId, SubmitError};

/// Bound on every call to the server
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Reply to the startup handshake
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ClientConnectReply {
    pub motd: String,
    pub valid_version: bool,
    pub update_available: bool,
}

#[async_trait]
pub trait SubmissionApi: Send + Sync {
    /// Announce this client version; returns the MOTD and version verdict
    async fn client_connect(&self, version: &str) -> Result<ClientConnectReply, SubmitError>;

    /// Submit a finished game; returns the id the server assigned
    async fn submit_game(&self, payload: &GamePayload) -> Result<GameId, SubmitError>;
}

#[derive(Debug, Deserialize)]
struct SubmitReply {
    game_id: Option<GameId>,
    message: Option<String>,
}

pub struct HttpApi {
    client: reqwest::Client,
    host: Url,
}

impl HttpApi {
    /// # Errors
    /// Fails if `host` is not a valid URL or the HTTP client cannot be built.
    pub fn new(host: &str, timeout: Duration) -> Result<Self, SubmitError> {
        let host = Url::parse(host).map_err(|e| SubmitError::InvalidResponse(format!("bad host {host}: {e}")))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, host })
    }

    fn endpoint(&self, path: &str) -> Result<Url, SubmitError> {
        self.host
            .join(path)
            .map_err(|e| SubmitError::InvalidResponse(format!("bad endpoint {path}: {e}")))
    }
}

#[async_trait]
impl SubmissionApi for HttpApi {
    async fn client_connect(&self, version: &str) -> Result<ClientConnectReply, SubmitError> {
        let endpoint = self.endpoint("/api/v2/client_connect")?;
        debug!("POST {endpoint}");
        let response = self
            .client
            .post(endpoint)
            .json(&serde_json::json!({ "version": version }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SubmitError::InvalidResponse(response.status().to_string()));
        }
        Ok(response.json::<ClientConnectReply>().await?)
    }

    async fn submit_game(&self, payload: &GamePayload) -> Result<GameId, SubmitError> {
        let endpoint = self.endpoint("/api/v2/submit_game")?;
        debug!("POST {endpoint} ({} frames)", payload.stats.len());
        let response = self.client.post(endpoint).json(payload).send().await?;

        let status = response.status();
        let body = response.text().await?;
        interpret_submit_reply(status.is_success(), &status.to_string(), &body)
    }
}

/// Turn a submit response into a game id or the server's reason
fn interpret_submit_reply(success: bool, status: &str, body: &str) -> Result<GameId, SubmitError> {
    let reply: Option<SubmitReply> = serde_json::from_str(body).ok();
    match reply {
        Some(SubmitReply { game_id: Some(id), .. }) if success => Ok(id),
        Some(SubmitReply { message: Some(message), .. }) => Err(SubmitError::Rejected(message)),
        _ if success => Err(SubmitError::InvalidResponse("no game id in response".to_string())),
        _ => Err(SubmitError::InvalidResponse(status.to_string())),
    }
}

/// Link to a submitted game on the site
#[must_use]
pub fn game_url(host: &str, id: GameId) -> String {
    format!("{}/games/{id}", host.trim_end_matches('/'))
}
