//! Submission dispatcher
//!
//! Runs on its own task, fed by a bounded queue from the sampling loop. Each
//! completed recording is filtered, submitted once with a bounded timeout,
//! and the outcome published for the display. Nothing is retried.

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use super::api::{game_url, SubmissionApi};
use super::filters;
use super::payload::GamePayload;
use crate::config::{ChannelFilter, Config, DiscordConfig};
use crate::domain::{GameId, SubmitError};
use crate::live::LiveCommand;
use crate::session::SessionRecording;

/// Outcome of the most recent session, as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LastSubmission {
    #[default]
    None,
    Pending,
    Submitted { game_id: GameId, url: String },
    Skipped(String),
    Failed(String),
}

impl LastSubmission {
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::None => "None yet".to_string(),
            Self::Pending => "Submitting...".to_string(),
            Self::Submitted { url, .. } => url.clone(),
            Self::Skipped(reason) => reason.clone(),
            Self::Failed(reason) => format!("Error: {reason}"),
        }
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Submitted { url, .. } => Some(url),
            _ => None,
        }
    }
}

/// What the server told us at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub motd: Option<String>,
    pub update_available: bool,
    pub submissions_allowed: bool,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self { motd: None, update_available: false, submissions_allowed: true }
    }
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub version: String,
    pub host: String,
    pub submit: ChannelFilter,
    pub stream: ChannelFilter,
    pub discord: DiscordConfig,
    pub timeout: Duration,
    pub get_motd: bool,
    pub check_for_updates: bool,
}

impl DispatchSettings {
    #[must_use]
    pub fn from_config(config: &Config, version: &str, timeout: Duration) -> Self {
        Self {
            version: version.to_string(),
            host: config.host.clone(),
            submit: config.submit,
            stream: config.stream,
            discord: config.discord,
            timeout,
            get_motd: config.get_motd,
            check_for_updates: config.check_for_updates,
        }
    }
}

/// Startup `client_connect`, bounded by the submit timeout
///
/// A failure never blocks submissions; only an explicit invalid-version
/// verdict does.
pub async fn handshake(api: &dyn SubmissionApi, settings: &DispatchSettings) -> ServerInfo {
    if !settings.get_motd && !settings.check_for_updates {
        return ServerInfo::default();
    }

    let reply = match tokio::time::timeout(settings.timeout, api.client_connect(&settings.version)).await {
        Ok(result) => result,
        Err(_) => Err(SubmitError::Timeout(settings.timeout)),
    };

    match reply {
        Ok(reply) => {
            if !reply.valid_version {
                warn!("Server rejected client version {}; submissions disabled", settings.version);
            }
            ServerInfo {
                motd: settings.get_motd.then_some(reply.motd),
                update_available: settings.check_for_updates && reply.update_available,
                submissions_allowed: reply.valid_version,
            }
        }
        Err(e) => {
            warn!("client_connect failed: {e}");
            ServerInfo { motd: Some(format!("Could not reach server: {e}")), ..ServerInfo::default() }
        }
    }
}

/// Submit one recording
///
/// Returns the outcome to display and, on success, the announcement for the
/// live channel if the stream filter lets it through.
pub async fn handle_one(
    api: &dyn SubmissionApi,
    settings: &DispatchSettings,
    submissions_allowed: bool,
    rec: &SessionRecording,
) -> (LastSubmission, Option<LiveCommand>) {
    if !filters::passes(&settings.submit, rec.is_replay, &rec.level_hash) {
        info!("Session not submitted: excluded by [submit] settings");
        return (LastSubmission::Skipped("Not submitted (filtered)".to_string()), None);
    }
    if !submissions_allowed {
        return (LastSubmission::Skipped("Not submitted: client out of date".to_string()), None);
    }

    let payload = GamePayload::new(rec, &settings.version);
    let result = match tokio::time::timeout(settings.timeout, api.submit_game(&payload)).await {
        Ok(result) => result,
        Err(_) => Err(SubmitError::Timeout(settings.timeout)),
    };

    match result {
        Ok(game_id) => {
            let url = game_url(&settings.host, game_id);
            info!("Submitted game {game_id} ({} frames): {url}", payload.stats.len());
            let announce = filters::passes(&settings.stream, rec.is_replay, &rec.level_hash).then_some(
                LiveCommand::GameSubmitted {
                    game_id,
                    notify_player_best: settings.discord.notify_player_best,
                    notify_above_1000: settings.discord.notify_above_1000,
                },
            );
            (LastSubmission::Submitted { game_id, url }, announce)
        }
        Err(e) => {
            warn!("Submission failed: {e}");
            (LastSubmission::Failed(e.to_string()), None)
        }
    }
}

/// Dispatcher loop; exits on shutdown or when the queue closes
pub async fn run(
    api: Arc<dyn SubmissionApi>,
    settings: DispatchSettings,
    mut queue: mpsc::Receiver<SessionRecording>,
    status_tx: watch::Sender<LastSubmission>,
    server_tx: watch::Sender<ServerInfo>,
    live_tx: Option<mpsc::Sender<LiveCommand>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let server = tokio::select! {
        info = handshake(api.as_ref(), &settings) => info,
        _ = shutdown.changed() => return,
    };
    let submissions_allowed = server.submissions_allowed;
    server_tx.send_replace(server);

    loop {
        let rec = tokio::select! {
            rec = queue.recv() => match rec {
                Some(rec) => rec,
                None => break,
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        };

        status_tx.send_replace(LastSubmission::Pending);
        let (outcome, announce) = tokio::select! {
            done = handle_one(api.as_ref(), &settings, submissions_allowed, &rec) => done,
            _ = shutdown.changed() => break,
        };
        status_tx.send_replace(outcome);

        if let (Some(command), Some(tx)) = (announce, live_tx.as_ref()) {
            if tx.send(command).await.is_err() {
                debug!("Live reporter gone, game_submitted dropped");
            }
        }
    }
    debug!("Dispatcher stopped");
}
