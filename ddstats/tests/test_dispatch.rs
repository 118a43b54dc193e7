//! Dispatcher task end to end with a fake server

use async_trait::async_trait;
use ddstats::config::Config;
use ddstats::domain::{GameId, SubmitError};
use ddstats::live::LiveCommand;
use ddstats::session::SessionRecording;
use ddstats::submit::{dispatcher, ClientConnectReply, DispatchSettings, GamePayload, LastSubmission, ServerInfo, SubmissionApi};
use ddstats_common::DEFAULT_SURVIVAL_HASH;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

#[derive(Default)]
struct RecordingApi {
    submitted: Mutex<Vec<GamePayload>>,
    hang: bool,
}

#[async_trait]
impl SubmissionApi for RecordingApi {
    async fn client_connect(&self, _version: &str) -> Result<ClientConnectReply, SubmitError> {
        Ok(ClientConnectReply { motd: "hello".to_string(), valid_version: true, update_available: false })
    }

    async fn submit_game(&self, payload: &GamePayload) -> Result<GameId, SubmitError> {
        self.submitted.lock().unwrap().push(payload.clone());
        if self.hang {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Ok(GameId(1000 + self.submitted.lock().unwrap().len() as i64))
    }
}

fn recording(seconds: usize) -> SessionRecording {
    SessionRecording {
        level_hash: DEFAULT_SURVIVAL_HASH.to_string(),
        frames: vec![Default::default(); seconds],
        final_time: seconds as f32 + 0.25,
        ..Default::default()
    }
}

struct Harness {
    queue: mpsc::Sender<SessionRecording>,
    status: watch::Receiver<LastSubmission>,
    server: watch::Receiver<ServerInfo>,
    live: mpsc::Receiver<LiveCommand>,
    shutdown: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

fn start(api: Arc<RecordingApi>, timeout: Duration) -> Harness {
    let (queue, queue_rx) = mpsc::channel(4);
    let (status_tx, status) = watch::channel(LastSubmission::default());
    let (server_tx, server) = watch::channel(ServerInfo::default());
    let (live_tx, live) = mpsc::channel(4);
    let (shutdown, shutdown_rx) = watch::channel(false);
    let settings = DispatchSettings::from_config(&Config::default(), "0.7.0", timeout);
    let task = tokio::spawn(dispatcher::run(api, settings, queue_rx, status_tx, server_tx, Some(live_tx), shutdown_rx));
    Harness { queue, status, server, live, shutdown, task }
}

async fn wait_for(status: &mut watch::Receiver<LastSubmission>, done: impl Fn(&LastSubmission) -> bool) -> LastSubmission {
    tokio::time::timeout(Duration::from_secs(5), status.wait_for(|s| done(s)))
        .await
        .expect("dispatcher did not finish in time")
        .expect("dispatcher dropped its status sender")
        .clone()
}

#[tokio::test]
async fn test_submission_published_and_announced() {
    let api = Arc::new(RecordingApi::default());
    let mut h = start(api.clone(), Duration::from_secs(5));

    h.queue.send(recording(12)).await.unwrap();
    let outcome = wait_for(&mut h.status, |s| matches!(s, LastSubmission::Submitted { .. })).await;

    assert_eq!(outcome.url(), Some("https://ddstats.com/games/1001"));
    assert_eq!(h.server.borrow().motd.as_deref(), Some("hello"));
    let command = h.live.recv().await.unwrap();
    assert!(matches!(command, LiveCommand::GameSubmitted { game_id: GameId(1001), .. }));
    assert_eq!(api.submitted.lock().unwrap()[0].stats.len(), 12);

    h.shutdown.send_replace(true);
    h.task.await.unwrap();
}

#[tokio::test]
async fn test_timeout_is_reported_and_not_retried() {
    let api = Arc::new(RecordingApi { hang: true, ..Default::default() });
    let mut h = start(api.clone(), Duration::from_millis(100));

    h.queue.send(recording(3)).await.unwrap();
    let outcome = wait_for(&mut h.status, |s| matches!(s, LastSubmission::Failed(_))).await;
    assert!(outcome.label().contains("timed out"));

    // give a retry every chance to happen
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(api.submitted.lock().unwrap().len(), 1);
    assert!(h.live.try_recv().is_err());

    h.shutdown.send_replace(true);
    h.task.await.unwrap();
}
