//! Runtime wiring
//!
//! Spawns the periodic tasks and connects them with watch channels:
//!
//! ```text
//!  sampling (36 Hz, own thread) ──session/connection──▶ presence (3 Hz) ──▶ live channel
//!        │                   │
//!        │ completed         └──────────────▶ display (2 Hz, TUI thread)
//!        ▼                                        ▲
//!  dispatcher (queue) ──last submission───────────┘
//!        └── game_submitted ──▶ presence
//! ```
//!
//! The sampling thread is the only writer of session and connection state;
//! everyone else reads the latest published copy.

use anyhow::{Context, Result};
use crossbeam_channel::unbounded;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::cli::Args;
use crate::config::{self, Config};
use crate::connection::ConnectionState;
use crate::display::{DisplayModel, Feeds};
use crate::live::{reporter, LiveSettings, PresenceState, SocketIoChannel};
use crate::memory::{MemoryReader, ProcReader};
use crate::sampler::{Sampler, Tick};
use crate::session::{SessionEvent, SessionRecording, SessionSnapshot};
use crate::submit::{dispatcher, DispatchSettings, HttpApi, LastSubmission, ServerInfo, SubmissionApi, DEFAULT_TIMEOUT};
use crate::tui::{self, HeaderInfo, UiCommand};

/// 36 Hz
pub const SAMPLE_INTERVAL: Duration = Duration::from_micros(27_778);
const HEADLESS_STATUS_INTERVAL: Duration = Duration::from_secs(10);
const SUBMIT_QUEUE: usize = 8;
const LIVE_QUEUE: usize = 8;
const TASK_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Where completed recordings go
pub enum Sink {
    Queue(mpsc::Sender<SessionRecording>),
    /// No networking: the outcome is published directly
    Offline(watch::Sender<LastSubmission>),
}

impl Sink {
    /// Hand a recording over without waiting
    pub fn deliver(&self, rec: SessionRecording) {
        match self {
            Self::Queue(tx) => match tx.try_send(rec) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("Submission queue full, session dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => debug!("Dispatcher gone, session dropped"),
            },
            Self::Offline(status) => {
                info!("Offline mode: session of {:.2}s not submitted", rec.final_time);
                status.send_replace(LastSubmission::Skipped("Offline mode: not submitted".to_string()));
            }
        }
    }
}

/// Sampling loop; releases the process handle on exit
///
/// Runs on its own thread: memory reads and `/proc` scans block, so they
/// stay off the async workers. Missed ticks are skipped, not replayed.
pub fn sample_loop<R: MemoryReader>(
    mut sampler: Sampler<R>,
    session_tx: watch::Sender<SessionSnapshot>,
    connection_tx: watch::Sender<ConnectionState>,
    sink: Sink,
    shutdown: watch::Receiver<bool>,
) {
    let mut next_tick = Instant::now();

    while !stopping(&shutdown) {
        let Tick { session, connection, event } = sampler.tick();
        if let Some(SessionEvent::Completed(rec)) = event {
            sink.deliver(rec);
        }
        session_tx.send_replace(session);
        connection_tx.send_replace(connection);

        next_tick += SAMPLE_INTERVAL;
        let now = Instant::now();
        if next_tick > now {
            std::thread::sleep(next_tick - now);
        } else {
            next_tick = now;
        }
    }

    sampler.shutdown();
    debug!("Sampling stopped");
}

/// Shutdown requested, or its sender is gone
fn stopping(shutdown: &watch::Receiver<bool>) -> bool {
    shutdown.has_changed().is_err() || *shutdown.borrow()
}

fn effective_config(args: &Args, mut config: Config) -> Config {
    if let Some(host) = &args.host {
        config.host.clone_from(host);
    }
    config.offline_mode |= args.offline;
    config
}

fn log_status(model: &DisplayModel) {
    info!(
        "{} | online: {} | recording: {} | time {:.2}s | last game: {}",
        model.status_label(),
        model.presence.label(),
        model.recording_label(),
        model.stats.timer,
        model.submission.label(),
    );
}

/// Run until Ctrl+C or the TUI quits
///
/// # Errors
/// Fails on an unusable host URL or if the TUI cannot drive the terminal.
pub async fn run(args: Args) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    let loaded = config::load(&args.config);
    let config = effective_config(&args, loaded.config);

    if !args.quiet && args.headless {
        eprintln!("ddstats v{version}");
        eprintln!("config: {}", args.config.display());
        eprintln!("host: {}", if config.offline_mode { "offline" } else { config.host.as_str() });
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (session_tx, session_rx) = watch::channel(SessionSnapshot::default());
    let (connection_tx, connection_rx) = watch::channel(ConnectionState::default());
    let (presence_tx, presence_rx) = watch::channel(PresenceState::default());
    let (submission_tx, submission_rx) = watch::channel(LastSubmission::default());
    let (server_tx, server_rx) = watch::channel(ServerInfo::default());

    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    // Network tasks
    let sink = if config.offline_mode {
        info!("Offline mode: no submissions, no live channel");
        Sink::Offline(submission_tx)
    } else {
        let api: Arc<dyn SubmissionApi> =
            Arc::new(HttpApi::new(&config.host, DEFAULT_TIMEOUT).context("Invalid host in config")?);
        let channel = SocketIoChannel::new(&config.host).context("Invalid host in config")?;

        let (live_tx, live_rx) = mpsc::channel(LIVE_QUEUE);
        tasks.push(tokio::spawn(reporter::run(
            channel,
            session_rx.clone(),
            connection_rx.clone(),
            LiveSettings { stream: config.stream, discord: config.discord },
            live_rx,
            presence_tx,
            shutdown_rx.clone(),
        )));

        let (queue_tx, queue_rx) = mpsc::channel(SUBMIT_QUEUE);
        tasks.push(tokio::spawn(dispatcher::run(
            api,
            DispatchSettings::from_config(&config, version, DEFAULT_TIMEOUT),
            queue_rx,
            submission_tx,
            server_tx,
            Some(live_tx),
            shutdown_rx.clone(),
        )));
        Sink::Queue(queue_tx)
    };

    // Sampling thread
    let sampler = Sampler::new(ProcReader, args.process.clone());
    let sampling_shutdown = shutdown_rx.clone();
    let sampling_handle =
        std::thread::spawn(move || sample_loop(sampler, session_tx, connection_tx, sink, sampling_shutdown));

    let feeds = Feeds {
        session: session_rx,
        connection: connection_rx,
        presence: presence_rx,
        submission: submission_rx,
        server: server_rx,
    };

    // Launch TUI in separate thread if not headless
    let (ui_tx, ui_rx) = unbounded();
    let tui_handle = if args.headless {
        None
    } else {
        let header = HeaderInfo {
            version: version.to_string(),
            host: config.host.clone(),
            offline: config.offline_mode,
            auto_clipboard: config.auto_clipboard_game,
            config_warning: loaded.warning.clone(),
        };
        let tui_feeds = feeds.clone();
        let tui_shutdown = shutdown_rx.clone();
        Some(std::thread::spawn(move || tui::run_live(tui_feeds, header, ui_tx, tui_shutdown)))
    };
    if let Some(warning) = &loaded.warning {
        warn!("{warning}");
    }

    // Setup Ctrl+C handler
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stats_timer = Instant::now();

    loop {
        if tui_handle.as_ref().is_some_and(std::thread::JoinHandle::is_finished) {
            break;
        }

        while let Ok(command) = ui_rx.try_recv() {
            match command {
                UiCommand::RewriteConfig => match config::write_default(&args.config) {
                    Ok(()) => info!("Rewrote {} with defaults", args.config.display()),
                    Err(e) => warn!("Could not rewrite {}: {e}", args.config.display()),
                },
            }
        }

        // Print status every 10 seconds in headless mode
        if args.headless && stats_timer.elapsed() > HEADLESS_STATUS_INTERVAL {
            log_status(&feeds.render());
            stats_timer = Instant::now();
        }

        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(100)) => {}
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }
    }

    shutdown_tx.send_replace(true);
    for task in tasks {
        if tokio::time::timeout(TASK_STOP_TIMEOUT, task).await.is_err() {
            warn!("A task did not stop in time");
        }
    }
    let sampling = tokio::task::spawn_blocking(move || sampling_handle.join());
    match tokio::time::timeout(TASK_STOP_TIMEOUT, sampling).await {
        Ok(Ok(Ok(()))) => {}
        Ok(_) => warn!("Sampling thread panicked"),
        Err(_) => warn!("Sampling thread did not stop in time"),
    }

    if let Some(handle) = tui_handle {
        handle.join().map_err(|_| anyhow::anyhow!("TUI thread panicked"))??;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{StatFrame, StatsBlock};
    use crate::domain::PlayerId;
    use crate::memory::ScriptedMemory;
    use crate::session::CoarseStatus;
    use clap::Parser;

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from(["ddstats", "--host", "http://localhost:5666", "--offline"]);
        let config = effective_config(&args, Config::default());
        assert_eq!(config.host, "http://localhost:5666");
        assert!(config.offline_mode);

        let args = Args::parse_from(["ddstats"]);
        let config = effective_config(&args, Config { offline_mode: true, ..Config::default() });
        assert!(config.offline_mode);
    }

    #[test]
    fn test_offline_sink_publishes_skip() {
        let (tx, rx) = watch::channel(LastSubmission::default());
        Sink::Offline(tx).deliver(SessionRecording::default());
        assert!(matches!(*rx.borrow(), LastSubmission::Skipped(_)));
    }

    #[test]
    fn test_sample_loop_publishes_and_stops() {
        let mem = ScriptedMemory::with_game("devildaggers", 3);
        let menu = StatsBlock {
            player_id: PlayerId(1),
            player_name: "cookie".to_string(),
            counters: StatFrame { enemies_alive: 5, ..Default::default() },
            is_player_alive: true,
            status_code: ddstats_common::status::MENU,
            ..Default::default()
        };
        mem.stage(&menu, &[]);

        let (session_tx, session_rx) = watch::channel(SessionSnapshot::default());
        let (connection_tx, connection_rx) = watch::channel(ConnectionState::default());
        let (status_tx, _status_rx) = watch::channel(LastSubmission::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sampler = Sampler::new(mem, "devildaggers");
        let handle = std::thread::spawn(move || {
            sample_loop(sampler, session_tx, connection_tx, Sink::Offline(status_tx), shutdown_rx);
        });

        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(session_rx.borrow().status, CoarseStatus::Menu);
        assert!(connection_rx.borrow().is_connected());

        let stop = Instant::now();
        shutdown_tx.send_replace(true);
        handle.join().unwrap();
        assert!(stop.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_sample_loop_stops_when_shutdown_sender_dropped() {
        let (session_tx, _session_rx) = watch::channel(SessionSnapshot::default());
        let (connection_tx, _connection_rx) = watch::channel(ConnectionState::default());
        let (status_tx, _status_rx) = watch::channel(LastSubmission::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sampler = Sampler::new(ScriptedMemory::default(), "devildaggers");
        let handle = std::thread::spawn(move || {
            sample_loop(sampler, session_tx, connection_tx, Sink::Offline(status_tx), shutdown_rx);
        });

        drop(shutdown_tx);
        handle.join().unwrap();
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let sink = Sink::Queue(tx);
        sink.deliver(SessionRecording { final_time: 1.0, ..Default::default() });
        sink.deliver(SessionRecording { final_time: 2.0, ..Default::default() });
        assert!((rx.try_recv().unwrap().final_time - 1.0).abs() < f32::EPSILON);
        assert!(rx.try_recv().is_err());
    }
}
