//! Display adapter
//!
//! [`render`] flattens the latest published snapshots into the
//! [`DisplayModel`] the TUI draws. It is pure and cheap, so the UI can call
//! it at its own rate.

use ddstats_common::death_type_name;
use tokio::sync::watch;

use crate::connection::ConnectionState;
use crate::domain::Pid;
use crate::live::PresenceState;
use crate::session::{CoarseStatus, RecordingState, SessionSnapshot};
use crate::submit::{LastSubmission, ServerInfo};

/// Per-run numbers; all zero while no game is attached
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatsView {
    pub player_name: String,
    pub timer: f32,
    pub gems: i32,
    pub homing: i32,
    pub daggers_hit: i32,
    pub daggers_fired: i32,
    pub accuracy: f32,
    pub enemies_alive: i32,
    pub kills: i32,
    pub level_2: f32,
    pub level_3: f32,
    pub level_4: f32,
    pub homing_max: i32,
    pub homing_max_time: f32,
    pub enemies_alive_max: i32,
    pub enemies_alive_max_time: f32,
    /// Only set while dead
    pub death_type: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisplayModel {
    pub status: CoarseStatus,
    pub pid: Option<Pid>,
    pub presence: PresenceState,
    pub recording: RecordingState,
    pub frames_recorded: usize,
    pub stats: StatsView,
    pub submission: LastSubmission,
    pub motd: Option<String>,
    pub update_available: bool,
    pub submissions_allowed: bool,
}

impl DisplayModel {
    #[must_use]
    pub fn status_label(&self) -> &'static str {
        self.status.label()
    }

    #[must_use]
    pub fn recording_label(&self) -> &'static str {
        match self.recording {
            RecordingState::NotRecording => "Not recording",
            RecordingState::Recording => "Recording",
            RecordingState::Submitted => "Submitted",
        }
    }
}

#[must_use]
pub fn render(
    session: &SessionSnapshot,
    connection: &ConnectionState,
    presence: PresenceState,
    submission: &LastSubmission,
    server: &ServerInfo,
) -> DisplayModel {
    let stats = match (&session.block, session.status) {
        (_, CoarseStatus::NotConnected | CoarseStatus::Connecting) | (None, _) => StatsView::default(),
        (Some(block), status) => StatsView {
            player_name: block.player_name.clone(),
            timer: block.timer,
            gems: block.counters.total_gems,
            homing: block.counters.homing_daggers,
            daggers_hit: block.counters.daggers_hit,
            daggers_fired: block.counters.daggers_fired,
            accuracy: block.accuracy(),
            enemies_alive: block.counters.enemies_alive,
            kills: block.counters.kills,
            level_2: block.splits.level_2,
            level_3: block.splits.level_3,
            level_4: block.splits.level_4,
            homing_max: block.reported_maxima.homing,
            homing_max_time: block.reported_maxima.homing_time,
            enemies_alive_max: block.reported_maxima.enemies_alive,
            enemies_alive_max_time: block.reported_maxima.enemies_alive_time,
            death_type: (status == CoarseStatus::Dead).then(|| death_type_name(block.death_type)),
        },
    };

    DisplayModel {
        status: session.status,
        pid: connection.pid,
        presence,
        recording: session.recording,
        frames_recorded: session.frames_recorded,
        stats,
        submission: submission.clone(),
        motd: server.motd.clone(),
        update_available: server.update_available,
        submissions_allowed: server.submissions_allowed,
    }
}

/// Receivers for every snapshot [`render`] needs
///
/// Cloned into whichever loop draws; each call sees the latest values.
#[derive(Clone)]
pub struct Feeds {
    pub session: watch::Receiver<SessionSnapshot>,
    pub connection: watch::Receiver<ConnectionState>,
    pub presence: watch::Receiver<PresenceState>,
    pub submission: watch::Receiver<LastSubmission>,
    pub server: watch::Receiver<ServerInfo>,
}

impl Feeds {
    #[must_use]
    pub fn render(&self) -> DisplayModel {
        render(
            &self.session.borrow(),
            &self.connection.borrow(),
            *self.presence.borrow(),
            &self.submission.borrow(),
            &self.server.borrow(),
        )
    }
}
