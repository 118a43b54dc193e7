//! Live presence reporter
//!
//! [`plan`] decides, from the latest snapshots, the one thing to do this
//! tick; [`run`] executes it against a [`LiveChannel`] at 3 Hz and also
//! forwards `game_submitted` commands from the dispatcher.

use log::{debug, info, warn};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use super::{events, LiveChannel, LiveCommand, PresenceState};
use crate::config::{ChannelFilter, DiscordConfig};
use crate::connection::ConnectionState;
use crate::decode::StatsBlock;
use crate::domain::PlayerId;
use crate::session::{CoarseStatus, SessionSnapshot};
use crate::submit::filters;

pub const TICK: Duration = Duration::from_millis(333);
/// Wait after a failed connect before trying again
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Fields of a live `submit` message, in wire order
#[derive(Debug, Clone, PartialEq)]
pub struct LiveStats {
    pub player_id: PlayerId,
    pub timer: f32,
    pub gems: i32,
    pub homing: i32,
    pub enemies_alive: i32,
    pub enemies_killed: i32,
    pub daggers_hit: i32,
    pub daggers_fired: i32,
    pub level_2: f32,
    pub level_3: f32,
    pub level_4: f32,
    pub is_replay: bool,
    pub death_type: i32,
    pub notify_player_best: bool,
    pub notify_above_1000: bool,
}

impl LiveStats {
    #[must_use]
    pub fn new(block: &StatsBlock, status: CoarseStatus, discord: DiscordConfig) -> Self {
        Self {
            player_id: block.player_id,
            timer: block.timer,
            gems: block.counters.total_gems,
            homing: block.counters.homing_daggers,
            enemies_alive: block.counters.enemies_alive,
            enemies_killed: block.counters.kills,
            daggers_hit: block.counters.daggers_hit,
            daggers_fired: block.counters.daggers_fired,
            level_2: block.splits.level_2,
            level_3: block.splits.level_3,
            level_4: block.splits.level_4,
            is_replay: block.is_replay,
            death_type: status.live_death_type(block.death_type),
            notify_player_best: discord.notify_player_best,
            notify_above_1000: discord.notify_above_1000,
        }
    }

    #[must_use]
    pub fn args(&self) -> Vec<Value> {
        vec![
            json!(self.player_id.0),
            json!(self.timer),
            json!(self.gems),
            json!(self.homing),
            json!(self.enemies_alive),
            json!(self.enemies_killed),
            json!(self.daggers_hit),
            json!(self.daggers_fired),
            json!(self.level_2),
            json!(self.level_3),
            json!(self.level_4),
            json!(self.is_replay),
            json!(self.death_type),
            json!(self.notify_player_best),
            json!(self.notify_above_1000),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiveAction {
    Connect(PlayerId),
    Disconnect,
    SubmitStats(LiveStats),
    StatusUpdate { player_id: PlayerId, code: i32 },
    Idle,
}

#[derive(Debug, Clone, Copy)]
pub struct LiveSettings {
    pub stream: ChannelFilter,
    pub discord: DiscordConfig,
}

/// Pick this tick's action
///
/// Pure: no I/O, no clock.
#[must_use]
pub fn plan(
    session: &SessionSnapshot,
    connection: &ConnectionState,
    presence: PresenceState,
    settings: &LiveSettings,
) -> LiveAction {
    if !connection.is_connected() {
        return if presence == PresenceState::Disconnected {
            LiveAction::Idle
        } else {
            LiveAction::Disconnect
        };
    }

    let Some(block) = session.block.as_ref() else {
        return LiveAction::Idle;
    };
    if !session.status.has_player() {
        return LiveAction::Idle;
    }

    match presence {
        PresenceState::Disconnected => return LiveAction::Connect(block.player_id),
        PresenceState::Connecting | PresenceState::Connected => return LiveAction::Idle,
        PresenceState::LoggedIn => {}
    }

    let streamable = session.status.streams_live_stats()
        && filters::passes(&settings.stream, block.is_replay, &block.level_hash_hex());
    if streamable {
        return LiveAction::SubmitStats(LiveStats::new(block, session.status, settings.discord));
    }

    session.status.presence_code().map_or(LiveAction::Idle, |code| LiveAction::StatusUpdate {
        player_id: block.player_id,
        code,
    })
}

/// Reporter loop; exits when `shutdown` flips to true
pub async fn run<C: LiveChannel>(
    mut channel: C,
    session_rx: watch::Receiver<SessionSnapshot>,
    connection_rx: watch::Receiver<ConnectionState>,
    settings: LiveSettings,
    mut commands: mpsc::Receiver<LiveCommand>,
    presence_tx: watch::Sender<PresenceState>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(TICK);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut next_connect = Instant::now();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let action = {
                    let session = session_rx.borrow();
                    let connection = connection_rx.borrow();
                    plan(&session, &connection, channel.state(), &settings)
                };
                if matches!(action, LiveAction::Connect(_)) && Instant::now() < next_connect {
                    continue;
                }
                if let Err(e) = execute(&mut channel, &action).await {
                    warn!("Live channel: {e}");
                    if matches!(action, LiveAction::Connect(_)) {
                        next_connect = Instant::now() + RECONNECT_DELAY;
                    }
                    if let Err(e) = channel.disconnect().await {
                        debug!("Live channel disconnect: {e}");
                    }
                }
            }
            Some(command) = commands.recv() => {
                forward(&mut channel, command).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
        presence_tx.send_replace(channel.state());
    }

    if channel.state() != PresenceState::Disconnected {
        info!("Disconnecting live channel");
    }
    if let Err(e) = channel.disconnect().await {
        debug!("Live channel disconnect: {e}");
    }
    presence_tx.send_replace(PresenceState::Disconnected);
}

async fn execute<C: LiveChannel>(
    channel: &mut C,
    action: &LiveAction,
) -> Result<(), crate::domain::LiveError> {
    match action {
        LiveAction::Connect(player) => channel.connect(*player).await,
        LiveAction::Disconnect => channel.disconnect().await,
        LiveAction::SubmitStats(stats) => channel.emit(events::SUBMIT, stats.args()).await,
        LiveAction::StatusUpdate { player_id, code } => {
            channel.emit(events::STATUS_UPDATE, vec![json!(player_id.0), json!(code)]).await
        }
        LiveAction::Idle => Ok(()),
    }
}

async fn forward<C: LiveChannel>(channel: &mut C, command: LiveCommand) {
    match command {
        LiveCommand::GameSubmitted { game_id, notify_player_best, notify_above_1000 } => {
            if channel.state() != PresenceState::LoggedIn {
                debug!("Not logged in, dropping game_submitted for {game_id}");
                return;
            }
            let args = vec![json!(game_id.0), json!(notify_player_best), json!(notify_above_1000)];
            match channel.emit(events::GAME_SUBMITTED, args).await {
                Ok(()) => info!("Announced game {game_id}"),
                Err(e) => warn!("Could not announce game {game_id}: {e}"),
            }
        }
    }
}
