//! Coarse status and its canonical mappings
//!
//! [`derive_status`] is the only way a [`CoarseStatus`] is produced from game
//! data. Everything that needs to branch on status (edges, presence codes,
//! display labels) goes through the methods here rather than matching on raw
//! game codes.

use ddstats_common::status as raw;

use crate::decode::StatsBlock;

/// Which screen an own replay was opened from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplaySource {
    FromRun,
    FromLeaderboard,
}

/// What the player is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CoarseStatus {
    #[default]
    NotConnected,
    Connecting,
    TitleScreen,
    Menu,
    Lobby,
    Playing,
    Dead,
    OwnReplay(ReplaySource),
    OtherReplay,
}

impl CoarseStatus {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::NotConnected => "Devil Daggers not found",
            Self::Connecting => "Connecting",
            Self::TitleScreen => "Title screen",
            Self::Menu => "In menu",
            Self::Lobby => "In dagger lobby",
            Self::Playing => "Playing",
            Self::Dead => "Dead",
            Self::OwnReplay(_) => "Watching own replay",
            Self::OtherReplay => "Watching replay",
        }
    }

    /// Code carried by a `status_update` message
    ///
    /// `None` while there is no logged-in player to report for.
    #[must_use]
    pub fn presence_code(self) -> Option<i32> {
        match self {
            Self::NotConnected | Self::Connecting => None,
            Self::TitleScreen | Self::Menu => Some(4),
            Self::Lobby => Some(5),
            Self::Playing => Some(2),
            Self::Dead => Some(6),
            Self::OwnReplay(_) | Self::OtherReplay => Some(3),
        }
    }

    #[must_use]
    pub fn is_replay(self) -> bool {
        matches!(self, Self::OwnReplay(_) | Self::OtherReplay)
    }

    /// Entering one of these from a different status starts a session
    #[must_use]
    pub fn starts_session(self) -> bool {
        matches!(
            self,
            Self::Playing | Self::OtherReplay | Self::OwnReplay(ReplaySource::FromLeaderboard)
        )
    }

    /// An armed session completes in one of these once frames finish loading
    #[must_use]
    pub fn ends_session(self) -> bool {
        matches!(
            self,
            Self::Dead | Self::OtherReplay | Self::OwnReplay(ReplaySource::FromLeaderboard)
        )
    }

    /// Live stats (rather than a bare status update) are streamed in these
    #[must_use]
    pub fn streams_live_stats(self) -> bool {
        matches!(self, Self::Playing | Self::Dead | Self::OwnReplay(_) | Self::OtherReplay)
    }

    /// Whether a game block is available (stats are meaningful)
    #[must_use]
    pub fn has_player(self) -> bool {
        !matches!(self, Self::NotConnected | Self::Connecting)
    }

    /// Death type carried by live stats: -1 playing, the code when dead, -2 otherwise
    #[must_use]
    pub fn live_death_type(self, death_type: u8) -> i32 {
        match self {
            Self::Playing => -1,
            Self::Dead => i32::from(death_type),
            _ => -2,
        }
    }
}

/// Derive the status of `block`
///
/// `previous` is the last successfully decoded block and `previous_status`
/// the status derived from it; read failures in between do not reset either.
/// First matching row wins.
#[must_use]
#[allow(clippy::float_cmp)] // the game writes an exact 0.0 outside a run
pub fn derive_status(
    block: &StatsBlock,
    previous: Option<&StatsBlock>,
    previous_status: CoarseStatus,
) -> CoarseStatus {
    let alive = block.is_player_alive;

    if previous.is_some_and(|p| p.is_player_alive) && !alive {
        return CoarseStatus::Dead;
    }
    if !alive
        && block.timer > 0.0
        && (previous_status == CoarseStatus::Dead || block.status_code == raw::DEAD)
    {
        return CoarseStatus::Dead;
    }
    if !block.player_id.is_known() || block.player_name.is_empty() {
        return CoarseStatus::Connecting;
    }
    if block.status_code == raw::TITLE {
        return CoarseStatus::TitleScreen;
    }
    if block.timer == 0.0 {
        return if block.counters.enemies_alive == 0 {
            CoarseStatus::Lobby
        } else {
            CoarseStatus::Menu
        };
    }
    if block.is_replay {
        if block.replay_player_id == block.player_id {
            let source = if block.status_code == raw::OWN_REPLAY_FROM_LEADERBOARD {
                ReplaySource::FromLeaderboard
            } else {
                ReplaySource::FromRun
            };
            return CoarseStatus::OwnReplay(source);
        }
        return CoarseStatus::OtherReplay;
    }
    CoarseStatus::Playing
}
