//! Submission payload
//!
//! A 1:1 copy of a [`SessionRecording`] in the server's JSON shape, plus the
//! client version.

use ddstats_common::ENEMY_SLOTS;
use serde::Serialize;

use crate::decode::StatFrame;
use crate::domain::PlayerId;
use crate::session::SessionRecording;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FramePayload {
    pub gems_collected: i32,
    pub kills: i32,
    pub daggers_fired: i32,
    pub daggers_hit: i32,
    pub enemies_alive: i32,
    pub level_gems: i32,
    pub homing_daggers: i32,
    pub gems_despawned: i32,
    pub gems_eaten: i32,
    pub total_gems: i32,
    pub daggers_eaten: i32,
    pub per_enemy_alive_count: [i16; ENEMY_SLOTS],
    pub per_enemy_kill_count: [i16; ENEMY_SLOTS],
}

impl From<&StatFrame> for FramePayload {
    fn from(f: &StatFrame) -> Self {
        Self {
            gems_collected: f.gems_collected,
            kills: f.kills,
            daggers_fired: f.daggers_fired,
            daggers_hit: f.daggers_hit,
            enemies_alive: f.enemies_alive,
            level_gems: f.level_gems,
            homing_daggers: f.homing_daggers,
            gems_despawned: f.gems_despawned,
            gems_eaten: f.gems_eaten,
            total_gems: f.total_gems,
            daggers_eaten: f.daggers_eaten,
            per_enemy_alive_count: f.per_enemy_alive,
            per_enemy_kill_count: f.per_enemy_killed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePayload {
    pub version: String,
    /// Whose run this is: the replay participant when watching a replay
    pub player_id: PlayerId,
    pub player_name: String,
    /// The local player when watching a replay, otherwise 0
    pub replay_player_id: PlayerId,
    pub is_replay: bool,
    #[serde(rename = "levelHashMD5")]
    pub level_hash: String,
    pub block_version: i32,
    pub time: f32,
    pub death_type: u8,
    pub time_lvl2: f32,
    pub time_lvl3: f32,
    pub time_lvl4: f32,
    pub time_levi_down: f32,
    pub time_orb_down: f32,
    pub homing_daggers_max: i32,
    pub homing_daggers_max_time: f32,
    pub enemies_alive_max: i32,
    pub enemies_alive_max_time: f32,
    pub starting_hand_level: i32,
    pub starting_homing_count: i32,
    pub starting_time: f32,
    pub prohibited_mods: bool,
    #[serde(flatten)]
    pub totals: FramePayload,
    pub stats: Vec<FramePayload>,
}

impl GamePayload {
    #[must_use]
    pub fn new(rec: &SessionRecording, version: &str) -> Self {
        let (player_id, player_name, replay_player_id) = if rec.is_replay {
            (rec.replay_player_id, rec.replay_player_name.clone(), rec.player_id)
        } else {
            (rec.player_id, rec.player_name.clone(), PlayerId::default())
        };

        Self {
            version: version.to_string(),
            player_id,
            player_name,
            replay_player_id,
            is_replay: rec.is_replay,
            level_hash: rec.level_hash.clone(),
            block_version: rec.version,
            time: rec.final_time,
            death_type: rec.death_type,
            time_lvl2: rec.splits.level_2,
            time_lvl3: rec.splits.level_3,
            time_lvl4: rec.splits.level_4,
            time_levi_down: rec.splits.leviathan_down,
            time_orb_down: rec.splits.orb_down,
            homing_daggers_max: rec.maxima.homing,
            homing_daggers_max_time: rec.maxima.homing_time,
            enemies_alive_max: rec.maxima.enemies_alive,
            enemies_alive_max_time: rec.maxima.enemies_alive_time,
            starting_hand_level: rec.starting_hand_level,
            starting_homing_count: rec.starting_homing_count,
            starting_time: rec.starting_time,
            prohibited_mods: rec.prohibited_mods,
            totals: FramePayload::from(&rec.totals),
            stats: rec.frames.iter().map(FramePayload::from).collect(),
        }
    }
}
