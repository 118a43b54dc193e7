//! Session recording
//!
//! Owned by the session machine from start edge to end edge, then frozen and
//! handed over whole.

use crate::decode::{Maxima, Splits, StatFrame, StatsBlock};
use crate::domain::PlayerId;

use super::status::CoarseStatus;

/// One playthrough or replay viewing
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionRecording {
    pub version: i32,
    pub player_id: PlayerId,
    pub player_name: String,
    pub is_replay: bool,
    /// Participant of the replay being watched
    pub replay_player_id: PlayerId,
    pub replay_player_name: String,
    pub level_hash: String,
    /// One frame per elapsed second; entry `i` is second `i + 1`
    pub frames: Vec<StatFrame>,
    pub maxima: Maxima,
    pub splits: Splits,
    pub death_type: u8,
    pub final_time: f32,
    /// Totals from the last frame
    pub totals: StatFrame,
    pub starting_hand_level: i32,
    pub starting_homing_count: i32,
    pub starting_time: f32,
    pub prohibited_mods: bool,
    /// Status the session ended in
    pub ended_as: CoarseStatus,
}

impl SessionRecording {
    /// Empty recording tagged with the identity in `block`
    #[must_use]
    pub fn start(block: &StatsBlock) -> Self {
        Self {
            version: block.version,
            player_id: block.player_id,
            player_name: block.player_name.clone(),
            is_replay: block.is_replay,
            replay_player_id: block.replay_player_id,
            replay_player_name: block.replay_player_name.clone(),
            level_hash: block.level_hash_hex(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self, frame: StatFrame) {
        self.frames.push(frame);
    }

    /// Replace recorded seconds with the game's own frames and append any
    /// seconds not yet recorded
    pub fn reconcile(&mut self, frames: &[StatFrame]) {
        let overlap = self.frames.len().min(frames.len());
        self.frames[..overlap].copy_from_slice(&frames[..overlap]);
        if frames.len() > self.frames.len() {
            self.frames.extend_from_slice(&frames[self.frames.len()..]);
        }
    }

    /// Freeze with the end-of-session values from `block`
    pub fn finalize(&mut self, block: &StatsBlock, ended_as: CoarseStatus) {
        self.totals = self.frames.last().copied().unwrap_or(block.counters);
        self.final_time = block.timer.max(block.time_max);
        self.death_type = block.death_type;
        self.splits = block.splits;
        self.starting_hand_level = block.starting_hand_level;
        self.starting_homing_count = block.starting_homing_count;
        self.starting_time = block.starting_time;
        self.prohibited_mods = block.prohibited_mods;
        self.ended_as = ended_as;

        let reported = block.reported_maxima;
        if reported.homing > self.maxima.homing {
            self.maxima.homing = reported.homing;
            self.maxima.homing_time = reported.homing_time;
        }
        if reported.enemies_alive > self.maxima.enemies_alive {
            self.maxima.enemies_alive = reported.enemies_alive;
            self.maxima.enemies_alive_time = reported.enemies_alive_time;
        }
    }
}

/// Highest homing and enemies-alive seen since the last sample
///
/// The source counters occasionally read low for a single tick; folding the
/// peak into each sample keeps such dropouts out of the maxima.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecondPeak {
    homing: Option<(i32, f32)>,
    enemies_alive: Option<(i32, f32)>,
}

impl SecondPeak {
    pub fn observe(&mut self, block: &StatsBlock) {
        bump(&mut self.homing, block.counters.homing_daggers, block.timer);
        bump(&mut self.enemies_alive, block.counters.enemies_alive, block.timer);
    }

    /// Fold the peak and the sampled `frame` (taken at `time`) into `maxima`,
    /// then start a new window
    pub fn apply(&mut self, maxima: &mut Maxima, frame: &StatFrame, time: f32) {
        let mut homing = self.homing.take();
        bump(&mut homing, frame.homing_daggers, time);
        if let Some((value, at)) = homing {
            if value > maxima.homing {
                maxima.homing = value;
                maxima.homing_time = at;
            }
        }

        let mut enemies = self.enemies_alive.take();
        bump(&mut enemies, frame.enemies_alive, time);
        if let Some((value, at)) = enemies {
            if value > maxima.enemies_alive {
                maxima.enemies_alive = value;
                maxima.enemies_alive_time = at;
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn bump(slot: &mut Option<(i32, f32)>, value: i32, at: f32) {
    match slot {
        Some((best, _)) if *best >= value => {}
        _ => *slot = Some((value, at)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(homing: i32, enemies: i32) -> StatFrame {
        StatFrame { homing_daggers: homing, enemies_alive: enemies, ..Default::default() }
    }

    #[test]
    fn test_peak_covers_one_tick_dropout() {
        let mut peak = SecondPeak::default();
        let mut maxima = Maxima::default();

        let mut b = StatsBlock { timer: 4.2, counters: frame(30, 12), ..Default::default() };
        peak.observe(&b);
        b.timer = 4.9;
        b.counters = frame(0, 12);
        peak.observe(&b);

        // the sampled frame caught the dropout
        peak.apply(&mut maxima, &frame(0, 11), 5.0);
        assert_eq!(maxima.homing, 30);
        assert!((maxima.homing_time - 4.2).abs() < f32::EPSILON);
        assert_eq!(maxima.enemies_alive, 12);
    }

    #[test]
    fn test_peak_window_resets_after_sample() {
        let mut peak = SecondPeak::default();
        let mut maxima = Maxima { homing: 50, ..Default::default() };
        peak.observe(&StatsBlock { timer: 1.5, counters: frame(40, 0), ..Default::default() });
        peak.apply(&mut maxima, &frame(40, 0), 2.0);
        assert_eq!(maxima.homing, 50);

        peak.apply(&mut maxima, &frame(60, 0), 3.0);
        assert_eq!(maxima.homing, 60);
        assert!((maxima.homing_time - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_reconcile_prefers_game_frames() {
        let mut rec = SessionRecording::default();
        rec.push(frame(1, 0));
        rec.push(frame(2, 0));
        rec.reconcile(&[frame(10, 0), frame(20, 0), frame(30, 0)]);
        let homing: Vec<i32> = rec.frames.iter().map(|f| f.homing_daggers).collect();
        assert_eq!(homing, vec![10, 20, 30]);

        // a shorter array never drops recorded seconds
        rec.reconcile(&[frame(11, 0)]);
        assert_eq!(rec.frame_count(), 3);
        assert_eq!(rec.frames[0].homing_daggers, 11);
    }

    #[test]
    fn test_finalize_reported_maxima_win_if_larger() {
        let mut rec = SessionRecording {
            maxima: Maxima { homing: 80, homing_time: 100.0, enemies_alive: 90, enemies_alive_time: 50.0 },
            ..Default::default()
        };
        rec.push(frame(75, 60));
        let block = StatsBlock {
            timer: 120.3,
            time_max: 120.5,
            death_type: 3,
            reported_maxima: Maxima {
                homing: 81,
                homing_time: 99.0,
                enemies_alive: 20,
                enemies_alive_time: 1.0,
            },
            ..Default::default()
        };
        rec.finalize(&block, CoarseStatus::Dead);

        assert_eq!(rec.maxima.homing, 81);
        assert!((rec.maxima.homing_time - 99.0).abs() < f32::EPSILON);
        assert_eq!(rec.maxima.enemies_alive, 90);
        assert!((rec.final_time - 120.5).abs() < f32::EPSILON);
        assert_eq!(rec.totals.homing_daggers, 75);
        assert_eq!(rec.death_type, 3);
    }
}
