//! Session state machine
//!
//! Fed one tick at a time by the sampling loop. Turns decoded blocks into a
//! [`CoarseStatus`], detects start/end/restart edges, and owns the
//! in-progress [`SessionRecording`].
//!
//! A tick without a block (read failure, process gone) only changes the
//! published status: the last decoded block and the recording survive it, so
//! a glitch can neither fake a start edge nor truncate a session.

use log::{debug, info};

use super::recording::{SecondPeak, SessionRecording};
use super::status::{derive_status, CoarseStatus};
use crate::decode::{StatFrame, StatsBlock};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A new session began and was armed for submission
    Started,
    /// The timer went backwards mid-run; the partial recording was discarded
    Restarted,
    /// A session ended; emitted at most once per start
    Completed(SessionRecording),
}

/// Recording state as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    #[default]
    NotRecording,
    Recording,
    Submitted,
}

/// Read-only view published after every tick
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub status: CoarseStatus,
    /// Latest block; `None` whenever the tick produced no block
    pub block: Option<StatsBlock>,
    pub recording: RecordingState,
    pub frames_recorded: usize,
}

#[derive(Debug, Default)]
pub struct SessionMachine {
    status: CoarseStatus,
    previous: Option<StatsBlock>,
    previous_status: CoarseStatus,
    recording: Option<SessionRecording>,
    armed: bool,
    submitted: bool,
    last_second: usize,
    peak: SecondPeak,
}

impl SessionMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn status(&self) -> CoarseStatus {
        self.status
    }

    #[must_use]
    pub fn recording(&self) -> Option<&SessionRecording> {
        self.recording.as_ref()
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Whether this tick will consume the frame array
    ///
    /// True when a second boundary is crossed or an end edge may fire, so
    /// the caller only reads frames when they are needed.
    #[must_use]
    pub fn needs_frames(&self, block: &StatsBlock) -> bool {
        let status = derive_status(block, self.previous.as_ref(), self.previous_status);
        let restarts = self.is_restart(status, block);
        let starts = restarts || (status.starts_session() && status != self.previous_status);
        if !self.armed && !starts {
            return false;
        }
        let last_second = if starts { 0 } else { self.last_second };
        whole_seconds(block.timer) > last_second
            || (status.ends_session() && block.frames_finished_loading)
    }

    /// A tick that produced no block
    pub fn no_update(&mut self) {
        if self.status != CoarseStatus::NotConnected {
            debug!("No block this tick, status {:?} -> NotConnected", self.status);
        }
        self.status = CoarseStatus::NotConnected;
    }

    /// Advance with a freshly decoded block
    ///
    /// `frames` is the frame array read this tick (empty when
    /// [`SessionMachine::needs_frames`] said it was not needed), or `None`
    /// when it was needed but could not be read. Such a tick records no
    /// seconds and cannot end the session; the next tick picks up where
    /// this one left off.
    pub fn observe(&mut self, block: &StatsBlock, frames: Option<&[StatFrame]>) -> Option<SessionEvent> {
        let status = derive_status(block, self.previous.as_ref(), self.previous_status);
        let mut event = None;

        if self.is_restart(status, block) {
            info!("Restart at {:.2}s, discarding partial recording", block.timer);
            self.begin(block);
            event = Some(SessionEvent::Restarted);
        } else if status.starts_session() && status != self.previous_status {
            info!("Session started ({})", status.label());
            self.begin(block);
            event = Some(SessionEvent::Started);
        }

        if self.armed {
            self.peak.observe(block);
            match frames {
                Some(frames) => {
                    self.sample(frames, whole_seconds(block.timer));
                    if status.ends_session() && block.frames_finished_loading {
                        event = self.complete(block, frames, status).or(event);
                    }
                }
                None => debug!("Frame array unavailable, holding at second {}", self.last_second),
            }
        }

        self.previous = Some(block.clone());
        self.previous_status = status;
        self.status = status;
        event
    }

    #[must_use]
    pub fn snapshot(&self, block: Option<&StatsBlock>) -> SessionSnapshot {
        let recording = if self.armed {
            RecordingState::Recording
        } else if self.submitted {
            RecordingState::Submitted
        } else {
            RecordingState::NotRecording
        };
        SessionSnapshot {
            status: self.status,
            block: block.cloned(),
            recording,
            frames_recorded: self.recording.as_ref().map_or(0, SessionRecording::frame_count),
        }
    }

    fn is_restart(&self, status: CoarseStatus, block: &StatsBlock) -> bool {
        status == CoarseStatus::Playing
            && self.previous_status == CoarseStatus::Playing
            && self.previous.as_ref().is_some_and(|p| block.timer < p.timer)
    }

    fn begin(&mut self, block: &StatsBlock) {
        self.recording = Some(SessionRecording::start(block));
        self.armed = true;
        self.submitted = false;
        self.last_second = 0;
        self.peak.reset();
    }

    /// Append one frame per newly crossed second, back-filling any gap
    ///
    /// Seconds the game has not written to the frame array yet are left for
    /// a later tick.
    #[allow(clippy::cast_precision_loss)]
    fn sample(&mut self, frames: &[StatFrame], now: usize) {
        let Some(recording) = self.recording.as_mut() else {
            return;
        };
        let now = now.min(frames.len());
        for frame in frames.iter().take(now).skip(self.last_second) {
            self.last_second += 1;
            self.peak.apply(&mut recording.maxima, frame, self.last_second as f32);
            recording.push(*frame);
        }
    }

    fn complete(
        &mut self,
        block: &StatsBlock,
        frames: &[StatFrame],
        status: CoarseStatus,
    ) -> Option<SessionEvent> {
        self.armed = false;
        let mut recording = self.recording.take()?;
        recording.reconcile(frames);

        if recording.is_empty() {
            debug!("Session ended with no frames, nothing to submit");
            return None;
        }

        recording.finalize(block, status);
        info!(
            "Session complete: {:.4}s, {} frames ({})",
            recording.final_time,
            recording.frame_count(),
            status.label()
        );
        self.submitted = true;
        Some(SessionEvent::Completed(recording))
    }
}

/// Whole seconds elapsed on the in-game timer
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_seconds(timer: f32) -> usize {
    if timer.is_finite() && timer > 0.0 {
        timer.floor() as usize
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PlayerId;

    fn playing(timer: f32) -> StatsBlock {
        StatsBlock {
            player_id: PlayerId(5),
            player_name: "bintr".to_string(),
            timer,
            counters: StatFrame { enemies_alive: 3, kills: 999, ..Default::default() },
            is_player_alive: true,
            status_code: ddstats_common::status::PLAYING,
            ..Default::default()
        }
    }

    fn dead(timer: f32) -> StatsBlock {
        StatsBlock {
            is_player_alive: false,
            frames_finished_loading: true,
            status_code: ddstats_common::status::DEAD,
            ..playing(timer)
        }
    }

    /// What the game has written for a run at `timer`: one frame per second
    fn game_frames(timer: f32) -> Vec<StatFrame> {
        (1..=whole_seconds(timer))
            .map(|s| StatFrame { kills: i32::try_from(s).unwrap(), ..Default::default() })
            .collect()
    }

    fn step(machine: &mut SessionMachine, block: &StatsBlock) -> Option<SessionEvent> {
        machine.observe(block, Some(&game_frames(block.timer)))
    }

    fn run(machine: &mut SessionMachine, blocks: &[StatsBlock]) -> Vec<SessionEvent> {
        blocks.iter().filter_map(|b| step(machine, b)).collect()
    }

    fn kills(rec: &SessionRecording) -> Vec<i32> {
        rec.frames.iter().map(|f| f.kills).collect()
    }

    #[test]
    fn test_scenario_menu_lobby_play_die() {
        let mut m = SessionMachine::new();
        let mut menu = playing(0.0);
        menu.counters.enemies_alive = 5;
        let mut lobby = playing(0.0);
        lobby.counters.enemies_alive = 0;

        assert_eq!(step(&mut m, &menu), None);
        assert_eq!(m.status(), CoarseStatus::Menu);
        assert_eq!(step(&mut m, &lobby), None);
        assert_eq!(m.status(), CoarseStatus::Lobby);
        assert_eq!(step(&mut m, &playing(0.5)), Some(SessionEvent::Started));
        assert_eq!(m.status(), CoarseStatus::Playing);

        let events = run(&mut m, &[playing(1.02), playing(1.5), playing(2.01), playing(3.3)]);
        assert!(events.is_empty());
        assert_eq!(m.recording().unwrap().frame_count(), 3);

        let Some(SessionEvent::Completed(rec)) = step(&mut m, &dead(3.4)) else {
            panic!("expected completion");
        };
        assert_eq!(rec.frame_count(), 3);
        assert_eq!(kills(&rec), vec![1, 2, 3]);
        assert_eq!(m.snapshot(None).recording, RecordingState::Submitted);

        // nothing further while the death screen persists
        assert!(run(&mut m, &[dead(3.4), dead(3.4)]).is_empty());
    }

    #[test]
    fn test_end_waits_for_frames_to_load() {
        let mut m = SessionMachine::new();
        run(&mut m, &[playing(0.5), playing(2.5)]);

        let mut loading = dead(2.6);
        loading.frames_finished_loading = false;
        assert_eq!(step(&mut m, &loading), None);
        assert!(m.is_armed());
        assert!(matches!(step(&mut m, &dead(2.6)), Some(SessionEvent::Completed(_))));
    }

    #[test]
    fn test_read_failure_preserves_recording() {
        let mut m = SessionMachine::new();
        run(&mut m, &[playing(0.5), playing(2.2)]);
        let before = m.recording().unwrap().frame_count();

        m.no_update();
        m.no_update();
        assert_eq!(m.status(), CoarseStatus::NotConnected);
        assert_eq!(m.recording().unwrap().frame_count(), before);

        // resuming is not a new start, and the gap is back-filled
        assert_eq!(step(&mut m, &playing(5.1)), None);
        assert_eq!(kills(m.recording().unwrap()), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_unreadable_frames_hold_the_recording() {
        let mut m = SessionMachine::new();
        run(&mut m, &[playing(0.5), playing(3.2)]);

        // frame array unreadable on the last sample tick and on the death tick
        assert_eq!(m.observe(&playing(5.6), None), None);
        assert_eq!(m.recording().unwrap().frame_count(), 3);
        assert_eq!(m.observe(&dead(5.7), None), None);
        assert!(m.is_armed());

        let Some(SessionEvent::Completed(rec)) = step(&mut m, &dead(5.7)) else {
            panic!("expected completion once the frames are readable");
        };
        assert_eq!(kills(&rec), vec![1, 2, 3, 4, 5]);
        assert!(run(&mut m, &[dead(5.7), dead(5.7)]).is_empty());
    }

    #[test]
    fn test_replay_waits_for_readable_frame_array() {
        let mut replay = playing(0.0);
        replay.is_replay = true;
        replay.replay_player_id = PlayerId(77);
        replay.timer = 40.2;
        replay.frames_loaded = 40;
        replay.frames_finished_loading = true;
        let mut menu = playing(0.0);
        menu.counters.enemies_alive = 5;

        let mut m = SessionMachine::new();
        step(&mut m, &menu);
        assert_eq!(m.observe(&replay, None), Some(SessionEvent::Started));
        assert!(m.is_armed());
        assert!(m.needs_frames(&replay));

        let Some(SessionEvent::Completed(rec)) = step(&mut m, &replay) else {
            panic!("expected completion");
        };
        assert_eq!(rec.frame_count(), 40);
        assert!(run(&mut m, &[replay.clone(), replay]).is_empty());
    }

    #[test]
    fn test_frames_not_yet_written_are_not_invented() {
        let mut m = SessionMachine::new();
        step(&mut m, &playing(0.5));
        // the game has only written one of the two crossed seconds
        m.observe(&playing(2.05), Some(&game_frames(1.0)));
        assert_eq!(kills(m.recording().unwrap()), vec![1]);
        assert!(m.needs_frames(&playing(2.1)));
        step(&mut m, &playing(2.1));
        assert_eq!(kills(m.recording().unwrap()), vec![1, 2]);
    }

    #[test]
    fn test_restart_discards_without_submit() {
        let mut m = SessionMachine::new();
        run(&mut m, &[playing(0.5), playing(4.5)]);
        assert_eq!(step(&mut m, &playing(0.2)), Some(SessionEvent::Restarted));
        assert_eq!(m.recording().unwrap().frame_count(), 0);
        assert!(m.is_armed());

        let events = run(&mut m, &[playing(1.1), dead(1.2)]);
        let [SessionEvent::Completed(rec)] = events.as_slice() else {
            panic!("expected exactly one completion, got {events:?}");
        };
        assert_eq!(rec.frame_count(), 1);
    }

    #[test]
    fn test_empty_recording_is_never_submitted() {
        let mut m = SessionMachine::new();
        assert_eq!(step(&mut m, &playing(0.3)), Some(SessionEvent::Started));
        assert_eq!(step(&mut m, &dead(0.4)), None);
        assert!(!m.is_armed());
        assert_eq!(m.snapshot(None).recording, RecordingState::NotRecording);
    }

    #[test]
    fn test_replay_submits_whole_frame_array() {
        let mut replay = playing(0.0);
        replay.is_replay = true;
        replay.replay_player_id = PlayerId(77);
        replay.timer = 0.1;
        replay.frames_finished_loading = true;
        let frames: Vec<StatFrame> =
            (1..=40).map(|k| StatFrame { kills: k, ..Default::default() }).collect();

        let mut m = SessionMachine::new();
        step(&mut m, &playing(0.0));
        assert!(m.needs_frames(&replay));
        let Some(SessionEvent::Completed(rec)) = m.observe(&replay, Some(&frames)) else {
            panic!("expected completion");
        };
        assert!(rec.is_replay);
        assert_eq!(rec.ended_as, CoarseStatus::OtherReplay);
        assert_eq!(rec.frame_count(), 40);
        assert_eq!(rec.totals.kills, 40);
    }

    #[test]
    fn test_frames_only_needed_on_boundaries() {
        let mut m = SessionMachine::new();
        assert!(!m.needs_frames(&playing(0.0)));
        step(&mut m, &playing(0.5));
        assert!(!m.needs_frames(&playing(0.9)));
        assert!(m.needs_frames(&playing(1.0)));
        assert!(m.needs_frames(&dead(0.9)));
    }

    #[test]
    fn test_sampled_frames_come_from_array() {
        let frames: Vec<StatFrame> =
            (1..=2).map(|k| StatFrame { gems_collected: k * 10, ..Default::default() }).collect();
        let mut m = SessionMachine::new();
        step(&mut m, &playing(0.5));
        m.observe(&playing(2.1), Some(&frames));
        let gems: Vec<i32> =
            m.recording().unwrap().frames.iter().map(|f| f.gems_collected).collect();
        assert_eq!(gems, vec![10, 20]);
    }

    #[test]
    fn test_connecting_mid_death_screen_is_not_a_session() {
        let mut m = SessionMachine::new();
        assert_eq!(step(&mut m, &dead(50.0)), None);
        assert_eq!(m.status(), CoarseStatus::Dead);
        assert!(!m.is_armed());
    }
}
