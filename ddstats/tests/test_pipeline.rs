//! Sampling pipeline against a scripted game process

use ddstats::connection::LinkState;
use ddstats::decode::{StatFrame, StatsBlock};
use ddstats::domain::PlayerId;
use ddstats::memory::scripted::FRAMES_ADDRESS;
use ddstats::memory::ScriptedMemory;
use ddstats::sampler::Sampler;
use ddstats::session::{CoarseStatus, RecordingState, SessionEvent};
use ddstats_common::status;

const NAME: &str = "devildaggers";

fn block(timer: f32, enemies_alive: i32, alive: bool) -> StatsBlock {
    StatsBlock {
        version: 1,
        player_id: PlayerId(229),
        player_name: "m4ttbush".to_string(),
        timer,
        counters: StatFrame { enemies_alive, ..Default::default() },
        is_player_alive: alive,
        status_code: if alive { status::PLAYING } else { status::DEAD },
        ..Default::default()
    }
}

fn frames(n: usize) -> Vec<StatFrame> {
    (1..=n)
        .map(|s| StatFrame { kills: i32::try_from(s).unwrap() * 2, enemies_alive: 4, ..Default::default() })
        .collect()
}

fn stage(mem: &ScriptedMemory, mut b: StatsBlock) {
    let n = b.timer.floor() as usize;
    b.frames_loaded = i32::try_from(n).unwrap();
    mem.stage(&b, &frames(n));
}

/// Stage `b` but leave its frame array unreadable
fn stage_without_frames(mem: &ScriptedMemory, b: StatsBlock) {
    stage(mem, b);
    mem.write(FRAMES_ADDRESS, &[]);
}

fn completions(sampler: &mut Sampler<ScriptedMemory>, ticks: usize) -> Vec<ddstats::session::SessionRecording> {
    (0..ticks)
        .filter_map(|_| match sampler.tick().event {
            Some(SessionEvent::Completed(rec)) => Some(rec),
            _ => None,
        })
        .collect()
}

#[test]
fn test_menu_lobby_play_die_submits_once() {
    let mem = ScriptedMemory::with_game(NAME, 4242);
    let mut sampler = Sampler::new(mem.clone(), NAME);

    stage(&mem, block(0.0, 5, true));
    let tick = sampler.tick();
    assert_eq!(tick.connection.link, LinkState::Connected);
    assert_eq!(tick.session.status, CoarseStatus::Menu);

    stage(&mem, block(0.0, 0, true));
    assert_eq!(sampler.tick().session.status, CoarseStatus::Lobby);

    stage(&mem, block(0.5, 1, true));
    let tick = sampler.tick();
    assert_eq!(tick.session.status, CoarseStatus::Playing);
    assert_eq!(tick.event, Some(SessionEvent::Started));

    let mut completed = Vec::new();
    for step in 1..=40 {
        #[allow(clippy::cast_precision_loss)]
        let timer = 0.5 + step as f32 * 0.1;
        stage(&mem, block(timer, 4, true));
        if let Some(SessionEvent::Completed(rec)) = sampler.tick().event {
            completed.push(rec);
        }
    }
    assert!(completed.is_empty());
    assert_eq!(sampler.machine().recording().unwrap().frame_count(), 4);

    let mut death = block(4.55, 4, false);
    death.frames_finished_loading = true;
    stage(&mem, death.clone());
    for _ in 0..5 {
        if let Some(SessionEvent::Completed(rec)) = sampler.tick().event {
            completed.push(rec);
        }
    }

    assert_eq!(completed.len(), 1);
    let rec = &completed[0];
    assert_eq!(rec.frame_count(), 4);
    assert_eq!(rec.totals.kills, 8);
    assert_eq!(rec.player_id, PlayerId(229));
    assert_eq!(sampler.tick().session.recording, RecordingState::Submitted);
}

#[test]
fn test_lost_connection_mid_session_keeps_recording() {
    let mem = ScriptedMemory::with_game(NAME, 7);
    let mut sampler = Sampler::new(mem.clone(), NAME);

    stage(&mem, block(0.0, 0, true));
    sampler.tick();
    stage(&mem, block(0.4, 2, true));
    sampler.tick();
    stage(&mem, block(2.5, 2, true));
    sampler.tick();
    let before = sampler.machine().recording().unwrap().frame_count();
    assert_eq!(before, 2);

    // single read glitch
    mem.fail_next_reads(1);
    let tick = sampler.tick();
    assert_eq!(tick.session.status, CoarseStatus::NotConnected);
    assert!(tick.session.block.is_none());

    // process vanishes entirely
    mem.kill();
    let tick = sampler.tick();
    assert_eq!(tick.connection.link, LinkState::Disconnected);
    assert_eq!(sampler.machine().recording().unwrap().frame_count(), before);

    mem.spawn(NAME, 7, 1);
    stage(&mem, block(3.2, 2, true));
    let tick = sampler.tick();
    assert_eq!(tick.connection.link, LinkState::Connected);
    assert_eq!(tick.session.status, CoarseStatus::Playing);
    assert_eq!(tick.event, None);
    assert!(sampler.machine().recording().unwrap().frame_count() >= before);
}

#[test]
fn test_garbage_block_is_no_update() {
    let mem = ScriptedMemory::with_game(NAME, 9);
    let mut sampler = Sampler::new(mem.clone(), NAME);

    stage(&mem, block(0.0, 3, true));
    assert_eq!(sampler.tick().session.status, CoarseStatus::Menu);

    // a block shorter than the layout fails to read, leaving the previous one
    mem.write(ScriptedMemory::block_address(), &[0u8; 10]);
    let tick = sampler.tick();
    assert!(tick.session.block.is_none());
    assert_eq!(tick.session.status, CoarseStatus::NotConnected);

    stage(&mem, block(0.0, 3, true));
    assert_eq!(sampler.tick().session.status, CoarseStatus::Menu);
}

#[test]
fn test_replay_survives_unreadable_frame_array() {
    let mem = ScriptedMemory::with_game(NAME, 31);
    let mut sampler = Sampler::new(mem.clone(), NAME);

    stage(&mem, block(0.0, 5, true));
    assert_eq!(sampler.tick().session.status, CoarseStatus::Menu);

    let mut replay = block(40.2, 12, true);
    replay.is_replay = true;
    replay.replay_player_id = PlayerId(77);
    replay.frames_finished_loading = true;

    stage_without_frames(&mem, replay.clone());
    let tick = sampler.tick();
    assert_eq!(tick.session.status, CoarseStatus::OtherReplay);
    assert_eq!(tick.event, Some(SessionEvent::Started));
    assert_eq!(tick.session.recording, RecordingState::Recording);

    stage(&mem, replay);
    let completed = completions(&mut sampler, 10);
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].frame_count(), 40);
    assert_eq!(completed[0].totals.kills, 80);
}

#[test]
fn test_recorded_seconds_come_from_the_game_frames() {
    let mem = ScriptedMemory::with_game(NAME, 32);
    let mut sampler = Sampler::new(mem.clone(), NAME);
    let with_block_kills = |timer, alive| {
        let mut b = block(timer, 4, alive);
        b.counters.kills = 999;
        b
    };

    stage(&mem, block(0.0, 0, true));
    sampler.tick();
    stage(&mem, with_block_kills(0.5, true));
    assert_eq!(sampler.tick().event, Some(SessionEvent::Started));
    stage(&mem, with_block_kills(3.2, true));
    sampler.tick();

    // last sample tick and death tick both miss the frame array
    stage_without_frames(&mem, with_block_kills(5.6, true));
    assert_eq!(sampler.tick().event, None);
    let mut death = with_block_kills(5.7, false);
    death.frames_finished_loading = true;
    stage_without_frames(&mem, death.clone());
    assert_eq!(sampler.tick().event, None);
    assert!(sampler.machine().is_armed());

    stage(&mem, death);
    let completed = completions(&mut sampler, 5);
    assert_eq!(completed.len(), 1);
    let kills: Vec<i32> = completed[0].frames.iter().map(|f| f.kills).collect();
    assert_eq!(kills, vec![2, 4, 6, 8, 10]);
}
