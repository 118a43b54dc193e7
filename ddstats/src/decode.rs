//! Raw block decoder
//!
//! Turns the flat bytes read out of the game into a [`StatsBlock`] and the
//! per-second [`StatFrame`] array. Layout offsets come from
//! [`ddstats_common`]; every read is bounds-safe once the buffer length has
//! been checked, so a bad buffer is a [`DecodeError`], never a panic.

use byteorder::{ByteOrder, LittleEndian};
use ddstats_common::{block, frame, BLOCK_SIZE, ENEMY_SLOTS, FRAME_SIZE, LEVEL_HASH_LEN, NAME_LEN};
use std::fmt::Write as _;

use crate::domain::{Address, DecodeError, PlayerId};

/// Upper bound on a plausible frame count (one per second, ~27 hours)
pub const MAX_FRAMES: i32 = 100_000;

/// Counters shared by the block and each per-second frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatFrame {
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
    pub per_enemy_alive: [i16; ENEMY_SLOTS],
    pub per_enemy_killed: [i16; ENEMY_SLOTS],
}

/// Split times for fixed milestones (0.0 until reached)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Splits {
    pub level_2: f32,
    pub level_3: f32,
    pub level_4: f32,
    pub leviathan_down: f32,
    pub orb_down: f32,
}

/// Peak values and the timer value at which they were reached
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Maxima {
    pub homing: i32,
    pub homing_time: f32,
    pub enemies_alive: i32,
    pub enemies_alive_time: f32,
}

/// One decoded snapshot of the stats block
///
/// Replaced wholesale on every successful read; never merged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatsBlock {
    pub version: i32,
    pub player_id: PlayerId,
    pub player_name: String,
    pub timer: f32,
    pub counters: StatFrame,
    pub is_player_alive: bool,
    pub is_replay: bool,
    /// Already clamped into the valid range
    pub death_type: u8,
    pub is_in_game: bool,
    pub replay_player_id: PlayerId,
    pub replay_player_name: String,
    pub level_hash: [u8; LEVEL_HASH_LEN],
    pub splits: Splits,
    pub status_code: i32,
    /// Maxima as tracked by the game itself
    pub reported_maxima: Maxima,
    pub time_max: f32,
    pub frames_address: Address,
    pub frames_loaded: i32,
    pub frames_finished_loading: bool,
    pub starting_hand_level: i32,
    pub starting_homing_count: i32,
    pub starting_time: f32,
    pub prohibited_mods: bool,
}

impl StatsBlock {
    /// Lowercase hex form of the level hash
    #[must_use]
    pub fn level_hash_hex(&self) -> String {
        self.level_hash.iter().fold(String::with_capacity(LEVEL_HASH_LEN * 2), |mut s, b| {
            let _ = write!(s, "{b:02x}");
            s
        })
    }

    /// Daggers hit / fired as a percentage
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn accuracy(&self) -> f32 {
        if self.counters.daggers_fired == 0 {
            0.0
        } else {
            self.counters.daggers_hit as f32 / self.counters.daggers_fired as f32 * 100.0
        }
    }

    /// Validated frame count, usable as a read length
    ///
    /// # Errors
    /// Negative or implausibly large counts are treated as a bad read.
    pub fn frame_count(&self) -> Result<usize, DecodeError> {
        match usize::try_from(self.frames_loaded) {
            Ok(n) if self.frames_loaded <= MAX_FRAMES => Ok(n),
            _ => Err(DecodeError::FrameCount(self.frames_loaded)),
        }
    }
}

/// Decode a stats block
///
/// # Errors
/// Returns [`DecodeError::LengthMismatch`] unless `buf` is exactly
/// [`BLOCK_SIZE`] bytes.
pub fn decode_block(buf: &[u8]) -> Result<StatsBlock, DecodeError> {
    check_len(buf, BLOCK_SIZE)?;

    Ok(StatsBlock {
        version: i32_at(buf, block::VERSION),
        player_id: PlayerId(i32_at(buf, block::PLAYER_ID)),
        player_name: c_string(&buf[block::PLAYER_NAME..block::PLAYER_NAME + NAME_LEN]),
        timer: f32_at(buf, block::TIMER),
        counters: counters_at(buf, block::COUNTERS),
        is_player_alive: buf[block::IS_PLAYER_ALIVE] != 0,
        is_replay: buf[block::IS_REPLAY] != 0,
        death_type: ddstats_common::clamp_death_type(buf[block::DEATH_TYPE]),
        is_in_game: buf[block::IS_IN_GAME] != 0,
        replay_player_id: PlayerId(i32_at(buf, block::REPLAY_PLAYER_ID)),
        replay_player_name: c_string(
            &buf[block::REPLAY_PLAYER_NAME..block::REPLAY_PLAYER_NAME + NAME_LEN],
        ),
        level_hash: {
            let mut hash = [0u8; LEVEL_HASH_LEN];
            hash.copy_from_slice(&buf[block::LEVEL_HASH..block::LEVEL_HASH + LEVEL_HASH_LEN]);
            hash
        },
        splits: Splits {
            level_2: f32_at(buf, block::TIME_LEVEL_2),
            level_3: f32_at(buf, block::TIME_LEVEL_3),
            level_4: f32_at(buf, block::TIME_LEVEL_4),
            leviathan_down: f32_at(buf, block::TIME_LEVIATHAN_DOWN),
            orb_down: f32_at(buf, block::TIME_ORB_DOWN),
        },
        status_code: i32_at(buf, block::STATUS),
        reported_maxima: Maxima {
            homing: i32_at(buf, block::HOMING_MAX),
            homing_time: f32_at(buf, block::TIME_HOMING_MAX),
            enemies_alive: i32_at(buf, block::ENEMIES_ALIVE_MAX),
            enemies_alive_time: f32_at(buf, block::TIME_ENEMIES_ALIVE_MAX),
        },
        time_max: f32_at(buf, block::TIME_MAX),
        frames_address: Address(LittleEndian::read_u64(&buf[block::FRAMES_ADDRESS..])),
        frames_loaded: i32_at(buf, block::FRAMES_LOADED),
        frames_finished_loading: buf[block::FRAMES_FINISHED_LOADING] != 0,
        starting_hand_level: i32_at(buf, block::STARTING_HAND_LEVEL),
        starting_homing_count: i32_at(buf, block::STARTING_HOMING_COUNT),
        starting_time: f32_at(buf, block::STARTING_TIME),
        prohibited_mods: buf[block::PROHIBITED_MODS] != 0,
    })
}

/// Byte length of `count` stat frames
///
/// # Errors
/// Returns [`DecodeError::FrameCount`] if the length overflows `usize`.
pub fn frames_len(count: usize) -> Result<usize, DecodeError> {
    count
        .checked_mul(FRAME_SIZE)
        .ok_or_else(|| DecodeError::FrameCount(i32::try_from(count).unwrap_or(i32::MAX)))
}

/// Decode `count` contiguous stat frames
///
/// # Errors
/// Returns [`DecodeError::LengthMismatch`] unless `buf` holds exactly
/// `count` frames.
pub fn decode_frames(buf: &[u8], count: usize) -> Result<Vec<StatFrame>, DecodeError> {
    let mut frames = FrameBuffer::default();
    frames.fill(buf, count)?;
    Ok(frames.as_slice().to_vec())
}

/// Reusable storage for the frame array
///
/// Grows on demand to the largest count seen; a smaller count truncates
/// logically so the allocation is kept for the next session.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    frames: Vec<StatFrame>,
    len: usize,
}

impl FrameBuffer {
    /// Replace the contents with `count` frames decoded from `buf`
    ///
    /// On error the previous contents are left untouched.
    ///
    /// # Errors
    /// Returns [`DecodeError::LengthMismatch`] on a length mismatch, or
    /// [`DecodeError::FrameCount`] if `count` frames cannot be addressed.
    pub fn fill(&mut self, buf: &[u8], count: usize) -> Result<(), DecodeError> {
        check_len(buf, frames_len(count)?)?;

        if self.frames.len() < count {
            self.frames.resize(count, StatFrame::default());
        }
        for (slot, chunk) in self.frames.iter_mut().zip(buf.chunks_exact(FRAME_SIZE)) {
            *slot = counters_at(chunk, 0);
        }
        self.len = count;
        Ok(())
    }

    #[must_use]
    pub fn as_slice(&self) -> &[StatFrame] {
        &self.frames[..self.len]
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Allocated frame slots, including logically truncated ones
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }
}

/// Encode a block into its raw layout
///
/// Inverse of [`decode_block`]; used to stage blocks in
/// [`crate::memory::ScriptedMemory`].
#[must_use]
pub fn encode_block(b: &StatsBlock) -> Vec<u8> {
    let mut buf = vec![0u8; BLOCK_SIZE];
    LittleEndian::write_i32(&mut buf[block::VERSION..], b.version);
    LittleEndian::write_i32(&mut buf[block::PLAYER_ID..], b.player_id.0);
    put_c_string(&mut buf[block::PLAYER_NAME..block::PLAYER_NAME + NAME_LEN], &b.player_name);
    LittleEndian::write_f32(&mut buf[block::TIMER..], b.timer);
    put_counters(&mut buf[block::COUNTERS..], &b.counters);
    buf[block::IS_PLAYER_ALIVE] = u8::from(b.is_player_alive);
    buf[block::IS_REPLAY] = u8::from(b.is_replay);
    buf[block::DEATH_TYPE] = b.death_type;
    buf[block::IS_IN_GAME] = u8::from(b.is_in_game);
    LittleEndian::write_i32(&mut buf[block::REPLAY_PLAYER_ID..], b.replay_player_id.0);
    put_c_string(
        &mut buf[block::REPLAY_PLAYER_NAME..block::REPLAY_PLAYER_NAME + NAME_LEN],
        &b.replay_player_name,
    );
    buf[block::LEVEL_HASH..block::LEVEL_HASH + LEVEL_HASH_LEN].copy_from_slice(&b.level_hash);
    LittleEndian::write_f32(&mut buf[block::TIME_LEVEL_2..], b.splits.level_2);
    LittleEndian::write_f32(&mut buf[block::TIME_LEVEL_3..], b.splits.level_3);
    LittleEndian::write_f32(&mut buf[block::TIME_LEVEL_4..], b.splits.level_4);
    LittleEndian::write_f32(&mut buf[block::TIME_LEVIATHAN_DOWN..], b.splits.leviathan_down);
    LittleEndian::write_f32(&mut buf[block::TIME_ORB_DOWN..], b.splits.orb_down);
    LittleEndian::write_i32(&mut buf[block::STATUS..], b.status_code);
    LittleEndian::write_i32(&mut buf[block::HOMING_MAX..], b.reported_maxima.homing);
    LittleEndian::write_f32(&mut buf[block::TIME_HOMING_MAX..], b.reported_maxima.homing_time);
    LittleEndian::write_i32(&mut buf[block::ENEMIES_ALIVE_MAX..], b.reported_maxima.enemies_alive);
    LittleEndian::write_f32(
        &mut buf[block::TIME_ENEMIES_ALIVE_MAX..],
        b.reported_maxima.enemies_alive_time,
    );
    LittleEndian::write_f32(&mut buf[block::TIME_MAX..], b.time_max);
    LittleEndian::write_u64(&mut buf[block::FRAMES_ADDRESS..], b.frames_address.0);
    LittleEndian::write_i32(&mut buf[block::FRAMES_LOADED..], b.frames_loaded);
    buf[block::FRAMES_FINISHED_LOADING] = u8::from(b.frames_finished_loading);
    LittleEndian::write_i32(&mut buf[block::STARTING_HAND_LEVEL..], b.starting_hand_level);
    LittleEndian::write_i32(&mut buf[block::STARTING_HOMING_COUNT..], b.starting_homing_count);
    LittleEndian::write_f32(&mut buf[block::STARTING_TIME..], b.starting_time);
    buf[block::PROHIBITED_MODS] = u8::from(b.prohibited_mods);
    buf
}

/// Encode frames into their raw contiguous layout
#[must_use]
pub fn encode_frames(frames: &[StatFrame]) -> Vec<u8> {
    let mut buf = vec![0u8; frames.len() * FRAME_SIZE];
    for (chunk, f) in buf.chunks_exact_mut(FRAME_SIZE).zip(frames) {
        put_counters(chunk, f);
    }
    buf
}

fn check_len(buf: &[u8], expected: usize) -> Result<(), DecodeError> {
    if buf.len() == expected {
        Ok(())
    } else {
        Err(DecodeError::LengthMismatch { expected, actual: buf.len() })
    }
}

fn i32_at(buf: &[u8], offset: usize) -> i32 {
    LittleEndian::read_i32(&buf[offset..])
}

fn f32_at(buf: &[u8], offset: usize) -> f32 {
    LittleEndian::read_f32(&buf[offset..])
}

/// Bytes up to the first NUL; anything after it is ignored
fn c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn put_c_string(dst: &mut [u8], s: &str) {
    let n = s.len().min(dst.len() - 1);
    dst[..n].copy_from_slice(&s.as_bytes()[..n]);
}

/// Read the counter group starting at `base`; frame offsets are relative to it
fn counters_at(buf: &[u8], base: usize) -> StatFrame {
    let i = |off: usize| i32_at(buf, base + off);
    let mut per_enemy_alive = [0i16; ENEMY_SLOTS];
    let mut per_enemy_killed = [0i16; ENEMY_SLOTS];
    LittleEndian::read_i16_into(
        &buf[base + frame::PER_ENEMY_ALIVE..base + frame::PER_ENEMY_ALIVE + ENEMY_SLOTS * 2],
        &mut per_enemy_alive,
    );
    LittleEndian::read_i16_into(
        &buf[base + frame::PER_ENEMY_KILLED..base + frame::PER_ENEMY_KILLED + ENEMY_SLOTS * 2],
        &mut per_enemy_killed,
    );

    StatFrame {
        gems_collected: i(frame::GEMS_COLLECTED),
        kills: i(frame::KILLS),
        daggers_fired: i(frame::DAGGERS_FIRED),
        daggers_hit: i(frame::DAGGERS_HIT),
        enemies_alive: i(frame::ENEMIES_ALIVE),
        level_gems: i(frame::LEVEL_GEMS),
        homing_daggers: i(frame::HOMING_DAGGERS),
        gems_despawned: i(frame::GEMS_DESPAWNED),
        gems_eaten: i(frame::GEMS_EATEN),
        total_gems: i(frame::TOTAL_GEMS),
        daggers_eaten: i(frame::DAGGERS_EATEN),
        per_enemy_alive,
        per_enemy_killed,
    }
}

fn put_counters(buf: &mut [u8], f: &StatFrame) {
    for (off, v) in [
        (frame::GEMS_COLLECTED, f.gems_collected),
        (frame::KILLS, f.kills),
        (frame::DAGGERS_FIRED, f.daggers_fired),
        (frame::DAGGERS_HIT, f.daggers_hit),
        (frame::ENEMIES_ALIVE, f.enemies_alive),
        (frame::LEVEL_GEMS, f.level_gems),
        (frame::HOMING_DAGGERS, f.homing_daggers),
        (frame::GEMS_DESPAWNED, f.gems_despawned),
        (frame::GEMS_EATEN, f.gems_eaten),
        (frame::TOTAL_GEMS, f.total_gems),
        (frame::DAGGERS_EATEN, f.daggers_eaten),
    ] {
        LittleEndian::write_i32(&mut buf[off..], v);
    }
    LittleEndian::write_i16_into(
        &f.per_enemy_alive,
        &mut buf[frame::PER_ENEMY_ALIVE..frame::PER_ENEMY_ALIVE + ENEMY_SLOTS * 2],
    );
    LittleEndian::write_i16_into(
        &f.per_enemy_killed,
        &mut buf[frame::PER_ENEMY_KILLED..frame::PER_ENEMY_KILLED + ENEMY_SLOTS * 2],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> StatsBlock {
        StatsBlock {
            version: 1,
            player_id: PlayerId(151_675),
            player_name: "VHS".to_string(),
            timer: 412.25,
            counters: StatFrame { gems_collected: 70, daggers_fired: 200, daggers_hit: 50, ..Default::default() },
            is_player_alive: true,
            frames_loaded: 412,
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_block_fields() {
        let mut block = sample_block();
        block.counters.per_enemy_alive[ddstats_common::EnemyType::Leviathan as usize] = 1;
        block.level_hash[0] = 0x56;
        block.level_hash[15] = 0x51;

        let decoded = decode_block(&encode_block(&block)).unwrap();
        assert_eq!(decoded, block);
        assert!(decoded.level_hash_hex().starts_with("56"));
        assert!(decoded.level_hash_hex().ends_with("51"));
        assert!((decoded.accuracy() - 25.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_decode_block_wrong_length() {
        let buf = encode_block(&sample_block());
        let err = decode_block(&buf[..BLOCK_SIZE - 1]).unwrap_err();
        assert!(matches!(err, DecodeError::LengthMismatch { expected: BLOCK_SIZE, actual } if actual == BLOCK_SIZE - 1));

        let mut long = buf.clone();
        long.push(0);
        assert!(decode_block(&long).is_err());
    }

    #[test]
    fn test_name_stops_at_first_nul() {
        let mut buf = encode_block(&sample_block());
        // garbage after the terminator must not leak into the name
        buf[block::PLAYER_NAME + 4..block::PLAYER_NAME + 10].copy_from_slice(b"zzzzzz");
        assert_eq!(decode_block(&buf).unwrap().player_name, "VHS");
    }

    #[test]
    fn test_name_without_terminator_uses_whole_array() {
        let mut buf = encode_block(&sample_block());
        buf[block::PLAYER_NAME..block::PLAYER_NAME + NAME_LEN].fill(b'a');
        assert_eq!(decode_block(&buf).unwrap().player_name.len(), NAME_LEN);
    }

    #[test]
    fn test_death_type_out_of_range_is_clamped() {
        let mut buf = encode_block(&sample_block());
        buf[block::DEATH_TYPE] = 99;
        assert_eq!(decode_block(&buf).unwrap().death_type, ddstats_common::DEFAULT_DEATH_TYPE);
    }

    #[test]
    fn test_frame_count_validation() {
        let mut block = sample_block();
        assert_eq!(block.frame_count().unwrap(), 412);
        block.frames_loaded = -3;
        assert!(block.frame_count().is_err());
        block.frames_loaded = MAX_FRAMES + 1;
        assert!(block.frame_count().is_err());
    }

    #[test]
    fn test_decode_frames_zero_count() {
        assert!(decode_frames(&[], 0).unwrap().is_empty());
        assert!(decode_frames(&[0u8; FRAME_SIZE], 0).is_err());
    }

    #[test]
    fn test_overflowing_frame_count_is_an_error() {
        assert!(matches!(frames_len(usize::MAX), Err(DecodeError::FrameCount(i32::MAX))));
        assert!(matches!(decode_frames(&[], usize::MAX / 2), Err(DecodeError::FrameCount(_))));
        assert_eq!(frames_len(3).unwrap(), 3 * FRAME_SIZE);
    }

    #[test]
    fn test_frame_buffer_truncates_without_shrinking() {
        let frames: Vec<StatFrame> =
            (0..5).map(|i| StatFrame { kills: i, ..Default::default() }).collect();
        let mut buffer = FrameBuffer::default();

        buffer.fill(&encode_frames(&frames), 5).unwrap();
        assert_eq!(buffer.as_slice().len(), 5);

        buffer.fill(&encode_frames(&frames[..2]), 2).unwrap();
        assert_eq!(buffer.as_slice().len(), 2);
        assert_eq!(buffer.capacity(), 5);
        assert_eq!(buffer.as_slice()[1].kills, 1);
    }

    #[test]
    fn test_frame_buffer_keeps_contents_on_error() {
        let frames = vec![StatFrame { kills: 7, ..Default::default() }; 3];
        let mut buffer = FrameBuffer::default();
        buffer.fill(&encode_frames(&frames), 3).unwrap();

        assert!(buffer.fill(&[0u8; 10], 1).is_err());
        assert_eq!(buffer.as_slice().len(), 3);
        assert_eq!(buffer.as_slice()[2].kills, 7);
    }
}
