//! # Shared Layout Definitions (Game ↔ Client)
//!
//! Describes the fixed-layout statistics block the game exports for external
//! readers, and the per-second stat frame array it points at. Everything here
//! is plain data: byte offsets, sizes, raw codes. Decoding lives in the
//! `ddstats` crate; this crate only pins down *where* things are.
//!
//! All multi-byte values are little-endian. The block is packed: the only
//! padding is the explicit padding the game itself writes.
//!
//! ## Key Items
//!
//! - [`block`] - Byte offsets into the stats block
//! - [`frame`] - Byte offsets into one stat frame
//! - [`POINTER_CHAIN`] - How to get from the module base to the block
//! - [`status`] - Raw status codes written by the game
//! - [`DEATH_TYPES`] - Death type names indexed by the raw code

#![no_std]

// ============================================================================
// Sizes
// ============================================================================

/// Total size of the stats block in bytes
pub const BLOCK_SIZE: usize = 289;

/// Size of one stat frame in bytes
pub const FRAME_SIZE: usize = 112;

/// Number of slots in the per-enemy alive/kill arrays
///
/// The game reserves 17 slots; only the first 16 map to a named enemy.
pub const ENEMY_SLOTS: usize = 17;

/// Size of the fixed player-name arrays
pub const NAME_LEN: usize = 32;

/// Size of the level hash (MD5 digest)
pub const LEVEL_HASH_LEN: usize = 16;

/// Hash of the default survival level, hex-encoded
///
/// Sessions on any other level are "non-default spawnset" sessions.
pub const DEFAULT_SURVIVAL_HASH: &str = "569fead87abf4d30fdee4231a6398051";

// ============================================================================
// Locating the block
// ============================================================================

/// Pointer chain from the module base to the stats block
///
/// Resolution: `addr = base + base_offset`, then for each hop
/// `addr = read_pointer(addr) + hop`. The final address points at
/// [`BLOCK_MARKER`], and the block itself begins `data_offset` bytes later.
#[derive(Debug, Clone, Copy)]
pub struct PointerChain {
    /// Offset from the module base to the first pointer
    pub base_offset: u64,
    /// Offsets added after each pointer dereference
    pub hops: &'static [u64],
    /// Distance from the marker to the first block field
    pub data_offset: u64,
}

/// Pointer chain for the supported game build
///
/// Must be updated if the game is ever patched.
pub const POINTER_CHAIN: PointerChain =
    PointerChain { base_offset: 0x0025_0DC0, hops: &[0x0], data_offset: 0xC };

/// Marker the game writes in front of the stats block
pub const BLOCK_MARKER: &[u8; 11] = b"__ddstats__";

// ============================================================================
// Stats block offsets
// ============================================================================

/// Byte offsets of each field in the stats block
pub mod block {
    pub const VERSION: usize = 0;
    pub const PLAYER_ID: usize = 4;
    pub const PLAYER_NAME: usize = 8;
    pub const TIMER: usize = 40;

    /// First of the eleven `i32` counters shared with [`super::frame`]
    pub const COUNTERS: usize = 44;
    pub const GEMS_COLLECTED: usize = 44;
    pub const KILLS: usize = 48;
    pub const DAGGERS_FIRED: usize = 52;
    pub const DAGGERS_HIT: usize = 56;
    pub const ENEMIES_ALIVE: usize = 60;
    pub const LEVEL_GEMS: usize = 64;
    pub const HOMING_DAGGERS: usize = 68;
    pub const GEMS_DESPAWNED: usize = 72;
    pub const GEMS_EATEN: usize = 76;
    pub const TOTAL_GEMS: usize = 80;
    pub const DAGGERS_EATEN: usize = 84;
    pub const PER_ENEMY_ALIVE: usize = 88;
    pub const PER_ENEMY_KILLED: usize = 122;

    pub const IS_PLAYER_ALIVE: usize = 156;
    pub const IS_REPLAY: usize = 157;
    pub const DEATH_TYPE: usize = 158;
    pub const IS_IN_GAME: usize = 159;

    pub const REPLAY_PLAYER_ID: usize = 160;
    pub const REPLAY_PLAYER_NAME: usize = 164;
    pub const LEVEL_HASH: usize = 196;

    pub const TIME_LEVEL_2: usize = 212;
    pub const TIME_LEVEL_3: usize = 216;
    pub const TIME_LEVEL_4: usize = 220;
    pub const TIME_LEVIATHAN_DOWN: usize = 224;
    pub const TIME_ORB_DOWN: usize = 228;

    pub const STATUS: usize = 232;
    pub const HOMING_MAX: usize = 236;
    pub const TIME_HOMING_MAX: usize = 240;
    pub const ENEMIES_ALIVE_MAX: usize = 244;
    pub const TIME_ENEMIES_ALIVE_MAX: usize = 248;
    pub const TIME_MAX: usize = 252;

    /// Address of the stat frame array in the game's address space
    pub const FRAMES_ADDRESS: usize = 260;
    pub const FRAMES_LOADED: usize = 268;
    pub const FRAMES_FINISHED_LOADING: usize = 272;

    pub const STARTING_HAND_LEVEL: usize = 276;
    pub const STARTING_HOMING_COUNT: usize = 280;
    pub const STARTING_TIME: usize = 284;
    pub const PROHIBITED_MODS: usize = 288;
}

/// Byte offsets of each field in one stat frame
pub mod frame {
    pub const GEMS_COLLECTED: usize = 0;
    pub const KILLS: usize = 4;
    pub const DAGGERS_FIRED: usize = 8;
    pub const DAGGERS_HIT: usize = 12;
    pub const ENEMIES_ALIVE: usize = 16;
    pub const LEVEL_GEMS: usize = 20;
    pub const HOMING_DAGGERS: usize = 24;
    pub const GEMS_DESPAWNED: usize = 28;
    pub const GEMS_EATEN: usize = 32;
    pub const TOTAL_GEMS: usize = 36;
    pub const DAGGERS_EATEN: usize = 40;
    pub const PER_ENEMY_ALIVE: usize = 44;
    pub const PER_ENEMY_KILLED: usize = 78;
}

// ============================================================================
// Raw codes
// ============================================================================

/// Raw status codes written by the game into the block's status field
pub mod status {
    pub const TITLE: i32 = 0;
    pub const MENU: i32 = 1;
    pub const LOBBY: i32 = 2;
    pub const PLAYING: i32 = 3;
    pub const DEAD: i32 = 4;
    pub const OWN_REPLAY_FROM_LAST_RUN: i32 = 5;
    pub const OWN_REPLAY_FROM_LEADERBOARD: i32 = 6;
    pub const OTHER_REPLAY: i32 = 7;
}

/// Index of each named enemy in the per-enemy arrays
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyType {
    Skull1 = 0,
    Skull2,
    Spiderling,
    Skull3,
    Squid1,
    Squid2,
    Squid3,
    Centipede1,
    Centipede2,
    Spider1,
    Spider2,
    Leviathan,
    Orb,
    Thorn,
    Centipede3,
    SpiderEgg,
}

/// Death type names indexed by raw death code
pub const DEATH_TYPES: [&str; 16] = [
    "Fallen",
    "Swarmed",
    "Impaled",
    "Gored",
    "Infested",
    "Opened",
    "Purged",
    "Desecrated",
    "Sacrificed",
    "Eviscerated",
    "Annihilated",
    "Intoxicated",
    "Envenomated",
    "Incarnated",
    "Discarnated",
    "Barbed",
];

/// Death code used when the raw value is out of range
pub const DEFAULT_DEATH_TYPE: u8 = 0;

/// Clamp a raw death code into the valid range
///
/// Out-of-range values are memory-read noise and map to [`DEFAULT_DEATH_TYPE`].
#[must_use]
pub const fn clamp_death_type(raw: u8) -> u8 {
    if (raw as usize) < DEATH_TYPES.len() {
        raw
    } else {
        DEFAULT_DEATH_TYPE
    }
}

/// Name of a (clamped) death code
#[must_use]
pub const fn death_type_name(raw: u8) -> &'static str {
    DEATH_TYPES[clamp_death_type(raw) as usize]
}
