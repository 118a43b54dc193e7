//! Stream/submit filters
//!
//! Pure predicates over a session's kind; the network code only asks.

use ddstats_common::DEFAULT_SURVIVAL_HASH;

use crate::config::ChannelFilter;

/// Whether a session of this kind goes through `filter`
///
/// The kind has to be enabled (`stats` for runs, `replay_stats` for
/// replays), and a custom spawnset additionally needs
/// `non_default_spawnsets`.
#[must_use]
pub fn passes(filter: &ChannelFilter, is_replay: bool, level_hash: &str) -> bool {
    let kind_enabled = if is_replay { filter.replay_stats } else { filter.stats };
    let level_allowed = level_hash == DEFAULT_SURVIVAL_HASH || filter.non_default_spawnsets;
    kind_enabled && level_allowed
}
