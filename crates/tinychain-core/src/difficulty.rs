//! Difficulty retargeting.
//!
//! `bits` is an exponential difficulty parameter: a block is accepted when its
//! id, read as a 256-bit big-endian unsigned integer `H`, satisfies
//! `H < 2^(256 - bits)`. Higher `bits` means harder. Retargeting happens only
//! every [`PERIOD_IN_BLOCKS`] blocks, comparing the elapsed wall-clock time of
//! that period against [`DIFFICULTY_PERIOD_TARGET`] and nudging `bits` by
//! exactly one in the appropriate direction — no proportional scaling, no
//! clamp, since the adjustment itself is already bounded to ±1.

use crate::constants::{DIFFICULTY_PERIOD_TARGET, INITIAL_DIFFICULTY_BITS, PERIOD_IN_BLOCKS};
use crate::types::PrevBlockHash;

/// Compute the `bits` required for the block that extends `prev_height` (the
/// height of the current tip).
///
/// `get_timestamp(height)` must return the timestamp of the block at that
/// height; it is only called for heights inside the retarget window, so
/// callers can serve it from the active chain without scanning the whole
/// history.
pub fn get_next_work_required(
    prev_block_hash: PrevBlockHash,
    prev_height: u64,
    prev_bits: u32,
    get_timestamp: impl Fn(u64) -> u32,
) -> u32 {
    if matches!(prev_block_hash, PrevBlockHash::Genesis) {
        return INITIAL_DIFFICULTY_BITS;
    }

    let next_height = prev_height + 1;
    if next_height % PERIOD_IN_BLOCKS != 0 {
        return prev_bits;
    }

    let period_start_height = next_height - PERIOD_IN_BLOCKS;
    let period_start_timestamp = get_timestamp(period_start_height);
    let prev_timestamp = get_timestamp(prev_height);
    let actual = prev_timestamp.saturating_sub(period_start_timestamp) as u64;

    match actual.cmp(&DIFFICULTY_PERIOD_TARGET) {
        std::cmp::Ordering::Less => prev_bits + 1,
        std::cmp::Ordering::Greater => prev_bits.saturating_sub(1),
        std::cmp::Ordering::Equal => prev_bits,
    }
}
