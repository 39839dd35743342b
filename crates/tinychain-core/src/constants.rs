//! Protocol constants. All monetary values are in belushis (1 coin = 10^8 belushis).

/// Smallest currency unit per whole coin.
pub const BELUSHIS_PER_COIN: u64 = 100_000_000;

/// Total number of coins that will ever be minted, excluding remainder dust from
/// the halving schedule's floor division.
pub const TOTAL_COINS: u64 = 21_000_000;

/// Upper bound on the sum of any set of output values.
pub const MAX_MONEY: u64 = TOTAL_COINS * BELUSHIS_PER_COIN;

/// Upper bound on a block's canonical-serialized size.
pub const MAX_BLOCK_SERIALIZED_SIZE: usize = 1_000_000;

/// Number of blocks a coinbase output must wait before it can be spent.
pub const COINBASE_MATURITY: u64 = 2;

/// A block's timestamp may not be more than this many seconds ahead of the
/// validator's wall clock.
pub const MAX_FUTURE_BLOCK_TIME: u64 = 7_200;

/// Target spacing between blocks, in seconds.
pub const TIME_BETWEEN_BLOCKS_TARGET: u64 = 60;

/// Target duration of one retarget period, in seconds (`PERIOD_IN_BLOCKS * TIME_BETWEEN_BLOCKS_TARGET`).
pub const DIFFICULTY_PERIOD_TARGET: u64 = 36_000;

/// Number of blocks between difficulty retargets.
pub const PERIOD_IN_BLOCKS: u64 = 600;

/// `bits` value used by the genesis block and any chain with no retarget history yet.
pub const INITIAL_DIFFICULTY_BITS: u32 = 24;

/// Block subsidy halves every this many blocks.
pub const HALVE_SUBSIDY_AFTER_BLOCKS: u64 = 210_000;

/// Number of trailing blocks used to compute median-time-past.
pub const MEDIAN_TIME_PAST_WINDOW: usize = 11;

/// Number of blocks served per `GetBlocksMsg` response.
pub const GET_BLOCKS_CHUNK_SIZE: u64 = 50;

/// Default TCP port for the P2P listener.
pub const DEFAULT_PORT: u16 = 9999;

/// Per-peer connect/send timeout, in seconds.
pub const PEER_TIMEOUT_SECS: u64 = 10;

/// Number of send attempts before a peer is evicted.
pub const PEER_MAX_ATTEMPTS: u32 = 3;

/// Grace period after startup before mining begins, regardless of IBD progress.
pub const IBD_GRACE_PERIOD_SECS: u64 = 60;

/// Base58check version byte prepended before RIPEMD160(SHA256(pubkey)).
pub const ADDRESS_VERSION_BYTE: u8 = 0x00;

/// Default on-disk path for the active chain blob.
pub const DEFAULT_CHAIN_PATH: &str = "chain.dat";

/// Default on-disk path for the wallet key file.
pub const DEFAULT_WALLET_PATH: &str = "wallet.dat";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_money_matches_total_coins() {
        assert_eq!(MAX_MONEY, 21_000_000 * 100_000_000);
    }

    #[test]
    fn difficulty_period_matches_spacing_times_blocks() {
        assert_eq!(
            DIFFICULTY_PERIOD_TARGET,
            TIME_BETWEEN_BLOCKS_TARGET * PERIOD_IN_BLOCKS
        );
    }

    #[test]
    fn coinbase_maturity_is_small_for_instructional_chain() {
        assert_eq!(COINBASE_MATURITY, 2);
    }
}
