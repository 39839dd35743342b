//! Context-free block validation.
//!
//! This covers the steps of block validation that need nothing beyond the
//! block itself and a little ambient context (wall clock, median-time-past):
//! non-empty transaction list, future-timestamp bound, proof of work,
//! coinbase position, per-transaction structural checks, merkle root, and
//! the stale-timestamp check. The chain-context-dependent steps — locating
//! `prev_block_hash` among the active chain and side branches, checking
//! `bits` against `get_next_work_required`, and running full contextual
//! transaction validation against the UTXO set — live in the node's chain
//! engine, which has the active chain and mempool in scope.

use crate::constants::MAX_FUTURE_BLOCK_TIME;
use crate::error::BlockError;
use crate::merkle;
use crate::validation;

/// Run the context-free checks of block validation (§4.D steps 1–7, minus
/// the `prev_block_hash`/`bits` checks that require chain state).
pub fn validate_block_basics(block: &crate::types::Block, now: u32, median_time_past: u32) -> Result<(), BlockError> {
    if block.txns.is_empty() {
        return Err(BlockError::EmptyTransactions);
    }

    if block.timestamp as u64 > now as u64 + MAX_FUTURE_BLOCK_TIME {
        return Err(BlockError::TimestampTooFarInFuture { timestamp: block.timestamp, max_future: MAX_FUTURE_BLOCK_TIME });
    }

    if !block.id().meets_bits(block.bits) {
        return Err(BlockError::ProofOfWorkNotMet { bits: block.bits });
    }

    if !block.txns[0].is_coinbase() {
        return Err(BlockError::FirstTxNotCoinbase);
    }

    for (index, txn) in block.txns.iter().enumerate() {
        validation::validate_basics(txn, index == 0)
            .map_err(|source| BlockError::TransactionInvalid { index, source })?;
    }

    let computed = merkle::merkle_root_of_txns(&block.txns).val;
    if computed != block.merkle_hash {
        return Err(BlockError::MerkleRootMismatch {
            computed: computed.to_hex(),
            declared: block.merkle_hash.to_hex(),
        });
    }

    if !block.is_genesis() && block.timestamp <= median_time_past {
        return Err(BlockError::StaleTimestamp { timestamp: block.timestamp, median: median_time_past });
    }

    Ok(())
}

/// Median of up to the last [`MEDIAN_TIME_PAST_WINDOW`](crate::constants::MEDIAN_TIME_PAST_WINDOW)
/// block timestamps, oldest to newest. Returns 0 for an empty slice (an empty chain).
pub fn median_time_past(recent_timestamps: &[u32]) -> u32 {
    if recent_timestamps.is_empty() {
        return 0;
    }
    let mut sorted = recent_timestamps.to_vec();
    sorted.sort_unstable();
    sorted[sorted.len() / 2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::genesis_block;
    use crate::types::{Address, PrevBlockHash, Transaction, TxIn, TxOut};

    fn coinbase(value: u64) -> Transaction {
        Transaction {
            txins: vec![TxIn { to_spend: None, unlock_sig: vec![0], unlock_pk: vec![], sequence: 0 }],
            txouts: vec![TxOut { value, to_address: Address("addr".to_string()) }],
            locktime: None,
        }
    }

    fn block_with(txns: Vec<Transaction>, timestamp: u32, bits: u32, nonce: u64) -> crate::types::Block {
        let merkle_hash = merkle::merkle_root_of_txns(&txns).val;
        crate::types::Block {
            version: 0,
            prev_block_hash: PrevBlockHash::Hash(genesis_block().id()),
            merkle_hash,
            timestamp,
            bits,
            nonce,
            txns,
        }
    }

    #[test]
    fn genesis_passes_basics() {
        let g = genesis_block();
        assert!(validate_block_basics(&g, g.timestamp, 0).is_ok());
    }

    #[test]
    fn rejects_empty_transactions() {
        let block = crate::types::Block {
            version: 0,
            prev_block_hash: PrevBlockHash::Genesis,
            merkle_hash: crate::types::Hash256::ZERO,
            timestamp: 1,
            bits: 0,
            nonce: 0,
            txns: vec![],
        };
        assert_eq!(validate_block_basics(&block, 1, 0).unwrap_err(), BlockError::EmptyTransactions);
    }

    #[test]
    fn rejects_future_timestamp() {
        let block = block_with(vec![coinbase(1)], 1_000_000, 0, 0);
        let err = validate_block_basics(&block, 1, 0).unwrap_err();
        assert!(matches!(err, BlockError::TimestampTooFarInFuture { .. }));
    }

    #[test]
    fn rejects_non_coinbase_first() {
        let outpoint = crate::types::OutPoint { txid: crate::types::Hash256::ZERO, txout_idx: 0 };
        let spend = Transaction {
            txins: vec![TxIn { to_spend: Some(outpoint), unlock_sig: vec![], unlock_pk: vec![], sequence: 0 }],
            txouts: vec![TxOut { value: 1, to_address: Address("addr".to_string()) }],
            locktime: None,
        };
        let block = block_with(vec![spend], 1, 0, 0);
        let err = validate_block_basics(&block, 1, 0).unwrap_err();
        assert_eq!(err, BlockError::FirstTxNotCoinbase);
    }

    #[test]
    fn rejects_merkle_mismatch() {
        let mut block = block_with(vec![coinbase(1)], 1, 0, 0);
        block.merkle_hash = crate::types::Hash256::ZERO;
        let err = validate_block_basics(&block, 1, 0).unwrap_err();
        assert!(matches!(err, BlockError::MerkleRootMismatch { .. }));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let block = block_with(vec![coinbase(1)], 100, 0, 0);
        let err = validate_block_basics(&block, 200, 500).unwrap_err();
        assert!(matches!(err, BlockError::StaleTimestamp { .. }));
    }

    #[test]
    fn median_time_past_empty_is_zero() {
        assert_eq!(median_time_past(&[]), 0);
    }

    #[test]
    fn median_time_past_odd_count() {
        assert_eq!(median_time_past(&[3, 1, 2]), 2);
    }

    #[test]
    fn median_time_past_is_order_independent() {
        assert_eq!(median_time_past(&[5, 1, 9, 3, 7]), median_time_past(&[9, 7, 5, 3, 1]));
    }
}
