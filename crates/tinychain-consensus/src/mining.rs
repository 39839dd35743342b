//! Block template assembly, mining, and block validation (§4.G/§4.H).
//!
//! [`MiningEngine`] wires together [`tinychain_core::validation`],
//! [`tinychain_core::difficulty`], and [`tinychain_core::reward`] with a
//! [`ChainState`] to provide a complete block production and validation
//! pipeline. Structural block checks (empty txns, PoW, merkle root, ...) are
//! delegated to [`tinychain_core::block_validation`]; this module adds the
//! chain-context-dependent pieces: matching `prev_block_hash` and `bits`
//! against the active tip, and resolving each transaction's inputs against
//! the confirmed UTXO set.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tinychain_core::constants::{COINBASE_MATURITY, MAX_BLOCK_SERIALIZED_SIZE, MEDIAN_TIME_PAST_WINDOW};
use tinychain_core::error::{BlockError, TransactionError, Validity};
use tinychain_core::mempool::Mempool;
use tinychain_core::traits::{BlockProducer, ChainState};
use tinychain_core::types::{Address, Block, Hash256, OutPoint, PrevBlockHash, Transaction, TxIn, TxOut};
use tinychain_core::{block_validation, codec, difficulty, merkle, reward, validation};

/// Block production and validation against a [`ChainState`].
pub struct MiningEngine {
    chain_state: Arc<dyn ChainState>,
}

impl MiningEngine {
    pub fn new(chain_state: Arc<dyn ChainState>) -> Self {
        Self { chain_state }
    }

    /// Look up a block timestamp by active-chain height, used both by
    /// difficulty retargeting and median-time-past.
    fn timestamp_at(&self, height: u64) -> u32 {
        self.chain_state
            .get_block_id_at_height(height)
            .ok()
            .flatten()
            .and_then(|id| self.chain_state.get_block(&id).ok().flatten())
            .map(|b| b.timestamp)
            .unwrap_or(0)
    }

    /// Median of the last [`MEDIAN_TIME_PAST_WINDOW`] active-chain timestamps
    /// up to and including `tip_height`.
    fn median_time_past(&self, tip_height: u64) -> u32 {
        let window = MEDIAN_TIME_PAST_WINDOW as u64;
        let start = tip_height.saturating_sub(window.saturating_sub(1));
        let timestamps: Vec<u32> = (start..=tip_height).map(|h| self.timestamp_at(h)).collect();
        block_validation::median_time_past(&timestamps)
    }

    /// The `bits` required for the block extending the current tip.
    fn next_bits(&self, tip_height: u64, tip_block: &Block) -> u32 {
        difficulty::get_next_work_required(tip_block.prev_block_hash, tip_height, tip_block.bits, |h| {
            self.timestamp_at(h)
        })
    }

    /// Greedy, dependency-respecting selection of mempool transactions for a
    /// new block template. Walks the mempool in insertion order; a candidate
    /// whose input is produced by another mempool transaction (rather than
    /// the confirmed UTXO set) pulls that parent in first. Stops selecting
    /// once the block would exceed [`MAX_BLOCK_SERIALIZED_SIZE`]; a candidate
    /// whose parent resolves to neither the UTXO set nor the mempool is
    /// skipped without failing the rest of the selection.
    fn select_from_mempool(&self, mempool: &Mempool, coinbase_budget: usize) -> Vec<Transaction> {
        let mut selected: Vec<Transaction> = Vec::new();
        let mut included: HashSet<Hash256> = HashSet::new();
        let mut budget = coinbase_budget;

        fn try_include(
            txid: Hash256,
            mempool: &Mempool,
            chain_state: &dyn ChainState,
            selected: &mut Vec<Transaction>,
            included: &mut HashSet<Hash256>,
            budget: &mut usize,
            in_progress: &mut HashSet<Hash256>,
        ) -> bool {
            if included.contains(&txid) {
                return true;
            }
            if in_progress.contains(&txid) {
                return false;
            }
            let Some(tx) = mempool.get(&txid) else {
                return false;
            };
            in_progress.insert(txid);

            for input in &tx.txins {
                let Some(outpoint) = input.to_spend else { continue };
                if chain_state.contains_utxo(&outpoint).unwrap_or(false) {
                    continue;
                }
                if !try_include(outpoint.txid, mempool, chain_state, selected, included, budget, in_progress) {
                    in_progress.remove(&txid);
                    return false;
                }
            }

            let size = codec::to_canonical_bytes(tx).len();
            if size > *budget {
                in_progress.remove(&txid);
                return false;
            }

            *budget -= size;
            selected.push(tx.clone());
            included.insert(txid);
            in_progress.remove(&txid);
            true
        }

        for (txid, _) in mempool.iter_in_order() {
            let mut in_progress = HashSet::new();
            try_include(*txid, mempool, self.chain_state.as_ref(), &mut selected, &mut included, &mut budget, &mut in_progress);
        }

        selected
    }

    /// Build a provisional block paying the subsidy plus collected fees to
    /// `pay_to`, including as many mempool transactions as fit.
    pub fn assemble_block_template(&self, pay_to: &Address, timestamp: u32, mempool: &Mempool) -> Result<Block, BlockError> {
        let (tip_height, tip_id) = self.chain_state.chain_tip().map_err(|_| BlockError::EmptyTransactions)?;
        let tip_block = self
            .chain_state
            .get_block(&tip_id)
            .map_err(|_| BlockError::EmptyTransactions)?
            .ok_or(BlockError::EmptyTransactions)?;

        let height = tip_height + 1;
        let bits = self.next_bits(tip_height, &tip_block);
        let included = self.select_from_mempool(mempool, MAX_BLOCK_SERIALIZED_SIZE);

        let cs = self.chain_state.clone();
        let fees = reward::calculate_fees(&included, |op| cs.get_utxo(op).ok().flatten().map(|u| u.value))
            .unwrap_or(0);
        let subsidy = reward::block_subsidy(height);

        let coinbase = Transaction {
            txins: vec![TxIn {
                to_spend: None,
                unlock_sig: height.to_be_bytes().to_vec(),
                unlock_pk: Vec::new(),
                sequence: 0,
            }],
            txouts: vec![TxOut { value: subsidy.saturating_add(fees), to_address: pay_to.clone() }],
            locktime: None,
        };

        let mut txns = Vec::with_capacity(1 + included.len());
        txns.push(coinbase);
        txns.extend(included);

        let merkle_hash = merkle::merkle_root_of_txns(&txns).val;
        let block = Block {
            version: 0,
            prev_block_hash: PrevBlockHash::Hash(tip_id),
            merkle_hash,
            timestamp,
            bits,
            nonce: 0,
            txns,
        };

        if codec::to_canonical_bytes(&block).len() > MAX_BLOCK_SERIALIZED_SIZE {
            return Err(BlockError::OversizedBlock { size: codec::to_canonical_bytes(&block).len(), max: MAX_BLOCK_SERIALIZED_SIZE });
        }

        Ok(block)
    }
}

impl BlockProducer for MiningEngine {
    fn create_block_template(&self, pay_to: &Address, timestamp: u32) -> Result<Block, BlockError> {
        self.assemble_block_template(pay_to, timestamp, &Mempool::new())
    }

    fn validate_block(&self, block: &Block) -> Result<(), BlockError> {
        let (tip_height, tip_id) = self.chain_state.chain_tip().map_err(|_| BlockError::EmptyTransactions)?;
        let median = self.median_time_past(tip_height);
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(block.timestamp);

        block_validation::validate_block_basics(block, now, median)?;

        if !block.is_genesis() {
            if block.prev_block_hash != PrevBlockHash::Hash(tip_id) {
                return Err(BlockError::TransactionInvalid {
                    index: 0,
                    source: TransactionError::InvalidCoinbase("block does not extend the active tip".to_string()),
                });
            }

            let tip_block = self
                .chain_state
                .get_block(&tip_id)
                .map_err(|_| BlockError::EmptyTransactions)?
                .ok_or(BlockError::EmptyTransactions)?;
            let expected_bits = self.next_bits(tip_height, &tip_block);
            if block.bits != expected_bits {
                return Err(BlockError::WrongDifficultyBits { expected: expected_bits, got: block.bits });
            }
        }

        let height = tip_height + 1;
        let rest = &block.txns[1..];
        for (index, tx) in block.txns.iter().enumerate() {
            let as_coinbase = index == 0;
            let cs = self.chain_state.clone();
            let result = validation::validate_txn(
                tx,
                as_coinbase,
                Some(rest),
                false,
                move |op| cs.get_utxo(op).ok().flatten(),
                None,
                height as u32,
            );
            if let Err(err) = result {
                let source = match err {
                    Validity::Invalid(e) => e,
                    Validity::Orphan(_) => TransactionError::InvalidCoinbase("references an unknown UTXO".to_string()),
                };
                return Err(BlockError::TransactionInvalid { index, source });
            }
        }

        Ok(())
    }

    fn block_subsidy(&self, height: u64) -> u64 {
        reward::block_subsidy(height)
    }
}

/// Search for a nonce that satisfies `block.bits`, mutating `block.nonce` in
/// place. Polls `interrupt` between attempts; returns `false` without
/// finding a nonce if it is set. Intended to run inside
/// `tokio::task::spawn_blocking`, since this is CPU-bound work that must not
/// occupy the async runtime.
pub fn mine(block: &mut Block, interrupt: &AtomicBool) -> bool {
    loop {
        if interrupt.load(Ordering::Relaxed) {
            return false;
        }
        if block.id().meets_bits(block.bits) {
            return true;
        }
        if block.nonce == u64::MAX {
            return false;
        }
        block.nonce += 1;
    }
}
