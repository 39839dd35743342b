//! The chain engine: active chain, side branches, UTXO set, mempool, and
//! peer set behind a single lock (§5/§9).
//!
//! [`Node`] is the one piece of mutable state in the process. Every
//! chain-mutating operation (`connect_block`, `disconnect_block`,
//! `reorg_if_necessary`, `try_reorg`) runs under `inner`'s write lock, so
//! observers never see a chain in a half-reorganized state. Side-branch
//! blocks are accepted with only structural validation; full UTXO-aware
//! validation runs when [`Node::try_reorg`] actually attaches them to the
//! active chain, and the attempt rolls back completely if any block in the
//! branch fails it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use tinychain_consensus::mining::MiningEngine;
use tinychain_core::constants::MEDIAN_TIME_PAST_WINDOW;
use tinychain_core::error::{BlockError, NetworkError, NodeError, TransactionError, Validity};
use tinychain_core::mempool::Mempool;
use tinychain_core::traits::{BlockProducer, ChainState, NetworkService};
use tinychain_core::types::{Address, Block, Hash256, OutPoint, PrevBlockHash, Transaction, UnspentTxOut};
use tinychain_core::utxo::UtxoSet;
use tinychain_core::{block_validation, difficulty, genesis, validation};
use tinychain_network::{send_to_peer, ConnectOutcome as NetConnectOutcome, NetworkMessage, NodeHandle};

use crate::config::NodeConfig;

/// The mutable chain state, held behind [`Node::inner`]'s lock.
struct Inner {
    /// Active-chain block ids, `active_ids[height] = id`. Index 0 is genesis.
    active_ids: Vec<Hash256>,
    /// Every known block: active chain plus all side branches.
    blocks: HashMap<Hash256, Block>,
    /// Side branches that have not (yet) overtaken the active chain,
    /// each a run of ids from just after its fork point to its tip.
    side_branches: Vec<Vec<Hash256>>,
    /// Blocks whose parent isn't known yet, keyed by that missing parent id.
    orphan_blocks: HashMap<Hash256, Vec<Block>>,
    /// Utxos spent by each active-chain block, for `disconnect_block` to
    /// restore.
    undo: HashMap<Hash256, Vec<UnspentTxOut>>,
    utxos: UtxoSet,
    mempool: Mempool,
    peer_hostnames: Vec<String>,
}

impl Inner {
    fn tip_height(&self) -> u64 {
        self.active_ids.len() as u64 - 1
    }

    fn tip_id(&self) -> Hash256 {
        *self.active_ids.last().expect("genesis is always present")
    }

    fn timestamp_at(&self, height: u64) -> u32 {
        self.active_ids
            .get(height as usize)
            .and_then(|id| self.blocks.get(id))
            .map(|b| b.timestamp)
            .unwrap_or(0)
    }

    fn median_time_past(&self) -> u32 {
        let window = MEDIAN_TIME_PAST_WINDOW as u64;
        let tip = self.tip_height();
        let start = tip.saturating_sub(window.saturating_sub(1));
        let timestamps: Vec<u32> = (start..=tip).map(|h| self.timestamp_at(h)).collect();
        block_validation::median_time_past(&timestamps)
    }

    fn get_confirmed_utxo(&self, outpoint: &OutPoint) -> Option<UnspentTxOut> {
        self.utxos.get(outpoint).cloned()
    }
}

/// The full chain engine: connects/disconnects blocks, tracks side branches
/// and reorgs, and serves the `tinychain-network`/`tinychain-consensus`
/// trait boundaries.
pub struct Node {
    inner: RwLock<Inner>,
    /// Flipped whenever the active tip changes, so an in-flight mining
    /// attempt abandons its stale template.
    mine_interrupt: Arc<AtomicBool>,
    config: NodeConfig,
    /// Self-reference so broadcast can hand peer tasks an owned `Arc<Node>`
    /// that outlives the call that spawned them.
    self_ref: Weak<Node>,
}

impl Node {
    /// Build a fresh node over `active_chain`, validating and connecting
    /// each block in order rather than trusting it outright (a chain file
    /// read from disk may be stale, truncated, or tampered with).
    pub fn new(config: NodeConfig, active_chain: Vec<Block>) -> Arc<Self> {
        assert!(!active_chain.is_empty() && active_chain[0].is_genesis(), "active chain must start at genesis");
        let mut blocks = active_chain.into_iter();
        let genesis_block = blocks.next().expect("checked non-empty above");

        let mut inner = Inner {
            active_ids: Vec::with_capacity(1),
            blocks: HashMap::new(),
            side_branches: Vec::new(),
            orphan_blocks: HashMap::new(),
            undo: HashMap::new(),
            utxos: UtxoSet::new(),
            mempool: Mempool::new(),
            peer_hostnames: config.network.peer_hostnames.clone(),
        };

        let genesis_id = genesis_block.id();
        let removed = Self::apply_block(&mut inner, &genesis_block, 0);
        inner.undo.insert(genesis_id, removed);
        inner.blocks.insert(genesis_id, genesis_block);
        inner.active_ids.push(genesis_id);

        let node = Arc::new_cyclic(|weak| Self {
            inner: RwLock::new(inner),
            mine_interrupt: Arc::new(AtomicBool::new(false)),
            config,
            self_ref: weak.clone(),
        });

        let mut guard = node.inner.write();
        for block in blocks {
            let id = block.id();
            match node.connect_block_silently(&mut guard, block) {
                NetConnectOutcome::Connected => {}
                other => {
                    warn!(block = %id, outcome = ?other, "on-disk chain contains an invalid block, stopping replay here");
                    break;
                }
            }
        }
        drop(guard);

        node
    }

    /// A fresh node starting from genesis only.
    pub fn genesis_only(config: NodeConfig) -> Arc<Self> {
        Self::new(config, vec![genesis::genesis_block()])
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Shared flag an in-progress `spawn_blocking` nonce search polls;
    /// flipped whenever the active tip changes.
    pub fn mine_interrupt(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.mine_interrupt)
    }

    /// Clear the interrupt flag so the next mining attempt can proceed.
    pub fn reset_mine_interrupt(&self) {
        self.mine_interrupt.store(false, Ordering::Relaxed);
    }

    fn mining_engine(self: &Arc<Self>) -> MiningEngine {
        MiningEngine::new(Arc::clone(self) as Arc<dyn ChainState>)
    }

    /// A snapshot of the current active chain.
    pub fn active_chain_snapshot(&self) -> Vec<Block> {
        let inner = self.inner.read();
        inner.active_ids.iter().map(|id| inner.blocks[id].clone()).collect()
    }

    /// Apply `block`'s effects to `inner`'s UTXO set and mempool. Returns the
    /// utxos consumed (for the undo log). `height` is the block's own height.
    fn apply_block(inner: &mut Inner, block: &Block, height: u32) -> Vec<UnspentTxOut> {
        let mut removed = Vec::new();
        for tx in &block.txns {
            if !tx.is_coinbase() {
                for input in &tx.txins {
                    if let Some(outpoint) = input.to_spend {
                        if let Some(utxo) = inner.utxos.remove(&outpoint.txid, outpoint.txout_idx) {
                            removed.push(utxo);
                        }
                    }
                }
            }
            let txid = tx.txid();
            for (idx, txout) in tx.txouts.iter().enumerate() {
                inner.utxos.add(UnspentTxOut {
                    value: txout.value,
                    to_address: txout.to_address.clone(),
                    txid,
                    txout_idx: idx as u32,
                    is_coinbase: tx.is_coinbase(),
                    height,
                });
            }
            inner.mempool.remove(&txid);
        }
        removed
    }

    /// Reverse `apply_block`'s effects: drop the outputs it created, restore
    /// the ones it spent, and return its non-coinbase transactions to the
    /// mempool.
    fn unapply_block(inner: &mut Inner, block: &Block) {
        for tx in &block.txns {
            let txid = tx.txid();
            for idx in 0..tx.txouts.len() {
                inner.utxos.remove(&txid, idx as u32);
            }
            if !tx.is_coinbase() {
                inner.mempool.insert(txid, tx.clone());
            }
        }
        if let Some(removed) = inner.undo.remove(&block.id()) {
            for utxo in removed {
                inner.utxos.add(utxo);
            }
        }
    }

    /// Full, chain-context-aware validation of `block` as a direct extension
    /// of the current active tip.
    fn validate_for_active(inner: &Inner, block: &Block) -> Result<(), BlockError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(block.timestamp);
        let median = inner.median_time_past();
        block_validation::validate_block_basics(block, now, median)?;

        let tip_height = inner.tip_height();
        let tip_id = inner.tip_id();
        if block.prev_block_hash != PrevBlockHash::Hash(tip_id) {
            return Err(BlockError::TransactionInvalid {
                index: 0,
                source: TransactionError::InvalidCoinbase("block does not extend the active tip".to_string()),
            });
        }

        let tip_block = &inner.blocks[&tip_id];
        let expected_bits = difficulty::get_next_work_required(tip_block.prev_block_hash, tip_height, tip_block.bits, |h| {
            inner.timestamp_at(h)
        });
        if block.bits != expected_bits {
            return Err(BlockError::WrongDifficultyBits { expected: expected_bits, got: block.bits });
        }

        let height = (tip_height + 1) as u32;
        let rest = &block.txns[1..];
        for (index, tx) in block.txns.iter().enumerate() {
            let as_coinbase = index == 0;
            let result = validation::validate_txn(
                tx,
                as_coinbase,
                Some(rest),
                false,
                |op| inner.get_confirmed_utxo(op),
                None,
                height,
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

    /// Validate and apply `block` directly onto the active tip.
    fn connect_to_active(inner: &mut Inner, block: Block) -> Result<(), BlockError> {
        Self::validate_for_active(inner, &block)?;
        let height = (inner.tip_height() + 1) as u32;
        let removed = Self::apply_block(inner, &block, height);
        let id = block.id();
        inner.undo.insert(id, removed);
        inner.active_ids.push(id);
        inner.blocks.insert(id, block);
        Ok(())
    }

    fn disconnect_active_tip(inner: &mut Inner) -> Block {
        let id = inner.active_ids.pop().expect("never disconnect below genesis");
        let block = inner.blocks[&id].clone();
        Self::unapply_block(inner, &block);
        block
    }

    /// Attempt to replace the active chain with `side_branches[branch_idx]`.
    /// Rolls back entirely, leaving the active chain exactly as it was, if
    /// any block in the branch fails full validation.
    fn try_reorg(inner: &mut Inner, branch_idx: usize) -> bool {
        let branch = inner.side_branches[branch_idx].clone();
        let fork_parent = match inner.blocks[&branch[0]].prev_block_hash {
            PrevBlockHash::Hash(h) => h,
            PrevBlockHash::Genesis => return false,
        };
        let Some(fork_height) = inner.active_ids.iter().position(|id| *id == fork_parent) else {
            return false;
        };

        let mut disconnected = Vec::new();
        while inner.active_ids.len() - 1 > fork_height {
            disconnected.push(Self::disconnect_active_tip(inner).id());
        }

        let mut connected = Vec::new();
        for &bid in &branch {
            let block = inner.blocks[&bid].clone();
            match Self::connect_to_active(inner, block) {
                Ok(()) => connected.push(bid),
                Err(e) => {
                    warn!(block = %bid, error = %e, "reorg candidate failed validation, rolling back");
                    for _ in &connected {
                        Self::disconnect_active_tip(inner);
                    }
                    for &oid in disconnected.iter().rev() {
                        let old_block = inner.blocks[&oid].clone();
                        Self::connect_to_active(inner, old_block)
                            .expect("re-connecting a previously active block cannot fail");
                    }
                    return false;
                }
            }
        }

        inner.side_branches[branch_idx] = disconnected;
        true
    }

    /// Reorg onto `branch_idx` if it is now longer than the active chain.
    fn reorg_if_necessary(inner: &mut Inner, branch_idx: usize) {
        let branch = &inner.side_branches[branch_idx];
        let Some(&last) = branch.last() else { return };
        let fork_parent = match inner.blocks[&branch[0]].prev_block_hash {
            PrevBlockHash::Hash(h) => h,
            PrevBlockHash::Genesis => return,
        };
        let Some(fork_height) = inner.active_ids.iter().position(|id| *id == fork_parent) else {
            return;
        };
        let branch_height = fork_height as u64 + branch.len() as u64;
        if branch_height > inner.tip_height() {
            debug!(tip = %last, "side branch overtakes active chain, reorganizing");
            Self::try_reorg(inner, branch_idx);
        }
    }

    /// Append `block` to the side branch whose tip is its parent, or start a
    /// new branch if its parent is an older active-chain block. Only
    /// structural validation runs here — full validation happens at reorg.
    fn grow_side_branch(inner: &mut Inner, block: Block) -> bool {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(block.timestamp);
        if block_validation::validate_block_basics(&block, now, 0).is_err() {
            return false;
        }

        let parent_id = match block.prev_block_hash {
            PrevBlockHash::Hash(h) => h,
            PrevBlockHash::Genesis => return false,
        };
        let id = block.id();

        let branch_idx = inner.side_branches.iter().position(|b| b.last() == Some(&parent_id));
        let idx = match branch_idx {
            Some(i) => {
                inner.side_branches[i].push(id);
                i
            }
            None => {
                inner.side_branches.push(vec![id]);
                inner.side_branches.len() - 1
            }
        };
        inner.blocks.insert(id, block);
        Self::reorg_if_necessary(inner, idx);
        true
    }

    /// Connect `block` to the known chain(s), growing/reorganizing a side
    /// branch or the active chain as appropriate, and recursively connecting
    /// any orphans that were waiting on it. Broadcasts the block to every
    /// known peer once it is connected.
    pub fn connect_block(&self, block: Block) -> NetConnectOutcome {
        let mut inner = self.inner.write();
        let outcome = self.connect_block_locked(&mut inner, block, true);
        drop(inner);
        outcome
    }

    /// Connect `block` without broadcasting it, for replaying a chain
    /// that is already on disk.
    fn connect_block_silently(&self, inner: &mut Inner, block: Block) -> NetConnectOutcome {
        self.connect_block_locked(inner, block, false)
    }

    fn connect_block_locked(&self, inner: &mut Inner, block: Block, broadcast: bool) -> NetConnectOutcome {
        let id = block.id();
        if inner.blocks.contains_key(&id) {
            return NetConnectOutcome::AlreadyKnown;
        }

        let parent_id = match block.prev_block_hash {
            PrevBlockHash::Genesis => return NetConnectOutcome::AlreadyKnown,
            PrevBlockHash::Hash(h) => h,
        };

        if !inner.blocks.contains_key(&parent_id) {
            inner.orphan_blocks.entry(parent_id).or_default().push(block);
            return NetConnectOutcome::Orphaned;
        }

        let broadcast_candidate = broadcast.then(|| block.clone());
        let was_tip = parent_id == inner.tip_id();
        let outcome = if was_tip {
            match Self::connect_to_active(inner, block) {
                Ok(()) => {
                    self.mine_interrupt.store(true, Ordering::Relaxed);
                    info!(height = inner.tip_height(), tip = %inner.tip_id(), "connected block to active chain");
                    NetConnectOutcome::Connected
                }
                Err(e) => {
                    warn!(error = %e, "rejected block extending active tip");
                    NetConnectOutcome::Rejected
                }
            }
        } else if Self::grow_side_branch(inner, block) {
            self.mine_interrupt.store(true, Ordering::Relaxed);
            NetConnectOutcome::Connected
        } else {
            NetConnectOutcome::Rejected
        };

        if matches!(outcome, NetConnectOutcome::Connected) {
            if let Some(candidate) = broadcast_candidate {
                self.spawn_broadcast(inner.peer_hostnames.clone(), NetworkMessage::Block(candidate));
            }
            if let Some(waiting) = inner.orphan_blocks.remove(&id) {
                for child in waiting {
                    self.connect_block_locked(inner, child, broadcast);
                }
            }
        }

        outcome
    }

    /// Fire-and-forget fan-out of `msg` to each of `peers`, spawned on the
    /// ambient tokio runtime. A no-op with no peers, or outside a runtime
    /// (plain unit tests build a `Node` with none running). Each peer's own
    /// send/retry/eviction is handled by [`send_to_peer`].
    fn spawn_broadcast(&self, peers: Vec<String>, msg: NetworkMessage) {
        if peers.is_empty() {
            return;
        }
        let Some(node) = self.self_ref.upgrade() else { return };
        let Ok(handle) = tokio::runtime::Handle::try_current() else { return };
        handle.spawn(async move {
            for peer in peers {
                let _ = send_to_peer(node.as_ref(), Some(&peer), &msg).await;
            }
        });
    }

    /// Validate and admit `tx` to the mempool, or park it as an orphan if
    /// one of its inputs is not yet resolvable.
    pub fn process_transaction(&self, tx: Transaction) {
        let mut inner = self.inner.write();
        if inner.mempool.contains(&tx.txid()) {
            return;
        }
        let next_height = (inner.tip_height() + 1) as u32;
        let result = validation::validate_txn(
            &tx,
            false,
            None,
            true,
            |op| inner.get_confirmed_utxo(op),
            Some(&inner.mempool),
            next_height,
        );
        match result {
            Ok(_) => {
                let txid = tx.txid();
                self.spawn_broadcast(inner.peer_hostnames.clone(), NetworkMessage::Transaction(tx.clone()));
                inner.mempool.insert(txid, tx);
            }
            Err(Validity::Orphan(boxed)) => {
                let txid = boxed.txid();
                inner.mempool.add_orphan(txid, *boxed);
            }
            Err(Validity::Invalid(e)) => {
                debug!(error = %e, "rejected transaction");
            }
        }
    }
}

impl ChainState for Node {
    fn get_utxo(&self, outpoint: &OutPoint) -> Result<Option<UnspentTxOut>, NodeError> {
        Ok(self.inner.read().utxos.get(outpoint).cloned())
    }

    fn chain_tip(&self) -> Result<(u64, Hash256), NodeError> {
        let inner = self.inner.read();
        Ok((inner.tip_height(), inner.tip_id()))
    }

    fn get_block(&self, id: &Hash256) -> Result<Option<Block>, NodeError> {
        Ok(self.inner.read().blocks.get(id).cloned())
    }

    fn get_block_id_at_height(&self, height: u64) -> Result<Option<Hash256>, NodeError> {
        Ok(self.inner.read().active_ids.get(height as usize).copied())
    }

    fn validate_transaction(&self, tx: &Transaction) -> Result<(), TransactionError> {
        let inner = self.inner.read();
        let next_height = (inner.tip_height() + 1) as u32;
        match validation::validate_txn(tx, false, None, true, |op| inner.get_confirmed_utxo(op), Some(&inner.mempool), next_height) {
            Ok(_) => Ok(()),
            Err(Validity::Invalid(e)) => Err(e),
            Err(Validity::Orphan(_)) => Err(TransactionError::InvalidCoinbase("references an unknown UTXO".to_string())),
        }
    }
}

impl NodeHandle for Node {
    fn blocks_after(&self, from_blockid: Hash256) -> Vec<Block> {
        let inner = self.inner.read();
        let start = inner
            .active_ids
            .iter()
            .position(|id| *id == from_blockid)
            .map(|i| i + 1)
            .unwrap_or(1);
        inner
            .active_ids
            .iter()
            .skip(start)
            .take(tinychain_core::constants::GET_BLOCKS_CHUNK_SIZE as usize)
            .map(|id| inner.blocks[id].clone())
            .collect()
    }

    fn chain_tip_id(&self) -> Hash256 {
        self.inner.read().tip_id()
    }

    fn offer_block(&self, block: Block) -> NetConnectOutcome {
        self.connect_block(block)
    }

    fn offer_transaction(&self, tx: Transaction) {
        self.process_transaction(tx);
    }

    fn utxo_snapshot(&self) -> Vec<(OutPoint, UnspentTxOut)> {
        self.inner.read().utxos.iter().map(|(op, u)| (*op, u.clone())).collect()
    }

    fn mempool_txids(&self) -> Vec<Hash256> {
        self.inner.read().mempool.iter_in_order().map(|(id, _)| *id).collect()
    }

    fn active_chain_snapshot(&self) -> Vec<Block> {
        Node::active_chain_snapshot(self)
    }

    fn add_peer_hostname(&self, hostname: String) {
        let mut inner = self.inner.write();
        if !inner.peer_hostnames.contains(&hostname) {
            inner.peer_hostnames.push(hostname);
        }
    }

    fn known_peer_hostnames(&self) -> Vec<String> {
        self.inner.read().peer_hostnames.clone()
    }

    fn evict_peer_hostname(&self, hostname: &str) {
        self.inner.write().peer_hostnames.retain(|h| h != hostname);
    }
}

impl NetworkService for Node {
    fn broadcast_block(&self, block: &Block) -> Result<(), NetworkError> {
        let peers = self.inner.read().peer_hostnames.clone();
        if peers.is_empty() {
            return Err(NetworkError::NoPeers);
        }
        self.spawn_broadcast(peers, NetworkMessage::Block(block.clone()));
        Ok(())
    }

    fn broadcast_transaction(&self, tx: &Transaction) -> Result<(), NetworkError> {
        let peers = self.inner.read().peer_hostnames.clone();
        if peers.is_empty() {
            return Err(NetworkError::NoPeers);
        }
        self.spawn_broadcast(peers, NetworkMessage::Transaction(tx.clone()));
        Ok(())
    }

    fn peer_count(&self) -> usize {
        self.inner.read().peer_hostnames.len()
    }
}

impl Node {
    /// Build a block template paying the subsidy and collected fees to
    /// `pay_to`, over the current mempool.
    pub fn create_block_template(self: &Arc<Self>, pay_to: &Address, timestamp: u32) -> Result<Block, BlockError> {
        let mempool_snapshot = self.inner.read().mempool.clone();
        self.mining_engine().assemble_block_template(pay_to, timestamp, &mempool_snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinychain_consensus::mining::mine;
    use tinychain_core::crypto::KeyPair;
    use tinychain_core::genesis::genesis_block;

    fn test_config() -> NodeConfig {
        NodeConfig::default()
    }

    fn mined_child(node: &Arc<Node>, pay_to: &Address) -> Block {
        let parent_timestamp = node.active_chain_snapshot().last().unwrap().timestamp;
        let mut block = node.create_block_template(pay_to, parent_timestamp + 1).unwrap();
        let interrupt = AtomicBool::new(false);
        assert!(mine(&mut block, &interrupt));
        block
    }

    #[test]
    fn genesis_only_node_has_height_zero() {
        let node = Node::genesis_only(test_config());
        assert_eq!(node.chain_tip().unwrap(), (0, genesis_block().id()));
    }

    #[test]
    fn genesis_utxo_is_indexed() {
        let node = Node::genesis_only(test_config());
        let genesis = genesis_block();
        let outpoint = OutPoint { txid: genesis.txns[0].txid(), txout_idx: 0 };
        assert!(node.get_utxo(&outpoint).unwrap().is_some());
    }

    #[test]
    fn connecting_valid_block_advances_tip() {
        let node = Node::genesis_only(test_config());
        let addr = Address("payout".to_string());
        let block = mined_child(&node, &addr);
        let id = block.id();
        assert_eq!(node.connect_block(block), NetConnectOutcome::Connected);
        assert_eq!(node.chain_tip().unwrap(), (1, id));
    }

    #[test]
    fn connecting_duplicate_block_is_already_known() {
        let node = Node::genesis_only(test_config());
        let addr = Address("payout".to_string());
        let block = mined_child(&node, &addr);
        assert_eq!(node.connect_block(block.clone()), NetConnectOutcome::Connected);
        assert_eq!(node.connect_block(block), NetConnectOutcome::AlreadyKnown);
    }

    #[test]
    fn connecting_block_with_unknown_parent_is_orphaned() {
        let node = Node::genesis_only(test_config());
        let addr = Address("payout".to_string());
        let mut block = mined_child(&node, &addr);
        block.prev_block_hash = PrevBlockHash::Hash(Hash256([0xAB; 32]));
        assert_eq!(node.connect_block(block), NetConnectOutcome::Orphaned);
    }

    #[test]
    fn coinbase_is_immature_before_maturity_height() {
        let node = Node::genesis_only(test_config());
        let genesis = genesis_block();
        let kp = KeyPair::generate();
        let outpoint = OutPoint { txid: genesis.txns[0].txid(), txout_idx: 0 };
        let txouts = vec![tinychain_core::types::TxOut { value: 1, to_address: kp.address() }];
        let digest = tinychain_core::crypto::build_spend_message(&outpoint, &kp.public_key_bytes(), 0, &txouts);
        let sig = kp.sign(&digest);
        let spend = Transaction {
            txins: vec![tinychain_core::types::TxIn {
                to_spend: Some(outpoint),
                unlock_sig: sig.serialize_der().to_vec(),
                unlock_pk: kp.public_key_bytes(),
                sequence: 0,
            }],
            txouts,
            locktime: None,
        };
        node.process_transaction(spend.clone());
        assert!(!node.inner.read().mempool.contains(&spend.txid()));
    }

    #[test]
    fn orphaned_block_connects_once_parent_arrives() {
        let node = Node::genesis_only(test_config());
        let addr = Address("payout".to_string());
        let first = mined_child(&node, &addr);
        let first_id = first.id();

        let mut second_template = node.create_block_template(&addr, first.timestamp + 1).unwrap();
        second_template.prev_block_hash = PrevBlockHash::Hash(first_id);
        let interrupt = AtomicBool::new(false);
        assert!(mine(&mut second_template, &interrupt));

        assert_eq!(node.connect_block(second_template.clone()), NetConnectOutcome::Orphaned);
        assert_eq!(node.connect_block(first), NetConnectOutcome::Connected);
        assert_eq!(node.chain_tip().unwrap(), (2, second_template.id()));
    }

    #[test]
    fn peer_hostnames_round_trip() {
        let node = Node::genesis_only(test_config());
        node.add_peer_hostname("a:9999".to_string());
        node.add_peer_hostname("a:9999".to_string());
        assert_eq!(node.known_peer_hostnames(), vec!["a:9999".to_string()]);
        node.evict_peer_hostname("a:9999");
        assert!(node.known_peer_hostnames().is_empty());
    }
}
