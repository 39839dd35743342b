//! Trait interfaces between crates.
//!
//! - [`ChainState`] — read-only blockchain state (`tinychain-node` implements)
//! - [`BlockProducer`] — block template assembly and validation (`tinychain-consensus` implements)
//! - [`NetworkService`] — P2P broadcast/request operations (`tinychain-network` implements)

use crate::error::{BlockError, NetworkError, NodeError, TransactionError};
use crate::types::{Block, Hash256, OutPoint, Transaction, UnspentTxOut};

/// Read-only view of the blockchain state, used by validation and mining.
pub trait ChainState: Send + Sync {
    /// Look up a UTXO by outpoint. Returns `None` if spent or unknown.
    fn get_utxo(&self, outpoint: &OutPoint) -> Result<Option<UnspentTxOut>, NodeError>;

    /// Check whether a UTXO exists and is unspent.
    fn contains_utxo(&self, outpoint: &OutPoint) -> Result<bool, NodeError> {
        Ok(self.get_utxo(outpoint)?.is_some())
    }

    /// Current active-chain tip as `(height, block_id)`.
    fn chain_tip(&self) -> Result<(u64, Hash256), NodeError>;

    /// Get a full block by its id. Returns `None` if not found.
    fn get_block(&self, id: &Hash256) -> Result<Option<Block>, NodeError>;

    /// Get the block id at a given active-chain height. Returns `None` if
    /// `height` exceeds the tip.
    fn get_block_id_at_height(&self, height: u64) -> Result<Option<Hash256>, NodeError>;

    /// Validate a transaction against the current UTXO set and consensus rules.
    fn validate_transaction(&self, tx: &Transaction) -> Result<(), TransactionError>;
}

/// Block template assembly, validation, and reward computation.
pub trait BlockProducer: Send + Sync {
    /// Create a block template paying the subsidy and mempool fees to `pay_to`.
    fn create_block_template(&self, pay_to: &crate::types::Address, timestamp: u32) -> Result<Block, BlockError>;

    /// Validate a complete block: header PoW, merkle root, and every transaction.
    fn validate_block(&self, block: &Block) -> Result<(), BlockError>;

    /// The block subsidy (in belushis) for a given height.
    fn block_subsidy(&self, height: u64) -> u64;
}

/// P2P broadcast and request operations, abstracted over the transport.
pub trait NetworkService: Send + Sync {
    /// Broadcast a validated block to all connected peers.
    fn broadcast_block(&self, block: &Block) -> Result<(), NetworkError>;

    /// Broadcast a validated transaction to all connected peers.
    fn broadcast_transaction(&self, tx: &Transaction) -> Result<(), NetworkError>;

    /// Number of currently connected peers.
    fn peer_count(&self) -> usize;

    /// Whether the node has at least one connected peer.
    fn is_connected(&self) -> bool {
        self.peer_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, PrevBlockHash, TxIn, TxOut};
    use std::collections::HashMap;

    struct MockChainState {
        utxos: HashMap<OutPoint, UnspentTxOut>,
        tip_height: u64,
        tip_id: Hash256,
    }

    impl MockChainState {
        fn new() -> Self {
            Self { utxos: HashMap::new(), tip_height: 0, tip_id: Hash256::ZERO }
        }
    }

    impl ChainState for MockChainState {
        fn get_utxo(&self, outpoint: &OutPoint) -> Result<Option<UnspentTxOut>, NodeError> {
            Ok(self.utxos.get(outpoint).cloned())
        }

        fn chain_tip(&self) -> Result<(u64, Hash256), NodeError> {
            Ok((self.tip_height, self.tip_id))
        }

        fn get_block(&self, _id: &Hash256) -> Result<Option<Block>, NodeError> {
            Ok(None)
        }

        fn get_block_id_at_height(&self, _height: u64) -> Result<Option<Hash256>, NodeError> {
            Ok(None)
        }

        fn validate_transaction(&self, tx: &Transaction) -> Result<(), TransactionError> {
            if tx.txouts.is_empty() {
                return Err(TransactionError::EmptyOutputs);
            }
            Ok(())
        }
    }

    struct MockBlockProducer;

    impl BlockProducer for MockBlockProducer {
        fn create_block_template(&self, pay_to: &Address, timestamp: u32) -> Result<Block, BlockError> {
            let coinbase = Transaction {
                txins: vec![TxIn { to_spend: None, unlock_sig: vec![], unlock_pk: vec![], sequence: 0 }],
                txouts: vec![TxOut { value: self.block_subsidy(0), to_address: pay_to.clone() }],
                locktime: None,
            };
            Ok(Block {
                version: 0,
                prev_block_hash: PrevBlockHash::Genesis,
                merkle_hash: coinbase.txid(),
                timestamp,
                bits: 24,
                nonce: 0,
                txns: vec![coinbase],
            })
        }

        fn validate_block(&self, block: &Block) -> Result<(), BlockError> {
            if block.txns.is_empty() {
                return Err(BlockError::EmptyTransactions);
            }
            Ok(())
        }

        fn block_subsidy(&self, height: u64) -> u64 {
            crate::reward::block_subsidy(height)
        }
    }

    struct MockNetworkService {
        peers: usize,
    }

    impl NetworkService for MockNetworkService {
        fn broadcast_block(&self, _block: &Block) -> Result<(), NetworkError> {
            if self.peers == 0 {
                return Err(NetworkError::NoPeers);
            }
            Ok(())
        }

        fn broadcast_transaction(&self, _tx: &Transaction) -> Result<(), NetworkError> {
            if self.peers == 0 {
                return Err(NetworkError::NoPeers);
            }
            Ok(())
        }

        fn peer_count(&self) -> usize {
            self.peers
        }
    }

    fn _assert_chain_state_object_safe(cs: &dyn ChainState) {
        let _ = cs.chain_tip();
    }

    fn _assert_block_producer_object_safe(bp: &dyn BlockProducer) {
        let _ = bp.block_subsidy(0);
    }

    fn _assert_network_service_object_safe(ns: &dyn NetworkService) {
        let _ = ns.peer_count();
    }

    #[test]
    fn chain_state_get_utxo_missing() {
        let cs = MockChainState::new();
        let op = OutPoint { txid: Hash256::ZERO, txout_idx: 0 };
        assert_eq!(cs.get_utxo(&op).unwrap(), None);
    }

    #[test]
    fn chain_state_contains_utxo_default_false() {
        let cs = MockChainState::new();
        let op = OutPoint { txid: Hash256::ZERO, txout_idx: 0 };
        assert!(!cs.contains_utxo(&op).unwrap());
    }

    #[test]
    fn chain_state_validate_tx_rejects_empty_outputs() {
        let cs = MockChainState::new();
        let tx = Transaction { txins: vec![], txouts: vec![], locktime: None };
        assert_eq!(cs.validate_transaction(&tx).unwrap_err(), TransactionError::EmptyOutputs);
    }

    #[test]
    fn block_producer_template_has_coinbase() {
        let bp = MockBlockProducer;
        let addr = Address("addr".to_string());
        let block = bp.create_block_template(&addr, 1).unwrap();
        assert!(block.txns[0].is_coinbase());
    }

    #[test]
    fn block_producer_rejects_empty_block() {
        let bp = MockBlockProducer;
        let block = Block {
            version: 0,
            prev_block_hash: PrevBlockHash::Genesis,
            merkle_hash: Hash256::ZERO,
            timestamp: 0,
            bits: 24,
            nonce: 0,
            txns: vec![],
        };
        assert_eq!(bp.validate_block(&block).unwrap_err(), BlockError::EmptyTransactions);
    }

    #[test]
    fn network_is_connected_reflects_peer_count() {
        assert!(MockNetworkService { peers: 1 }.is_connected());
        assert!(!MockNetworkService { peers: 0 }.is_connected());
    }

    #[test]
    fn network_broadcast_fails_with_no_peers() {
        let ns = MockNetworkService { peers: 0 };
        let tx = Transaction { txins: vec![], txouts: vec![], locktime: None };
        assert!(ns.broadcast_transaction(&tx).is_err());
    }
}
