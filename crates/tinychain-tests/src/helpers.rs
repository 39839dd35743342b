//! Shared fixtures for cross-crate integration tests.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tinychain_consensus::mining::mine;
use tinychain_core::crypto::KeyPair;
use tinychain_core::difficulty;
use tinychain_core::merkle;
use tinychain_core::reward;
use tinychain_core::types::{Address, Block, PrevBlockHash, Transaction, TxIn, TxOut};
use tinychain_node::node::Node;
use tinychain_node::NodeConfig;

/// A node config pointed at throwaway paths; tests never touch disk through it.
pub fn test_config() -> NodeConfig {
    NodeConfig::default()
}

pub fn fresh_node() -> Arc<Node> {
    Node::genesis_only(test_config())
}

pub fn generated_address() -> Address {
    KeyPair::generate().address()
}

/// Mine a block directly on top of `node`'s current active tip.
pub fn mine_on_tip(node: &Arc<Node>, pay_to: &Address) -> Block {
    let parent_timestamp = node.active_chain_snapshot().last().unwrap().timestamp;
    let mut block = node.create_block_template(pay_to, parent_timestamp + 1).unwrap();
    let interrupt = AtomicBool::new(false);
    assert!(mine(&mut block, &interrupt), "mining should find a nonce at the initial difficulty");
    block
}

/// Build and mine a block extending `parent` (which need not be the active
/// tip), at `parent_height`, with the correctly computed next-work bits.
pub fn mine_child_of(parent: &Block, parent_height: u64, height: u64, timestamp: u32, pay_to: &Address) -> Block {
    let bits = difficulty::get_next_work_required(parent.prev_block_hash, parent_height, parent.bits, |_| 0);
    build_and_mine(parent, bits, height, timestamp, pay_to)
}

/// Like [`mine_child_of`] but with an explicit (possibly wrong) `bits`, for
/// exercising the difficulty-mismatch rejection path.
pub fn mine_child_of_with_bits(parent: &Block, height: u64, timestamp: u32, pay_to: &Address, bits: u32) -> Block {
    build_and_mine(parent, bits, height, timestamp, pay_to)
}

fn build_and_mine(parent: &Block, bits: u32, height: u64, timestamp: u32, pay_to: &Address) -> Block {
    let coinbase = Transaction {
        txins: vec![TxIn {
            to_spend: None,
            unlock_sig: height.to_be_bytes().to_vec(),
            unlock_pk: Vec::new(),
            sequence: 0,
        }],
        txouts: vec![TxOut { value: reward::block_subsidy(height), to_address: pay_to.clone() }],
        locktime: None,
    };
    let txns = vec![coinbase];
    let merkle_hash = merkle::merkle_root_of_txns(&txns).val;
    let mut block = Block {
        version: 0,
        prev_block_hash: PrevBlockHash::Hash(parent.id()),
        merkle_hash,
        timestamp,
        bits,
        nonce: 0,
        txns,
    };
    let interrupt = AtomicBool::new(false);
    assert!(mine(&mut block, &interrupt), "mining should find a nonce at bits={bits}");
    block
}
