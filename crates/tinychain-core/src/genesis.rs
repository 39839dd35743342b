//! The hard-coded genesis block.
//!
//! Built once and cached behind a [`std::sync::LazyLock`] so every caller
//! that asks for genesis gets the same value without re-parsing the literal
//! constants on every call.

use std::sync::LazyLock;

use crate::types::{Address, Block, Hash256, PrevBlockHash, Transaction, TxIn, TxOut};

const GENESIS_MERKLE_HASH: &str =
    "fec332d29938d404b2db93f46b70a45c66f637e40269fb6e6d91b214484fe3dd";
const GENESIS_TIMESTAMP: u32 = 1501821412;
const GENESIS_BITS: u32 = 24;
const GENESIS_NONCE: u64 = 9185807;
const GENESIS_REWARD: u64 = 5_000_000_000;
const GENESIS_PAYOUT_ADDRESS: &str = "143UVyz7ooiAv1pMqbwPPpnH4BV9ifJGFF";

fn build_genesis_coinbase() -> Transaction {
    Transaction {
        txins: vec![TxIn {
            to_spend: None,
            unlock_sig: Vec::new(),
            unlock_pk: Vec::new(),
            sequence: 0,
        }],
        txouts: vec![TxOut {
            value: GENESIS_REWARD,
            to_address: Address(GENESIS_PAYOUT_ADDRESS.to_string()),
        }],
        locktime: None,
    }
}

fn build_genesis() -> Block {
    Block {
        version: 0,
        prev_block_hash: PrevBlockHash::Genesis,
        merkle_hash: Hash256::from_hex(GENESIS_MERKLE_HASH)
            .expect("genesis merkle hash literal is well-formed hex"),
        timestamp: GENESIS_TIMESTAMP,
        bits: GENESIS_BITS,
        nonce: GENESIS_NONCE,
        txns: vec![build_genesis_coinbase()],
    }
}

static GENESIS: LazyLock<Block> = LazyLock::new(build_genesis);

/// The hard-coded genesis block, identical byte-for-byte across every node.
pub fn genesis_block() -> Block {
    GENESIS.clone()
}
