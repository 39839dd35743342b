//! # tinychain-node — full node composition: storage, wallet, chain engine.
//!
//! Composes the other crates into a running full node:
//! - [`storage`] — on-disk persistence for the active chain
//! - [`wallet`] — the node's single mining/spending keypair
//! - [`node::Node`] — the chain engine: active chain, side branches, UTXO set,
//!   mempool, and peer set
//! - [`config::NodeConfig`] — configuration, read once from the environment

pub mod config;
pub mod node;
pub mod storage;
pub mod wallet;

pub use config::NodeConfig;
pub use node::Node;
