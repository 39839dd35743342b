//! # tinychain-consensus — block production, validation, and proof-of-work.
//!
//! Wires [`tinychain_core::validation`], [`tinychain_core::difficulty`], and
//! [`tinychain_core::reward`] together with a [`tinychain_core::traits::ChainState`]
//! into the [`mining::MiningEngine`], which implements
//! [`tinychain_core::traits::BlockProducer`]: block template assembly, mempool
//! selection, nonce search, and full block validation against chain state.

pub mod mining;

pub use mining::{mine, MiningEngine};
