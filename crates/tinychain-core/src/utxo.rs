//! The UTXO set: a mapping `OutPoint -> UnspentTxOut`.

use std::collections::HashMap;

use crate::types::{OutPoint, UnspentTxOut};

/// Keyed store of unspent outputs. All operations are O(1) average.
#[derive(Debug, Clone, Default)]
pub struct UtxoSet {
    entries: HashMap<OutPoint, UnspentTxOut>,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, utxo: UnspentTxOut) {
        self.entries.insert(utxo.outpoint(), utxo);
    }

    pub fn remove(&mut self, txid: &crate::types::Hash256, idx: u32) -> Option<UnspentTxOut> {
        self.entries.remove(&OutPoint { txid: *txid, txout_idx: idx })
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<&UnspentTxOut> {
        self.entries.get(outpoint)
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.entries.contains_key(outpoint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OutPoint, &UnspentTxOut)> {
        self.entries.iter()
    }
}
