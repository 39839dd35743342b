//! The mempool: pending transactions keyed by id, plus orphan transactions
//! whose dependencies haven't arrived yet.
//!
//! No fee market: transactions leave in the order they arrived (insertion
//! order), not by fee rate. This is a deliberate simplification — see the
//! purpose section's non-goals — not an oversight.

use std::collections::HashMap;

use crate::types::{Hash256, OutPoint, Transaction, UnspentTxOut};

/// Pending, already-validated transactions awaiting inclusion in a block.
#[derive(Debug, Clone, Default)]
pub struct Mempool {
    order: Vec<Hash256>,
    by_txid: HashMap<Hash256, Transaction>,
    /// Transactions that failed validation only because a referenced UTXO
    /// wasn't resolvable yet. Retried once a new block or mempool entry
    /// might supply the missing dependency.
    orphans: HashMap<Hash256, Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, txid: &Hash256) -> bool {
        self.by_txid.contains_key(txid)
    }

    pub fn get(&self, txid: &Hash256) -> Option<&Transaction> {
        self.by_txid.get(txid)
    }

    /// Insert an already-validated transaction, preserving arrival order.
    /// A transaction already present is left untouched.
    pub fn insert(&mut self, txid: Hash256, tx: Transaction) {
        if self.by_txid.insert(txid, tx).is_none() {
            self.order.push(txid);
        }
    }

    /// Remove a transaction (e.g. because it was just included in a connected block).
    pub fn remove(&mut self, txid: &Hash256) -> Option<Transaction> {
        let removed = self.by_txid.remove(txid);
        if removed.is_some() {
            self.order.retain(|id| id != txid);
        }
        removed
    }

    /// Iterate transactions in insertion order — the order `select_from_mempool`
    /// walks when assembling a block template.
    pub fn iter_in_order(&self) -> impl Iterator<Item = (&Hash256, &Transaction)> {
        self.order.iter().map(|id| (id, &self.by_txid[id]))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn add_orphan(&mut self, txid: Hash256, tx: Transaction) {
        self.orphans.insert(txid, tx);
    }

    pub fn take_orphans(&mut self) -> Vec<Transaction> {
        self.orphans.drain().map(|(_, tx)| tx).collect()
    }

    pub fn orphan_count(&self) -> usize {
        self.orphans.len()
    }

    /// Resolve an [`OutPoint`] against the mempool's own transactions: find a
    /// pending transaction that creates the referenced output.
    ///
    /// Uses `outpoint.txout_idx` to index into the producing transaction's
    /// outputs (not some other field — an earlier version of this lookup
    /// destructured the wrong field name and always missed).
    pub fn find_utxo(&self, outpoint: &OutPoint) -> Option<UnspentTxOut> {
        let tx = self.by_txid.get(&outpoint.txid)?;
        let txout = tx.txouts.get(outpoint.txout_idx as usize)?;
        Some(UnspentTxOut {
            value: txout.value,
            to_address: txout.to_address.clone(),
            txid: outpoint.txid,
            txout_idx: outpoint.txout_idx,
            is_coinbase: tx.is_coinbase(),
            height: 0,
        })
    }
}
