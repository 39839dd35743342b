//! Merkle root over a block's transaction ids.
//!
//! No domain separation: each leaf is `sha256d(txid)`; internal nodes hash the
//! **hex-string concatenation** of their children's values before
//! double-hashing again, matching the wire format's hash-as-hex-string
//! convention rather than hashing raw bytes. Odd-length layers are padded by
//! duplicating the last element, including a single-leaf layer, which is
//! paired with itself exactly once rather than returned as-is. An empty
//! transaction list produces the zero hash.

use crate::types::{Hash256, MerkleNode, Transaction, sha256d};

/// Build the merkle tree over `txns` (in their given order) and return its root.
pub fn merkle_root_of_txns(txns: &[Transaction]) -> MerkleNode {
    let leaves: Vec<Hash256> = txns.iter().map(|tx| tx.txid()).collect();
    merkle_root(&leaves)
}

/// Build the merkle tree over raw leaf hashes and return its root node.
pub fn merkle_root(leaves: &[Hash256]) -> MerkleNode {
    if leaves.is_empty() {
        return MerkleNode { val: Hash256::ZERO, children: vec![] };
    }

    let mut level: Vec<MerkleNode> = leaves
        .iter()
        .map(|leaf| MerkleNode { val: sha256d(leaf.as_bytes()), children: vec![] })
        .collect();

    // A single leaf is still an odd-length layer: pair it with itself once
    // rather than returning it untouched.
    if level.len() == 1 {
        level.push(level[0].clone());
    }

    while level.len() > 1 {
        if level.len() % 2 == 1 {
            level.push(level.last().unwrap().clone());
        }
        let mut next = Vec::with_capacity(level.len() / 2);
        for pair in level.chunks(2) {
            let left = &pair[0];
            let right = &pair[1];
            let concatenated = format!("{}{}", left.val.to_hex(), right.val.to_hex());
            let parent = sha256d(concatenated.as_bytes());
            next.push(MerkleNode { val: parent, children: vec![left.clone(), right.clone()] });
        }
        level = next;
    }

    level.into_iter().next().unwrap()
}
