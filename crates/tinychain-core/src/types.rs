//! Core protocol types: outpoints, transactions, blocks, UTXOs.
//!
//! All monetary values are in belushis (1 coin = 10^8 belushis). All hashes are
//! 32-byte values that serialize as 64-character hex strings so that the
//! canonical codec (see [`crate::codec`]) can hash and sign over them.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::codec::{self, Canonical};

/// A 32-byte hash. Serializes as a 64-character lowercase hex string, per the
/// wire/disk convention that every hash is a plain hex string rather than a
/// tagged object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }

    /// Interpret the hash as a big-endian 256-bit unsigned integer, for the
    /// proof-of-work acceptance test `H < 2^(256 - bits)`.
    pub fn meets_bits(&self, bits: u32) -> bool {
        if bits >= 256 {
            return true;
        }
        let required_leading_zero_bits = bits;
        let full_zero_bytes = (required_leading_zero_bits / 8) as usize;
        let remaining_bits = required_leading_zero_bits % 8;
        for &b in self.0.iter().take(full_zero_bytes) {
            if b != 0 {
                return false;
            }
        }
        if remaining_bits == 0 {
            return true;
        }
        let byte = self.0[full_zero_bytes];
        let mask = 0xFFu8 << (8 - remaining_bits);
        byte & mask == 0
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

struct Hash256Visitor;

impl Visitor<'_> for Hash256Visitor {
    type Value = Hash256;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a 64-character hex string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Hash256::from_hex(v).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(Hash256Visitor)
    }
}

/// `sha256d(x) = SHA256(SHA256(x))`.
pub fn sha256d(bytes: &[u8]) -> Hash256 {
    let first = Sha256::digest(bytes);
    let second = Sha256::digest(first);
    Hash256(second.into())
}

/// A base58check-encoded address: `base58check(0x00 || RIPEMD160(SHA256(pubkey)))`.
/// See [`crate::address`] for derivation.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Address(s)
    }
}

/// The sentinel previous-block-hash used by the genesis block: the string
/// literal `"None"` rather than a hash. Every other block carries its parent's id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PrevBlockHash {
    Genesis,
    Hash(Hash256),
}

impl PrevBlockHash {
    pub fn as_hash(&self) -> Option<Hash256> {
        match self {
            PrevBlockHash::Genesis => None,
            PrevBlockHash::Hash(h) => Some(*h),
        }
    }
}

impl Serialize for PrevBlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PrevBlockHash::Genesis => serializer.serialize_str("None"),
            PrevBlockHash::Hash(h) => serializer.serialize_str(&h.to_hex()),
        }
    }
}

struct PrevBlockHashVisitor;

impl Visitor<'_> for PrevBlockHashVisitor {
    type Value = PrevBlockHash;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the literal string \"None\" or a 64-character hex string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        if v == "None" {
            Ok(PrevBlockHash::Genesis)
        } else {
            Hash256::from_hex(v)
                .map(PrevBlockHash::Hash)
                .map_err(de::Error::custom)
        }
    }
}

impl<'de> Deserialize<'de> for PrevBlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(PrevBlockHashVisitor)
    }
}

/// Bytes serialized as a lowercase hex string rather than a JSON array, used
/// for signatures and public keys so the canonical form stays compact and
/// human-inspectable.
pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Identifies one output of one transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Hash256,
    pub txout_idx: u32,
}

impl Canonical for OutPoint {
    const TYPE_TAG: &'static str = "OutPoint";
}

/// One output of a transaction: an amount locked to a single address.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct TxOut {
    pub value: u64,
    pub to_address: Address,
}

impl Canonical for TxOut {
    const TYPE_TAG: &'static str = "TxOut";
}

/// One input of a transaction, spending a previous output.
///
/// `to_spend = None` marks a coinbase input; in that case `unlock_sig` carries
/// the creating block's height as opaque bytes and `unlock_pk` is absent.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct TxIn {
    pub to_spend: Option<OutPoint>,
    #[serde(with = "hex_bytes", default, skip_serializing_if = "Vec::is_empty")]
    pub unlock_sig: Vec<u8>,
    #[serde(with = "hex_bytes", default, skip_serializing_if = "Vec::is_empty")]
    pub unlock_pk: Vec<u8>,
    pub sequence: u32,
}

impl Canonical for TxIn {
    const TYPE_TAG: &'static str = "TxIn";
}

/// An enriched [`TxOut`] record held in the UTXO set.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct UnspentTxOut {
    pub value: u64,
    pub to_address: Address,
    pub txid: Hash256,
    pub txout_idx: u32,
    pub is_coinbase: bool,
    pub height: u32,
}

impl Canonical for UnspentTxOut {
    const TYPE_TAG: &'static str = "UnspentTxOut";
}

impl UnspentTxOut {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint {
            txid: self.txid,
            txout_idx: self.txout_idx,
        }
    }
}

/// A transaction: a set of inputs spending prior outputs, and a set of new outputs.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub txins: Vec<TxIn>,
    pub txouts: Vec<TxOut>,
    pub locktime: Option<u32>,
}

impl Canonical for Transaction {
    const TYPE_TAG: &'static str = "Transaction";
}

impl Transaction {
    /// The double-SHA-256 of this transaction's canonical serialization.
    pub fn txid(&self) -> Hash256 {
        sha256d(&codec::to_canonical_bytes(self))
    }

    /// `is_coinbase ⇔ len(txins)=1 ∧ txins[0].to_spend = NONE`.
    pub fn is_coinbase(&self) -> bool {
        self.txins.len() == 1 && self.txins[0].to_spend.is_none()
    }

    pub fn total_output_value(&self) -> Option<u64> {
        self.txouts
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
    }
}

/// A block: a header plus the list of transactions it commits to via
/// `merkle_hash`. Built through [`BlockBuilder`] so that the merkle root and
/// transaction list are always consistent once a `Block` exists.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Block {
    pub version: u32,
    pub prev_block_hash: PrevBlockHash,
    pub merkle_hash: Hash256,
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u64,
    pub txns: Vec<Transaction>,
}

impl Canonical for Block {
    const TYPE_TAG: &'static str = "Block";
}

/// Just the header fields of a [`Block`], used to compute the block id without
/// re-serializing the (potentially large) transaction list redundantly.
#[derive(Serialize)]
struct BlockHeaderView<'a> {
    version: u32,
    prev_block_hash: &'a PrevBlockHash,
    merkle_hash: &'a Hash256,
    timestamp: u32,
    bits: u32,
    nonce: u64,
}

impl Canonical for BlockHeaderView<'_> {
    const TYPE_TAG: &'static str = "Block";
}

impl Block {
    /// The double-SHA-256 of the canonical serialization of
    /// `version || prev_block_hash || merkle_hash || timestamp || bits || nonce`.
    pub fn id(&self) -> Hash256 {
        let header = BlockHeaderView {
            version: self.version,
            prev_block_hash: &self.prev_block_hash,
            merkle_hash: &self.merkle_hash,
            timestamp: self.timestamp,
            bits: self.bits,
            nonce: self.nonce,
        };
        sha256d(&codec::to_canonical_bytes(&header))
    }

    pub fn coinbase(&self) -> Option<&Transaction> {
        self.txns.first()
    }

    pub fn is_genesis(&self) -> bool {
        matches!(self.prev_block_hash, PrevBlockHash::Genesis)
    }
}

/// A node of the merkle tree built over a block's transaction ids.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct MerkleNode {
    pub val: Hash256,
    pub children: Vec<MerkleNode>,
}

impl Canonical for MerkleNode {
    const TYPE_TAG: &'static str = "MerkleNode";
}
