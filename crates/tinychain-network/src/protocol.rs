//! Wire message types for the tinychain P2P protocol.
//!
//! Every message is a canonical entity (§4.A codec): `_type`-tagged,
//! key-sorted JSON, framed on the wire as `u32be length || payload`. There is
//! no separate binary encoding and no gossip overlay — one TCP connection
//! carries exactly one request and, where the handler table calls for one,
//! exactly one response.

use serde::{Deserialize, Serialize};

use tinychain_core::codec::{self, Canonical};
use tinychain_core::types::{Block, Hash256, OutPoint, Transaction, UnspentTxOut};

/// Request a chunk of the active chain starting after `from_blockid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBlocksMsg {
    pub from_blockid: Hash256,
}

impl Canonical for GetBlocksMsg {
    const TYPE_TAG: &'static str = "GetBlocksMsg";
}

/// A batch of blocks, sent in response to [`GetBlocksMsg`] or pushed
/// unsolicited when a peer wants to advertise new blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvMsg {
    pub blocks: Vec<Block>,
}

impl Canonical for InvMsg {
    const TYPE_TAG: &'static str = "InvMsg";
}

/// Request the full UTXO set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetUtxosMsg;

impl Canonical for GetUtxosMsg {
    const TYPE_TAG: &'static str = "GetUTXOsMsg";
}

/// The full UTXO set, sent in response to [`GetUtxosMsg`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtxosMsg {
    pub utxos: Vec<(OutPoint, UnspentTxOut)>,
}

impl Canonical for UtxosMsg {
    const TYPE_TAG: &'static str = "UTXOsMsg";
}

/// Request the mempool's txids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetMempoolMsg;

impl Canonical for GetMempoolMsg {
    const TYPE_TAG: &'static str = "GetMempoolMsg";
}

/// The mempool's txids, sent in response to [`GetMempoolMsg`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MempoolMsg {
    pub txids: Vec<Hash256>,
}

impl Canonical for MempoolMsg {
    const TYPE_TAG: &'static str = "MempoolMsg";
}

/// Request the full active chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetActiveChainMsg;

impl Canonical for GetActiveChainMsg {
    const TYPE_TAG: &'static str = "GetActiveChainMsg";
}

/// The full active chain, sent in response to [`GetActiveChainMsg`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveChainMsg {
    pub blocks: Vec<Block>,
}

impl Canonical for ActiveChainMsg {
    const TYPE_TAG: &'static str = "ActiveChainMsg";
}

/// Ask the receiving node to remember a new peer hostname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddPeerMsg {
    pub peer_hostname: String,
}

impl Canonical for AddPeerMsg {
    const TYPE_TAG: &'static str = "AddPeerMsg";
}

/// The full set of messages that can cross the wire, dispatched by `_type`.
///
/// Bare [`Transaction`] and [`Block`] are first-class members of this enum
/// rather than wrapped structs, matching the handler table in §4.I.
#[derive(Debug, Clone)]
pub enum NetworkMessage {
    GetBlocks(GetBlocksMsg),
    Inv(InvMsg),
    GetUtxos(GetUtxosMsg),
    Utxos(UtxosMsg),
    GetMempool(GetMempoolMsg),
    Mempool(MempoolMsg),
    GetActiveChain(GetActiveChainMsg),
    ActiveChain(ActiveChainMsg),
    AddPeer(AddPeerMsg),
    Transaction(Transaction),
    Block(Block),
}

impl NetworkMessage {
    /// Canonical-encode this message, tagged by its own variant's `_type`.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            NetworkMessage::GetBlocks(m) => codec::to_canonical_bytes(m),
            NetworkMessage::Inv(m) => codec::to_canonical_bytes(m),
            NetworkMessage::GetUtxos(m) => codec::to_canonical_bytes(m),
            NetworkMessage::Utxos(m) => codec::to_canonical_bytes(m),
            NetworkMessage::GetMempool(m) => codec::to_canonical_bytes(m),
            NetworkMessage::Mempool(m) => codec::to_canonical_bytes(m),
            NetworkMessage::GetActiveChain(m) => codec::to_canonical_bytes(m),
            NetworkMessage::ActiveChain(m) => codec::to_canonical_bytes(m),
            NetworkMessage::AddPeer(m) => codec::to_canonical_bytes(m),
            NetworkMessage::Transaction(m) => codec::to_canonical_bytes(m),
            NetworkMessage::Block(m) => codec::to_canonical_bytes(m),
        }
    }

    /// Decode a message by reading its `_type` tag and dispatching to the
    /// matching variant. Returns `None` for malformed JSON or an unknown tag.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes).ok()?;
        let tag = codec::type_tag_of(&value)?;
        match tag {
            "GetBlocksMsg" => serde_json::from_value(value).ok().map(NetworkMessage::GetBlocks),
            "InvMsg" => serde_json::from_value(value).ok().map(NetworkMessage::Inv),
            "GetUTXOsMsg" => serde_json::from_value(value).ok().map(NetworkMessage::GetUtxos),
            "UTXOsMsg" => serde_json::from_value(value).ok().map(NetworkMessage::Utxos),
            "GetMempoolMsg" => serde_json::from_value(value).ok().map(NetworkMessage::GetMempool),
            "MempoolMsg" => serde_json::from_value(value).ok().map(NetworkMessage::Mempool),
            "GetActiveChainMsg" => serde_json::from_value(value).ok().map(NetworkMessage::GetActiveChain),
            "ActiveChainMsg" => serde_json::from_value(value).ok().map(NetworkMessage::ActiveChain),
            "AddPeerMsg" => serde_json::from_value(value).ok().map(NetworkMessage::AddPeer),
            "Transaction" => serde_json::from_value(value).ok().map(NetworkMessage::Transaction),
            "Block" => serde_json::from_value(value).ok().map(NetworkMessage::Block),
            _ => None,
        }
    }

    /// Frame this message for the wire: `u32be length || encode()`.
    pub fn frame(&self) -> Vec<u8> {
        codec::frame(&self.encode())
    }
}
