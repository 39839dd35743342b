//! Raw-TCP transport: connection handling, message dispatch, send-to-peer
//! retry/eviction, and Initial Block Download (§4.I).
//!
//! There is no libp2p here: every message is one TCP connection, framed as
//! `u32be length || payload` and decoded through [`NetworkMessage`]. The
//! listener dispatches each inbound connection's single message per the
//! handler table; outbound sends (`send_to_peer`) own the retry/timeout/
//! eviction policy, and [`run_ibd`] drives the startup sync ping-pong.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use tinychain_core::constants::{GET_BLOCKS_CHUNK_SIZE, PEER_MAX_ATTEMPTS, PEER_TIMEOUT_SECS};
use tinychain_core::error::NetworkError;
use tinychain_core::types::{Block, Hash256, OutPoint, Transaction, UnspentTxOut};

use crate::protocol::{
    ActiveChainMsg, AddPeerMsg, GetActiveChainMsg, GetBlocksMsg, GetMempoolMsg, GetUtxosMsg,
    InvMsg, MempoolMsg, NetworkMessage, UtxosMsg,
};

/// Outcome of offering a received block to the chain engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// The block extended (or reorganized onto) the active chain.
    Connected,
    /// The block was already known: duplicate, already-active, or already a
    /// known side branch.
    AlreadyKnown,
    /// The block's parent is not yet known; parked for retry once it
    /// arrives.
    Orphaned,
    /// The block failed validation and was discarded.
    Rejected,
}

/// The slice of node state the network layer needs to serve peers and apply
/// what it receives from them. Implemented by `tinychain-node`'s `Node`,
/// whose methods take the single chain-wide lock internally.
pub trait NodeHandle: Send + Sync {
    /// Blocks starting after `from_blockid` in the active chain, up to
    /// [`GET_BLOCKS_CHUNK_SIZE`] of them. Starts at height 1 if `from_blockid`
    /// is not found in the active chain.
    fn blocks_after(&self, from_blockid: Hash256) -> Vec<Block>;

    /// The active chain tip's block id.
    fn chain_tip_id(&self) -> Hash256;

    /// Offer a block received from a peer to the chain engine.
    fn offer_block(&self, block: Block) -> ConnectOutcome;

    /// Offer a transaction received from a peer to the mempool.
    fn offer_transaction(&self, tx: Transaction);

    /// A snapshot of the full UTXO set.
    fn utxo_snapshot(&self) -> Vec<(OutPoint, UnspentTxOut)>;

    /// The mempool's txids, in insertion order.
    fn mempool_txids(&self) -> Vec<Hash256>;

    /// A snapshot of the full active chain.
    fn active_chain_snapshot(&self) -> Vec<Block>;

    /// Record a newly learned peer hostname.
    fn add_peer_hostname(&self, hostname: String);

    /// The currently known peer hostnames.
    fn known_peer_hostnames(&self) -> Vec<String>;

    /// Drop a peer hostname, typically after exhausting send attempts.
    fn evict_peer_hostname(&self, hostname: &str);
}

/// Handle one already-decoded message against `node`, returning the response
/// to write back (if the handler table calls for one).
fn dispatch(node: &dyn NodeHandle, msg: NetworkMessage) -> Option<NetworkMessage> {
    match msg {
        NetworkMessage::GetBlocks(GetBlocksMsg { from_blockid }) => {
            let blocks = node.blocks_after(from_blockid);
            Some(NetworkMessage::Inv(InvMsg { blocks }))
        }
        NetworkMessage::Inv(InvMsg { blocks }) => {
            let mut connected_any = false;
            for block in blocks {
                if node.offer_block(block) == ConnectOutcome::Connected {
                    connected_any = true;
                }
            }
            connected_any
                .then(|| NetworkMessage::GetBlocks(GetBlocksMsg { from_blockid: node.chain_tip_id() }))
        }
        NetworkMessage::GetUtxos(GetUtxosMsg) => {
            Some(NetworkMessage::Utxos(UtxosMsg { utxos: node.utxo_snapshot() }))
        }
        NetworkMessage::GetMempool(GetMempoolMsg) => {
            Some(NetworkMessage::Mempool(MempoolMsg { txids: node.mempool_txids() }))
        }
        NetworkMessage::GetActiveChain(GetActiveChainMsg) => {
            Some(NetworkMessage::ActiveChain(ActiveChainMsg {
                blocks: node.active_chain_snapshot(),
            }))
        }
        NetworkMessage::AddPeer(AddPeerMsg { peer_hostname }) => {
            node.add_peer_hostname(peer_hostname);
            None
        }
        NetworkMessage::Transaction(tx) => {
            node.offer_transaction(tx);
            None
        }
        NetworkMessage::Block(block) => {
            node.offer_block(block);
            None
        }
        // Only ever sent as responses, never as the first message on a
        // connection we accept.
        NetworkMessage::Utxos(_) | NetworkMessage::Mempool(_) | NetworkMessage::ActiveChain(_) => {
            None
        }
    }
}

/// Read exactly one length-prefixed frame from `stream`.
async fn read_frame(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Write one length-prefixed frame to `stream` and flush it.
async fn write_frame(stream: &mut TcpStream, payload: &[u8]) -> std::io::Result<()> {
    stream.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    stream.write_all(payload).await?;
    stream.flush().await
}

/// Serve one accepted connection: read its single message, dispatch it, and
/// write back a response frame if the handler table produced one.
async fn handle_connection(mut stream: TcpStream, node: Arc<dyn NodeHandle>) {
    let payload = match read_frame(&mut stream).await {
        Ok(p) => p,
        Err(e) => {
            debug!(error = %e, "connection closed before a full frame arrived");
            return;
        }
    };

    let Some(msg) = NetworkMessage::decode(&payload) else {
        debug!("failed to decode inbound message");
        return;
    };

    if let Some(response) = dispatch(node.as_ref(), msg) {
        if let Err(e) = write_frame(&mut stream, &response.encode()).await {
            debug!(error = %e, "failed to write response frame");
        }
    }
}

/// Accept connections on `listener` forever, spawning a task per connection.
///
/// Each connection is exactly one request, matching the protocol's
/// one-message-per-connection design; there is no persistent per-peer
/// session to maintain.
pub async fn run_listener(listener: TcpListener, node: Arc<dyn NodeHandle>) {
    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "accept error");
                continue;
            }
        };
        debug!(%peer_addr, "accepted connection");
        let node = Arc::clone(&node);
        tokio::spawn(handle_connection(stream, node));
    }
}

/// Whether `msg` expects a response on the same connection.
fn expects_response(msg: &NetworkMessage) -> bool {
    matches!(
        msg,
        NetworkMessage::GetBlocks(_)
            | NetworkMessage::GetUtxos(_)
            | NetworkMessage::GetMempool(_)
            | NetworkMessage::GetActiveChain(_)
    )
}

/// Connect to `addr`, send `msg`, and (if the message expects one) read back
/// the response. A single attempt, bounded by [`PEER_TIMEOUT_SECS`].
async fn send_once(addr: &str, msg: &NetworkMessage) -> Result<Option<NetworkMessage>, NetworkError> {
    let bound = Duration::from_secs(PEER_TIMEOUT_SECS);

    let mut stream = timeout(bound, TcpStream::connect(addr))
        .await
        .map_err(|_| NetworkError::TimedOut { attempts: 1 })?
        .map_err(|e| NetworkError::Io(e.to_string()))?;

    timeout(bound, write_frame(&mut stream, &msg.encode()))
        .await
        .map_err(|_| NetworkError::TimedOut { attempts: 1 })?
        .map_err(|e| NetworkError::Io(e.to_string()))?;

    if !expects_response(msg) {
        return Ok(None);
    }

    let payload = timeout(bound, read_frame(&mut stream))
        .await
        .map_err(|_| NetworkError::TimedOut { attempts: 1 })?
        .map_err(|e| NetworkError::Io(e.to_string()))?;

    Ok(NetworkMessage::decode(&payload))
}

/// Send `msg` to `to` (or a uniformly random known peer, if `None`), retrying
/// up to [`PEER_MAX_ATTEMPTS`] times. Evicts the peer from `node`'s peer set
/// once every attempt has failed.
pub async fn send_to_peer(
    node: &dyn NodeHandle,
    to: Option<&str>,
    msg: &NetworkMessage,
) -> Result<Option<NetworkMessage>, NetworkError> {
    let peer = match to {
        Some(hostname) => hostname.to_string(),
        None => {
            let known = node.known_peer_hostnames();
            known
                .choose(&mut rand::thread_rng())
                .cloned()
                .ok_or(NetworkError::NoPeers)?
        }
    };

    for attempt in 1..=PEER_MAX_ATTEMPTS {
        match send_once(&peer, msg).await {
            Ok(response) => return Ok(response),
            Err(e) => {
                debug!(%peer, attempt, error = %e, "send attempt failed");
            }
        }
    }

    warn!(%peer, attempts = PEER_MAX_ATTEMPTS, "evicting peer after exhausting send attempts");
    node.evict_peer_hostname(&peer);
    Err(NetworkError::TimedOut { attempts: PEER_MAX_ATTEMPTS })
}

/// Drive Initial Block Download: repeatedly request blocks past our active
/// tip and connect whatever comes back, until a round connects nothing new.
///
/// Does nothing if no peers are known yet.
pub async fn run_ibd(node: &dyn NodeHandle) {
    if node.known_peer_hostnames().is_empty() {
        debug!("no peers known, skipping IBD");
        return;
    }

    info!("starting initial block download");
    loop {
        let request = NetworkMessage::GetBlocks(GetBlocksMsg { from_blockid: node.chain_tip_id() });
        let response = match send_to_peer(node, None, &request).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "IBD request failed");
                break;
            }
        };

        let Some(NetworkMessage::Inv(InvMsg { blocks })) = response else {
            debug!("IBD response was not an Inv, stopping");
            break;
        };

        if blocks.is_empty() {
            info!("IBD complete: peer has nothing new");
            break;
        }

        let mut connected_any = false;
        for block in blocks {
            if node.offer_block(block) == ConnectOutcome::Connected {
                connected_any = true;
            }
        }

        if !connected_any {
            info!("IBD complete: no unknown blocks in last batch");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use tinychain_core::genesis::genesis_block;

    /// An in-memory stand-in for `tinychain-node`'s `Node`, just enough to
    /// exercise dispatch and send-to-peer logic in isolation.
    struct MockNode {
        chain: Mutex<Vec<Block>>,
        utxos: Mutex<HashMap<OutPoint, UnspentTxOut>>,
        mempool: Mutex<Vec<Hash256>>,
        peers: Mutex<Vec<String>>,
        received_txns: Mutex<Vec<Transaction>>,
    }

    impl MockNode {
        fn new() -> Self {
            Self {
                chain: Mutex::new(vec![genesis_block()]),
                utxos: Mutex::new(HashMap::new()),
                mempool: Mutex::new(Vec::new()),
                peers: Mutex::new(Vec::new()),
                received_txns: Mutex::new(Vec::new()),
            }
        }
    }

    impl NodeHandle for MockNode {
        fn blocks_after(&self, from_blockid: Hash256) -> Vec<Block> {
            let chain = self.chain.lock();
            let start = chain
                .iter()
                .position(|b| b.id() == from_blockid)
                .map(|i| i + 1)
                .unwrap_or(1);
            chain
                .iter()
                .skip(start)
                .take(GET_BLOCKS_CHUNK_SIZE as usize)
                .cloned()
                .collect()
        }

        fn chain_tip_id(&self) -> Hash256 {
            self.chain.lock().last().expect("chain always has genesis").id()
        }

        fn offer_block(&self, block: Block) -> ConnectOutcome {
            let mut chain = self.chain.lock();
            if chain.iter().any(|b| b.id() == block.id()) {
                ConnectOutcome::AlreadyKnown
            } else {
                chain.push(block);
                ConnectOutcome::Connected
            }
        }

        fn offer_transaction(&self, tx: Transaction) {
            self.received_txns.lock().push(tx);
        }

        fn utxo_snapshot(&self) -> Vec<(OutPoint, UnspentTxOut)> {
            self.utxos.lock().iter().map(|(k, v)| (*k, v.clone())).collect()
        }

        fn mempool_txids(&self) -> Vec<Hash256> {
            self.mempool.lock().clone()
        }

        fn active_chain_snapshot(&self) -> Vec<Block> {
            self.chain.lock().clone()
        }

        fn add_peer_hostname(&self, hostname: String) {
            self.peers.lock().push(hostname);
        }

        fn known_peer_hostnames(&self) -> Vec<String> {
            self.peers.lock().clone()
        }

        fn evict_peer_hostname(&self, hostname: &str) {
            self.peers.lock().retain(|h| h != hostname);
        }
    }

    #[test]
    fn dispatch_get_blocks_from_genesis_returns_empty_inv() {
        let node = MockNode::new();
        let msg = NetworkMessage::GetBlocks(GetBlocksMsg { from_blockid: genesis_block().id() });
        match dispatch(&node, msg) {
            Some(NetworkMessage::Inv(InvMsg { blocks })) => assert!(blocks.is_empty()),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn dispatch_get_blocks_unknown_from_starts_at_height_one() {
        let node = MockNode::new();
        let msg = NetworkMessage::GetBlocks(GetBlocksMsg { from_blockid: Hash256([0xAB; 32]) });
        match dispatch(&node, msg) {
            Some(NetworkMessage::Inv(InvMsg { blocks })) => assert!(blocks.is_empty()),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn dispatch_add_peer_records_hostname() {
        let node = MockNode::new();
        let msg = NetworkMessage::AddPeer(AddPeerMsg { peer_hostname: "a:9999".into() });
        assert!(dispatch(&node, msg).is_none());
        assert_eq!(node.known_peer_hostnames(), vec!["a:9999".to_string()]);
    }

    #[test]
    fn dispatch_get_utxos_returns_snapshot() {
        let node = MockNode::new();
        let op = OutPoint { txid: Hash256::ZERO, txout_idx: 0 };
        let utxo = UnspentTxOut {
            value: 1,
            to_address: tinychain_core::types::Address("addr".into()),
            txid: Hash256::ZERO,
            txout_idx: 0,
            is_coinbase: false,
            height: 0,
        };
        node.utxos.lock().insert(op, utxo);
        match dispatch(&node, NetworkMessage::GetUtxos(GetUtxosMsg)) {
            Some(NetworkMessage::Utxos(UtxosMsg { utxos })) => assert_eq!(utxos.len(), 1),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn dispatch_bare_transaction_has_no_response() {
        let node = MockNode::new();
        let tx = Transaction { txins: vec![], txouts: vec![], locktime: None };
        assert!(dispatch(&node, NetworkMessage::Transaction(tx.clone())).is_none());
        assert_eq!(node.received_txns.lock().len(), 1);
    }

    #[test]
    fn dispatch_inv_with_no_connected_blocks_has_no_response() {
        let node = MockNode::new();
        let msg = NetworkMessage::Inv(InvMsg { blocks: vec![genesis_block()] });
        assert!(dispatch(&node, msg).is_none());
    }

    #[tokio::test]
    async fn send_to_peer_fails_with_no_peers() {
        let node = MockNode::new();
        let msg = NetworkMessage::GetMempool(GetMempoolMsg);
        let result = send_to_peer(&node, None, &msg).await;
        assert!(matches!(result, Err(NetworkError::NoPeers)));
    }

    #[tokio::test]
    async fn send_to_peer_evicts_unreachable_peer() {
        let node = MockNode::new();
        node.add_peer_hostname("127.0.0.1:1".into());
        let msg = NetworkMessage::GetMempool(GetMempoolMsg);
        let result = send_to_peer(&node, None, &msg).await;
        assert!(result.is_err());
        assert!(node.known_peer_hostnames().is_empty());
    }

    #[tokio::test]
    async fn listener_round_trip_get_mempool() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let node: Arc<dyn NodeHandle> = Arc::new(MockNode::new());
        node.add_peer_hostname(addr.to_string());
        let mempool_node = Arc::clone(&node);
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            handle_connection(stream, mempool_node).await;
        });

        let response = send_once(&addr.to_string(), &NetworkMessage::GetMempool(GetMempoolMsg))
            .await
            .unwrap();
        match response {
            Some(NetworkMessage::Mempool(MempoolMsg { txids })) => assert!(txids.is_empty()),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn ibd_noop_with_no_peers() {
        let node = MockNode::new();
        run_ibd(&node).await;
        assert_eq!(node.chain_tip_id(), genesis_block().id());
    }
}
