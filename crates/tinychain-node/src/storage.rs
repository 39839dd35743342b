//! On-disk persistence for the active chain (§6).
//!
//! The chain blob uses exactly the wire framing: `u32be length ||
//! serialize(active_chain)`, where `active_chain` is canonically serialized
//! as a JSON array of [`Block`]. Corruption is never fatal: a node that
//! cannot parse its chain file logs the problem and restarts from genesis
//! rather than refusing to start.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use tinychain_core::codec;
use tinychain_core::genesis::genesis_block;
use tinychain_core::types::Block;

#[derive(Serialize, Deserialize)]
struct ChainBlob {
    blocks: Vec<Block>,
}

/// Persist `active_chain` to `path`, truncating any previous contents.
pub fn save_to_disk(path: &Path, active_chain: &[Block]) -> std::io::Result<()> {
    let blob = ChainBlob { blocks: active_chain.to_vec() };
    let payload = serde_json::to_vec(&blob).expect("chain blob always serializes");
    std::fs::write(path, codec::frame(&payload))
}

/// Load the active chain from `path`. Returns a single-genesis chain if the
/// file is missing, truncated, or fails to parse — persistence errors never
/// stop the node from starting, per the error-handling policy in §7.
pub fn load_from_disk(path: &Path) -> Vec<Block> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return vec![genesis_block()],
        Err(e) => {
            warn!(error = %e, "failed to read chain file, restarting from genesis");
            return vec![genesis_block()];
        }
    };

    let chain = codec::try_split_frame(&bytes)
        .and_then(|(payload, _)| serde_json::from_slice::<ChainBlob>(payload).ok())
        .map(|blob| blob.blocks);

    match chain {
        Some(blocks) if !blocks.is_empty() && blocks[0].is_genesis() => blocks,
        Some(_) => {
            warn!("chain file missing a genesis block, restarting from genesis");
            vec![genesis_block()]
        }
        None => {
            warn!("chain file is corrupt, restarting from genesis");
            vec![genesis_block()]
        }
    }
}
