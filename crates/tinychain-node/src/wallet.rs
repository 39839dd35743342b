//! Wallet file: a single hex-encoded secp256k1 private key (§6).
//!
//! No mnemonic, no encryption at rest, no multiple keys: the node mines to
//! and spends from exactly one keypair, persisted as 64 hex characters plus
//! a trailing newline.

use std::io::Write;
use std::path::Path;

use tinychain_core::crypto::KeyPair;
use tinychain_core::error::NodeError;

/// Load the keypair from `path`, generating and persisting a new one if the
/// file does not exist.
pub fn load_or_generate(path: &Path) -> Result<KeyPair, NodeError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse(&contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let keypair = KeyPair::generate();
            persist(path, &keypair)?;
            Ok(keypair)
        }
        Err(e) => Err(NodeError::Storage(format!("reading wallet file: {e}"))),
    }
}

fn parse(contents: &str) -> Result<KeyPair, NodeError> {
    let bytes = hex::decode(contents.trim())
        .map_err(|e| NodeError::Storage(format!("wallet file is not valid hex: {e}")))?;
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| NodeError::Storage("wallet file secret key is not 32 bytes".to_string()))?;
    Ok(KeyPair::from_secret_bytes(&arr)?)
}

fn persist(path: &Path, keypair: &KeyPair) -> Result<(), NodeError> {
    let hex = hex::encode(keypair.secret_bytes());
    let mut file = std::fs::File::create(path)
        .map_err(|e| NodeError::Storage(format!("creating wallet file: {e}")))?;
    writeln!(file, "{hex}").map_err(|e| NodeError::Storage(format!("writing wallet file: {e}")))?;
    Ok(())
}
