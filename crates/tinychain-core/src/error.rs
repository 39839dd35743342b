//! Error types for the tinychain protocol.
//!
//! Each subsystem gets its own `thiserror`-derived enum; [`NodeError`] aggregates
//! them with `#[from]` so any layer can bubble up with `?` while the node's main
//! loop still gets one type to match on for logging.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction has no outputs")]
    EmptyOutputs,
    #[error("non-coinbase transaction has no inputs")]
    EmptyInputs,
    #[error("duplicate input: {0}")]
    DuplicateInput(String),
    #[error("oversized: {size} > {max}")]
    OversizedTransaction { size: usize, max: usize },
    #[error("sum of outputs {total} exceeds max money {max}")]
    ExceedsMaxMoney { total: u64, max: u64 },
    #[error("not a well-formed coinbase: {0}")]
    InvalidCoinbase(String),
    #[error("immature coinbase: {height_needed} more blocks required")]
    ImmatureCoinbase { height_needed: u64 },
    #[error("address derived from unlock_pk does not match utxo owner")]
    AddressMismatch,
    #[error("ECDSA signature verification failed on input {index}")]
    InvalidSignature { index: usize },
    #[error("sum of inputs {have} is less than sum of outputs {need}")]
    InsufficientValue { have: u64, need: u64 },
    #[error("canonical serialization failed: {0}")]
    Serialization(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("block has no transactions")]
    EmptyTransactions,
    #[error("timestamp {timestamp} is more than {max_future}s ahead of now")]
    TimestampTooFarInFuture { timestamp: u32, max_future: u64 },
    #[error("timestamp {timestamp} is not after median-time-past {median}")]
    StaleTimestamp { timestamp: u32, median: u32 },
    #[error("proof of work not satisfied for bits {bits}")]
    ProofOfWorkNotMet { bits: u32 },
    #[error("first transaction is not a coinbase")]
    FirstTxNotCoinbase,
    #[error("merkle root mismatch: computed {computed}, header has {declared}")]
    MerkleRootMismatch { computed: String, declared: String },
    #[error("expected bits {expected}, block has {got}")]
    WrongDifficultyBits { expected: u32, got: u32 },
    #[error("transaction {index} invalid: {source}")]
    TransactionInvalid { index: usize, source: TransactionError },
    #[error("oversized: {size} > {max}")]
    OversizedBlock { size: usize, max: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid public key bytes")]
    InvalidPublicKey,
    #[error("invalid signature bytes")]
    InvalidSignature,
    #[error("signature verification failed")]
    VerificationFailed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid base58check encoding")]
    InvalidBase58,
    #[error("checksum mismatch")]
    BadChecksum,
    #[error("unexpected version byte: {0}")]
    WrongVersion(u8),
    #[error("decoded payload has wrong length: {0}")]
    WrongLength(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("peer I/O error: {0}")]
    Io(String),
    #[error("connect/send timed out after {attempts} attempts")]
    TimedOut { attempts: u32 },
    #[error("message exceeds max size: {size} > {max}")]
    MessageTooLarge { size: usize, max: usize },
    #[error("no peers available")]
    NoPeers,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MempoolError {
    #[error("transaction already in mempool: {0}")]
    AlreadyExists(String),
    #[error("conflicts with existing mempool entry on {0}")]
    Conflict(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainStateError {
    #[error("persisted chain is malformed: {0}")]
    MalformedChain(String),
    #[error("chain has no genesis block")]
    MissingGenesis,
    #[error("block not found: {0}")]
    BlockNotFound(String),
}

#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error(transparent)]
    Block(#[from] BlockError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Mempool(#[from] MempoolError),
    #[error(transparent)]
    ChainState(#[from] ChainStateError),
    #[error("storage: {0}")]
    Storage(String),
}

/// The result of validating an entity that might fail outright, or might simply
/// be premature because it references something the node hasn't seen yet.
///
/// `Orphan` carries the entity back to the caller so it can be parked in
/// `orphan_txns`/`orphan_blocks` and retried once its dependency arrives.
#[derive(Debug, Clone)]
pub enum Validity<T, E> {
    Invalid(E),
    Orphan(Box<T>),
}

impl<T: std::fmt::Debug, E: std::fmt::Display> std::fmt::Display for Validity<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Validity::Invalid(e) => write!(f, "invalid: {e}"),
            Validity::Orphan(_) => write!(f, "orphan: dependency not yet known"),
        }
    }
}

impl<T: std::fmt::Debug, E: std::fmt::Display + std::fmt::Debug> std::error::Error
    for Validity<T, E>
{
}
