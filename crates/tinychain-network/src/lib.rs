//! # tinychain-network — raw-TCP P2P layer.
//!
//! One TCP connection per request, framed as `u32be length || canonical
//! JSON payload` (see `tinychain_core::codec`). No gossip overlay, no DHT,
//! no peer scoring: the protocol is the small request/response set in
//! [`protocol::NetworkMessage`], dispatched through [`service::dispatch`]
//! and driven at startup by [`service::run_ibd`].

pub mod config;
pub mod protocol;
pub mod service;

pub use config::NetworkConfig;
pub use protocol::NetworkMessage;
pub use service::{run_ibd, run_listener, send_to_peer, ConnectOutcome, NodeHandle};
