//! Node configuration, read once from environment variables at startup.
//!
//! There is no config file and no CLI flags (§6): every knob is a `TC_*`
//! env var, read once in [`NodeConfig::from_env`] and carried from then on.

use std::path::PathBuf;

use tinychain_core::constants::{DEFAULT_CHAIN_PATH, DEFAULT_PORT, DEFAULT_WALLET_PATH};
use tinychain_network::NetworkConfig;

/// Configuration for a full node instance, populated once from the
/// environment.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// `tracing_subscriber::EnvFilter` directive string (`TC_LOG_LEVEL`).
    pub log_level: String,
    /// Span/event label identifying this node in logs (`TC_LOG_LABEL`).
    pub log_label: String,
    /// Path to the on-disk active-chain blob (`TC_CHAIN_PATH`).
    pub chain_path: PathBuf,
    /// Path to the wallet key file (`TC_WALLET_PATH`).
    pub wallet_path: PathBuf,
    /// P2P listener port and startup peer set (`TC_PORT`, `TC_PEERS`).
    pub network: NetworkConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_label: "tinychain-node".to_string(),
            chain_path: PathBuf::from(DEFAULT_CHAIN_PATH),
            wallet_path: PathBuf::from(DEFAULT_WALLET_PATH),
            network: NetworkConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Read configuration from `TC_LOG_LEVEL`, `TC_LOG_LABEL`,
    /// `TC_CHAIN_PATH`, `TC_WALLET_PATH`, `TC_PEERS` (comma-separated
    /// hostnames), and `TC_PORT`. Any var not set keeps its default.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("TC_LOG_LEVEL") {
            cfg.log_level = v;
        }
        if let Ok(v) = std::env::var("TC_LOG_LABEL") {
            cfg.log_label = v;
        }
        if let Ok(v) = std::env::var("TC_CHAIN_PATH") {
            cfg.chain_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("TC_WALLET_PATH") {
            cfg.wallet_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("TC_PEERS") {
            cfg.network.peer_hostnames = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Ok(v) = std::env::var("TC_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                cfg.network.listen_port = port;
            }
        }

        cfg
    }
}
