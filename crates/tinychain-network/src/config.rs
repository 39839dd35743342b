//! Network-layer configuration for the tinychain P2P transport.
//!
//! Everything else in `NodeConfig` (chain/wallet paths, log settings) lives
//! in `tinychain-node`; this crate only needs the listen port and the peers
//! to dial at startup.

use tinychain_core::constants::DEFAULT_PORT;

/// Configuration for the TCP listener and initial peer set.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// TCP port to listen on.
    pub listen_port: u16,
    /// Peer hostnames (`host:port` or bare host, see [`NetworkConfig::peer_addr`])
    /// to connect to at startup.
    pub peer_hostnames: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_PORT,
            peer_hostnames: Vec::new(),
        }
    }
}

impl NetworkConfig {
    /// The address to bind the TCP listener on.
    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.listen_port)
    }

    /// Normalize a configured peer hostname into a dialable `host:port`
    /// socket address string, appending [`DEFAULT_PORT`] if the hostname
    /// carries none.
    pub fn peer_addr(hostname: &str) -> String {
        if hostname.contains(':') {
            hostname.to_string()
        } else {
            format!("{hostname}:{DEFAULT_PORT}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_default_port() {
        let cfg = NetworkConfig::default();
        assert_eq!(cfg.listen_port, DEFAULT_PORT);
    }

    #[test]
    fn default_config_has_no_peers() {
        let cfg = NetworkConfig::default();
        assert!(cfg.peer_hostnames.is_empty());
    }

    #[test]
    fn listen_addr_format() {
        let cfg = NetworkConfig { listen_port: 9999, peer_hostnames: vec![] };
        assert_eq!(cfg.listen_addr(), "0.0.0.0:9999");
    }

    #[test]
    fn peer_addr_appends_default_port() {
        assert_eq!(NetworkConfig::peer_addr("example.com"), format!("example.com:{DEFAULT_PORT}"));
    }

    #[test]
    fn peer_addr_keeps_explicit_port() {
        assert_eq!(NetworkConfig::peer_addr("example.com:1234"), "example.com:1234");
    }
}
