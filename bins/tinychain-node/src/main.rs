//! tinychain full node binary.
//!
//! Reads configuration from the environment, loads the chain and wallet from
//! disk, binds the P2P listener, kicks off initial block download, and starts
//! mining after the IBD grace period. No subcommands, no CLI flags.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tinychain_consensus::mining::mine;
use tinychain_core::constants::IBD_GRACE_PERIOD_SECS;
use tinychain_network::{run_ibd, run_listener, ConnectOutcome, NodeHandle};
use tinychain_node::{node::Node, storage, wallet, NodeConfig};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    let config = NodeConfig::from_env();
    init_logging(&config.log_level);

    info!(label = %config.log_label, "starting tinychain node");

    let active_chain = storage::load_from_disk(&config.chain_path);
    info!(height = active_chain.len() - 1, "loaded active chain");

    let node = Node::new(config.clone(), active_chain);

    let listener = match TcpListener::bind(config.network.listen_addr()).await {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, "failed to bind P2P listener");
            std::process::exit(1);
        }
    };
    info!(addr = %config.network.listen_addr(), "listening for peers");

    let node_handle: Arc<dyn NodeHandle> = node.clone();
    tokio::spawn(run_listener(listener, node_handle));

    let ibd_node = Arc::clone(&node);
    tokio::spawn(async move {
        run_ibd(ibd_node.as_ref()).await;
    });

    tokio::time::sleep(std::time::Duration::from_secs(IBD_GRACE_PERIOD_SECS)).await;
    info!("IBD grace period elapsed, starting mining loop");
    mine_forever(node, config).await;
}

/// Assemble, mine, and connect blocks forever, persisting the chain after
/// each one that's accepted onto the active tip.
async fn mine_forever(node: Arc<Node>, config: NodeConfig) {
    loop {
        let keypair = match wallet::load_or_generate(&config.wallet_path) {
            Ok(kp) => kp,
            Err(e) => {
                error!(error = %e, "failed to load wallet, retrying in 5s");
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                continue;
            }
        };
        let pay_to = keypair.address();
        let timestamp = now_secs();

        let mut block = match node.create_block_template(&pay_to, timestamp) {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "failed to assemble block template, retrying in 1s");
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                continue;
            }
        };

        node.reset_mine_interrupt();
        let interrupt = node.mine_interrupt();
        let found = match tokio::task::spawn_blocking(move || {
            let ok = mine(&mut block, &interrupt);
            (ok, block)
        })
        .await
        {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "mining worker panicked");
                continue;
            }
        };

        let (ok, mined_block) = found;
        if !ok {
            debug!("mining interrupted, reassembling against the new tip");
            continue;
        }

        match node.connect_block(mined_block) {
            ConnectOutcome::Connected => {
                let chain = node.active_chain_snapshot();
                if let Err(e) = storage::save_to_disk(&config.chain_path, &chain) {
                    warn!(error = %e, "failed to persist chain after mining a block");
                }
                info!(height = chain.len() - 1, "mined and connected a new block");
            }
            other => {
                warn!(outcome = ?other, "mined block was not accepted onto the active chain");
            }
        }
    }
}

fn now_secs() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

fn init_logging(level: &str) {
    use tracing_subscriber::filter::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
