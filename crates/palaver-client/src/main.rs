//! Headless Palaver node: loads the snapshot, claims the transport identity
//! and runs the bridge loop until interrupted.

use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tracing::info;
use tracing_subscriber::EnvFilter;

use palaver_client::assistant;
use palaver_client::bridge::run_bridge;
use palaver_client::config::ClientConfig;
use palaver_client::notify::{LogNotifier, Notifier};
use palaver_client::state::ClientState;
use palaver_net::{ensure_identity, spawn_node, NodeCommand, NodeConfig};
use palaver_shared::constants::APP_NAME;
use palaver_store::ConversationStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,palaver_client=debug")),
        )
        .init();

    info!("Starting {APP_NAME} client v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();

    let mut store = ConversationStore::open_at(&config.snapshot_path()?)?;
    assistant::ensure_assistant_chat(&mut store);

    let keypair = ensure_identity(&config.identity_path()?)?;
    let (cmd_tx, notif_rx, peer_id) = spawn_node(
        keypair,
        NodeConfig {
            listen_port: config.listen_port,
            bootstrap: config.bootstrap.clone(),
        },
    )
    .await?;
    store.set_my_peer_id(peer_id.to_string());
    info!(peer_id = %peer_id, "Identity claimed");

    let state = Arc::new(Mutex::new(ClientState::new(store)));
    state
        .lock()
        .map_err(|_| anyhow!("State lock poisoned"))?
        .node_cmd_tx = Some(cmd_tx.clone());

    for peer in &config.connect {
        cmd_tx.send(NodeCommand::Connect(peer.clone())).await?;
    }

    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    let bridge = tokio::spawn(run_bridge(
        Arc::clone(&state),
        cmd_tx.clone(),
        notif_rx,
        notifier,
    ));

    tokio::select! {
        _ = bridge => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            let _ = cmd_tx.send(NodeCommand::Shutdown).await;
        }
    }

    Ok(())
}
