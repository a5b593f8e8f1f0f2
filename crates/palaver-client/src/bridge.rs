//! Bridge between the node task and the conversation state.
//!
//! Consumes [`NodeNotification`]s, decodes envelopes at the boundary and
//! hands them to the dispatcher. This is the only task that reacts to link
//! lifecycle events.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use palaver_net::{NodeCommand, NodeNotification};
use palaver_shared::envelope::Envelope;

use crate::dispatcher::dispatch_inbound;
use crate::notify::Notifier;
use crate::state::ClientState;

pub async fn run_bridge(
    state: Arc<Mutex<ClientState>>,
    cmd_tx: mpsc::Sender<NodeCommand>,
    mut notif_rx: mpsc::Receiver<NodeNotification>,
    notifier: Arc<dyn Notifier>,
) {
    info!("Bridge loop started");
    while let Some(notification) = notif_rx.recv().await {
        match notification {
            NodeNotification::LinkOpened { peer } => {
                // A handshake is the first payload on every opened link.
                let self_user = match state.lock() {
                    Ok(guard) => guard.store.self_user().cloned(),
                    Err(_) => None,
                };
                let Some(user) = self_user else {
                    warn!(peer = %peer, "Link opened before login, skipping handshake");
                    continue;
                };
                match Envelope::handshake(user).to_bytes() {
                    Ok(data) => {
                        let _ = cmd_tx.send(NodeCommand::Send { peer, data }).await;
                    }
                    Err(e) => warn!(peer = %peer, error = %e, "Failed to encode handshake"),
                }
            }
            NodeNotification::EnvelopeReceived { peer, data } => {
                let envelope = match Envelope::from_bytes(&data) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        // Discard the payload; the link itself stays open.
                        warn!(peer = %peer, error = %e, "Discarding malformed envelope");
                        continue;
                    }
                };
                if let Ok(mut guard) = state.lock() {
                    dispatch_inbound(&mut guard, &peer, envelope, notifier.as_ref());
                }
            }
            NodeNotification::LinkClosed { peer } => {
                // The counterpart's presence is deliberately left untouched;
                // a closed link says nothing about whether they are online.
                debug!(peer = %peer, "Link closed");
            }
            NodeNotification::ConnectFailed { peer } => {
                debug!(peer = %peer, "Connect failed, no retry scheduled");
            }
        }
    }
    info!("Bridge loop ended");
}
