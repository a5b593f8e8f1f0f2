//! Node orchestration with the tokio mpsc command/notification pattern.
//!
//! The swarm event loop runs in a dedicated tokio task. Application code
//! communicates with it through typed channels only, so all link-state
//! mutation happens on one logical thread: the [`LinkRegistry`] is written
//! exclusively by lifecycle events and read exclusively by the send path,
//! both inside this loop.
//!
//! Each node subscribes to its own inbox topic (claiming its id with the
//! rendezvous layer); opening a channel to a remote id means dialing it via
//! the DHT and publishing envelopes to the remote's inbox.

use futures::StreamExt;
use libp2p::{
    gossipsub, identify,
    multiaddr::Protocol,
    swarm::SwarmEvent,
    Multiaddr, PeerId,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use palaver_shared::constants::{DEFAULT_QUIC_PORT, INBOX_TOPIC_PREFIX};

use crate::behaviour::PalaverEvent;
use crate::registry::LinkRegistry;
use crate::transport::build_swarm;

/// GossipSub topic a peer receives envelopes on.
pub fn inbox_topic(peer_id: &str) -> String {
    format!("{INBOX_TOPIC_PREFIX}{peer_id}")
}

// ---------------------------------------------------------------------------
// Command / notification types
// ---------------------------------------------------------------------------

/// Commands sent *into* the node task.
#[derive(Debug)]
pub enum NodeCommand {
    /// Open a link to a remote peer id.
    Connect(String),
    /// Send an encoded envelope over an open link. Silently dropped when no
    /// open link exists: best effort, no queueing, no confirmation.
    Send { peer: String, data: Vec<u8> },
    /// Tear down the link to a peer.
    Close(String),
    /// Request a snapshot of peers with open links.
    GetLinks(tokio::sync::oneshot::Sender<Vec<String>>),
    /// Gracefully shut down the node.
    Shutdown,
}

/// Notifications sent *from* the node task to the application.
#[derive(Debug, Clone)]
pub enum NodeNotification {
    /// A link reached the open state (either direction). The application is
    /// expected to send its handshake in response.
    LinkOpened { peer: String },
    /// A link was torn down (local close or remote disconnect).
    LinkClosed { peer: String },
    /// An outbound connect attempt failed; the entry is already gone and
    /// will not be retried.
    ConnectFailed { peer: String },
    /// An encoded envelope arrived on our inbox.
    EnvelopeReceived { peer: String, data: Vec<u8> },
}

/// Configuration for spawning a node.
pub struct NodeConfig {
    /// QUIC port to listen on.
    pub listen_port: u16,
    /// Rendezvous (DHT bootstrap) multiaddrs to dial on startup.
    pub bootstrap: Vec<Multiaddr>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_QUIC_PORT,
            bootstrap: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Node task
// ---------------------------------------------------------------------------

/// Spawn the libp2p node in a background tokio task.
///
/// Returns channels for sending commands and receiving notifications, plus
/// the local `PeerId` claimed with the rendezvous layer.
pub async fn spawn_node(
    keypair: libp2p::identity::Keypair,
    config: NodeConfig,
) -> anyhow::Result<(
    mpsc::Sender<NodeCommand>,
    mpsc::Receiver<NodeNotification>,
    PeerId,
)> {
    let mut swarm = build_swarm(keypair)?;
    let local_peer_id = *swarm.local_peer_id();

    let listen_addr_v4: Multiaddr = format!("/ip4/0.0.0.0/udp/{}/quic-v1", config.listen_port)
        .parse()
        .expect("valid multiaddr");
    let listen_addr_v6: Multiaddr = format!("/ip6/::/udp/{}/quic-v1", config.listen_port)
        .parse()
        .expect("valid multiaddr");

    swarm.listen_on(listen_addr_v4)?;
    swarm.listen_on(listen_addr_v6)?;

    // Claim our id: anyone publishing to our inbox reaches us.
    let own_inbox = gossipsub::IdentTopic::new(inbox_topic(&local_peer_id.to_string()));
    swarm.behaviour_mut().gossipsub.subscribe(&own_inbox)?;
    let own_inbox_hash = own_inbox.hash();

    info!(peer_id = %local_peer_id, port = config.listen_port, "Node listening");

    // Dial rendezvous peers and seed the routing table.
    for addr in &config.bootstrap {
        if let Err(e) = swarm.dial(addr.clone()) {
            warn!(addr = %addr, error = %e, "Failed to dial bootstrap peer");
        } else {
            if let Some(peer_id) = extract_peer_id(addr) {
                swarm
                    .behaviour_mut()
                    .kademlia
                    .add_address(&peer_id, addr.clone());
            }
            debug!(addr = %addr, "Dialing bootstrap peer");
        }
    }
    if !config.bootstrap.is_empty() {
        if let Err(e) = swarm.behaviour_mut().kademlia.bootstrap() {
            warn!(error = %e, "Kademlia bootstrap failed to start");
        }
    }

    let (cmd_tx, mut cmd_rx) = mpsc::channel::<NodeCommand>(256);
    let (notif_tx, notif_rx) = mpsc::channel::<NodeNotification>(256);

    tokio::spawn(async move {
        let mut registry = LinkRegistry::new();

        loop {
            tokio::select! {
                // --- Incoming commands ---
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(NodeCommand::Connect(peer)) => {
                            if !registry.begin_connect(&peer) {
                                debug!(peer = %peer, "Connect ignored, link already exists");
                                continue;
                            }
                            let peer_id: PeerId = match peer.parse() {
                                Ok(id) => id,
                                Err(e) => {
                                    warn!(peer = %peer, error = %e, "Invalid peer id");
                                    registry.abandon(&peer);
                                    let _ = notif_tx
                                        .send(NodeNotification::ConnectFailed { peer })
                                        .await;
                                    continue;
                                }
                            };
                            // Resolve the peer's address through the DHT,
                            // then dial; failures surface as
                            // OutgoingConnectionError.
                            swarm
                                .behaviour_mut()
                                .kademlia
                                .get_closest_peers(peer_id);
                            if let Err(e) = swarm.dial(peer_id) {
                                warn!(peer = %peer, error = %e, "Dial failed");
                                registry.abandon(&peer);
                                let _ = notif_tx
                                    .send(NodeNotification::ConnectFailed { peer })
                                    .await;
                            }
                        }
                        Some(NodeCommand::Send { peer, data }) => {
                            if !registry.can_send(&peer) {
                                debug!(peer = %peer, "No open link, dropping envelope");
                                continue;
                            }
                            let topic = gossipsub::IdentTopic::new(inbox_topic(&peer));
                            if let Err(e) =
                                swarm.behaviour_mut().gossipsub.publish(topic, data)
                            {
                                // Best effort: the envelope is lost, the
                                // link stays as-is.
                                warn!(peer = %peer, error = %e, "Publish failed");
                            }
                        }
                        Some(NodeCommand::Close(peer)) => {
                            if let Ok(peer_id) = peer.parse::<PeerId>() {
                                let _ = swarm.disconnect_peer_id(peer_id);
                            }
                            if registry.close(&peer) {
                                let _ = notif_tx
                                    .send(NodeNotification::LinkClosed { peer })
                                    .await;
                            }
                        }
                        Some(NodeCommand::GetLinks(reply)) => {
                            let _ = reply.send(registry.open_peers());
                        }
                        Some(NodeCommand::Shutdown) => {
                            info!("Node shutdown requested");
                            break;
                        }
                        None => {
                            info!("Command channel closed, shutting down node");
                            break;
                        }
                    }
                }

                // --- Swarm events ---
                event = swarm.select_next_some() => {
                    match event {
                        SwarmEvent::Behaviour(PalaverEvent::Gossipsub(
                            gossipsub::Event::Message { message, .. },
                        )) => {
                            if message.topic != own_inbox_hash {
                                continue;
                            }
                            let Some(source) = message.source else {
                                debug!("Dropping inbox payload without a declared source");
                                continue;
                            };
                            let peer = source.to_string();
                            // Inbound path: the first payload from an
                            // unknown peer registers the link under the
                            // remote's declared id.
                            if registry.accept(&peer) {
                                info!(peer = %peer, "Accepted inbound link");
                                let _ = notif_tx
                                    .send(NodeNotification::LinkOpened { peer: peer.clone() })
                                    .await;
                            }
                            let _ = notif_tx
                                .send(NodeNotification::EnvelopeReceived {
                                    peer,
                                    data: message.data,
                                })
                                .await;
                        }

                        SwarmEvent::Behaviour(PalaverEvent::Identify(
                            identify::Event::Received { peer_id, info, .. },
                        )) => {
                            for addr in &info.listen_addrs {
                                swarm
                                    .behaviour_mut()
                                    .kademlia
                                    .add_address(&peer_id, addr.clone());
                            }
                        }

                        SwarmEvent::Behaviour(PalaverEvent::Kademlia(event)) => {
                            debug!(event = ?event, "Kademlia event");
                        }

                        SwarmEvent::ConnectionEstablished { peer_id, endpoint, .. } => {
                            let peer = peer_id.to_string();
                            if endpoint.is_dialer() && registry.open(&peer) {
                                info!(peer = %peer, "Outbound link open");
                                let _ = notif_tx
                                    .send(NodeNotification::LinkOpened { peer })
                                    .await;
                            }
                        }

                        SwarmEvent::ConnectionClosed {
                            peer_id,
                            num_established,
                            ..
                        } => {
                            if num_established == 0 {
                                let peer = peer_id.to_string();
                                if registry.close(&peer) {
                                    info!(peer = %peer, "Peer disconnected");
                                    let _ = notif_tx
                                        .send(NodeNotification::LinkClosed { peer })
                                        .await;
                                }
                            }
                        }

                        SwarmEvent::OutgoingConnectionError { peer_id, error, .. } => {
                            warn!(peer = ?peer_id, error = %error, "Outgoing connection error");
                            if let Some(peer_id) = peer_id {
                                let peer = peer_id.to_string();
                                if registry.abandon(&peer) {
                                    let _ = notif_tx
                                        .send(NodeNotification::ConnectFailed { peer })
                                        .await;
                                }
                            }
                        }

                        SwarmEvent::NewListenAddr { address, .. } => {
                            info!(addr = %address, "Listening on new address");
                        }

                        _ => {}
                    }
                }
            }
        }

        info!("Node event loop terminated");
    });

    Ok((cmd_tx, notif_rx, local_peer_id))
}

/// Extract a `PeerId` from a multiaddr, if one is present.
fn extract_peer_id(addr: &Multiaddr) -> Option<PeerId> {
    addr.iter().find_map(|p| {
        if let Protocol::P2p(peer_id) = p {
            Some(peer_id)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbox_topic_format() {
        assert_eq!(inbox_topic("12D3KooWabc"), "inbox:12D3KooWabc");
    }

    #[test]
    fn test_extract_peer_id() {
        let peer_id = PeerId::random();
        let addr: Multiaddr = format!("/ip4/127.0.0.1/udp/4201/quic-v1/p2p/{peer_id}")
            .parse()
            .unwrap();
        assert_eq!(extract_peer_id(&addr), Some(peer_id));

        let bare: Multiaddr = "/ip4/127.0.0.1/udp/4201/quic-v1".parse().unwrap();
        assert_eq!(extract_peer_id(&bare), None);
    }
}
