//! Composed libp2p `NetworkBehaviour` for Palaver nodes.
//!
//! Combines GossipSub (per-peer inbox topics carrying envelopes), Kademlia
//! (the rendezvous layer that resolves a peer id to a reachable address),
//! and Identify (address exchange feeding the DHT).

use libp2p::{
    gossipsub, identify,
    kad::{self, store::MemoryStore},
    swarm::NetworkBehaviour,
};

/// Composed network behaviour, driven by the single node event loop.
/// Construction is handled by [`super::transport::build_swarm`].
#[derive(NetworkBehaviour)]
#[behaviour(to_swarm = "PalaverEvent")]
pub struct PalaverBehaviour {
    /// Pub/sub transport for envelope delivery
    pub gossipsub: gossipsub::Behaviour,
    /// Distributed hash table for peer address resolution
    pub kademlia: kad::Behaviour<MemoryStore>,
    /// Protocol identification and listen-address advertisement
    pub identify: identify::Behaviour,
}

/// Events emitted by the composed behaviour, one variant per sub-behaviour.
#[derive(Debug)]
pub enum PalaverEvent {
    Gossipsub(gossipsub::Event),
    Kademlia(kad::Event),
    Identify(identify::Event),
}

impl From<gossipsub::Event> for PalaverEvent {
    fn from(event: gossipsub::Event) -> Self {
        PalaverEvent::Gossipsub(event)
    }
}

impl From<kad::Event> for PalaverEvent {
    fn from(event: kad::Event) -> Self {
        PalaverEvent::Kademlia(event)
    }
}

impl From<identify::Event> for PalaverEvent {
    fn from(event: identify::Event) -> Self {
        PalaverEvent::Identify(event)
    }
}
