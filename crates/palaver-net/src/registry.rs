//! Per-peer link lifecycle tracking.
//!
//! The registry owns the mapping from peer id to link state and is the only
//! place link transitions happen. It is a plain state machine with no I/O so
//! the lifecycle rules stay unit-testable away from the swarm:
//!
//! ```text
//! Idle -> Connecting -> Open -> Closed (entry removed)
//! ```
//!
//! A failed connect removes the entry outright; there is no retry. Sending
//! is only permitted on an `Open` link, and querying never mutates anything,
//! which is what makes the fire-and-forget send path safe.

use std::collections::HashMap;

use tracing::debug;

/// Lifecycle state of a single peer link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No link and no attempt in progress.
    Idle,
    /// An outbound dial is in flight.
    Connecting,
    /// The bidirectional channel is usable.
    Open,
}

/// Tracks every live or in-progress peer link, keyed by peer id.
#[derive(Debug, Default)]
pub struct LinkRegistry {
    links: HashMap<String, LinkState>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state for a peer; an unknown peer is `Idle`.
    pub fn state(&self, peer: &str) -> LinkState {
        self.links.get(peer).copied().unwrap_or(LinkState::Idle)
    }

    /// Begin an outbound connect (`Idle -> Connecting`). Returns `false`
    /// when an attempt or an open link already exists.
    pub fn begin_connect(&mut self, peer: &str) -> bool {
        if self.links.contains_key(peer) {
            return false;
        }
        self.links.insert(peer.to_string(), LinkState::Connecting);
        true
    }

    /// Complete an outbound connect (`Connecting -> Open`). Returns `false`
    /// for peers we were not connecting to, so stray transport events from
    /// rendezvous traffic never materialize a link.
    pub fn open(&mut self, peer: &str) -> bool {
        match self.links.get_mut(peer) {
            Some(state @ LinkState::Connecting) => {
                *state = LinkState::Open;
                true
            }
            _ => false,
        }
    }

    /// Register an inbound link under the remote's declared peer id.
    /// Returns `false` if a link already exists.
    pub fn accept(&mut self, peer: &str) -> bool {
        if matches!(self.state(peer), LinkState::Open) {
            return false;
        }
        self.links.insert(peer.to_string(), LinkState::Open);
        true
    }

    /// Whether a send to this peer would actually go out.
    pub fn can_send(&self, peer: &str) -> bool {
        self.state(peer) == LinkState::Open
    }

    /// Tear down a link and forget the peer. Used both for deliberate close
    /// and for remote disconnect. Returns `false` if there was no entry.
    pub fn close(&mut self, peer: &str) -> bool {
        let removed = self.links.remove(peer).is_some();
        if removed {
            debug!(peer = %peer, "Link closed, entry removed");
        }
        removed
    }

    /// Drop a failed connect attempt (no retry).
    pub fn abandon(&mut self, peer: &str) -> bool {
        match self.links.get(peer) {
            Some(LinkState::Connecting) => {
                self.links.remove(peer);
                true
            }
            _ => false,
        }
    }

    /// Peer ids of all `Open` links.
    pub fn open_peers(&self) -> Vec<String> {
        self.links
            .iter()
            .filter(|(_, state)| **state == LinkState::Open)
            .map(|(peer, _)| peer.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
