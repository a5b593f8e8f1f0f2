// P2P connection layer built on libp2p with QUIC transport.

pub mod behaviour;
pub mod identity;
pub mod node;
pub mod registry;
pub mod transport;

pub use behaviour::{PalaverBehaviour, PalaverEvent};
pub use identity::{ensure_identity, IdentityError};
pub use node::{inbox_topic, spawn_node, NodeCommand, NodeConfig, NodeNotification};
pub use registry::{LinkRegistry, LinkState};
pub use transport::build_swarm;
