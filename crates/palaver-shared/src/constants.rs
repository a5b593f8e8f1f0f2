/// Protocol version string for libp2p identify
pub const PROTOCOL_VERSION: &str = "/palaver/1.0.0";

/// Application name
pub const APP_NAME: &str = "Palaver";

/// Maximum envelope size in bytes (8 MiB; voice and image payloads travel
/// inline as base64 data URIs)
pub const MAX_ENVELOPE_SIZE: usize = 8 * 1024 * 1024;

/// GossipSub heartbeat interval in seconds
pub const GOSSIPSUB_HEARTBEAT_SECS: u64 = 1;

/// Default QUIC listen port
pub const DEFAULT_QUIC_PORT: u16 = 4201;

/// Reserved sigil every username must start with
pub const USERNAME_SIGIL: char = '@';

/// Topic prefix for per-peer inbox topics
pub const INBOX_TOPIC_PREFIX: &str = "inbox:";
