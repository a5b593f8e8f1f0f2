//! # palaver-shared
//!
//! Domain types and the wire envelope codec shared by every Palaver crate.
//!
//! The conversation model (users, messages, chats) lives here so the store,
//! the networking layer, and the client agree on a single definition, and the
//! [`envelope::Envelope`] codec defines the tagged JSON wrapper exchanged
//! over peer links.

pub mod constants;
pub mod envelope;
pub mod types;

pub use envelope::{Envelope, EnvelopeError};
pub use types::{now_millis, Chat, Message, MessageStatus, Presence, User};
