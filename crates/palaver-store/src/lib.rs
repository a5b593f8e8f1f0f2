//! # palaver-store
//!
//! The conversation store: an in-memory reducer over chats and messages plus
//! a JSON snapshot persisted after every mutation and loaded once at
//! startup. The store is the exclusive owner of the `Chat` and `Message`
//! collections; every other component addresses them by id only.

pub mod snapshot;
pub mod state;
pub mod store;

mod error;

pub use error::StoreError;
pub use state::{AppState, ChatPatch, Language, MessagePatch, Theme, UserPatch};
pub use store::ConversationStore;
