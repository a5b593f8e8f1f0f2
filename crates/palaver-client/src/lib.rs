//! # palaver-client
//!
//! The client core: inbound dispatch, outbound sending, the synthetic
//! assistant contact, the auth/profile HTTP client, and the bridge loop that
//! wires node notifications into the conversation store.

pub mod assistant;
pub mod auth;
pub mod bridge;
pub mod config;
pub mod dispatcher;
pub mod notify;
pub mod sender;
pub mod state;
