//! Persistence wrapper around the reducer.
//!
//! [`ConversationStore`] owns the [`AppState`] and is the only writer to it.
//! Every successful mutation is followed by a snapshot write; a failed write
//! is logged and swallowed, because delivery-path code must never surface a
//! storage error to the user.

use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

use palaver_shared::types::{Chat, Message, User};

use crate::error::Result;
use crate::snapshot::{self, Snapshot};
use crate::state::{AppState, ChatPatch, MessagePatch, UserPatch};

pub struct ConversationStore {
    state: AppState,
    path: Option<PathBuf>,
}

impl ConversationStore {
    /// Load the store from the default platform location.
    pub fn open_default() -> Result<Self> {
        let path = snapshot::default_snapshot_path()?;
        Self::open_at(&path)
    }

    /// Load the store from an explicit snapshot path, creating an empty
    /// state when the file does not exist yet.
    pub fn open_at(path: &Path) -> Result<Self> {
        let state = snapshot::load(path)?.into_state();
        Ok(Self {
            state,
            path: Some(path.to_path_buf()),
        })
    }

    /// Ephemeral store without persistence. Used by tests and tooling.
    pub fn in_memory() -> Self {
        Self {
            state: AppState::default(),
            path: None,
        }
    }

    fn persist(&self) {
        let Some(ref path) = self.path else { return };
        if let Err(e) = snapshot::save(path, &Snapshot::from_state(&self.state)) {
            warn!(path = %path.display(), error = %e, "Failed to persist snapshot");
        }
    }

    fn apply(&mut self, mutated: bool) -> bool {
        if mutated {
            self.persist();
        }
        mutated
    }

    // -- read access --------------------------------------------------------

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn chat(&self, id: &str) -> Option<&Chat> {
        self.state.chat(id)
    }

    pub fn chats(&self) -> &[Chat] {
        &self.state.chats
    }

    pub fn messages(&self, chat_id: &str) -> &[Message] {
        self.state.messages(chat_id)
    }

    pub fn active_chat_id(&self) -> Option<&str> {
        self.state.active_chat_id.as_deref()
    }

    pub fn self_user(&self) -> Option<&User> {
        self.state.self_user.as_ref()
    }

    pub fn my_peer_id(&self) -> &str {
        &self.state.my_peer_id
    }

    // -- mutations (each persisted atomically with the transition) ----------

    pub fn add_chat(&mut self, chat: Chat) -> bool {
        let mutated = self.state.add_chat(chat);
        self.apply(mutated)
    }

    pub fn update_chat(&mut self, id: &str, patch: ChatPatch) -> bool {
        let mutated = self.state.update_chat(id, patch);
        self.apply(mutated)
    }

    pub fn add_message(&mut self, chat_id: &str, message: Message) -> bool {
        let mutated = self.state.add_message(chat_id, message);
        self.apply(mutated)
    }

    pub fn update_message(&mut self, chat_id: &str, message_id: Uuid, patch: MessagePatch) -> bool {
        let mutated = self.state.update_message(chat_id, message_id, patch);
        self.apply(mutated)
    }

    pub fn delete_messages(&mut self, chat_id: &str, ids: &[Uuid]) -> bool {
        let mutated = self.state.delete_messages(chat_id, ids);
        self.apply(mutated)
    }

    pub fn set_active_chat_id(&mut self, id: Option<String>) -> bool {
        let mutated = self.state.set_active_chat_id(id);
        self.apply(mutated)
    }

    pub fn set_my_peer_id(&mut self, id: String) -> bool {
        let mutated = self.state.set_my_peer_id(id);
        self.apply(mutated)
    }

    pub fn set_auth(&mut self, user: User, token: String) -> bool {
        let mutated = self.state.set_auth(user, token);
        self.apply(mutated)
    }

    pub fn set_self_user(&mut self, patch: UserPatch) -> bool {
        let mutated = self.state.set_self_user(patch);
        self.apply(mutated)
    }

    pub fn logout(&mut self) -> bool {
        let mutated = self.state.logout();
        self.apply(mutated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palaver_shared::types::{now_millis, Presence};

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            name: id.to_string(),
            username: None,
            avatar: None,
            status: Presence::Offline,
            last_seen: None,
        }
    }

    #[test]
    fn test_mutations_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        {
            let mut store = ConversationStore::open_at(&path).unwrap();
            store.add_chat(Chat::for_user(user("bob"), now_millis()));
            store.set_my_peer_id("12D3KooWreopen".to_string());
        }

        let store = ConversationStore::open_at(&path).unwrap();
        assert!(store.chat("bob").is_some());
        assert_eq!(store.my_peer_id(), "12D3KooWreopen");
    }

    #[test]
    fn test_noop_mutation_reports_false() {
        let mut store = ConversationStore::in_memory();
        store.add_chat(Chat::for_user(user("bob"), now_millis()));
        assert!(!store.add_chat(Chat::for_user(user("bob"), now_millis())));
        assert!(!store.update_chat("nobody", ChatPatch::default()));
        // Focus changes with nothing to clear must not trigger a snapshot.
        assert!(!store.set_active_chat_id(Some("bob".to_string())));
    }
}
