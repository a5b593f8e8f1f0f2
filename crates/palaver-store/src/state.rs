//! The conversation reducer.
//!
//! [`AppState`] is the authoritative in-memory model of chats and messages.
//! Every mutation is a single indivisible transition, and every operation on
//! a missing chat or message id is a silent no-op: the store is designed to
//! tolerate stale references from asynchronous arrival ordering, never to
//! raise errors for them. Each mutator returns whether it changed anything so
//! the persistence wrapper can skip redundant snapshot writes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use palaver_shared::types::{Chat, Message, MessageStatus, Presence, User};

/// UI color theme, persisted with the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

/// Interface language, persisted with the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    #[default]
    Ru,
}

/// Shallow-merge patch for [`Chat`] fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ChatPatch {
    pub user: Option<User>,
    pub last_message: Option<String>,
    pub last_message_time: Option<i64>,
    pub last_activity: Option<i64>,
    pub unread_count: Option<u32>,
}

/// Shallow-merge patch for [`Message`] fields.
#[derive(Debug, Clone, Default)]
pub struct MessagePatch {
    pub text: Option<String>,
    pub status: Option<MessageStatus>,
    pub is_edited: Option<bool>,
}

/// Shallow-merge patch for the local user's profile.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub username: Option<String>,
    pub avatar: Option<String>,
    pub status: Option<Presence>,
    pub last_seen: Option<i64>,
}

/// The authoritative conversation state. Single writer; other components
/// hold only identifiers into it, never references.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub theme: Theme,
    pub lang: Language,
    pub self_user: Option<User>,
    pub token: Option<String>,
    pub chats: Vec<Chat>,
    /// Per-chat message sequences, keyed by chat id. A sequence may exist
    /// before its `Chat` record does (out-of-order arrival tolerance).
    pub messages: HashMap<String, Vec<Message>>,
    pub my_peer_id: String,
    pub active_chat_id: Option<String>,
}

impl AppState {
    pub fn chat(&self, id: &str) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == id)
    }

    pub fn messages(&self, chat_id: &str) -> &[Message] {
        self.messages.get(chat_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Idempotent create: a second chat with the same id is ignored.
    pub fn add_chat(&mut self, chat: Chat) -> bool {
        if self.chats.iter().any(|c| c.id == chat.id) {
            return false;
        }
        self.chats.push(chat);
        true
    }

    /// Shallow-merge `patch` into the chat with `id`; no-op if absent.
    pub fn update_chat(&mut self, id: &str, patch: ChatPatch) -> bool {
        let Some(chat) = self.chats.iter_mut().find(|c| c.id == id) else {
            return false;
        };
        if let Some(user) = patch.user {
            chat.user = user;
        }
        if let Some(last_message) = patch.last_message {
            chat.last_message = Some(last_message);
        }
        if let Some(last_message_time) = patch.last_message_time {
            chat.last_message_time = Some(last_message_time);
        }
        if let Some(last_activity) = patch.last_activity {
            chat.last_activity = last_activity;
        }
        if let Some(unread_count) = patch.unread_count {
            chat.unread_count = unread_count;
        }
        true
    }

    /// Append to the chat's sequence, creating it lazily. The sequence is
    /// insertion-ordered; timestamps are never consulted.
    pub fn add_message(&mut self, chat_id: &str, message: Message) -> bool {
        self.messages
            .entry(chat_id.to_string())
            .or_default()
            .push(message);
        true
    }

    /// Shallow-merge `patch` into the matching message; no-op if absent.
    pub fn update_message(&mut self, chat_id: &str, message_id: Uuid, patch: MessagePatch) -> bool {
        let Some(message) = self
            .messages
            .get_mut(chat_id)
            .and_then(|seq| seq.iter_mut().find(|m| m.id == message_id))
        else {
            return false;
        };
        if let Some(text) = patch.text {
            message.text = Some(text);
        }
        if let Some(status) = patch.status {
            message.status = status;
        }
        if let Some(is_edited) = patch.is_edited {
            message.is_edited = Some(is_edited);
        }
        true
    }

    /// Remove exactly the listed ids, preserving the relative order of the
    /// survivors. Local-only: no tombstone, no notification to the peer.
    pub fn delete_messages(&mut self, chat_id: &str, ids: &[Uuid]) -> bool {
        let Some(seq) = self.messages.get_mut(chat_id) else {
            return false;
        };
        let before = seq.len();
        seq.retain(|m| !ids.contains(&m.id));
        seq.len() != before
    }

    /// Switch the foreground chat. Activating a chat resets its unread count
    /// in the same transition, so a message arriving between "switch" and
    /// "clear unread" cannot be miscounted. Switching to `None` mutates
    /// nothing else.
    ///
    /// The selection itself is session-local and never persisted, so the
    /// return value reports only whether an unread count was cleared.
    pub fn set_active_chat_id(&mut self, id: Option<String>) -> bool {
        let mut cleared = false;
        if let Some(ref id) = id {
            if let Some(chat) = self.chats.iter_mut().find(|c| &c.id == id) {
                if chat.unread_count != 0 {
                    chat.unread_count = 0;
                    cleared = true;
                }
            }
        }
        self.active_chat_id = id;
        cleared
    }

    pub fn set_my_peer_id(&mut self, id: String) -> bool {
        if self.my_peer_id == id {
            return false;
        }
        self.my_peer_id = id;
        true
    }

    pub fn set_auth(&mut self, user: User, token: String) -> bool {
        self.self_user = Some(user);
        self.token = Some(token);
        true
    }

    /// Merge a profile patch into the local user; no-op when logged out.
    pub fn set_self_user(&mut self, patch: UserPatch) -> bool {
        let Some(user) = self.self_user.as_mut() else {
            return false;
        };
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(username) = patch.username {
            user.username = Some(username);
        }
        if let Some(avatar) = patch.avatar {
            user.avatar = Some(avatar);
        }
        if let Some(status) = patch.status {
            user.status = status;
        }
        if let Some(last_seen) = patch.last_seen {
            user.last_seen = Some(last_seen);
        }
        true
    }

    /// Drop identity and conversation data; settings and peer id survive.
    pub fn logout(&mut self) -> bool {
        self.self_user = None;
        self.token = None;
        self.chats.clear();
        self.messages.clear();
        self.active_chat_id = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palaver_shared::types::now_millis;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            name: id.to_string(),
            username: None,
            avatar: None,
            status: Presence::Online,
            last_seen: None,
        }
    }

    fn chat(id: &str) -> Chat {
        Chat::for_user(user(id), now_millis())
    }

    fn message(sender: &str, text: &str, timestamp: i64) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: sender.to_string(),
            text: Some(text.to_string()),
            image: None,
            is_voice: false,
            media_data: None,
            voice_duration: None,
            timestamp,
            status: MessageStatus::Sent,
            is_self: false,
            reply_to_id: None,
            is_edited: None,
            forwarded_from: None,
        }
    }

    #[test]
    fn test_add_chat_idempotent() {
        let mut state = AppState::default();
        let mut first = chat("alice");
        first.last_message = Some("hi".to_string());

        assert!(state.add_chat(first.clone()));
        assert!(!state.add_chat(chat("alice")));

        assert_eq!(state.chats.len(), 1);
        // The second call must not have overwritten field values either.
        assert_eq!(state.chats[0], first);
    }

    #[test]
    fn test_insertion_order_beats_timestamps() {
        let mut state = AppState::default();
        // Deliberately decreasing timestamps: clock skew must not reorder.
        let m1 = message("alice", "first", 300);
        let m2 = message("alice", "second", 200);
        let m3 = message("alice", "third", 100);

        state.add_message("alice", m1.clone());
        state.add_message("alice", m2.clone());
        state.add_message("alice", m3.clone());

        let ids: Vec<Uuid> = state.messages("alice").iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![m1.id, m2.id, m3.id]);
    }

    #[test]
    fn test_add_message_without_chat_record() {
        let mut state = AppState::default();
        state.add_message("ghost", message("ghost", "early", 1));
        assert_eq!(state.messages("ghost").len(), 1);
        assert!(state.chat("ghost").is_none());
    }

    #[test]
    fn test_update_chat_missing_is_noop() {
        let mut state = AppState::default();
        assert!(!state.update_chat(
            "nobody",
            ChatPatch {
                unread_count: Some(5),
                ..Default::default()
            }
        ));
    }

    #[test]
    fn test_update_message_merges_shallowly() {
        let mut state = AppState::default();
        let msg = message("alice", "draft", 1);
        let id = msg.id;
        state.add_message("alice", msg);

        assert!(state.update_message(
            "alice",
            id,
            MessagePatch {
                status: Some(MessageStatus::Sending),
                ..Default::default()
            }
        ));
        let stored = &state.messages("alice")[0];
        assert_eq!(stored.status, MessageStatus::Sending);
        assert_eq!(stored.text.as_deref(), Some("draft"));

        assert!(!state.update_message("alice", Uuid::new_v4(), MessagePatch::default()));
    }

    #[test]
    fn test_delete_messages_exact_set() {
        let mut state = AppState::default();
        let msgs: Vec<Message> = (0..5).map(|i| message("alice", "m", i)).collect();
        for m in &msgs {
            state.add_message("alice", m.clone());
        }

        state.delete_messages("alice", &[msgs[1].id, msgs[3].id]);

        let remaining: Vec<Uuid> = state.messages("alice").iter().map(|m| m.id).collect();
        assert_eq!(remaining, vec![msgs[0].id, msgs[2].id, msgs[4].id]);
    }

    #[test]
    fn test_activation_resets_unread() {
        let mut state = AppState::default();
        let mut c = chat("alice");
        c.unread_count = 7;
        state.add_chat(c);

        state.set_active_chat_id(Some("alice".to_string()));
        assert_eq!(state.chat("alice").unwrap().unread_count, 0);

        // Deactivating mutates no unread counts.
        state.update_chat(
            "alice",
            ChatPatch {
                unread_count: Some(3),
                ..Default::default()
            },
        );
        state.set_active_chat_id(None);
        assert_eq!(state.chat("alice").unwrap().unread_count, 3);
    }

    #[test]
    fn test_activation_reports_change_only_when_clearing() {
        let mut state = AppState::default();
        let mut c = chat("alice");
        c.unread_count = 2;
        state.add_chat(c);

        // Clearing a non-zero count is a persistable change; everything
        // else about the selection is session-local.
        assert!(state.set_active_chat_id(Some("alice".to_string())));
        assert!(!state.set_active_chat_id(Some("alice".to_string())));
        assert!(!state.set_active_chat_id(None));
        assert!(!state.set_active_chat_id(Some("nobody".to_string())));
        assert_eq!(state.active_chat_id.as_deref(), Some("nobody"));
    }

    #[test]
    fn test_set_self_user_requires_login() {
        let mut state = AppState::default();
        assert!(!state.set_self_user(UserPatch {
            name: Some("ghost".to_string()),
            ..Default::default()
        }));

        state.set_auth(user("me"), "token".to_string());
        assert!(state.set_self_user(UserPatch {
            name: Some("Renamed".to_string()),
            ..Default::default()
        }));
        assert_eq!(state.self_user.as_ref().unwrap().name, "Renamed");
    }

    #[test]
    fn test_logout_keeps_settings_and_peer_id() {
        let mut state = AppState::default();
        state.set_auth(user("me"), "token".to_string());
        state.set_my_peer_id("12D3KooWexample".to_string());
        state.add_chat(chat("alice"));
        state.theme = Theme::Light;

        state.logout();

        assert!(state.self_user.is_none());
        assert!(state.token.is_none());
        assert!(state.chats.is_empty());
        assert_eq!(state.my_peer_id, "12D3KooWexample");
        assert_eq!(state.theme, Theme::Light);
    }
}
