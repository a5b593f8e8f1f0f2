//! The built-in assistant contact.
//!
//! The assistant is an ordinary chat entry with a reserved id; its replies
//! enter the conversation state through the same inbound dispatch path as
//! payloads from real peers. The reply generator is an external HTTP service
//! and fails open: any transport or decode failure yields a canned apology
//! instead of an error.

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use palaver_shared::types::{now_millis, Chat, Message, MessageStatus, Presence, User};
use palaver_store::{ChatPatch, ConversationStore};

/// Reserved chat id for the assistant. Never a reachable peer id.
pub const ASSISTANT_CHAT_ID: &str = "palaver-ai";

pub const ASSISTANT_NAME: &str = "Palaver AI";

/// Reply used whenever the generator cannot produce one.
pub const FALLBACK_REPLY: &str = "Sorry, I am having trouble connecting to my brain right now 🤖";

const SYSTEM_PROMPT: &str =
    "You are a witty, helpful friend in a messenger app. Keep responses short (max 2-3 sentences) and informal.";

pub fn assistant_user() -> User {
    User {
        id: ASSISTANT_CHAT_ID.to_string(),
        name: ASSISTANT_NAME.to_string(),
        username: None,
        avatar: None,
        status: Presence::Online,
        last_seen: None,
    }
}

/// Make sure the assistant chat exists and carries the expected profile.
///
/// Runs at every startup: it bootstraps the chat on first launch and repairs
/// a snapshot whose assistant entry was renamed or damaged, without touching
/// its messages or summary fields.
pub fn ensure_assistant_chat(store: &mut ConversationStore) {
    match store.chat(ASSISTANT_CHAT_ID) {
        None => {
            store.add_chat(Chat::for_user(assistant_user(), now_millis()));
        }
        Some(chat) if chat.user != assistant_user() => {
            store.update_chat(
                ASSISTANT_CHAT_ID,
                ChatPatch {
                    user: Some(assistant_user()),
                    ..Default::default()
                },
            );
        }
        Some(_) => {}
    }
}

/// Build a reply message as it would arrive from a peer.
pub fn reply_message(text: String) -> Message {
    Message {
        id: Uuid::new_v4(),
        sender_id: ASSISTANT_CHAT_ID.to_string(),
        text: Some(text),
        image: None,
        is_voice: false,
        media_data: None,
        voice_duration: None,
        timestamp: now_millis(),
        status: MessageStatus::Sent,
        is_self: false,
        reply_to_id: None,
        is_edited: None,
        forwarded_from: None,
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    system: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    text: String,
}

/// Client for the external reply-generation service.
pub struct Generator {
    http: reqwest::Client,
    url: Option<String>,
}

impl Generator {
    /// `url` is the generation endpoint; `None` disables the service and
    /// every request falls back immediately.
    pub fn new(url: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
        }
    }

    /// Produce a reply for `prompt`. Never fails: an unreachable or
    /// misbehaving service degrades to [`FALLBACK_REPLY`].
    pub async fn generate(&self, prompt: &str) -> String {
        let Some(ref url) = self.url else {
            return FALLBACK_REPLY.to_string();
        };
        match self.request(url, prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Reply generation failed, falling back");
                FALLBACK_REPLY.to_string()
            }
        }
    }

    async fn request(&self, url: &str, prompt: &str) -> Result<String, reqwest::Error> {
        let response = self
            .http
            .post(url)
            .json(&GenerateRequest {
                prompt,
                system: SYSTEM_PROMPT,
            })
            .send()
            .await?
            .error_for_status()?;
        let body: GenerateResponse = response.json().await?;
        Ok(body.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_and_idempotence() {
        let mut store = ConversationStore::in_memory();

        ensure_assistant_chat(&mut store);
        assert_eq!(store.chat(ASSISTANT_CHAT_ID).unwrap().user.name, ASSISTANT_NAME);

        ensure_assistant_chat(&mut store);
        assert_eq!(store.chats().len(), 1);
    }

    #[test]
    fn test_repair_preserves_conversation() {
        let mut store = ConversationStore::in_memory();
        ensure_assistant_chat(&mut store);
        store.add_message(ASSISTANT_CHAT_ID, reply_message("kept".to_string()));
        store.update_chat(
            ASSISTANT_CHAT_ID,
            ChatPatch {
                user: Some(User {
                    name: "Mangled".to_string(),
                    ..assistant_user()
                }),
                unread_count: Some(4),
                ..Default::default()
            },
        );

        ensure_assistant_chat(&mut store);

        let chat = store.chat(ASSISTANT_CHAT_ID).unwrap();
        assert_eq!(chat.user.name, ASSISTANT_NAME);
        assert_eq!(chat.unread_count, 4);
        assert_eq!(store.messages(ASSISTANT_CHAT_ID).len(), 1);
    }

    #[tokio::test]
    async fn test_generator_disabled_falls_back() {
        let generator = Generator::new(None);
        assert_eq!(generator.generate("hello").await, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_generator_unreachable_falls_back() {
        // Port 1 is never listening; connect fails fast.
        let generator = Generator::new(Some("http://127.0.0.1:1/generate".to_string()));
        assert_eq!(generator.generate("hello").await, FALLBACK_REPLY);
    }
}
