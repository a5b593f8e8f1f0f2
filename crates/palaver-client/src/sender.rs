//! Outbound message sending.
//!
//! Sending is optimistic and two-phased: the message is committed to the
//! conversation immediately with status `Sending`, then flipped to `Sent`
//! after a fixed acknowledgment delay. Delivery itself is fire-and-forget:
//! if the link is not open the node drops the payload silently, and the
//! local copy still progresses to `Sent`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use palaver_net::NodeCommand;
use palaver_shared::envelope::Envelope;
use palaver_shared::types::{now_millis, Message, MessageStatus};
use palaver_store::{ChatPatch, ConversationStore, MessagePatch};

use crate::assistant::{self, Generator};
use crate::dispatcher::dispatch_inbound;
use crate::notify::Notifier;
use crate::state::ClientState;

/// Delay between the optimistic commit and the simulated acknowledgment.
pub const SEND_ACK_DELAY: Duration = Duration::from_millis(500);

/// A recorded voice clip ready to send.
#[derive(Debug, Clone)]
pub struct VoiceClip {
    /// Data URI with the encoded audio.
    pub media_data: String,
    pub duration_secs: u32,
}

/// Outgoing message content before it becomes a [`Message`].
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub text: Option<String>,
    /// Data URI of an attached image.
    pub image: Option<String>,
    pub voice: Option<VoiceClip>,
    pub reply_to: Option<Uuid>,
}

impl Draft {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

/// Materialize a draft into a message authored by `sender_id`.
pub fn compose(sender_id: &str, draft: Draft) -> Message {
    let (is_voice, media_data, voice_duration) = match draft.voice {
        Some(clip) => (true, Some(clip.media_data), Some(clip.duration_secs)),
        None => (false, None, None),
    };
    Message {
        id: Uuid::new_v4(),
        sender_id: sender_id.to_string(),
        text: draft.text,
        image: draft.image,
        is_voice,
        media_data,
        voice_duration,
        timestamp: now_millis(),
        status: MessageStatus::Sending,
        is_self: true,
        reply_to_id: draft.reply_to,
        is_edited: None,
        forwarded_from: None,
    }
}

/// Phase one: append the message and refresh the chat summary in one step.
pub fn commit_pending(store: &mut ConversationStore, chat_id: &str, message: &Message) {
    store.add_message(chat_id, message.clone());
    store.update_chat(
        chat_id,
        ChatPatch {
            last_message: Some(message.summary_label()),
            last_message_time: Some(message.timestamp),
            last_activity: Some(message.timestamp),
            ..Default::default()
        },
    );
}

/// Phase two: flip the committed message to `Sent`.
pub fn mark_sent(store: &mut ConversationStore, chat_id: &str, message_id: Uuid) -> bool {
    store.update_message(
        chat_id,
        message_id,
        MessagePatch {
            status: Some(MessageStatus::Sent),
            ..Default::default()
        },
    )
}

/// Send a draft into `chat_id`.
///
/// Commits locally, schedules the acknowledgment flip, then hands the wire
/// copy to the node. Messages into the assistant chat never reach the
/// network; the generated reply re-enters through the inbound dispatcher.
pub async fn send_local(
    state: &Arc<Mutex<ClientState>>,
    generator: &Generator,
    chat_id: &str,
    draft: Draft,
    notifier: &Arc<dyn Notifier>,
) {
    let (message, cmd_tx) = {
        let Ok(mut guard) = state.lock() else {
            warn!("State lock poisoned, dropping outgoing message");
            return;
        };
        let Some(sender_id) = guard.store.self_user().map(|u| u.id.clone()) else {
            warn!(chat = %chat_id, "Not logged in, dropping outgoing message");
            return;
        };
        let message = compose(&sender_id, draft);
        commit_pending(&mut guard.store, chat_id, &message);
        (message, guard.node_cmd_tx.clone())
    };

    schedule_ack(Arc::clone(state), chat_id.to_string(), message.id);

    if chat_id == assistant::ASSISTANT_CHAT_ID {
        let prompt = message.text.clone().unwrap_or_default();
        let reply = generator.generate(&prompt).await;
        if let Ok(mut guard) = state.lock() {
            dispatch_inbound(
                &mut guard,
                assistant::ASSISTANT_CHAT_ID,
                Envelope::Text(assistant::reply_message(reply)),
                notifier.as_ref(),
            );
        }
        return;
    }

    let data = match Envelope::for_message(message).to_bytes() {
        Ok(data) => data,
        Err(e) => {
            warn!(chat = %chat_id, error = %e, "Failed to encode outgoing envelope");
            return;
        }
    };
    match cmd_tx {
        Some(tx) => {
            let _ = tx
                .send(NodeCommand::Send {
                    peer: chat_id.to_string(),
                    data,
                })
                .await;
        }
        None => debug!(chat = %chat_id, "Node not running, message kept local only"),
    }
}

fn schedule_ack(state: Arc<Mutex<ClientState>>, chat_id: String, message_id: Uuid) {
    tokio::spawn(async move {
        tokio::time::sleep(SEND_ACK_DELAY).await;
        if let Ok(mut guard) = state.lock() {
            mark_sent(&mut guard.store, &chat_id, message_id);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::{ensure_assistant_chat, ASSISTANT_CHAT_ID, FALLBACK_REPLY};
    use crate::notify::LogNotifier;
    use palaver_shared::types::{Chat, Presence, User};

    fn self_user() -> User {
        User {
            id: "me".to_string(),
            name: "Me".to_string(),
            username: Some("@me".to_string()),
            avatar: None,
            status: Presence::Online,
            last_seen: None,
        }
    }

    fn peer_user(id: &str) -> User {
        User {
            id: id.to_string(),
            name: id.to_string(),
            username: None,
            avatar: None,
            status: Presence::Online,
            last_seen: None,
        }
    }

    #[test]
    fn test_compose_text() {
        let msg = compose("me", Draft::text("hello"));
        assert_eq!(msg.sender_id, "me");
        assert_eq!(msg.text.as_deref(), Some("hello"));
        assert_eq!(msg.status, MessageStatus::Sending);
        assert!(msg.is_self);
        assert!(!msg.is_voice);
    }

    #[test]
    fn test_compose_voice() {
        let draft = Draft {
            voice: Some(VoiceClip {
                media_data: "data:audio/webm;base64,AAAA".to_string(),
                duration_secs: 7,
            }),
            ..Default::default()
        };
        let msg = compose("me", draft);
        assert!(msg.is_voice);
        assert_eq!(msg.voice_duration, Some(7));
        assert_eq!(msg.summary_label(), "Voice message");
    }

    #[test]
    fn test_two_phase_send() {
        let mut store = ConversationStore::in_memory();
        store.add_chat(Chat::for_user(peer_user("alice"), now_millis()));

        let msg = compose("me", Draft::text("outgoing"));
        commit_pending(&mut store, "alice", &msg);

        let stored = &store.messages("alice")[0];
        assert_eq!(stored.status, MessageStatus::Sending);
        assert_eq!(
            store.chat("alice").unwrap().last_message.as_deref(),
            Some("outgoing")
        );

        assert!(mark_sent(&mut store, "alice", msg.id));
        assert_eq!(store.messages("alice")[0].status, MessageStatus::Sent);

        // A second acknowledgment for a vanished message is a no-op.
        assert!(!mark_sent(&mut store, "alice", Uuid::new_v4()));
    }

    #[test]
    fn test_commit_does_not_touch_unread() {
        let mut store = ConversationStore::in_memory();
        let mut chat = Chat::for_user(peer_user("alice"), now_millis());
        chat.unread_count = 2;
        store.add_chat(chat);

        commit_pending(&mut store, "alice", &compose("me", Draft::text("hi")));

        assert_eq!(store.chat("alice").unwrap().unread_count, 2);
    }

    #[tokio::test]
    async fn test_assistant_round_trip_falls_back() {
        let mut store = ConversationStore::in_memory();
        ensure_assistant_chat(&mut store);
        store.set_auth(self_user(), "token".to_string());
        let state = Arc::new(Mutex::new(ClientState::new(store)));
        let generator = Generator::new(None);
        let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

        send_local(
            &state,
            &generator,
            ASSISTANT_CHAT_ID,
            Draft::text("hello there"),
            &notifier,
        )
        .await;

        let guard = state.lock().unwrap();
        let messages = guard.store.messages(ASSISTANT_CHAT_ID);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].is_self);
        assert!(!messages[1].is_self);
        assert_eq!(messages[1].text.as_deref(), Some(FALLBACK_REPLY));
        assert_eq!(
            guard.store.chat(ASSISTANT_CHAT_ID).unwrap().unread_count,
            1
        );
    }

    #[tokio::test]
    async fn test_send_requires_login() {
        let state = Arc::new(Mutex::new(ClientState::new(ConversationStore::in_memory())));
        let generator = Generator::new(None);
        let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

        send_local(&state, &generator, "alice", Draft::text("void"), &notifier).await;

        assert!(state.lock().unwrap().store.messages("alice").is_empty());
    }
}
