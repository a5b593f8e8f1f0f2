//! Inbound payload dispatch.
//!
//! Every decoded envelope from a peer link funnels through
//! [`dispatch_inbound`], which applies the conversation mutations for the
//! payload kind. The synthetic assistant contact feeds its replies through
//! the same entry point, so there is exactly one code path that turns a
//! received payload into state.

use tracing::{debug, trace};

use palaver_shared::envelope::Envelope;
use palaver_shared::types::{now_millis, Chat, Message};
use palaver_store::ChatPatch;

use crate::notify::Notifier;
use crate::state::ClientState;

/// Apply one inbound envelope to the conversation state.
///
/// `peer` is the link the payload arrived on; the chat a message lands in is
/// keyed by the sender id the payload itself declares.
pub fn dispatch_inbound(
    state: &mut ClientState,
    peer: &str,
    envelope: Envelope,
    notifier: &dyn Notifier,
) {
    match envelope {
        Envelope::Handshake(user) => {
            trace!(peer = %peer, user = %user.id, "Handshake received");
            // Create-only: a repeated handshake must not clobber an existing
            // chat's summary fields or unread count.
            if state.store.chat(&user.id).is_none() {
                state.store.add_chat(Chat::for_user(user, now_millis()));
            }
        }
        Envelope::Text(message) | Envelope::Voice(message) | Envelope::Media(message) => {
            apply_message(state, message, notifier);
        }
        Envelope::Unknown => {
            debug!(peer = %peer, "Ignoring envelope with unrecognized tag");
        }
    }
}

fn apply_message(state: &mut ClientState, mut message: Message, notifier: &dyn Notifier) {
    // Authorship is a local judgment; whatever the sender claimed, an
    // inbound message is by definition not ours.
    message.is_self = false;

    let chat_id = message.sender_id.clone();
    let suppressed = state.visible && state.store.active_chat_id() == Some(chat_id.as_str());
    let unread = if suppressed {
        0
    } else {
        state
            .store
            .chat(&chat_id)
            .map(|c| c.unread_count)
            .unwrap_or(0)
            + 1
    };

    // Summary times come from the message itself, same as the outbound
    // path; the arrival clock is never consulted.
    let label = message.summary_label();
    let timestamp = message.timestamp;
    state.store.add_message(&chat_id, message);
    state.store.update_chat(
        &chat_id,
        ChatPatch {
            last_message: Some(label),
            last_message_time: Some(timestamp),
            last_activity: Some(timestamp),
            unread_count: Some(unread),
            ..Default::default()
        },
    );

    if !suppressed {
        notifier.notify();
    }
}
