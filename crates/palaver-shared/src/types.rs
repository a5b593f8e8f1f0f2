//! Conversation domain model.
//!
//! Field names serialize as camelCase because the same structs double as the
//! wire representation inside an [`crate::envelope::Envelope`] and as the
//! persisted snapshot layout.

use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current epoch time in milliseconds, the timestamp unit used on the wire.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Encode raw bytes as a `data:` URI for inline transport (avatars, voice
/// clips, pasted images).
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{mime};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Whether a user is currently reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Online,
    Offline,
}

/// Local delivery state of an outgoing message.
///
/// This is never negotiated with the peer; `Read` is declared for forward
/// compatibility but no operation currently sets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    Sent,
    Read,
}

/// A user identity as issued by the auth service.
///
/// The `id` is stable and server-issued; everything else is mutable only by
/// the owning user through a profile update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    /// Unique handle, always starting with the reserved sigil.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Avatar image encoded as a `data:` URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub status: Presence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<i64>,
}

/// A single chat message.
///
/// Ids are client-generated and globally unique. Per-chat ordering is
/// insertion order, never timestamp order: clock skew between peers is not
/// corrected, so sequences are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Pasted image as a `data:` URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub is_voice: bool,
    /// Binary attachment (voice audio) as a `data:` URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_data: Option<String>,
    /// Voice clip length in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_duration: Option<u32>,
    pub timestamp: i64,
    pub status: MessageStatus,
    pub is_self: bool,
    /// Back-reference to another message in the same chat; existence is not
    /// enforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<Uuid>,
    // Declared for forward compatibility; no mutation path sets these yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_edited: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarded_from: Option<String>,
}

impl Message {
    /// Human-readable one-line summary used for the chat list.
    pub fn summary_label(&self) -> String {
        if self.image.is_some() {
            "Photo".to_string()
        } else if self.is_voice {
            "Voice message".to_string()
        } else if let Some(ref text) = self.text {
            text.clone()
        } else {
            "Media".to_string()
        }
    }
}

/// The local representation of a single-counterpart conversation.
///
/// `id` equals the counterpart's [`User::id`]; there is no separate
/// conversation identifier, and at most one chat exists per counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_time: Option<i64>,
    /// Used for chat list ordering, most recent first.
    pub last_activity: i64,
    pub unread_count: u32,
}

impl Chat {
    /// Fresh chat for a newly seen counterpart.
    pub fn for_user(user: User, now: i64) -> Self {
        Self {
            id: user.id.clone(),
            user,
            last_message: None,
            last_message_time: None,
            last_activity: now,
            unread_count: 0,
        }
    }
}
