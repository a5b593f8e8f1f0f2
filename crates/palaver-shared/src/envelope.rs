//! Wire envelope codec.
//!
//! Every payload crossing a peer link is wrapped in a tagged JSON envelope
//! `{ "type": ..., "data": ... }`. Decoding happens exactly once at the
//! boundary; the dispatcher pattern-matches the resulting variant instead of
//! inspecting fields ad hoc. Unrecognized tags decode to [`Envelope::Unknown`]
//! rather than an error so a newer peer can never crash an older receiver.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Message, User};

/// Errors produced by the envelope codec.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    /// The payload is not parseable structured data.
    #[error("Malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The tagged wrapper around any payload sent over a peer link.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Envelope {
    /// First payload on a newly opened link, carrying profile identity.
    Handshake(User),
    Text(Message),
    Voice(Message),
    Media(Message),
    /// A tag this version does not recognize; silently ignored.
    Unknown,
}

/// Raw intermediate shape used to separate tag recognition from payload
/// decoding, so an unknown tag never fails on its payload.
#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    tag: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl Envelope {
    /// Wrap an outgoing message, choosing the tag from its content: `voice`
    /// for voice clips, `media` for other binary attachments, `text`
    /// otherwise.
    pub fn for_message(message: Message) -> Self {
        if message.is_voice {
            Envelope::Voice(message)
        } else if message.media_data.is_some() {
            Envelope::Media(message)
        } else {
            Envelope::Text(message)
        }
    }

    pub fn handshake(user: User) -> Self {
        Envelope::Handshake(user)
    }

    /// Serialize to wire JSON.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from wire JSON.
    ///
    /// Fails only when the bytes are not a parseable envelope at all; an
    /// unknown tag yields [`Envelope::Unknown`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let raw: RawEnvelope = serde_json::from_slice(bytes)?;
        Ok(match raw.tag.as_str() {
            "handshake" => Envelope::Handshake(serde_json::from_value(raw.data)?),
            "text" => Envelope::Text(serde_json::from_value(raw.data)?),
            "voice" => Envelope::Voice(serde_json::from_value(raw.data)?),
            "media" => Envelope::Media(serde_json::from_value(raw.data)?),
            _ => Envelope::Unknown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{now_millis, MessageStatus, Presence};
    use uuid::Uuid;

    fn test_user() -> User {
        User {
            id: "user-1".to_string(),
            name: "Alice".to_string(),
            username: Some("@alice".to_string()),
            avatar: None,
            status: Presence::Online,
            last_seen: None,
        }
    }

    fn test_message() -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: "user-1".to_string(),
            text: Some("hello there".to_string()),
            image: None,
            is_voice: false,
            media_data: None,
            voice_duration: None,
            timestamp: now_millis(),
            status: MessageStatus::Sending,
            is_self: true,
            reply_to_id: None,
            is_edited: None,
            forwarded_from: None,
        }
    }

    #[test]
    fn test_text_round_trip() {
        let original = test_message();
        let bytes = Envelope::for_message(original.clone()).to_bytes().unwrap();
        let decoded = Envelope::from_bytes(&bytes).unwrap();

        match decoded {
            Envelope::Text(msg) => {
                assert_eq!(msg.id, original.id);
                assert_eq!(msg.sender_id, original.sender_id);
                assert_eq!(msg.text, original.text);
                assert_eq!(msg.timestamp, original.timestamp);
            }
            other => panic!("expected text envelope, got {other:?}"),
        }
    }

    #[test]
    fn test_handshake_round_trip() {
        let bytes = Envelope::handshake(test_user()).to_bytes().unwrap();
        match Envelope::from_bytes(&bytes).unwrap() {
            Envelope::Handshake(user) => assert_eq!(user, test_user()),
            other => panic!("expected handshake, got {other:?}"),
        }
    }

    #[test]
    fn test_tag_selection() {
        let mut msg = test_message();
        assert!(matches!(
            Envelope::for_message(msg.clone()),
            Envelope::Text(_)
        ));

        msg.media_data = Some("data:audio/webm;base64,AAAA".to_string());
        assert!(matches!(
            Envelope::for_message(msg.clone()),
            Envelope::Media(_)
        ));

        msg.is_voice = true;
        assert!(matches!(Envelope::for_message(msg), Envelope::Voice(_)));
    }

    #[test]
    fn test_unknown_tag_is_not_an_error() {
        let bytes = br#"{"type":"sticker","data":{"whatever":true}}"#;
        assert_eq!(Envelope::from_bytes(bytes).unwrap(), Envelope::Unknown);
    }

    #[test]
    fn test_malformed_payload_fails() {
        assert!(Envelope::from_bytes(b"not json at all").is_err());
        // A known tag with a payload of the wrong shape is malformed too.
        assert!(Envelope::from_bytes(br#"{"type":"text","data":42}"#).is_err());
    }

    #[test]
    fn test_wire_shape() {
        let bytes = Envelope::handshake(test_user()).to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], "handshake");
        assert_eq!(value["data"]["id"], "user-1");
    }
}
