use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attachment::{Attachment, ReplyRef};
use crate::constants::{NOTICE_CLOSED_CONNECTION, NOTICE_NEW_CONNECTION, NOTICE_YOUR_ADDRESS};
use crate::error::ProtocolError;
use crate::types::{MessageId, PeerAddress, RoomFingerprint};

/// Prefixed plain-text line emitted by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A socket connected; its room is unknown until it announces itself.
    NewConnection(PeerAddress),
    ClosedConnection(PeerAddress),
    /// Address the relay assigned to this client.
    YourAddress(PeerAddress),
}

impl Notice {
    pub fn address(&self) -> &PeerAddress {
        match self {
            Self::NewConnection(a) | Self::ClosedConnection(a) | Self::YourAddress(a) => a,
        }
    }
}

/// JSON object frame, dispatched on its `type` field.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonEvent {
    /// `name-update` or `update-name`
    NameUpdate(NameAnnouncement),
    Encrypted { data: String },
    /// Legacy plaintext chat message.
    Message(Envelope),
}

/// Every text frame the relay can deliver.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Notice(Notice),
    Event(JsonEvent),
    /// Valid JSON with an unknown or missing `type`.
    Ignored,
}

impl InboundFrame {
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        if let Some(notice) = parse_notice(raw) {
            // A notice without an address carries nothing to act on.
            if notice.address().as_str().is_empty() {
                return Ok(Self::Ignored);
            }
            return Ok(Self::Notice(notice));
        }

        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ProtocolError::MalformedFrame(e.to_string()))?;
        let kind = value.get("type").and_then(Value::as_str).unwrap_or_default();

        let event = match kind {
            "name-update" | "update-name" => {
                let mut announcement: NameAnnouncement = from_value(value)?;
                announcement.address = PeerAddress::normalize(announcement.address.as_str());
                JsonEvent::NameUpdate(announcement)
            }
            "encrypted" => {
                let data = value
                    .get("data")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ProtocolError::MalformedFrame("encrypted frame without data".into()))?;
                JsonEvent::Encrypted {
                    data: data.to_string(),
                }
            }
            "message" => JsonEvent::Message(from_value(value)?),
            _ => return Ok(Self::Ignored),
        };
        Ok(Self::Event(event))
    }
}

fn parse_notice(raw: &str) -> Option<Notice> {
    if let Some(rest) = raw.strip_prefix(NOTICE_NEW_CONNECTION) {
        return Some(Notice::NewConnection(PeerAddress::normalize(rest)));
    }
    if let Some(rest) = raw.strip_prefix(NOTICE_CLOSED_CONNECTION) {
        return Some(Notice::ClosedConnection(PeerAddress::normalize(rest)));
    }
    if let Some(rest) = raw.strip_prefix(NOTICE_YOUR_ADDRESS) {
        return Some(Notice::YourAddress(PeerAddress::normalize(rest)));
    }
    None
}

fn from_value<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))
}

/// Presence announcement: who sits at `address` and which room they joined.
/// Posted to the relay's `/update-name` endpoint and echoed back to every
/// client in the same room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NameAnnouncement {
    pub address: PeerAddress,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "roomHash", default)]
    pub room_hash: RoomFingerprint,
}

/// Frames this client writes to the relay socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum OutboundFrame {
    #[serde(rename = "encrypted")]
    Encrypted { data: String },
}

impl OutboundFrame {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Plaintext chat message, sealed with the room key before it leaves the
/// client. Legacy relays deliver the same shape unencrypted with only
/// `sender`, `content` and `timestamp` set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default)]
    pub id: MessageId,
    #[serde(default)]
    pub sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_address: Option<PeerAddress>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyRef>,
    /// Sender-side clock, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum SealedPayload<'a> {
    #[serde(rename = "message")]
    Message(&'a Envelope),
}

impl Envelope {
    /// JSON text that gets encrypted: the envelope tagged `type: "message"`.
    pub fn to_plaintext(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(&SealedPayload::Message(self))?)
    }

    pub fn from_plaintext(plaintext: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(plaintext)?;
        match value.get("type").and_then(Value::as_str) {
            Some("message") => from_value(value),
            Some(other) => Err(ProtocolError::UnexpectedEnvelope(other.to_string())),
            None => Err(ProtocolError::UnexpectedEnvelope(String::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notices() {
        assert_eq!(
            InboundFrame::parse("New connection: 10.0.0.2:50123").unwrap(),
            InboundFrame::Notice(Notice::NewConnection("10.0.0.2:50123".into()))
        );
        assert_eq!(
            InboundFrame::parse("Closed connection: /10.0.0.2:50123").unwrap(),
            InboundFrame::Notice(Notice::ClosedConnection("10.0.0.2:50123".into()))
        );
        assert_eq!(
            InboundFrame::parse("Your address: 1.2.3.4:5").unwrap(),
            InboundFrame::Notice(Notice::YourAddress("1.2.3.4:5".into()))
        );
    }

    #[test]
    fn test_notice_without_address_ignored() {
        for raw in ["Your address: ", "Your address:", "New connection: /", "Closed connection:  "] {
            assert_eq!(InboundFrame::parse(raw).unwrap(), InboundFrame::Ignored, "{raw:?}");
        }
    }

    #[test]
    fn test_parse_name_update_both_spellings() {
        for kind in ["name-update", "update-name"] {
            let raw = format!(
                r#"{{"type":"{kind}","address":"10.0.0.3","name":"Alice","roomHash":"ab12"}}"#
            );
            let frame = InboundFrame::parse(&raw).unwrap();
            assert_eq!(
                frame,
                InboundFrame::Event(JsonEvent::NameUpdate(NameAnnouncement {
                    address: "10.0.0.3".into(),
                    name: "Alice".into(),
                    room_hash: RoomFingerprint("ab12".into()),
                }))
            );
        }
    }

    #[test]
    fn test_name_update_without_room_is_public() {
        let frame =
            InboundFrame::parse(r#"{"type":"update-name","address":"h:1","name":"Bo"}"#).unwrap();
        match frame {
            InboundFrame::Event(JsonEvent::NameUpdate(a)) => assert!(a.room_hash.is_public()),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_parse_legacy_message() {
        let raw = r#"{"type":"message","content":"hey","sender":"Alice","timestamp":"10:42:01"}"#;
        match InboundFrame::parse(raw).unwrap() {
            InboundFrame::Event(JsonEvent::Message(env)) => {
                assert_eq!(env.content, "hey");
                assert_eq!(env.sender, "Alice");
                assert!(env.id.is_empty());
                assert!(env.sender_address.is_none());
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_ignored_and_garbage_rejected() {
        assert_eq!(InboundFrame::parse(r#"{"type":"typing"}"#).unwrap(), InboundFrame::Ignored);
        assert_eq!(InboundFrame::parse(r#"{"hello":1}"#).unwrap(), InboundFrame::Ignored);
        assert!(matches!(
            InboundFrame::parse("definitely not json"),
            Err(ProtocolError::MalformedFrame(_))
        ));
        assert!(InboundFrame::parse(r#"{"type":"encrypted"}"#).is_err());
    }

    #[test]
    fn test_outbound_frame_shape() {
        let json = OutboundFrame::Encrypted { data: "abc".into() }.to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "encrypted");
        assert_eq!(value["data"], "abc");
    }

    #[test]
    fn test_envelope_plaintext_is_tagged() {
        let env = Envelope {
            id: MessageId::from("1-abc"),
            sender: "Alice".into(),
            sender_address: Some("1.2.3.4:5".into()),
            content: "hi".into(),
            reply_to: Some(ReplyRef::new(MessageId::from("m1"), "hello", "Bob")),
            ..Default::default()
        };
        let text = env.to_plaintext().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "message");
        assert_eq!(value["senderAddress"], "1.2.3.4:5");
        assert_eq!(value["replyTo"]["bodyPreview"], "hello");
        assert!(value.get("attachment").is_none());

        assert_eq!(Envelope::from_plaintext(&text).unwrap(), env);
    }

    #[test]
    fn test_non_message_envelope_rejected() {
        assert!(matches!(
            Envelope::from_plaintext(r#"{"type":"reaction","emoji":"+1"}"#),
            Err(ProtocolError::UnexpectedEnvelope(t)) if t == "reaction"
        ));
        assert!(Envelope::from_plaintext("[1,2,3]").is_err());
    }
}
