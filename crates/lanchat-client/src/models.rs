use chrono::{DateTime, Utc};
use serde::Serialize;

use lanchat_shared::{Attachment, MessageId, PeerAddress, ReplyRef};

/// A message as it sits in the local log. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    /// Sender name, or "You" for our own messages.
    pub sender_display_name: String,
    /// `None` for legacy plaintext frames, which only carry a name.
    pub sender_address: Option<PeerAddress>,
    pub body: String,
    pub attachment: Option<Attachment>,
    pub reply_to: Option<ReplyRef>,
    pub received_at: DateTime<Utc>,
    pub is_own: bool,
}

/// This client's own identity on the relay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalPeer {
    /// Assigned by the relay once per connection; `None` while disconnected.
    pub address: Option<PeerAddress>,
    pub display_name: String,
}
