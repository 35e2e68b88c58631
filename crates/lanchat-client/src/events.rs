//! View-model events pushed from the session to the rendering surface.

use serde::Serialize;
use tokio::sync::mpsc;

use lanchat_shared::{Attachment, ConnectionState, ReplyRef};

use crate::models::ChatMessage;
use crate::roster::RosterView;

pub const EVENT_PEER_LIST_CHANGED: &str = "peer-list-changed";
pub const EVENT_MESSAGE_APPENDED: &str = "message-appended";
pub const EVENT_MESSAGES_CLEARED: &str = "messages-cleared";
pub const EVENT_REPLY_STATE_CHANGED: &str = "reply-state-changed";
pub const EVENT_IMAGE_CACHE_CHANGED: &str = "image-cache-changed";
pub const EVENT_STATUS_CHANGED: &str = "status-changed";

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum ViewEvent {
    PeerListChanged(RosterView),
    MessageAppended(ChatMessage),
    MessagesCleared,
    ReplyStateChanged(Option<ReplyRef>),
    ImageCacheChanged(Vec<Attachment>),
    StatusChanged {
        state: ConnectionState,
        detail: String,
    },
}

impl ViewEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PeerListChanged(_) => EVENT_PEER_LIST_CHANGED,
            Self::MessageAppended(_) => EVENT_MESSAGE_APPENDED,
            Self::MessagesCleared => EVENT_MESSAGES_CLEARED,
            Self::ReplyStateChanged(_) => EVENT_REPLY_STATE_CHANGED,
            Self::ImageCacheChanged(_) => EVENT_IMAGE_CACHE_CHANGED,
            Self::StatusChanged { .. } => EVENT_STATUS_CHANGED,
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<ViewEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ViewEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

pub fn emit_event(tx: &EventSender, event: ViewEvent) {
    let name = event.name();
    if tx.send(event).is_err() {
        tracing::warn!(event = name, "Rendering surface gone, dropping event");
    }
}
