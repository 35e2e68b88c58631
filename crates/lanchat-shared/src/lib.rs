// Wire types, room crypto and frame codec shared by the lanchat crates.

pub mod attachment;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod protocol;
pub mod types;

pub use attachment::{Attachment, ReplyRef};
pub use crypto::{room_fingerprint, room_key, CryptoProvider, PassphraseCipher};
pub use error::{ChatError, CryptoError, ProtocolError, ValidationError};
pub use protocol::{Envelope, InboundFrame, JsonEvent, NameAnnouncement, Notice, OutboundFrame};
pub use types::{ConnectionState, MessageId, PeerAddress, RoomFingerprint};
