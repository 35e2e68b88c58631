pub mod announce;
pub mod config;
pub mod console;
pub mod events;
pub mod image_cache;
pub mod models;
pub mod roster;
pub mod session;
pub mod transport;

pub use announce::{Announcer, HttpAnnouncer};
pub use config::ClientConfig;
pub use events::{event_channel, EventReceiver, EventSender, ViewEvent};
pub use image_cache::ImageCache;
pub use models::{ChatMessage, LocalPeer};
pub use roster::{Peer, PeerRoster, RosterEntry, RosterView};
pub use session::ChatSession;
pub use transport::{Connector, FrameSink, TransportEvent, WsConnector};
