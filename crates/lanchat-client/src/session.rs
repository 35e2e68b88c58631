//! Room-scoped chat session.
//!
//! [`ChatSession`] owns everything one chat client knows: connection state,
//! the peer roster, the message log, the pending reply and the image cache.
//! It is driven synchronously by user intents (`configure`, `connect`,
//! `send_message`, ...) and by transport events, and pushes
//! [`ViewEvent`]s to the rendering surface.
//!
//! Messages are sealed with a key derived from the room passphrase. Frames
//! that do not open with our key are dropped without a trace, so a client in
//! another room never learns that a message existed.

use chrono::Utc;
use tracing::{debug, info, warn};

use lanchat_shared::attachment::preview;
use lanchat_shared::constants::OWN_SENDER_LABEL;
use lanchat_shared::{
    room_fingerprint, Attachment, ChatError, ConnectionState, CryptoProvider, Envelope,
    InboundFrame, JsonEvent, MessageId, NameAnnouncement, Notice, OutboundFrame,
    PassphraseCipher, ReplyRef, RoomFingerprint, ValidationError,
};
use lanchat_store::LocalStore;

use crate::announce::Announcer;
use crate::events::{emit_event, EventSender, ViewEvent};
use crate::image_cache::ImageCache;
use crate::models::{ChatMessage, LocalPeer};
use crate::roster::{PeerRoster, RosterView};
use crate::transport::{Connector, FrameSink, TransportEvent};

pub struct ChatSession {
    ws_url: String,
    connector: Box<dyn Connector>,
    announcer: Box<dyn Announcer>,
    cipher: Box<dyn CryptoProvider>,
    store: Box<dyn LocalStore>,
    events: EventSender,

    state: ConnectionState,
    /// Bumped on every connect/disconnect; transport events carrying an older
    /// value belong to a socket we already abandoned.
    generation: u64,
    sink: Option<Box<dyn FrameSink>>,

    configured: bool,
    local: LocalPeer,
    passphrase: String,
    room: RoomFingerprint,

    roster: PeerRoster,
    messages: Vec<ChatMessage>,
    pending_reply: Option<ReplyRef>,
    pending_attachment: Option<Attachment>,
    images: ImageCache,
}

impl ChatSession {
    /// Create a disconnected session, seeded with the persisted display name
    /// and image cache.
    pub fn new(
        ws_url: impl Into<String>,
        connector: Box<dyn Connector>,
        announcer: Box<dyn Announcer>,
        store: Box<dyn LocalStore>,
        events: EventSender,
    ) -> Self {
        let display_name = match store.load_display_name() {
            Ok(name) => name.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Failed to load display name");
                String::new()
            }
        };

        let images = match store.load_image_cache() {
            Ok(entries) => ImageCache::from_entries(entries),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable image cache");
                ImageCache::new()
            }
        };

        Self {
            ws_url: ws_url.into(),
            connector,
            announcer,
            cipher: Box::new(PassphraseCipher::new()),
            store,
            events,
            state: ConnectionState::Disconnected,
            generation: 0,
            sink: None,
            configured: false,
            local: LocalPeer {
                address: None,
                display_name,
            },
            passphrase: String::new(),
            room: RoomFingerprint::public(),
            roster: PeerRoster::new(),
            messages: Vec::new(),
            pending_reply: None,
            pending_attachment: None,
            images,
        }
    }

    /// Replace the default XChaCha20-Poly1305 cipher.
    pub fn with_cipher(mut self, cipher: Box<dyn CryptoProvider>) -> Self {
        self.cipher = cipher;
        self
    }

    // -----------------------------------------------------------------------
    // Identity and room
    // -----------------------------------------------------------------------

    /// Set the display name and room passphrase. An empty passphrase joins the
    /// public room.
    ///
    /// If the relay already assigned us an address, the new name and room are
    /// announced right away so the roster on every side follows the switch.
    pub fn configure(&mut self, display_name: &str, passphrase: &str) -> Result<(), ChatError> {
        let name = display_name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyDisplayName.into());
        }
        let room = room_fingerprint(passphrase)?;

        self.local.display_name = name.to_string();
        self.passphrase = passphrase.to_string();
        self.room = room;
        self.configured = true;

        if let Err(e) = self.store.save_display_name(name) {
            warn!(error = %e, "Failed to persist display name");
        }

        info!(name = %name, room = %self.room.short(), "Session configured");

        if self.local.address.is_some() {
            self.announce();
        }
        self.emit_roster();
        Ok(())
    }

    pub fn set_display_name(&mut self, display_name: &str) -> Result<(), ChatError> {
        let passphrase = self.passphrase.clone();
        self.configure(display_name, &passphrase)
    }

    pub fn join_room(&mut self, passphrase: &str) -> Result<(), ChatError> {
        let name = self.local.display_name.clone();
        self.configure(&name, passphrase)
    }

    // -----------------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------------

    /// Open the relay connection. An existing connection is torn down first.
    pub fn connect(&mut self) -> Result<(), ChatError> {
        if !self.configured {
            return Err(ChatError::NotConfigured);
        }

        if self.sink.is_some() {
            debug!("Replacing active connection");
            self.release_connection();
        }

        self.generation += 1;
        self.set_state(ConnectionState::Connecting, "Connecting...".to_string());

        match self.connector.open(&self.ws_url, self.generation) {
            Ok(sink) => {
                self.sink = Some(sink);
                Ok(())
            }
            Err(e) => {
                warn!(url = %self.ws_url, error = %e, "Failed to open connection");
                self.set_state(ConnectionState::Disconnected, format!("Connection error: {e}"));
                Err(e)
            }
        }
    }

    /// Close the connection and forget everything tied to it. Calling it
    /// again, or before any connection, does nothing.
    pub fn disconnect(&mut self) {
        if self.sink.is_none() && self.state == ConnectionState::Disconnected {
            debug!("Already disconnected");
            return;
        }

        self.generation += 1;
        self.release_connection();
        self.set_state(
            ConnectionState::Disconnected,
            "Disconnected from server, you can change your name".to_string(),
        );
        self.emit_roster();
    }

    /// Feed one event from the connection opened with `generation`.
    pub fn handle_transport_event(&mut self, generation: u64, event: TransportEvent) {
        if generation != self.generation || self.sink.is_none() {
            debug!(generation, current = self.generation, ?event, "Ignoring stale transport event");
            return;
        }

        match event {
            // Presence is announced once the relay assigns our address.
            TransportEvent::Opened => {
                self.set_state(ConnectionState::Connected, "Connected to server".to_string());
            }
            TransportEvent::Frame(raw) => self.on_transport_message(&raw),
            TransportEvent::Closed => self.connection_lost("Disconnected from server".to_string()),
            TransportEvent::Error(e) => self.connection_lost(format!("Connection error: {e}")),
        }
    }

    /// Dispatch one inbound text frame.
    pub fn on_transport_message(&mut self, raw: &str) {
        if self.state == ConnectionState::Disconnected {
            debug!("Ignoring frame while disconnected");
            return;
        }

        let frame = match InboundFrame::parse(raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed frame");
                return;
            }
        };

        match frame {
            InboundFrame::Notice(Notice::NewConnection(address)) => {
                // Room unknown until the peer announces itself.
                self.roster.on_connected(address);
            }
            InboundFrame::Notice(Notice::ClosedConnection(address)) => {
                self.roster.on_disconnected(&address);
                self.emit_roster();
            }
            InboundFrame::Notice(Notice::YourAddress(address)) => {
                if let Some(current) = &self.local.address {
                    warn!(current = %current, offered = %address, "Relay re-assigned our address, ignoring");
                    return;
                }
                info!(address = %address, "Relay assigned our address");
                self.local.address = Some(address);
                self.announce();
                self.emit_roster();
            }
            InboundFrame::Event(JsonEvent::NameUpdate(announcement)) => {
                self.roster.upsert(&announcement);
                if self.local.address.as_ref() == Some(&announcement.address) {
                    self.local.display_name = announcement.name.clone();
                }
                self.emit_roster();
            }
            InboundFrame::Event(JsonEvent::Encrypted { data }) => self.on_sealed_message(&data),
            InboundFrame::Event(JsonEvent::Message(envelope)) => self.append_message(envelope),
            InboundFrame::Ignored => debug!("Ignoring unrecognised frame"),
        }
    }

    // -----------------------------------------------------------------------
    // Messaging
    // -----------------------------------------------------------------------

    /// Seal and send a message. Returns `Ok(None)` without sending when there
    /// is nothing to send or no relay address yet.
    ///
    /// Without an explicit `attachment`, one picked with
    /// [`attach_from_cache`](Self::attach_from_cache) is used. The pending
    /// reply and attachment are only consumed once the frame is handed to the
    /// transport.
    pub fn send_message(
        &mut self,
        body: &str,
        attachment: Option<Attachment>,
    ) -> Result<Option<MessageId>, ChatError> {
        let body = body.trim();
        let attachment = attachment.or_else(|| self.pending_attachment.clone());

        if body.is_empty() && attachment.is_none() {
            return Ok(None);
        }
        let Some(address) = self.local.address.clone() else {
            debug!("No relay address yet, message not sent");
            return Ok(None);
        };
        if let Some(att) = &attachment {
            att.validate()?;
        }

        let envelope = Envelope {
            id: MessageId::generate(),
            sender: self.local.display_name.clone(),
            sender_address: Some(address),
            content: body.to_string(),
            attachment,
            reply_to: self.pending_reply.clone(),
            timestamp: Some(Utc::now().to_rfc3339()),
        };

        let sealed = self.cipher.encrypt(&envelope.to_plaintext()?, &self.passphrase)?;
        let frame = OutboundFrame::Encrypted { data: sealed }.to_json()?;
        self.transmit(frame)?;

        self.pending_attachment = None;
        if self.pending_reply.take().is_some() {
            emit_event(&self.events, ViewEvent::ReplyStateChanged(None));
        }

        debug!(id = %envelope.id, "Message sent");
        Ok(Some(envelope.id))
    }

    /// Quote a message in the next send. The preview is truncated.
    pub fn set_reply(&mut self, message_id: MessageId, body_preview: &str, sender: &str) {
        let reply = ReplyRef::new(message_id, preview(body_preview), sender);
        self.pending_reply = Some(reply.clone());
        emit_event(&self.events, ViewEvent::ReplyStateChanged(Some(reply)));
    }

    /// Quote a message from the local log by id. Returns `false` if it is not
    /// in the log.
    pub fn reply_to_message(&mut self, message_id: &MessageId) -> bool {
        let Some(message) = self.messages.iter().find(|m| &m.id == message_id) else {
            return false;
        };
        let (body, sender) = (message.body.clone(), message.sender_display_name.clone());
        self.set_reply(message_id.clone(), &body, &sender);
        true
    }

    pub fn cancel_reply(&mut self) {
        self.pending_reply = None;
        emit_event(&self.events, ViewEvent::ReplyStateChanged(None));
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
        emit_event(&self.events, ViewEvent::MessagesCleared);
    }

    // -----------------------------------------------------------------------
    // Image cache
    // -----------------------------------------------------------------------

    /// Remember an image for later reuse. Returns `false` if the same payload
    /// was already cached.
    pub fn cache_image(&mut self, image: Attachment) -> Result<bool, ChatError> {
        image.validate()?;
        let inserted = self.images.insert(image);
        self.images_changed();
        Ok(inserted)
    }

    pub fn delete_from_cache(&mut self, index: usize) -> Option<Attachment> {
        let removed = self.images.remove(index);
        self.images_changed();
        removed
    }

    /// Pick a cached image as the attachment for the next message.
    pub fn attach_from_cache(&mut self, index: usize) -> Option<Attachment> {
        let image = self.images.get(index).cloned();
        if image.is_some() {
            self.pending_attachment = image.clone();
        }
        self.images_changed();
        image
    }

    pub fn clear_pending_attachment(&mut self) {
        self.pending_attachment = None;
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn local(&self) -> &LocalPeer {
        &self.local
    }

    pub fn room(&self) -> &RoomFingerprint {
        &self.room
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn roster(&self) -> &PeerRoster {
        &self.roster
    }

    pub fn render_roster(&self) -> RosterView {
        self.roster.render(&self.local, &self.room)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn pending_reply(&self) -> Option<&ReplyRef> {
        self.pending_reply.as_ref()
    }

    pub fn pending_attachment(&self) -> Option<&Attachment> {
        self.pending_attachment.as_ref()
    }

    pub fn images(&self) -> Vec<Attachment> {
        self.images.to_vec()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn on_sealed_message(&mut self, data: &str) {
        let plaintext = match self.cipher.decrypt(data, &self.passphrase) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                debug!(error = %e, "Dropping sealed frame we cannot open");
                return;
            }
        };

        match Envelope::from_plaintext(&plaintext) {
            Ok(envelope) => self.append_message(envelope),
            Err(e) => debug!(error = %e, "Dropping sealed frame without a chat message"),
        }
    }

    fn append_message(&mut self, envelope: Envelope) {
        let is_own = match &envelope.sender_address {
            Some(address) => self.local.address.as_ref() == Some(address),
            // Legacy frames only carry a name (or, from old clients, an address).
            None => {
                !envelope.sender.is_empty()
                    && (self
                        .local
                        .address
                        .as_ref()
                        .is_some_and(|a| a.as_str() == envelope.sender)
                        || envelope.sender == self.local.display_name)
            }
        };

        let message = ChatMessage {
            id: if envelope.id.is_empty() {
                MessageId::generate()
            } else {
                envelope.id
            },
            sender_display_name: if is_own {
                OWN_SENDER_LABEL.to_string()
            } else {
                envelope.sender
            },
            sender_address: envelope.sender_address,
            body: envelope.content,
            attachment: envelope.attachment,
            reply_to: envelope.reply_to,
            received_at: Utc::now(),
            is_own,
        };

        debug!(id = %message.id, own = is_own, "Message appended");
        self.messages.push(message.clone());
        emit_event(&self.events, ViewEvent::MessageAppended(message));
    }

    fn transmit(&mut self, frame: String) -> Result<(), ChatError> {
        let Some(sink) = self.sink.as_mut() else {
            return Err(ChatError::Transport("Not connected".into()));
        };
        if let Err(e) = sink.send_text(frame) {
            self.connection_lost(format!("Connection error: {e}"));
            return Err(e);
        }
        Ok(())
    }

    fn announce(&self) {
        let Some(address) = &self.local.address else {
            return;
        };
        let announcement = NameAnnouncement {
            address: address.clone(),
            name: self.local.display_name.clone(),
            room_hash: self.room.clone(),
        };
        debug!(address = %address, room = %self.room.short(), "Announcing presence");
        self.announcer.announce(&announcement);
    }

    /// Close the sink (if any) and drop connection-scoped state.
    fn release_connection(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            sink.close();
        }
        self.roster.clear();
        self.local.address = None;
    }

    fn connection_lost(&mut self, detail: String) {
        self.release_connection();
        self.set_state(ConnectionState::Disconnected, detail);
        self.emit_roster();
    }

    fn set_state(&mut self, state: ConnectionState, detail: String) {
        self.state = state;
        info!(state = %state, detail = %detail, "Connection state changed");
        emit_event(&self.events, ViewEvent::StatusChanged { state, detail });
    }

    fn emit_roster(&self) {
        emit_event(&self.events, ViewEvent::PeerListChanged(self.render_roster()));
    }

    fn images_changed(&self) {
        let entries = self.images.to_vec();
        if let Err(e) = self.store.save_image_cache(&entries) {
            warn!(error = %e, "Failed to persist image cache");
        }
        emit_event(&self.events, ViewEvent::ImageCacheChanged(entries));
    }
}
