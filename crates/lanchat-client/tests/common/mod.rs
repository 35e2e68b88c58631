//! Recording fakes for driving a `ChatSession` without a relay.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use lanchat_client::{
    event_channel, Announcer, ChatSession, Connector, EventReceiver, FrameSink, TransportEvent,
    ViewEvent,
};
use lanchat_shared::{ChatError, NameAnnouncement};
use lanchat_store::MemoryStore;

pub const WS_URL: &str = "ws://relay.test:4001/ws";

/// Shared record of everything the fake transport saw.
#[derive(Clone, Default)]
pub struct Wire {
    pub sent: Rc<RefCell<Vec<String>>>,
    pub opens: Rc<RefCell<Vec<(String, u64)>>>,
    pub closes: Rc<Cell<usize>>,
    pub fail_open: Rc<Cell<bool>>,
    pub fail_send: Rc<Cell<bool>>,
}

impl Wire {
    pub fn last_generation(&self) -> u64 {
        self.opens.borrow().last().map(|(_, g)| *g).unwrap_or_default()
    }

    pub fn last_sent(&self) -> String {
        self.sent.borrow().last().cloned().expect("a frame was sent")
    }
}

pub struct FakeConnector(pub Wire);

impl Connector for FakeConnector {
    fn open(&mut self, url: &str, generation: u64) -> Result<Box<dyn FrameSink>, ChatError> {
        if self.0.fail_open.get() {
            return Err(ChatError::Transport("connection refused".into()));
        }
        self.0.opens.borrow_mut().push((url.to_string(), generation));
        Ok(Box::new(FakeSink(self.0.clone())))
    }
}

pub struct FakeSink(pub Wire);

impl FrameSink for FakeSink {
    fn send_text(&mut self, frame: String) -> Result<(), ChatError> {
        if self.0.fail_send.get() {
            return Err(ChatError::Transport("broken pipe".into()));
        }
        self.0.sent.borrow_mut().push(frame);
        Ok(())
    }

    fn close(&mut self) {
        self.0.closes.set(self.0.closes.get() + 1);
    }
}

#[derive(Clone, Default)]
pub struct Announcements(pub Rc<RefCell<Vec<NameAnnouncement>>>);

impl Announcer for Announcements {
    fn announce(&self, announcement: &NameAnnouncement) {
        self.0.borrow_mut().push(announcement.clone());
    }
}

pub struct Harness {
    pub session: ChatSession,
    pub wire: Wire,
    pub announced: Announcements,
    pub store: MemoryStore,
    pub events: EventReceiver,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    pub fn with_store(store: MemoryStore) -> Self {
        let wire = Wire::default();
        let announced = Announcements::default();
        let (tx, events) = event_channel();
        let session = ChatSession::new(
            WS_URL,
            Box::new(FakeConnector(wire.clone())),
            Box::new(announced.clone()),
            Box::new(store.clone()),
            tx,
        );
        Self {
            session,
            wire,
            announced,
            store,
            events,
        }
    }

    /// Configured, connected, and assigned `address` by the relay.
    pub fn connected(name: &str, passphrase: &str, address: &str) -> Self {
        let mut h = Self::new();
        h.session.configure(name, passphrase).unwrap();
        h.session.connect().unwrap();
        h.open();
        h.frame(&format!("Your address: {address}"));
        h.drain();
        h
    }

    pub fn open(&mut self) {
        let generation = self.wire.last_generation();
        self.session
            .handle_transport_event(generation, TransportEvent::Opened);
    }

    pub fn frame(&mut self, raw: &str) {
        let generation = self.wire.last_generation();
        self.session
            .handle_transport_event(generation, TransportEvent::Frame(raw.to_string()));
    }

    pub fn drain(&mut self) -> Vec<ViewEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

pub fn name_update(address: &str, name: &str, room_hash: &str) -> String {
    serde_json::json!({
        "type": "update-name",
        "address": address,
        "name": name,
        "roomHash": room_hash,
    })
    .to_string()
}
