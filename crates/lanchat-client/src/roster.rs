//! Peer roster tracking.
//!
//! Keeps every peer the relay has told us about, whatever room it is in, so a
//! later room switch can reveal peers again without waiting for new
//! announcements. Room isolation happens in [`PeerRoster::render`].

use serde::Serialize;
use tracing::debug;

use lanchat_shared::constants::OWN_SENDER_LABEL;
use lanchat_shared::{NameAnnouncement, PeerAddress, RoomFingerprint};

use crate::models::LocalPeer;

/// A remote client known to the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub address: PeerAddress,
    pub display_name: String,
    /// `None` until the peer announces a room. Such peers are never rendered.
    pub room: Option<RoomFingerprint>,
}

impl Peer {
    pub fn is_confirmed(&self) -> bool {
        self.room.is_some()
    }

    fn label(&self) -> String {
        if self.display_name.is_empty() {
            self.address.to_string()
        } else {
            self.display_name.clone()
        }
    }
}

/// One line of the rendered roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub address: Option<PeerAddress>,
    pub label: String,
    pub is_self: bool,
}

/// The roster as the rendering surface sees it: self first, then same-room
/// peers in the order they were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RosterView {
    pub entries: Vec<RosterEntry>,
}

impl RosterView {
    pub fn peer_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_self).count()
    }
}

/// Tracks all peers, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct PeerRoster {
    peers: Vec<Peer>,
}

impl PeerRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an address the relay reported as connected. Returns `false` if
    /// it was already known.
    pub fn on_connected(&mut self, address: PeerAddress) -> bool {
        if self.get(&address).is_some() {
            return false;
        }
        debug!(address = %address, "Tracking unconfirmed peer");
        self.peers.push(Peer {
            address,
            display_name: String::new(),
            room: None,
        });
        true
    }

    /// Remove a peer that has disconnected.
    pub fn on_disconnected(&mut self, address: &PeerAddress) -> bool {
        let before = self.peers.len();
        self.peers.retain(|p| &p.address != address);
        let removed = self.peers.len() != before;
        if removed {
            debug!(address = %address, "Removed peer from roster");
        }
        removed
    }

    /// Create or update a peer from its name/room announcement.
    pub fn upsert(&mut self, announcement: &NameAnnouncement) {
        match self.peers.iter_mut().find(|p| p.address == announcement.address) {
            Some(peer) => {
                peer.display_name = announcement.name.clone();
                peer.room = Some(announcement.room_hash.clone());
            }
            None => self.peers.push(Peer {
                address: announcement.address.clone(),
                display_name: announcement.name.clone(),
                room: Some(announcement.room_hash.clone()),
            }),
        }
        debug!(
            address = %announcement.address,
            name = %announcement.name,
            room = %announcement.room_hash.short(),
            "Peer announced"
        );
    }

    pub fn get(&self, address: &PeerAddress) -> Option<&Peer> {
        self.peers.iter().find(|p| &p.address == address)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn confirmed_count(&self) -> usize {
        self.peers.iter().filter(|p| p.is_confirmed()).count()
    }

    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }

    /// Self, then every confirmed peer whose room matches `room`.
    pub fn render(&self, local: &LocalPeer, room: &RoomFingerprint) -> RosterView {
        let mut entries = Vec::with_capacity(self.peers.len() + 1);
        entries.push(RosterEntry {
            address: local.address.clone(),
            label: format!("{} ({})", OWN_SENDER_LABEL, local.display_name),
            is_self: true,
        });

        entries.extend(
            self.peers
                .iter()
                .filter(|p| local.address.as_ref() != Some(&p.address))
                .filter(|p| p.room.as_ref() == Some(room))
                .map(|p| RosterEntry {
                    address: Some(p.address.clone()),
                    label: p.label(),
                    is_self: false,
                }),
        );

        RosterView { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn announce(address: &str, name: &str, room: &str) -> NameAnnouncement {
        NameAnnouncement {
            address: address.into(),
            name: name.into(),
            room_hash: RoomFingerprint(room.into()),
        }
    }

    fn local(address: &str) -> LocalPeer {
        LocalPeer {
            address: Some(address.into()),
            display_name: "Me".into(),
        }
    }

    #[test]
    fn test_unconfirmed_peers_hidden() {
        let mut roster = PeerRoster::new();
        assert!(roster.on_connected("10.0.0.2:1".into()));
        assert!(!roster.on_connected("10.0.0.2:1".into()));

        let view = roster.render(&local("10.0.0.1:1"), &RoomFingerprint::public());
        assert_eq!(view.entries.len(), 1);
        assert!(view.entries[0].is_self);
        assert_eq!(roster.peer_count(), 1);
        assert_eq!(roster.confirmed_count(), 0);
    }

    #[test]
    fn test_room_filtering() {
        let mut roster = PeerRoster::new();
        roster.upsert(&announce("a:1", "A", "x"));
        roster.upsert(&announce("b:1", "B", "y"));
        roster.upsert(&announce("self:1", "Me", "x"));

        let view = roster.render(&local("self:1"), &RoomFingerprint("x".into()));
        let labels: Vec<_> = view.entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["You (Me)", "A"]);
        assert_eq!(view.peer_count(), 1);
    }

    #[test]
    fn test_self_shown_without_address_or_room() {
        let roster = PeerRoster::new();
        let me = LocalPeer {
            address: None,
            display_name: "Me".into(),
        };
        let view = roster.render(&me, &RoomFingerprint("zz".into()));
        assert_eq!(view.entries.len(), 1);
        assert_eq!(view.entries[0].address, None);
    }

    #[test]
    fn test_upsert_updates_in_place() {
        let mut roster = PeerRoster::new();
        roster.on_connected("a:1".into());
        roster.on_connected("b:1".into());
        roster.upsert(&announce("a:1", "Alice", ""));
        roster.upsert(&announce("a:1", "Alicia", ""));

        assert_eq!(roster.peer_count(), 2);
        let alice = roster.get(&"a:1".into()).unwrap();
        assert_eq!(alice.display_name, "Alicia");
        assert!(alice.is_confirmed());
        assert_eq!(roster.peers()[0].address.as_str(), "a:1");
    }

    #[test]
    fn test_nameless_peer_renders_address() {
        let mut roster = PeerRoster::new();
        roster.upsert(&announce("c:9", "", ""));
        let view = roster.render(&local("me:1"), &RoomFingerprint::public());
        assert_eq!(view.entries[1].label, "c:9");
    }

    #[test]
    fn test_disconnect_and_clear() {
        let mut roster = PeerRoster::new();
        roster.upsert(&announce("a:1", "A", ""));
        roster.upsert(&announce("b:1", "B", ""));

        assert!(roster.on_disconnected(&"a:1".into()));
        assert!(!roster.on_disconnected(&"a:1".into()));
        assert_eq!(roster.peer_count(), 1);

        roster.clear();
        assert_eq!(roster.peer_count(), 0);
    }
}
