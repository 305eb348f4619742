//! Room records and slot bookkeeping.
//!
//! A room pairs at most one broadcaster with at most one viewer. The struct
//! here is plain data; all cross-room coordination and locking lives in the
//! hub and session layers.

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use beamcast_shared::keys::KeyDigest;
use beamcast_shared::protocol::RoomSummary;
use beamcast_shared::types::{ClientId, Role, RoomId};

/// A pairing context between one broadcaster and one viewer.
#[derive(Debug)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    key_digest: KeyDigest,
    broadcaster: Option<ClientId>,
    viewer: Option<ClientId>,
    pub created_at: DateTime<Utc>,
    /// Deadline of the pending empty-room cleanup, if one is scheduled.
    cleanup_at: Option<Instant>,
    /// Bumped on every occupancy change. A cleanup timer destroys the room
    /// only if the epoch it captured at scheduling time is still current.
    cleanup_epoch: u64,
}

impl Room {
    /// Create a room with the creator already holding the broadcaster slot.
    pub fn new(id: RoomId, name: String, key_digest: KeyDigest, creator: ClientId) -> Self {
        Self {
            id,
            name,
            key_digest,
            broadcaster: Some(creator),
            viewer: None,
            created_at: Utc::now(),
            cleanup_at: None,
            cleanup_epoch: 0,
        }
    }

    pub fn verify_key(&self, key: &str) -> bool {
        self.key_digest.verify(key)
    }

    pub fn broadcaster(&self) -> Option<ClientId> {
        self.broadcaster
    }

    pub fn viewer(&self) -> Option<ClientId> {
        self.viewer
    }

    pub fn occupant(&self, role: Role) -> Option<ClientId> {
        match role {
            Role::Broadcaster => self.broadcaster,
            Role::Viewer => self.viewer,
        }
    }

    /// The slot this connection occupies, if any.
    pub fn role_of(&self, client: ClientId) -> Option<Role> {
        if self.broadcaster == Some(client) {
            Some(Role::Broadcaster)
        } else if self.viewer == Some(client) {
            Some(Role::Viewer)
        } else {
            None
        }
    }

    /// Bind `client` to the first empty slot in (broadcaster, viewer) order.
    /// Returns `None` when both slots are occupied. A connection already
    /// holding a slot never gets a second one.
    pub fn claim_slot(&mut self, client: ClientId) -> Option<Role> {
        if self.role_of(client).is_some() {
            return None;
        }
        if self.broadcaster.is_none() {
            self.broadcaster = Some(client);
            self.cleanup_epoch += 1;
            Some(Role::Broadcaster)
        } else if self.viewer.is_none() {
            self.viewer = Some(client);
            self.cleanup_epoch += 1;
            Some(Role::Viewer)
        } else {
            None
        }
    }

    /// Clear whichever slot references `client`. Returns the vacated role,
    /// or `None` if the connection held no slot here.
    pub fn vacate(&mut self, client: ClientId) -> Option<Role> {
        let role = self.role_of(client)?;
        match role {
            Role::Broadcaster => self.broadcaster = None,
            Role::Viewer => self.viewer = None,
        }
        self.cleanup_epoch += 1;
        Some(role)
    }

    pub fn participants(&self) -> u8 {
        self.broadcaster.is_some() as u8 + self.viewer.is_some() as u8
    }

    pub fn is_full(&self) -> bool {
        self.broadcaster.is_some() && self.viewer.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.broadcaster.is_none() && self.viewer.is_none()
    }

    /// Arm the deferred-cleanup deadline and return the epoch the timer must
    /// present when it fires.
    pub fn schedule_cleanup(&mut self, deadline: Instant) -> u64 {
        self.cleanup_at = Some(deadline);
        self.cleanup_epoch
    }

    /// Disarm a pending cleanup. Joins call this so an in-flight timer finds
    /// a stale epoch and backs off.
    pub fn cancel_cleanup(&mut self) {
        self.cleanup_at = None;
    }

    /// Whether a timer armed at `epoch` is still authoritative.
    pub fn cleanup_current(&self, epoch: u64) -> bool {
        self.cleanup_epoch == epoch && self.cleanup_at.is_some()
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            participants: self.participants(),
            is_full: self.is_full(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn room(creator: u64) -> Room {
        Room::new(
            RoomId::from("room-abcd1234"),
            "movie".to_string(),
            KeyDigest::of("hunter2"),
            ClientId::new(creator),
        )
    }

    #[test]
    fn test_creator_takes_broadcaster_slot() {
        let room = room(1);
        assert_eq!(room.broadcaster(), Some(ClientId::new(1)));
        assert_eq!(room.viewer(), None);
        assert_eq!(room.participants(), 1);
        assert!(!room.is_full());
    }

    #[test]
    fn test_claim_fills_broadcaster_first() {
        let mut room = room(1);
        assert_eq!(room.vacate(ClientId::new(1)), Some(Role::Broadcaster));

        // Both slots empty: the broadcaster slot is claimed before the viewer.
        assert_eq!(room.claim_slot(ClientId::new(2)), Some(Role::Broadcaster));
        assert_eq!(room.claim_slot(ClientId::new(3)), Some(Role::Viewer));
        assert!(room.is_full());
        assert_eq!(room.claim_slot(ClientId::new(4)), None);
    }

    #[test]
    fn test_same_connection_never_holds_two_slots() {
        let mut room = room(1);
        assert_eq!(room.claim_slot(ClientId::new(1)), None);
        assert_eq!(room.viewer(), None);
    }

    #[test]
    fn test_vacate_clears_only_the_right_slot() {
        let mut room = room(1);
        room.claim_slot(ClientId::new(2));

        assert_eq!(room.vacate(ClientId::new(2)), Some(Role::Viewer));
        assert_eq!(room.broadcaster(), Some(ClientId::new(1)));
        assert_eq!(room.viewer(), None);

        // Vacating an unknown connection is a no-op.
        assert_eq!(room.vacate(ClientId::new(9)), None);
        assert_eq!(room.participants(), 1);
    }

    #[test]
    fn test_cleanup_epoch_invalidated_by_join() {
        let mut room = room(1);
        room.vacate(ClientId::new(1));
        let epoch = room.schedule_cleanup(Instant::now() + Duration::from_secs(60));
        assert!(room.cleanup_current(epoch));

        room.claim_slot(ClientId::new(2));
        room.cancel_cleanup();
        assert!(!room.cleanup_current(epoch));
    }

    #[test]
    fn test_summary_reflects_occupancy() {
        let mut room = room(1);
        let s = room.summary();
        assert_eq!(s.participants, 1);
        assert!(!s.is_full);

        room.claim_slot(ClientId::new(2));
        let s = room.summary();
        assert_eq!(s.participants, 2);
        assert!(s.is_full);
    }
}
