//! Per-room session coordination: admission, slot transitions, signaling
//! relay and chat.
//!
//! Every inbound frame funnels through [`Hub::dispatch`]. Each handler takes
//! the hub lock once, performs its state transition, and enqueues the
//! counterpart notification and room-list refresh inside the same critical
//! section, so they precede anything triggered by a later frame from the
//! same connection.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use beamcast_shared::constants::{MAX_CHAT_MESSAGE_CHARS, MAX_ROOM_NAME_CHARS};
use beamcast_shared::error::RoomErrorCode;
use beamcast_shared::keys::KeyDigest;
use beamcast_shared::protocol::{ClientFrame, ServerFrame};
use beamcast_shared::types::{ClientId, Role, RoomId};

use crate::hub::{Hub, HubState};
use crate::room::Room;

impl Hub {
    /// Entry point for every parsed inbound frame.
    pub async fn dispatch(&self, client: ClientId, frame: ClientFrame) {
        match frame {
            ClientFrame::Ping => self.pong(client).await,
            ClientFrame::CreateRoom { name, key } => self.create_room(client, name, key).await,
            ClientFrame::JoinRoom { room_id, key } => self.join_room(client, room_id, key).await,
            ClientFrame::LeaveRoom => self.leave_room(client).await,
            ClientFrame::GetRoomList => self.send_room_list(client).await,
            ClientFrame::BroadcasterReady => self.broadcaster_ready(client).await,
            ClientFrame::ViewerJoin => self.viewer_join(client).await,
            // The inbound viewerId is advisory: with a single viewer slot the
            // relay target is always the opposite slot.
            ClientFrame::Offer { offer, .. } => self.relay_offer(client, offer).await,
            ClientFrame::Answer { answer } => self.relay_answer(client, answer).await,
            ClientFrame::IceCandidate { candidate, .. } => {
                self.relay_candidate(client, candidate).await
            }
            ClientFrame::ChatMessage { message } => self.relay_chat(client, message).await,
        }
    }

    async fn pong(&self, client: ClientId) {
        let state = self.state.lock().await;
        state.push(client, ServerFrame::Pong);
    }

    async fn send_room_list(&self, client: ClientId) {
        let state = self.state.lock().await;
        let rooms = state.room_snapshot();
        state.push(client, ServerFrame::RoomList { rooms });
    }

    async fn create_room(&self, client: ClientId, name: String, key: String) {
        let mut state = self.state.lock().await;
        if let Err(code) = self.try_create(&mut state, client, name, key) {
            debug!(client = %client, code = ?code, "Room creation rejected");
            state.push(client, code.into());
        }
    }

    fn try_create(
        &self,
        state: &mut HubState,
        client: ClientId,
        name: String,
        key: String,
    ) -> Result<(), RoomErrorCode> {
        let Some(handle) = state.clients.get(&client) else {
            return Ok(());
        };
        if handle.room.is_some() {
            return Err(RoomErrorCode::AlreadyInRoom);
        }
        if state.rooms.len() >= self.config.max_rooms {
            return Err(RoomErrorCode::MaxRooms);
        }

        // The key is digested here and goes no further.
        let digest = KeyDigest::of(&key);
        let name = truncate_chars(name, MAX_ROOM_NAME_CHARS);
        let mut room_id = RoomId::generate();
        while state.rooms.contains_key(&room_id) {
            room_id = RoomId::generate();
        }

        let room = Room::new(room_id.clone(), name.clone(), digest, client);
        state.rooms.insert(room_id.clone(), room);
        if let Some(handle) = state.clients.get_mut(&client) {
            handle.room = Some(room_id.clone());
        }

        info!(client = %client, room = %room_id, "Room created");
        state.push(
            client,
            ServerFrame::RoomCreated {
                room_id,
                name,
                role: Role::Broadcaster,
            },
        );
        state.broadcast_room_list();
        Ok(())
    }

    async fn join_room(&self, client: ClientId, room_id: RoomId, key: String) {
        let mut state = self.state.lock().await;
        if let Err(code) = self.try_join(&mut state, client, room_id, key) {
            debug!(client = %client, code = ?code, "Join rejected");
            state.push(client, code.into());
        }
    }

    fn try_join(
        &self,
        state: &mut HubState,
        client: ClientId,
        room_id: RoomId,
        key: String,
    ) -> Result<(), RoomErrorCode> {
        let Some(handle) = state.clients.get(&client) else {
            return Ok(());
        };
        if handle.room.is_some() {
            return Err(RoomErrorCode::AlreadyInRoom);
        }
        let Some(room) = state.rooms.get_mut(&room_id) else {
            return Err(RoomErrorCode::RoomNotFound);
        };
        if !room.verify_key(&key) {
            return Err(RoomErrorCode::InvalidKey);
        }
        let Some(role) = room.claim_slot(client) else {
            return Err(RoomErrorCode::RoomFull);
        };
        room.cancel_cleanup();
        let name = room.name.clone();
        let counterpart = room.occupant(role.opposite());
        if let Some(handle) = state.clients.get_mut(&client) {
            handle.room = Some(room_id.clone());
        }

        info!(client = %client, room = %room_id, role = %role, "Client joined room");
        state.push(
            client,
            ServerFrame::RoomJoined {
                room_id,
                name,
                role,
            },
        );
        if let Some(peer) = counterpart {
            match role {
                Role::Viewer => state.push(peer, ServerFrame::ViewerJoined { viewer_id: client }),
                Role::Broadcaster => state.push(peer, ServerFrame::BroadcasterAvailable),
            }
        }
        state.broadcast_room_list();
        Ok(())
    }

    async fn leave_room(&self, client: ClientId) {
        let mut state = self.state.lock().await;
        self.detach_locked(&mut state, client, true);
    }

    /// Shared by explicit leave and transport close: clear the slot, notify
    /// the counterpart, arm cleanup when the room empties, refresh the room
    /// inventory. Idempotent; returns whether a binding was cleared.
    pub(crate) fn detach_locked(
        &self,
        state: &mut HubState,
        client: ClientId,
        notify_leaver: bool,
    ) -> bool {
        let Some(handle) = state.clients.get_mut(&client) else {
            return false;
        };
        let Some(room_id) = handle.room.take() else {
            return false;
        };
        let Some(room) = state.rooms.get_mut(&room_id) else {
            // Stale binding to a destroyed room; clearing it is all that is left.
            if notify_leaver {
                state.push(client, ServerFrame::RoomLeft);
            }
            return true;
        };
        let role = room.vacate(client);
        let counterpart = role.and_then(|r| room.occupant(r.opposite()));
        let now_empty = room.is_empty();

        if notify_leaver {
            state.push(client, ServerFrame::RoomLeft);
        }
        if let (Some(role), Some(peer)) = (role, counterpart) {
            match role {
                Role::Broadcaster => state.push(peer, ServerFrame::BroadcasterLeft),
                Role::Viewer => state.push(peer, ServerFrame::ViewerLeft { viewer_id: client }),
            }
        }
        info!(client = %client, room = %room_id, "Client left room");
        if now_empty {
            self.schedule_cleanup_locked(state, &room_id);
        }
        state.broadcast_room_list();
        true
    }

    /// Re-notification path for a viewer that wants the broadcaster to
    /// (re-)drive its offer, e.g. after a reconnect.
    async fn viewer_join(&self, client: ClientId) {
        let state = self.state.lock().await;
        let Some((room_id, Role::Viewer)) = state.binding(client) else {
            debug!(client = %client, "Dropping viewer-join from connection not bound as viewer");
            return;
        };
        match state.rooms.get(&room_id).and_then(|r| r.broadcaster()) {
            Some(broadcaster) => {
                state.push(broadcaster, ServerFrame::ViewerJoined { viewer_id: client })
            }
            None => state.push(client, ServerFrame::NoBroadcaster),
        }
    }

    /// Re-notification path for a broadcaster that restarted: if a viewer is
    /// already present, hand the broadcaster its id again.
    async fn broadcaster_ready(&self, client: ClientId) {
        let state = self.state.lock().await;
        let Some((room_id, Role::Broadcaster)) = state.binding(client) else {
            debug!(client = %client, "Dropping broadcaster-ready from connection not bound as broadcaster");
            return;
        };
        if let Some(viewer) = state.rooms.get(&room_id).and_then(|r| r.viewer()) {
            state.push(client, ServerFrame::ViewerJoined { viewer_id: viewer });
        }
    }

    async fn relay_offer(&self, client: ClientId, offer: Value) {
        let state = self.state.lock().await;
        let Some((room_id, Role::Broadcaster)) = state.binding(client) else {
            debug!(client = %client, "Dropping offer from connection not bound as broadcaster");
            return;
        };
        let Some(viewer) = state.rooms.get(&room_id).and_then(|r| r.viewer()) else {
            debug!(room = %room_id, "No viewer present, offer dropped");
            return;
        };
        // Delivered without a viewerId: the viewer is the addressee.
        state.push(viewer, ServerFrame::Offer { offer });
    }

    async fn relay_answer(&self, client: ClientId, answer: Value) {
        let state = self.state.lock().await;
        let Some((room_id, Role::Viewer)) = state.binding(client) else {
            debug!(client = %client, "Dropping answer from connection not bound as viewer");
            return;
        };
        let Some(broadcaster) = state.rooms.get(&room_id).and_then(|r| r.broadcaster()) else {
            debug!(room = %room_id, "No broadcaster present, answer dropped");
            return;
        };
        // The broadcaster addresses viewers by id, so the sender's id rides along.
        state.push(
            broadcaster,
            ServerFrame::Answer {
                viewer_id: client,
                answer,
            },
        );
    }

    async fn relay_candidate(&self, client: ClientId, candidate: Value) {
        let state = self.state.lock().await;
        let Some((room_id, role)) = state.binding(client) else {
            debug!(client = %client, "Dropping ice-candidate from unbound connection");
            return;
        };
        let Some(room) = state.rooms.get(&room_id) else {
            return;
        };
        match role {
            Role::Broadcaster => {
                if let Some(viewer) = room.viewer() {
                    state.push(
                        viewer,
                        ServerFrame::IceCandidate {
                            candidate,
                            viewer_id: None,
                        },
                    );
                }
            }
            Role::Viewer => {
                if let Some(broadcaster) = room.broadcaster() {
                    state.push(
                        broadcaster,
                        ServerFrame::IceCandidate {
                            candidate,
                            viewer_id: Some(client),
                        },
                    );
                }
            }
        }
    }

    async fn relay_chat(&self, client: ClientId, message: String) {
        let state = self.state.lock().await;
        let Some((room_id, role)) = state.binding(client) else {
            debug!(client = %client, "Dropping chat from unbound connection");
            return;
        };
        let Some(peer) = state
            .rooms
            .get(&room_id)
            .and_then(|r| r.occupant(role.opposite()))
        else {
            return;
        };
        let message = truncate_chars(message, MAX_CHAT_MESSAGE_CHARS);
        state.push(
            peer,
            ServerFrame::ChatBroadcast {
                sender: role,
                message,
                timestamp: Utc::now().timestamp_millis(),
            },
        );
    }
}

/// Truncate to at most `max` characters, on a char boundary.
fn truncate_chars(s: String, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s,
    }
}
