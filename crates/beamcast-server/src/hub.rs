//! Process-wide hub: the authoritative room store plus the connection
//! registry.
//!
//! Constructed once at startup and cloned into every connection handler;
//! all clones address the same state behind a single coarse lock.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use beamcast_shared::constants::OUTBOUND_QUEUE_FRAMES;
use beamcast_shared::protocol::{RoomSummary, ServerFrame};
use beamcast_shared::types::{ClientId, Role, RoomId};

use crate::config::ServerConfig;
use crate::room::Room;

/// Shared server state. Cheap to clone.
#[derive(Clone)]
pub struct Hub {
    pub(crate) state: Arc<Mutex<HubState>>,
    pub(crate) config: Arc<ServerConfig>,
}

pub(crate) struct HubState {
    pub(crate) rooms: HashMap<RoomId, Room>,
    pub(crate) clients: HashMap<ClientId, ClientHandle>,
    next_client_id: u64,
}

/// Registry entry for one live connection: its outbound queue and the room
/// it is currently bound to, if any. The binding is cleared by the session
/// coordinator; the connection never owns the room.
pub(crate) struct ClientHandle {
    sender: mpsc::Sender<ServerFrame>,
    pub(crate) room: Option<RoomId>,
}

impl Hub {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState {
                rooms: HashMap::new(),
                clients: HashMap::new(),
                next_client_id: 0,
            })),
            config: Arc::new(config),
        }
    }

    /// Register a freshly accepted connection: mint an identifier and queue
    /// the current room inventory as its first outbound frame. The returned
    /// receiver is drained by the connection's writer task.
    pub async fn register(&self) -> (ClientId, mpsc::Receiver<ServerFrame>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_FRAMES);
        let mut state = self.state.lock().await;
        state.next_client_id += 1;
        let id = ClientId::new(state.next_client_id);
        state.clients.insert(id, ClientHandle { sender: tx, room: None });
        info!(client = %id, "Connection registered");
        let rooms = state.room_snapshot();
        state.push(id, ServerFrame::RoomList { rooms });
        (id, rx)
    }

    /// Transport close: run the same detach path as an explicit leave, then
    /// drop the registry entry.
    pub async fn disconnect(&self, client: ClientId) {
        let mut state = self.state.lock().await;
        self.detach_locked(&mut state, client, false);
        state.clients.remove(&client);
        info!(client = %client, "Connection closed");
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub async fn room_count(&self) -> usize {
        self.state.lock().await.rooms.len()
    }

    /// Arm the deferred-cleanup timer for an empty room.
    pub(crate) fn schedule_cleanup_locked(&self, state: &mut HubState, room_id: &RoomId) {
        let grace = self.config.cleanup_grace;
        let Some(room) = state.rooms.get_mut(room_id) else {
            return;
        };
        let epoch = room.schedule_cleanup(tokio::time::Instant::now() + grace);
        info!(
            room = %room_id,
            grace_secs = grace.as_secs(),
            "Room empty, cleanup scheduled"
        );

        let hub = self.clone();
        let room_id = room_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            hub.expire_room(room_id, epoch).await;
        });
    }

    /// Deferred-cleanup timer body. Revalidates under the lock: the room
    /// must still exist, still be empty, and the epoch captured at
    /// scheduling time must still be current, so a join that raced the
    /// timer wins.
    async fn expire_room(&self, room_id: RoomId, epoch: u64) {
        let mut state = self.state.lock().await;
        let Some(room) = state.rooms.get(&room_id) else {
            return;
        };
        if !room.cleanup_current(epoch) || !room.is_empty() {
            debug!(room = %room_id, "Cleanup timer fired stale, ignoring");
            return;
        }
        state.rooms.remove(&room_id);
        info!(room = %room_id, "Destroyed empty room");
        state.broadcast_room_list();
    }
}

impl HubState {
    /// Best-effort outbound write: a slow or dead consumer loses frames
    /// rather than blocking the hub lock. The transport's close event is the
    /// authoritative cleanup trigger for dead connections.
    pub(crate) fn push(&self, to: ClientId, frame: ServerFrame) {
        let Some(handle) = self.clients.get(&to) else {
            debug!(client = %to, "Dropping frame for unknown connection");
            return;
        };
        if handle.sender.try_send(frame).is_err() {
            debug!(client = %to, "Dropping frame for slow or closed connection");
        }
    }

    /// Send the current room inventory to every connected client.
    pub(crate) fn broadcast_room_list(&self) {
        let rooms = self.room_snapshot();
        for (id, handle) in &self.clients {
            let frame = ServerFrame::RoomList { rooms: rooms.clone() };
            if handle.sender.try_send(frame).is_err() {
                debug!(client = %id, "Dropping room list for slow or closed connection");
            }
        }
    }

    /// Public snapshot of all rooms, oldest first. No secrets, no
    /// connection ids.
    pub(crate) fn room_snapshot(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<&Room> = self.rooms.values().collect();
        rooms.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        rooms.iter().map(|r| r.summary()).collect()
    }

    /// The room and role a connection is currently bound to, if any.
    pub(crate) fn binding(&self, client: ClientId) -> Option<(RoomId, Role)> {
        let room_id = self.clients.get(&client)?.room.clone()?;
        let role = self.rooms.get(&room_id)?.role_of(client)?;
        Some((room_id, role))
    }
}
