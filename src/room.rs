//! The in-process room/participant graph: a `Participant` belongs to at
//! most one `Room`, a `Room` weakly references its participants, and all
//! mutation of a room's member set is serialized through that room's
//! mutex so fan-out snapshots never race a concurrent join or leave.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::info;

use crate::id_types::{ParticipantId, RoomId, DEFAULT_ROOM_ID};
use crate::metrics;

/// The session-scoped state machine from accept to teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Opened,
    Joining,
    Active,
    Closing,
    Closed,
}

/// A participant's mutable, room-coordinator-owned state. Liveness fields
/// (`alive`, `last_activity`) are owned here too since they are consulted
/// by the same lock-free fast path the gateway's liveness ticker uses.
pub struct Participant {
    pub id: ParticipantId,
    pub room_id: Mutex<RoomId>,
    pub state: Mutex<SessionState>,
    pub producer_id: Mutex<Option<String>>,
    pub rtp_capabilities: Mutex<Option<Value>>,
    pub is_killed: AtomicBool,
    pub alive: AtomicBool,
    pub last_activity: Mutex<Instant>,
    pub outbound: crate::gateway::OutboundTx,
}

impl Participant {
    pub fn new(id: ParticipantId, room_id: RoomId, outbound: crate::gateway::OutboundTx) -> Self {
        Self {
            id,
            room_id: Mutex::new(room_id),
            state: Mutex::new(SessionState::Opened),
            producer_id: Mutex::new(None),
            rtp_capabilities: Mutex::new(None),
            is_killed: AtomicBool::new(false),
            alive: AtomicBool::new(true),
            last_activity: Mutex::new(Instant::now()),
            outbound,
        }
    }

    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    pub async fn set_state(&self, new_state: SessionState) {
        *self.state.lock().await = new_state;
    }

    pub fn touch(&self) {
        self.alive.store(true, Ordering::SeqCst);
    }

    /// Sends a message to this participant's session if it is still
    /// writable; otherwise drops it, per the gateway's send() contract. A
    /// closed channel means the peer's connection task has already torn
    /// down (or is in the process of doing so), so no further cleanup is
    /// triggered from here beyond logging the `CoreError::Transport`.
    pub fn send(&self, message: &crate::protocol::ServerMessage) {
        match serde_json::to_string(message) {
            Ok(text) => {
                if self.outbound.send(warp::ws::Message::text(text)).is_ok() {
                    metrics::WS_MESSAGES_SENT_TOTAL.inc();
                } else {
                    let err = crate::error::CoreError::transport(format!(
                        "session channel for participant {} is gone",
                        self.id
                    ));
                    tracing::warn!(error = %err, participant_id = %self.id, "dropping outbound message");
                    metrics::WS_MESSAGES_DROPPED_TOTAL.inc();
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize outbound message");
            }
        }
    }
}

struct RoomInner {
    members: HashMap<ParticipantId, Arc<Participant>>,
}

/// One room. All mutation of `members` is serialized through `inner`'s
/// mutex (the "room-level mutex" the concurrency model calls for); reads
/// that need a stable snapshot for fan-out take the same lock rather than
/// reading the map directly.
pub struct Room {
    pub id: RoomId,
    inner: Mutex<RoomInner>,
}

impl Room {
    fn new(id: RoomId) -> Self {
        Self {
            id,
            inner: Mutex::new(RoomInner {
                members: HashMap::new(),
            }),
        }
    }

    pub async fn attach(&self, participant: Arc<Participant>) {
        let mut inner = self.inner.lock().await;
        let is_new_room = inner.members.is_empty();
        inner.members.insert(participant.id.clone(), participant);
        if is_new_room {
            info!(room = %self.id, "room now has its first member");
        }
        metrics::ACTIVE_PARTICIPANTS.inc();
    }

    pub async fn detach(&self, participant_id: &ParticipantId) -> bool {
        let mut inner = self.inner.lock().await;
        let removed = inner.members.remove(participant_id).is_some();
        if removed {
            metrics::ACTIVE_PARTICIPANTS.dec();
        }
        removed
    }

    /// An iteration-safe snapshot of `(participant_id, participant)` pairs,
    /// taken under the room lock so it cannot observe a torn mutation.
    pub async fn snapshot_members(&self) -> Vec<Arc<Participant>> {
        let inner = self.inner.lock().await;
        inner.members.values().cloned().collect()
    }

    pub async fn get(&self, participant_id: &ParticipantId) -> Option<Arc<Participant>> {
        let inner = self.inner.lock().await;
        inner.members.get(participant_id).cloned()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.members.is_empty()
    }
}

/// Process-wide `roomId -> Room` map. The default room is created eagerly
/// and is never reaped even when empty; other rooms are created on demand
/// and may be reaped once empty (see `reap_if_empty`).
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Arc<Room>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        let registry = Self {
            rooms: DashMap::new(),
        };
        let default_id = RoomId::from(DEFAULT_ROOM_ID);
        registry
            .rooms
            .insert(default_id.clone(), Arc::new(Room::new(default_id)));
        registry
    }

    pub fn get_or_create(&self, room_id: &RoomId) -> Arc<Room> {
        self.rooms
            .entry(room_id.clone())
            .or_insert_with(|| {
                metrics::ACTIVE_ROOMS.inc();
                Arc::new(Room::new(room_id.clone()))
            })
            .clone()
    }

    pub fn get(&self, room_id: &RoomId) -> Option<Arc<Room>> {
        self.rooms.get(room_id).map(|r| r.clone())
    }

    /// Removes `room_id` from the registry if it is empty and not the
    /// default room. A policy choice, not forced by any invariant: this
    /// implementation reaps non-default empty rooms so long-lived
    /// processes with many short-lived ad hoc rooms don't accumulate
    /// empty entries forever.
    pub async fn reap_if_empty(&self, room_id: &RoomId) {
        if room_id.as_ref() == DEFAULT_ROOM_ID {
            return;
        }
        let should_remove = match self.rooms.get(room_id) {
            Some(room) => room.is_empty().await,
            None => false,
        };
        if should_remove && self.rooms.remove(room_id).is_some() {
            metrics::ACTIVE_ROOMS.dec();
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn test_participant(id: &str, room: &str) -> Arc<Participant> {
        let (tx, _rx) = mpsc::unbounded_channel();
        Arc::new(Participant::new(
            ParticipantId::from(id),
            RoomId::from(room),
            tx,
        ))
    }

    #[tokio::test]
    async fn test_default_room_exists_at_construction() {
        let registry = RoomRegistry::new();
        let default_room = registry.get(&RoomId::default()).expect("default room");
        assert!(default_room.is_empty().await);
    }

    #[tokio::test]
    async fn test_attach_and_snapshot() {
        let registry = RoomRegistry::new();
        let room = registry.get_or_create(&RoomId::from("r1"));
        let p1 = test_participant("user-1", "r1");
        let p2 = test_participant("user-2", "r1");
        room.attach(p1.clone()).await;
        room.attach(p2.clone()).await;

        let members = room.snapshot_members().await;
        assert_eq!(members.len(), 2);
    }

    #[tokio::test]
    async fn test_detach_removes_member() {
        let registry = RoomRegistry::new();
        let room = registry.get_or_create(&RoomId::from("r1"));
        let p1 = test_participant("user-1", "r1");
        room.attach(p1.clone()).await;
        assert!(room.detach(&p1.id).await);
        assert!(room.snapshot_members().await.is_empty());
        assert!(!room.detach(&p1.id).await);
    }

    #[tokio::test]
    async fn test_default_room_never_reaped() {
        let registry = RoomRegistry::new();
        registry.reap_if_empty(&RoomId::default()).await;
        assert!(registry.get(&RoomId::default()).is_some());
    }

    #[tokio::test]
    async fn test_non_default_empty_room_is_reaped() {
        let registry = RoomRegistry::new();
        let room_id = RoomId::from("ephemeral");
        let room = registry.get_or_create(&room_id);
        let p1 = test_participant("user-1", "ephemeral");
        room.attach(p1.clone()).await;
        room.detach(&p1.id).await;

        registry.reap_if_empty(&room_id).await;
        assert!(registry.get(&room_id).is_none());
    }

    #[tokio::test]
    async fn test_two_rooms_are_isolated() {
        let registry = RoomRegistry::new();
        let room_a = registry.get_or_create(&RoomId::from("a"));
        let room_b = registry.get_or_create(&RoomId::from("b"));
        room_a.attach(test_participant("user-1", "a")).await;

        assert_eq!(room_a.snapshot_members().await.len(), 1);
        assert_eq!(room_b.snapshot_members().await.len(), 0);
    }
}
