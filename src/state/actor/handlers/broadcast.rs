//! Event delivery to room members.
//!
//! Fan-out goes to every connected participant's current connection;
//! participants in their grace period are skipped.

use std::sync::Arc;

use super::super::Coordinator;
use crate::metrics;
use crate::proto::ServerEvent;
use crate::state::{ConnId, UserId};

impl Coordinator {
    pub(crate) fn send_to(&self, conn_id: &str, event: ServerEvent) -> bool {
        self.connections.send(conn_id, Arc::new(event))
    }

    /// Deliver to every connected participant, optionally skipping one
    /// connection. Returns the number of successful deliveries.
    pub(crate) fn broadcast(&self, room_id: &str, event: ServerEvent, exclude: Option<&ConnId>) -> usize {
        let Some(room) = self.registry.get(room_id) else {
            return 0;
        };
        let targets = room.live_connections(exclude);
        metrics::record_fanout(targets.len());

        let event = Arc::new(event);
        targets
            .iter()
            .filter(|conn_id| self.connections.send(conn_id, Arc::clone(&event)))
            .count()
    }

    pub(crate) fn broadcast_participants(&self, room_id: &str) {
        let Some(room) = self.registry.get(room_id) else {
            return;
        };
        let event = ServerEvent::ParticipantsList {
            room_id: room.id.clone(),
            participants: room.participant_views(),
        };
        self.broadcast(room_id, event, None);
    }

    /// Targeted delivery. Returns false when the participant is not
    /// connected, in which case the event is dropped.
    pub(crate) fn send_to_participant(&self, room_id: &str, user_id: &UserId, event: ServerEvent) -> bool {
        let conn = self
            .registry
            .get(room_id)
            .and_then(|room| room.participants.get(user_id))
            .and_then(|p| p.live_connection());
        match conn {
            Some(conn_id) => self.send_to(conn_id, event),
            None => {
                tracing::debug!(room_id = %room_id, user_id = %user_id, "Target not connected, event dropped");
                false
            }
        }
    }

    /// Send `room-joined` followed by the whiteboard snapshot.
    pub(crate) fn send_room_state(&self, conn_id: &str, room_id: &str, user_id: &str) {
        let Some(room) = self.registry.get(room_id) else {
            return;
        };
        self.send_to(
            conn_id,
            ServerEvent::RoomJoined {
                room_id: room.id.clone(),
                friendly_name: room.friendly_name.clone(),
                is_owner: room.owner_id == user_id,
                participants: room.participant_views(),
            },
        );
        self.send_whiteboard_snapshot(conn_id, room_id);
    }

    pub(crate) fn send_whiteboard_snapshot(&self, conn_id: &str, room_id: &str) {
        let Some(room) = self.registry.get(room_id) else {
            return;
        };
        self.send_to(
            conn_id,
            ServerEvent::WhiteboardData {
                room_id: room.id.clone(),
                strokes: room.content.strokes.iter().cloned().collect(),
            },
        );
    }
}
