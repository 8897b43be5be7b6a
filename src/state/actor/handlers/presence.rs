//! Disconnects, grace expiry and record purging.

use chrono::Utc;
use tracing::{debug, info};

use super::super::{Coordinator, CoordinatorEvent, spawn_timer};
use crate::metrics;
use crate::proto::ServerEvent;
use crate::state::{RoomId, UserId};

impl Coordinator {
    /// Transport closed. The participant enters the grace period; a connection
    /// that was already superseded by a newer one changes nothing.
    pub(crate) fn handle_detach(&mut self, conn_id: &str) {
        let Some(entry) = self.connections.detach(conn_id) else {
            return;
        };
        let (Some(user_id), Some(room_id)) = (entry.user_id, entry.room_id) else {
            debug!(conn_id = %conn_id, "Unbound connection closed");
            return;
        };
        let grace = self.settings.rooms.grace_period();

        let Some(room) = self.registry.get_mut(&room_id).filter(|r| r.is_active) else {
            return;
        };
        let Some(participant) = room.participants.get_mut(&user_id) else {
            return;
        };
        if participant.connection_id.as_deref() != Some(conn_id) {
            debug!(room_id = %room_id, user_id = %user_id, conn_id = %conn_id, "Stale connection closed, newer binding kept");
            return;
        }
        let Some(generation) = participant.presence.begin_grace(Utc::now()) else {
            return;
        };
        let timer = spawn_timer(
            &self.self_tx,
            grace,
            CoordinatorEvent::GraceExpired {
                room_id: room_id.clone(),
                user_id: user_id.clone(),
                generation,
            },
        );
        participant.presence.arm(timer);
        let user_name = participant.display_name.clone();
        info!(room_id = %room_id, user_id = %user_id, grace_secs = grace.as_secs(), "Participant disconnected, grace period started");

        self.broadcast(
            &room_id,
            ServerEvent::UserLeft {
                room_id: room_id.clone(),
                user_id,
                user_name,
                temporary: true,
            },
            None,
        );
        self.broadcast_participants(&room_id);
    }

    pub(crate) fn handle_grace_expired(&mut self, room_id: &RoomId, user_id: &UserId, generation: u64) {
        let Some(room) = self.registry.get_mut(room_id).filter(|r| r.is_active) else {
            return;
        };
        let expired = room
            .participants
            .get_mut(user_id)
            .is_some_and(|p| p.presence.expire(generation));
        if !expired {
            debug!(room_id = %room_id, user_id = %user_id, generation, "Stale grace timer ignored");
            return;
        }
        let Some(participant) = room.participants.remove(user_id) else {
            return;
        };

        metrics::record_grace_expiration();
        info!(room_id = %room_id, user_id = %user_id, "Grace period expired, participant removed");
        self.after_removal(room_id, participant, true);
    }

    pub(crate) fn handle_purge(&mut self, room_id: &RoomId, generation: u64) {
        if self.registry.purge(room_id, generation) {
            debug!(room_id = %room_id, "Room record purged");
        }
    }
}
