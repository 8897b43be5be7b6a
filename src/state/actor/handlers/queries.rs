//! Read-only snapshots for the admin HTTP surface.

use super::super::{
    Coordinator, HealthSnapshot, PendingView, RoomDetail, RoomLookup, RoomStats, RoomSummary,
};

impl Coordinator {
    pub(crate) fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            rooms: self.registry.active_count(),
            users: self.registry.active_rooms().map(|r| r.participants.len()).sum(),
            connections: self.connections.len(),
        }
    }

    pub(crate) fn stats(&self) -> Vec<RoomStats> {
        let mut stats: Vec<RoomStats> = self
            .registry
            .active_rooms()
            .map(|room| RoomStats {
                room_id: room.id.clone(),
                friendly_name: room.friendly_name.clone(),
                participant_count: room.participants.len(),
                participants: room.participant_views(),
            })
            .collect();
        stats.sort_by(|a, b| a.friendly_name.cmp(&b.friendly_name));
        stats
    }

    pub(crate) fn list_rooms(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self
            .registry
            .active_rooms()
            .map(|room| RoomSummary {
                room_id: room.id.clone(),
                friendly_name: room.friendly_name.clone(),
                owner_id: room.owner_id.clone(),
                owner_name: room.owner_name.clone(),
                created_at: room.created_at,
                participant_count: room.participants.len(),
                connected_count: room.connected_count(),
                max_participants: room.max_participants,
            })
            .collect();
        rooms.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        rooms
    }

    pub(crate) fn room_detail(&self, room_id: &str) -> RoomLookup {
        let room = match self.registry.get(room_id) {
            Some(room) if room.is_active => room,
            Some(_) => {
                return RoomLookup::Missing {
                    exists: false,
                    recently_deleted: true,
                };
            }
            None => {
                return RoomLookup::Missing {
                    exists: false,
                    recently_deleted: false,
                };
            }
        };

        RoomLookup::Found(Box::new(RoomDetail {
            exists: true,
            room_id: room.id.clone(),
            friendly_name: room.friendly_name.clone(),
            owner_id: room.owner_id.clone(),
            owner_name: room.owner_name.clone(),
            created_at: room.created_at,
            max_participants: room.max_participants,
            participants: room.participant_views(),
            pending_requests: room
                .join_requests
                .iter()
                .map(|r| PendingView {
                    user_id: r.user_id.clone(),
                    user_name: r.display_name.clone(),
                    requested_at: r.requested_at,
                })
                .collect(),
            invited: room.invites.len(),
            chat_messages: room.content.chat.len(),
            questions: room.content.questions.len(),
            polls: room.content.polls.len(),
            whiteboard_strokes: room.content.strokes.len(),
        }))
    }
}
