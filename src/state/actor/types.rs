use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;

use crate::config::{Config, LimitsConfig, RoomsConfig};
use crate::error::RoomResult;
use crate::proto::{ClientEvent, ParticipantView};
use crate::state::{ConnId, EventSender, RoomId, UserId};

/// Policy the coordinator runs with.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub rooms: RoomsConfig,
    pub limits: LimitsConfig,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            rooms: config.rooms.clone(),
            limits: config.limits.clone(),
        }
    }
}

/// Events processed by the coordinator.
#[derive(Debug)]
pub enum CoordinatorEvent {
    /// A transport connection was accepted.
    Attach { conn_id: ConnId, sender: EventSender },
    /// A decoded client event, in per-connection receipt order.
    Client { conn_id: ConnId, event: ClientEvent },
    /// The transport connection closed.
    Detach { conn_id: ConnId },
    /// A grace timer fired.
    GraceExpired {
        room_id: RoomId,
        user_id: UserId,
        generation: u64,
    },
    /// A purge timer fired.
    PurgeDue { room_id: RoomId, generation: u64 },
    /// Admin: create a room for an owner who will connect later.
    CreateRoom {
        owner: UserId,
        owner_name: Option<String>,
        reply_tx: oneshot::Sender<RoomResult<CreatedRoom>>,
    },
    /// Admin: resolve a friendly name.
    FindRoom {
        friendly_name: String,
        reply_tx: oneshot::Sender<Option<RoomId>>,
    },
    Health {
        reply_tx: oneshot::Sender<HealthSnapshot>,
    },
    Stats {
        reply_tx: oneshot::Sender<Vec<RoomStats>>,
    },
    ListRooms {
        reply_tx: oneshot::Sender<Vec<RoomSummary>>,
    },
    RoomDetail {
        room_id: RoomId,
        reply_tx: oneshot::Sender<RoomLookup>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRoom {
    pub room_id: RoomId,
    pub friendly_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub rooms: usize,
    pub users: usize,
    pub connections: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStats {
    pub room_id: RoomId,
    pub friendly_name: String,
    pub participant_count: usize,
    pub participants: Vec<ParticipantView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub friendly_name: String,
    pub owner_id: UserId,
    pub owner_name: String,
    pub created_at: DateTime<Utc>,
    pub participant_count: usize,
    pub connected_count: usize,
    pub max_participants: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingView {
    pub user_id: UserId,
    pub user_name: String,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetail {
    pub exists: bool,
    pub room_id: RoomId,
    pub friendly_name: String,
    pub owner_id: UserId,
    pub owner_name: String,
    pub created_at: DateTime<Utc>,
    pub max_participants: usize,
    pub participants: Vec<ParticipantView>,
    pub pending_requests: Vec<PendingView>,
    pub invited: usize,
    pub chat_messages: usize,
    pub questions: usize,
    pub polls: usize,
    pub whiteboard_strokes: usize,
}

/// Result of an admin room lookup.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RoomLookup {
    Found(Box<RoomDetail>),
    #[serde(rename_all = "camelCase")]
    Missing { exists: bool, recently_deleted: bool },
}
