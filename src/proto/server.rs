//! Server -> client events.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::ExportKind;
use crate::state::{ChatMessage, ConnectionState, Poll, Question, RoomId, Stroke, UserId};

/// Participant as shown to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub user_id: UserId,
    pub user_name: String,
    pub is_owner: bool,
    pub state: ConnectionState,
    pub joined_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disconnected_at: Option<DateTime<Utc>>,
}

/// Relayed signaling payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub room_id: RoomId,
    pub from: UserId,
    pub payload: Value,
}

/// Every event the server sends over the real-time surface.
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    RoomCreated {
        room_id: RoomId,
        friendly_name: String,
    },
    RoomJoined {
        room_id: RoomId,
        friendly_name: String,
        is_owner: bool,
        participants: Vec<ParticipantView>,
    },
    RoomError {
        #[serde(rename = "type")]
        kind: &'static str,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
    },
    RoomNotFound {
        room_id: RoomId,
    },
    UserJoined {
        room_id: RoomId,
        user_id: UserId,
        user_name: String,
    },
    UserLeft {
        room_id: RoomId,
        user_id: UserId,
        user_name: String,
        /// Set while the user is in their grace period and may come back.
        temporary: bool,
    },
    UserReconnected {
        room_id: RoomId,
        user_id: UserId,
        user_name: String,
    },
    ParticipantsList {
        room_id: RoomId,
        participants: Vec<ParticipantView>,
    },
    RoomDeleted {
        room_id: RoomId,
        reason: String,
    },
    LeftRoom {
        room_id: RoomId,
    },
    ChatMessage(ChatMessage),
    NewQuestion(Question),
    QuestionUpdated(Question),
    NewPoll(Poll),
    PollUpdated(Poll),
    WhiteboardDraw {
        room_id: RoomId,
        stroke: Stroke,
    },
    WhiteboardData {
        room_id: RoomId,
        strokes: Vec<Stroke>,
    },
    WhiteboardClear {
        room_id: RoomId,
        cleared_by: UserId,
    },
    ExportReady {
        room_id: RoomId,
        #[serde(rename = "type")]
        kind: ExportKind,
        data: Value,
    },
    JoinApproved {
        room_id: RoomId,
        friendly_name: String,
        members: Vec<ParticipantView>,
    },
    JoinPending {
        room_id: RoomId,
    },
    JoinRejected {
        room_id: RoomId,
    },
    JoinRequest {
        room_id: RoomId,
        user: UserId,
        user_name: String,
    },
    JoinRequestResolved {
        room_id: RoomId,
        user: UserId,
        accepted: bool,
    },
    MemberJoined {
        room_id: RoomId,
        user: UserId,
        user_name: String,
    },
    InviteSent {
        room_id: RoomId,
        invitee: UserId,
    },
    Offer(Signal),
    Answer(Signal),
    IceCandidate(Signal),
}

impl ServerEvent {
    /// Serialize to a text frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(event: &ServerEvent) -> Value {
        serde_json::from_str(&event.to_frame().unwrap()).unwrap()
    }

    #[test]
    fn struct_variant_uses_camel_case_fields() {
        let value = frame(&ServerEvent::RoomCreated {
            room_id: "r1".into(),
            friendly_name: "azul-leon-42".into(),
        });
        assert_eq!(
            value,
            json!({"event": "room-created", "data": {"roomId": "r1", "friendlyName": "azul-leon-42"}})
        );
    }

    #[test]
    fn room_error_has_type_field() {
        let value = frame(&ServerEvent::RoomError {
            kind: "NotOwner",
            message: "only the room owner can do that".into(),
            room_id: Some("r1".into()),
        });
        assert_eq!(value["event"], "room-error");
        assert_eq!(value["data"]["type"], "NotOwner");
        assert_eq!(value["data"]["roomId"], "r1");
    }

    #[test]
    fn signal_carries_sender() {
        let value = frame(&ServerEvent::IceCandidate(Signal {
            room_id: "r1".into(),
            from: "u1".into(),
            payload: json!({"candidate": "x"}),
        }));
        assert_eq!(value["event"], "ice-candidate");
        assert_eq!(value["data"]["from"], "u1");
        assert_eq!(value["data"]["payload"]["candidate"], "x");
    }

    #[test]
    fn export_kind_serializes_lowercase() {
        let value = frame(&ServerEvent::ExportReady {
            room_id: "r1".into(),
            kind: ExportKind::Whiteboard,
            data: json!([]),
        });
        assert_eq!(value["data"]["type"], "whiteboard");
    }
}
