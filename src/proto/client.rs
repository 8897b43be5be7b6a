//! Client -> server events.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProtocolError;
use crate::state::{RoomId, UserId};

/// Every event a client may send over the real-time surface.
#[derive(Debug, Clone, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    CreateRoom {
        #[serde(default)]
        user_id: Option<UserId>,
        #[serde(default)]
        user_name: Option<String>,
    },
    JoinRoom {
        room_id: RoomId,
        user_id: UserId,
        #[serde(default)]
        user_name: Option<String>,
        #[serde(default)]
        is_room_owner: bool,
    },
    Reconnect {
        room_id: RoomId,
        user_id: UserId,
        #[serde(default)]
        user_name: Option<String>,
    },
    Invite {
        room_id: RoomId,
        invitee: UserId,
    },
    JoinRequest {
        room_id: RoomId,
        user: UserId,
        #[serde(default)]
        user_name: Option<String>,
    },
    AcceptJoin {
        room_id: RoomId,
        user: UserId,
    },
    RejectJoin {
        room_id: RoomId,
        user: UserId,
    },
    DeleteRoom {
        room_id: RoomId,
        #[serde(default)]
        user: Option<UserId>,
    },
    LeaveRoom {
        #[serde(default)]
        room_id: Option<RoomId>,
    },
    ChatMessage {
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default, alias = "text")]
        message: Option<String>,
    },
    AskQuestion {
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default, alias = "text")]
        question: Option<String>,
    },
    AnswerQuestion {
        #[serde(default)]
        room_id: Option<RoomId>,
        question_id: String,
        #[serde(default, alias = "text")]
        answer: Option<String>,
    },
    CreatePoll {
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default)]
        question: Option<String>,
        #[serde(default)]
        options: Vec<String>,
    },
    VotePoll {
        #[serde(default)]
        room_id: Option<RoomId>,
        poll_id: String,
        option_index: usize,
    },
    WhiteboardDraw {
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default)]
        stroke: Option<StrokeInput>,
    },
    WhiteboardData {
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default)]
        strokes: Vec<StrokeInput>,
    },
    WhiteboardClear {
        #[serde(default)]
        room_id: Option<RoomId>,
    },
    ExportData {
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(rename = "type")]
        kind: ExportKind,
    },
    Offer(SignalInput),
    Answer(SignalInput),
    IceCandidate(SignalInput),
    SetUserId {
        user_id: UserId,
    },
}

impl ClientEvent {
    /// Event name, used as a metric label and span field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "create-room",
            Self::JoinRoom { .. } => "join-room",
            Self::Reconnect { .. } => "reconnect",
            Self::Invite { .. } => "invite",
            Self::JoinRequest { .. } => "join-request",
            Self::AcceptJoin { .. } => "accept-join",
            Self::RejectJoin { .. } => "reject-join",
            Self::DeleteRoom { .. } => "delete-room",
            Self::LeaveRoom { .. } => "leave-room",
            Self::ChatMessage { .. } => "chat-message",
            Self::AskQuestion { .. } => "ask-question",
            Self::AnswerQuestion { .. } => "answer-question",
            Self::CreatePoll { .. } => "create-poll",
            Self::VotePoll { .. } => "vote-poll",
            Self::WhiteboardDraw { .. } => "whiteboard-draw",
            Self::WhiteboardData { .. } => "whiteboard-data",
            Self::WhiteboardClear { .. } => "whiteboard-clear",
            Self::ExportData { .. } => "export-data",
            Self::Offer(_) => "offer",
            Self::Answer(_) => "answer",
            Self::IceCandidate(_) => "ice-candidate",
            Self::SetUserId { .. } => "set-user-id",
        }
    }

    /// Room the event explicitly addresses, if any.
    pub fn room_hint(&self) -> Option<&RoomId> {
        match self {
            Self::JoinRoom { room_id, .. }
            | Self::Reconnect { room_id, .. }
            | Self::Invite { room_id, .. }
            | Self::JoinRequest { room_id, .. }
            | Self::AcceptJoin { room_id, .. }
            | Self::RejectJoin { room_id, .. }
            | Self::DeleteRoom { room_id, .. } => Some(room_id),
            Self::LeaveRoom { room_id }
            | Self::ChatMessage { room_id, .. }
            | Self::AskQuestion { room_id, .. }
            | Self::AnswerQuestion { room_id, .. }
            | Self::CreatePoll { room_id, .. }
            | Self::VotePoll { room_id, .. }
            | Self::WhiteboardDraw { room_id, .. }
            | Self::WhiteboardData { room_id, .. }
            | Self::WhiteboardClear { room_id }
            | Self::ExportData { room_id, .. } => room_id.as_ref(),
            Self::Offer(signal) | Self::Answer(signal) | Self::IceCandidate(signal) => signal.room_id.as_ref(),
            Self::CreateRoom { .. } | Self::SetUserId { .. } => None,
        }
    }

    /// Join-path events report a missing room with `room-not-found`.
    pub fn is_join(&self) -> bool {
        matches!(
            self,
            Self::JoinRoom { .. } | Self::Reconnect { .. } | Self::JoinRequest { .. }
        )
    }

    /// Content events never change membership.
    pub fn is_content(&self) -> bool {
        matches!(
            self,
            Self::ChatMessage { .. }
                | Self::AskQuestion { .. }
                | Self::AnswerQuestion { .. }
                | Self::CreatePoll { .. }
                | Self::VotePoll { .. }
                | Self::WhiteboardDraw { .. }
                | Self::WhiteboardData { .. }
                | Self::WhiteboardClear { .. }
                | Self::ExportData { .. }
                | Self::Offer(_)
                | Self::Answer(_)
                | Self::IceCandidate(_)
        )
    }

    /// Decode one text frame.
    ///
    /// A frame without a `data` member is treated as carrying an empty object,
    /// so `{"event":"whiteboard-clear"}` is accepted.
    pub fn decode(text: &str, max_bytes: usize) -> Result<Self, ProtocolError> {
        if text.len() > max_bytes {
            return Err(ProtocolError::FrameTooLarge(text.len()));
        }
        let mut value: Value = serde_json::from_str(text)?;
        if let Value::Object(ref mut map) = value
            && !map.contains_key("data")
        {
            map.insert("data".to_string(), Value::Object(Default::default()));
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Raw whiteboard segment as sent by a client; sanitized before storage.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StrokeInput {
    pub x0: Option<f64>,
    pub y0: Option<f64>,
    pub x1: Option<f64>,
    pub y1: Option<f64>,
    pub color: Option<String>,
    pub width: Option<f64>,
    pub tool: Option<String>,
}

/// Opaque signaling payload addressed to one participant.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalInput {
    #[serde(default)]
    pub room_id: Option<RoomId>,
    pub to: UserId,
    #[serde(default, alias = "offer", alias = "answer", alias = "candidate")]
    pub payload: Value,
}

/// Which content stream `export-data` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Chat,
    Questions,
    Polls,
    Whiteboard,
    All,
}
