//! Unified error handling for conflux.
//!
//! Domain failures are typed results that the dispatch layer converts into
//! caller-directed notifications. Nothing in this hierarchy closes a
//! connection or stops the coordinator.

use thiserror::Error;

use crate::proto::ServerEvent;
use crate::state::{RoomId, UserId};

// ============================================================================
// Room Errors (coordinator operations)
// ============================================================================

/// Room operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("room {0} does not exist")]
    RoomNotFound(RoomId),

    #[error("room {0} is no longer active")]
    RoomInactive(RoomId),

    #[error("room {0} is full")]
    RoomFull(RoomId),

    #[error("room {0} already exists")]
    DuplicateRoom(RoomId),

    #[error("only the room owner can do that")]
    NotOwner,

    #[error("you are not a member of this room")]
    NotMember,

    #[error("user {0} is not a valid target")]
    InvalidTarget(UserId),

    #[error("{0}")]
    ValidationFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RoomError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RoomNotFound(_) => "room_not_found",
            Self::RoomInactive(_) => "room_inactive",
            Self::RoomFull(_) => "room_full",
            Self::DuplicateRoom(_) => "duplicate_room",
            Self::NotOwner => "not_owner",
            Self::NotMember => "not_member",
            Self::InvalidTarget(_) => "invalid_target",
            Self::ValidationFailed(_) => "validation_failed",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Error type reported to clients in `room-error`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RoomNotFound(_) => "RoomNotFound",
            Self::RoomInactive(_) => "RoomInactive",
            Self::RoomFull(_) => "RoomFull",
            Self::DuplicateRoom(_) => "DuplicateRoom",
            Self::NotOwner => "NotOwner",
            Self::NotMember => "NotMember",
            Self::InvalidTarget(_) => "InvalidTarget",
            Self::ValidationFailed(_) => "ValidationFailed",
            Self::Internal(_) => "InternalFault",
        }
    }

    /// Convert to the notification sent back to the caller.
    ///
    /// Internal errors carry a generic message; their detail is only logged.
    pub fn to_event(&self, room_id: Option<&RoomId>) -> ServerEvent {
        let message = match self {
            Self::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };
        ServerEvent::RoomError {
            kind: self.kind(),
            message,
            room_id: room_id.cloned(),
        }
    }

    /// Variant used on the join paths, where a missing room has its own event.
    pub fn to_join_event(&self, room_id: &RoomId) -> ServerEvent {
        match self {
            Self::RoomNotFound(id) => ServerEvent::RoomNotFound { room_id: id.clone() },
            other => other.to_event(Some(room_id)),
        }
    }
}

/// Result type for coordinator handlers.
pub type RoomResult<T = ()> = Result<T, RoomError>;

// ============================================================================
// Protocol Errors (frame decoding)
// ============================================================================

/// Errors raised while decoding an inbound frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame of {0} bytes exceeds the limit")]
    FrameTooLarge(usize),

    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("binary frames are not supported")]
    Binary,
}

impl From<ProtocolError> for RoomError {
    fn from(err: ProtocolError) -> Self {
        RoomError::ValidationFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_error_codes() {
        assert_eq!(RoomError::NotOwner.error_code(), "not_owner");
        assert_eq!(RoomError::RoomFull("r".into()).error_code(), "room_full");
        assert_eq!(RoomError::Internal("x".into()).error_code(), "internal_error");
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let event = RoomError::Internal("poisoned index".into()).to_event(None);
        match event {
            ServerEvent::RoomError { kind, message, room_id } => {
                assert_eq!(kind, "InternalFault");
                assert!(!message.contains("poisoned"));
                assert!(room_id.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_join_event_uses_room_not_found() {
        let room = "r1".to_string();
        let event = RoomError::RoomNotFound(room.clone()).to_join_event(&room);
        assert!(matches!(event, ServerEvent::RoomNotFound { room_id } if room_id == "r1"));

        let event = RoomError::RoomFull(room.clone()).to_join_event(&room);
        assert!(matches!(event, ServerEvent::RoomError { kind: "RoomFull", .. }));
    }

    #[test]
    fn test_protocol_error_maps_to_validation() {
        let err: RoomError = ProtocolError::FrameTooLarge(70_000).into();
        assert_eq!(err.kind(), "ValidationFailed");
    }
}
