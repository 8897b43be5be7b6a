//! Peer-to-peer signaling relay (offer / answer / ICE candidate).
//!
//! Payloads are opaque and relayed to exactly one participant. Delivery is
//! best-effort: a target in its grace period is skipped, and the media
//! negotiation layer is expected to retry.

use super::super::Coordinator;
use crate::error::{RoomError, RoomResult};
use crate::proto::{ServerEvent, Signal, SignalInput};
use crate::state::ConnId;

#[derive(Debug, Clone, Copy)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

impl SignalKind {
    fn wrap(self, signal: Signal) -> ServerEvent {
        match self {
            Self::Offer => ServerEvent::Offer(signal),
            Self::Answer => ServerEvent::Answer(signal),
            Self::IceCandidate => ServerEvent::IceCandidate(signal),
        }
    }
}

impl Coordinator {
    pub(crate) fn handle_signal(&mut self, conn_id: &ConnId, kind: SignalKind, input: SignalInput) -> RoomResult {
        let member = self.member(conn_id, input.room_id)?;
        let is_participant = self
            .registry
            .get(&member.room_id)
            .is_some_and(|room| room.participants.contains_key(&input.to));
        if !is_participant {
            return Err(RoomError::InvalidTarget(input.to));
        }

        let event = kind.wrap(Signal {
            room_id: member.room_id.clone(),
            from: member.user_id,
            payload: input.payload,
        });
        if !self.send_to_participant(&member.room_id, &input.to, event) {
            tracing::debug!(room_id = %member.room_id, to = %input.to, ?kind, "Signal not delivered");
        }
        Ok(())
    }
}
