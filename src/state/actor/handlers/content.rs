//! Chat, Q&A, polls, whiteboard and export.
//!
//! Content is validated, stored, then broadcast. A rejected input is never
//! stored and only the sender hears about it.

use super::super::Coordinator;
use crate::error::{RoomError, RoomResult};
use crate::proto::{ExportKind, ServerEvent, StrokeInput};
use crate::state::{ConnId, RoomId, Stroke, UserId};

/// Sender of a content event, resolved from the connection binding.
pub(crate) struct Member {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub user_name: String,
}

impl Coordinator {
    /// Resolve the sender as a connected participant of the addressed room
    /// (or of the room the connection is bound to when none is given).
    pub(crate) fn member(&self, conn_id: &ConnId, room_id: Option<RoomId>) -> RoomResult<Member> {
        let user_id = self.connections.user_of(conn_id).ok_or(RoomError::NotMember)?;
        let room_id = room_id
            .or_else(|| self.connections.room_of(conn_id).cloned())
            .ok_or(RoomError::NotMember)?;
        let room = match self.registry.get(&room_id) {
            Some(room) if room.is_active => room,
            Some(_) => return Err(RoomError::RoomInactive(room_id)),
            None => return Err(RoomError::RoomNotFound(room_id)),
        };
        let participant = room
            .participants
            .get(user_id)
            .filter(|p| p.live_connection() == Some(conn_id))
            .ok_or(RoomError::NotMember)?;

        Ok(Member {
            user_id: user_id.clone(),
            user_name: participant.display_name.clone(),
            room_id,
        })
    }

    pub(crate) fn handle_chat(&mut self, conn_id: &ConnId, room_id: Option<RoomId>, message: Option<String>) -> RoomResult {
        let member = self.member(conn_id, room_id)?;
        let chat = self
            .registry
            .active_mut(&member.room_id)?
            .content
            .add_chat(&member.user_id, &member.user_name, message.as_deref(), &self.settings.limits)?;
        self.broadcast(&member.room_id, ServerEvent::ChatMessage(chat), None);
        Ok(())
    }

    pub(crate) fn handle_ask(&mut self, conn_id: &ConnId, room_id: Option<RoomId>, question: Option<String>) -> RoomResult {
        let member = self.member(conn_id, room_id)?;
        let question = self
            .registry
            .active_mut(&member.room_id)?
            .content
            .add_question(&member.user_id, &member.user_name, question.as_deref(), &self.settings.limits)?;
        self.broadcast(&member.room_id, ServerEvent::NewQuestion(question), None);
        Ok(())
    }

    pub(crate) fn handle_answer(
        &mut self,
        conn_id: &ConnId,
        room_id: Option<RoomId>,
        question_id: &str,
        answer: Option<String>,
    ) -> RoomResult {
        let member = self.member(conn_id, room_id)?;
        let question = self.registry.active_mut(&member.room_id)?.content.answer_question(
            question_id,
            &member.user_id,
            &member.user_name,
            answer.as_deref(),
            &self.settings.limits,
        )?;
        self.broadcast(&member.room_id, ServerEvent::QuestionUpdated(question), None);
        Ok(())
    }

    pub(crate) fn handle_create_poll(
        &mut self,
        conn_id: &ConnId,
        room_id: Option<RoomId>,
        question: Option<String>,
        options: Vec<String>,
    ) -> RoomResult {
        let member = self.member(conn_id, room_id)?;
        let poll = self
            .registry
            .active_mut(&member.room_id)?
            .content
            .add_poll(&member.user_id, question.as_deref(), &options, &self.settings.limits)?;
        self.broadcast(&member.room_id, ServerEvent::NewPoll(poll), None);
        Ok(())
    }

    pub(crate) fn handle_vote(&mut self, conn_id: &ConnId, room_id: Option<RoomId>, poll_id: &str, option_index: usize) -> RoomResult {
        let member = self.member(conn_id, room_id)?;
        let poll = self
            .registry
            .active_mut(&member.room_id)?
            .content
            .vote(poll_id, &member.user_id, option_index)?;
        self.broadcast(&member.room_id, ServerEvent::PollUpdated(poll), None);
        Ok(())
    }

    /// Single stroke. The sender already rendered it, so it is excluded.
    pub(crate) fn handle_draw(&mut self, conn_id: &ConnId, room_id: Option<RoomId>, stroke: Option<StrokeInput>) -> RoomResult {
        let member = self.member(conn_id, room_id)?;
        let input = stroke.ok_or_else(|| RoomError::ValidationFailed("stroke is required".into()))?;
        let stroke = Stroke::sanitize(&input, &member.user_id, &self.settings.limits)?;

        self.registry
            .active_mut(&member.room_id)?
            .content
            .add_stroke(stroke.clone(), &self.settings.limits);
        self.broadcast(
            &member.room_id,
            ServerEvent::WhiteboardDraw {
                room_id: member.room_id.clone(),
                stroke,
            },
            Some(conn_id),
        );
        Ok(())
    }

    /// Batch of strokes. Valid ones are stored and relayed; invalid ones are
    /// reported once.
    pub(crate) fn handle_whiteboard_batch(
        &mut self,
        conn_id: &ConnId,
        room_id: Option<RoomId>,
        strokes: Vec<StrokeInput>,
    ) -> RoomResult {
        let member = self.member(conn_id, room_id)?;

        let mut accepted = Vec::with_capacity(strokes.len());
        let mut rejected = 0usize;
        for input in &strokes {
            match Stroke::sanitize(input, &member.user_id, &self.settings.limits) {
                Ok(stroke) => accepted.push(stroke),
                Err(_) => rejected += 1,
            }
        }

        if !accepted.is_empty() {
            let room = self.registry.active_mut(&member.room_id)?;
            for stroke in &accepted {
                room.content.add_stroke(stroke.clone(), &self.settings.limits);
            }
            self.broadcast(
                &member.room_id,
                ServerEvent::WhiteboardData {
                    room_id: member.room_id.clone(),
                    strokes: accepted,
                },
                Some(conn_id),
            );
        }

        if rejected > 0 {
            return Err(RoomError::ValidationFailed(format!(
                "{rejected} of {} strokes were invalid and skipped",
                strokes.len()
            )));
        }
        Ok(())
    }

    pub(crate) fn handle_whiteboard_clear(&mut self, conn_id: &ConnId, room_id: Option<RoomId>) -> RoomResult {
        let member = self.member(conn_id, room_id)?;
        self.registry.active_mut(&member.room_id)?.content.clear_whiteboard();
        self.broadcast(
            &member.room_id,
            ServerEvent::WhiteboardClear {
                room_id: member.room_id.clone(),
                cleared_by: member.user_id.clone(),
            },
            None,
        );
        Ok(())
    }

    pub(crate) fn handle_export(&mut self, conn_id: &ConnId, room_id: Option<RoomId>, kind: ExportKind) -> RoomResult {
        let member = self.member(conn_id, room_id)?;
        let data = self.registry.active_mut(&member.room_id)?.content.export(kind);
        self.send_to(
            conn_id,
            ServerEvent::ExportReady {
                room_id: member.room_id,
                kind,
                data,
            },
        );
        Ok(())
    }
}
