//! Room content streams: chat, Q&A, polls and whiteboard.
//!
//! Streams are append-only and capped; the oldest entry is evicted when a
//! stream is full. Inputs are validated and normalized before they are
//! stored, so everything here is safe to broadcast as-is.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use crate::config::LimitsConfig;
use crate::error::{RoomError, RoomResult};
use crate::proto::{ExportKind, StrokeInput};
use crate::state::UserId;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub from_user_id: UserId,
    pub from_user_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub text: String,
    pub answered_by: UserId,
    pub answered_by_name: String,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub text: String,
    pub asked_by: UserId,
    pub asked_by_name: String,
    pub asked_at: DateTime<Utc>,
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub user_id: UserId,
    pub option_index: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub votes: Vec<Vote>,
    /// Vote count per option, kept in step with `votes`.
    pub tally: Vec<usize>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Poll {
    fn recount(&mut self) {
        self.tally = vec![0; self.options.len()];
        for vote in &self.votes {
            if let Some(count) = self.tally.get_mut(vote.option_index) {
                *count += 1;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Pen,
    Eraser,
    Line,
    Rectangle,
    Circle,
    Highlighter,
}

impl Tool {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "pen" => Some(Self::Pen),
            "eraser" => Some(Self::Eraser),
            "line" => Some(Self::Line),
            "rectangle" => Some(Self::Rectangle),
            "circle" => Some(Self::Circle),
            "highlighter" => Some(Self::Highlighter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub color: String,
    pub width: f64,
    pub tool: Tool,
    pub drawn_by: UserId,
}

const DEFAULT_COLOR: &str = "#000000";
const DEFAULT_WIDTH: f64 = 2.0;

fn is_hex_color(color: &str) -> bool {
    let Some(hex) = color.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

impl Stroke {
    /// Validate and normalize a client-supplied segment.
    ///
    /// Missing or non-finite coordinates reject the stroke. Everything else
    /// is clamped or defaulted.
    pub fn sanitize(input: &StrokeInput, drawn_by: &UserId, limits: &LimitsConfig) -> RoomResult<Self> {
        let coord = |value: Option<f64>, name: &str| -> RoomResult<f64> {
            match value {
                Some(v) if v.is_finite() => Ok(v.clamp(0.0, limits.canvas_size)),
                _ => Err(RoomError::ValidationFailed(format!(
                    "stroke coordinate {name} is missing or invalid"
                ))),
            }
        };

        let color = input
            .color
            .as_deref()
            .filter(|c| is_hex_color(c))
            .unwrap_or(DEFAULT_COLOR)
            .to_string();
        let width = input
            .width
            .filter(|w| w.is_finite())
            .map(|w| w.clamp(1.0, limits.max_stroke_width))
            .unwrap_or(DEFAULT_WIDTH);
        let tool = input.tool.as_deref().and_then(Tool::parse).unwrap_or(Tool::Pen);

        Ok(Self {
            x0: coord(input.x0, "x0")?,
            y0: coord(input.y0, "y0")?,
            x1: coord(input.x1, "x1")?,
            y1: coord(input.y1, "y1")?,
            color,
            width,
            tool,
            drawn_by: drawn_by.clone(),
        })
    }
}

/// Trim and clamp free text. Empty text is rejected.
pub fn clamp_text(text: Option<&str>, field: &str, max_chars: usize) -> RoomResult<String> {
    let trimmed = text.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(RoomError::ValidationFailed(format!("{field} is required")));
    }
    Ok(trimmed.chars().take(max_chars).collect())
}

fn push_capped<T>(stream: &mut VecDeque<T>, item: T, cap: usize) {
    while stream.len() >= cap.max(1) {
        stream.pop_front();
    }
    stream.push_back(item);
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// All content stored for one room.
#[derive(Debug, Default)]
pub struct RoomContent {
    pub chat: VecDeque<ChatMessage>,
    pub questions: VecDeque<Question>,
    pub polls: VecDeque<Poll>,
    pub strokes: VecDeque<Stroke>,
}

impl RoomContent {
    pub fn add_chat(
        &mut self,
        from: &UserId,
        from_name: &str,
        text: Option<&str>,
        limits: &LimitsConfig,
    ) -> RoomResult<ChatMessage> {
        let message = ChatMessage {
            id: new_id(),
            from_user_id: from.clone(),
            from_user_name: from_name.to_string(),
            text: clamp_text(text, "message", limits.max_message_length)?,
            timestamp: Utc::now(),
        };
        push_capped(&mut self.chat, message.clone(), limits.max_chat_history);
        Ok(message)
    }

    pub fn add_question(
        &mut self,
        from: &UserId,
        from_name: &str,
        text: Option<&str>,
        limits: &LimitsConfig,
    ) -> RoomResult<Question> {
        let question = Question {
            id: new_id(),
            text: clamp_text(text, "question", limits.max_message_length)?,
            asked_by: from.clone(),
            asked_by_name: from_name.to_string(),
            asked_at: Utc::now(),
            answers: Vec::new(),
        };
        push_capped(&mut self.questions, question.clone(), limits.max_questions);
        Ok(question)
    }

    pub fn answer_question(
        &mut self,
        question_id: &str,
        from: &UserId,
        from_name: &str,
        text: Option<&str>,
        limits: &LimitsConfig,
    ) -> RoomResult<Question> {
        let text = clamp_text(text, "answer", limits.max_message_length)?;
        let question = self
            .questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .ok_or_else(|| RoomError::ValidationFailed(format!("unknown question {question_id}")))?;
        question.answers.push(Answer {
            text,
            answered_by: from.clone(),
            answered_by_name: from_name.to_string(),
            answered_at: Utc::now(),
        });
        Ok(question.clone())
    }

    pub fn add_poll(
        &mut self,
        from: &UserId,
        question: Option<&str>,
        options: &[String],
        limits: &LimitsConfig,
    ) -> RoomResult<Poll> {
        let question = clamp_text(question, "poll question", limits.max_message_length)?;
        let options: Vec<String> = options
            .iter()
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .map(|o| o.chars().take(limits.max_message_length).collect())
            .collect();
        if options.len() < 2 || options.len() > limits.max_poll_options {
            return Err(RoomError::ValidationFailed(format!(
                "a poll needs between 2 and {} options",
                limits.max_poll_options
            )));
        }

        let mut poll = Poll {
            id: new_id(),
            question,
            options,
            votes: Vec::new(),
            tally: Vec::new(),
            created_by: from.clone(),
            created_at: Utc::now(),
        };
        poll.recount();
        push_capped(&mut self.polls, poll.clone(), limits.max_polls);
        Ok(poll)
    }

    /// Record a vote. A user's later vote replaces their earlier one.
    pub fn vote(&mut self, poll_id: &str, user_id: &UserId, option_index: usize) -> RoomResult<Poll> {
        let poll = self
            .polls
            .iter_mut()
            .find(|p| p.id == poll_id)
            .ok_or_else(|| RoomError::ValidationFailed(format!("unknown poll {poll_id}")))?;
        if option_index >= poll.options.len() {
            return Err(RoomError::ValidationFailed(format!(
                "option {option_index} is out of range"
            )));
        }

        poll.votes.retain(|v| &v.user_id != user_id);
        poll.votes.push(Vote {
            user_id: user_id.clone(),
            option_index,
        });
        poll.recount();
        Ok(poll.clone())
    }

    pub fn add_stroke(&mut self, stroke: Stroke, limits: &LimitsConfig) {
        push_capped(&mut self.strokes, stroke, limits.max_whiteboard_strokes);
    }

    pub fn clear_whiteboard(&mut self) {
        self.strokes.clear();
    }

    pub fn export(&self, kind: ExportKind) -> Value {
        match kind {
            ExportKind::Chat => json!(self.chat),
            ExportKind::Questions => json!(self.questions),
            ExportKind::Polls => json!(self.polls),
            ExportKind::Whiteboard => json!(self.strokes),
            ExportKind::All => json!({
                "chat": self.chat,
                "questions": self.questions,
                "polls": self.polls,
                "whiteboard": self.strokes,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> LimitsConfig {
        LimitsConfig::default()
    }

    fn user() -> UserId {
        "u1".to_string()
    }

    #[test]
    fn chat_is_trimmed_and_clamped() {
        let mut content = RoomContent::default();
        let limits = LimitsConfig {
            max_message_length: 5,
            ..limits()
        };
        let msg = content.add_chat(&user(), "Ana", Some("  hello world "), &limits).unwrap();
        assert_eq!(msg.text, "hello");
        assert_eq!(content.chat.len(), 1);
    }

    #[test]
    fn empty_chat_is_rejected_and_not_stored() {
        let mut content = RoomContent::default();
        let err = content.add_chat(&user(), "Ana", Some("   "), &limits()).unwrap_err();
        assert_eq!(err.kind(), "ValidationFailed");
        assert!(content.chat.is_empty());
    }

    #[test]
    fn chat_history_evicts_oldest() {
        let mut content = RoomContent::default();
        let limits = LimitsConfig {
            max_chat_history: 2,
            ..limits()
        };
        for text in ["one", "two", "three"] {
            content.add_chat(&user(), "Ana", Some(text), &limits).unwrap();
        }
        let texts: Vec<&str> = content.chat.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["two", "three"]);
    }

    #[test]
    fn revote_replaces_previous_vote() {
        let mut content = RoomContent::default();
        let options = vec!["yes".to_string(), "no".to_string()];
        let poll = content.add_poll(&user(), Some("lunch?"), &options, &limits()).unwrap();

        content.vote(&poll.id, &user(), 0).unwrap();
        let poll = content.vote(&poll.id, &user(), 1).unwrap();
        assert_eq!(poll.votes.len(), 1);
        assert_eq!(poll.tally, vec![0, 1]);

        assert!(content.vote(&poll.id, &user(), 2).is_err());
        assert!(content.vote("missing", &user(), 0).is_err());
    }

    #[test]
    fn poll_option_bounds() {
        let mut content = RoomContent::default();
        let one = vec!["only".to_string()];
        assert!(content.add_poll(&user(), Some("q"), &one, &limits()).is_err());

        let many: Vec<String> = (0..11).map(|i| i.to_string()).collect();
        assert!(content.add_poll(&user(), Some("q"), &many, &limits()).is_err());
        assert!(content.polls.is_empty());
    }

    #[test]
    fn answers_attach_to_question() {
        let mut content = RoomContent::default();
        let q = content.add_question(&user(), "Ana", Some("why?"), &limits()).unwrap();
        let q = content
            .answer_question(&q.id, &"u2".to_string(), "Bo", Some("because"), &limits())
            .unwrap();
        assert_eq!(q.answers.len(), 1);
        assert_eq!(q.answers[0].answered_by, "u2");
        assert!(content.answer_question("nope", &user(), "Ana", Some("x"), &limits()).is_err());
    }

    #[test]
    fn stroke_is_clamped_and_defaulted() {
        let input = StrokeInput {
            x0: Some(-5.0),
            y0: Some(20.0),
            x1: Some(20_000.0),
            y1: Some(30.0),
            color: Some("red".to_string()),
            width: Some(500.0),
            tool: Some("spray".to_string()),
        };
        let stroke = Stroke::sanitize(&input, &user(), &limits()).unwrap();
        assert_eq!(stroke.x0, 0.0);
        assert_eq!(stroke.x1, 10_000.0);
        assert_eq!(stroke.color, DEFAULT_COLOR);
        assert_eq!(stroke.width, 50.0);
        assert_eq!(stroke.tool, Tool::Pen);
    }

    #[test]
    fn stroke_keeps_valid_style() {
        let input = StrokeInput {
            x0: Some(1.0),
            y0: Some(2.0),
            x1: Some(3.0),
            y1: Some(4.0),
            color: Some("#a0f".to_string()),
            width: None,
            tool: Some("Eraser".to_string()),
        };
        let stroke = Stroke::sanitize(&input, &user(), &limits()).unwrap();
        assert_eq!(stroke.color, "#a0f");
        assert_eq!(stroke.width, DEFAULT_WIDTH);
        assert_eq!(stroke.tool, Tool::Eraser);
    }

    #[test]
    fn stroke_requires_coordinates() {
        let input = StrokeInput {
            x0: Some(1.0),
            ..Default::default()
        };
        assert!(Stroke::sanitize(&input, &user(), &limits()).is_err());
    }

    #[test]
    fn export_all_contains_every_stream() {
        let mut content = RoomContent::default();
        content.add_chat(&user(), "Ana", Some("hi"), &limits()).unwrap();
        let all = content.export(ExportKind::All);
        assert_eq!(all["chat"][0]["text"], "hi");
        assert!(all["whiteboard"].as_array().unwrap().is_empty());

        let chat = content.export(ExportKind::Chat);
        assert_eq!(chat.as_array().unwrap().len(), 1);
    }
}
