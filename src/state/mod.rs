//! State management module.
//!
//! The coordinator actor owns every piece of room state; the types here are
//! plain data it mutates from a single task.

pub mod actor;
mod connections;
mod content;
mod names;
mod presence;
mod registry;
mod room;
mod uid;

pub use actor::{Coordinator, CoordinatorEvent, CoordinatorHandle, Settings};
pub use connections::{ConnectionTable, EventSender};
pub use content::{Answer, ChatMessage, Poll, Question, RoomContent, Stroke, Tool, Vote};
pub use names::NameGenerator;
pub use presence::{ConnectionState, Presence};
pub use registry::RoomRegistry;
pub use room::{JoinRequestEntry, Participant, Room};
pub use uid::{ConnId, ConnIdGenerator, RoomId, UserId, new_room_id};
