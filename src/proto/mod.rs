//! Wire protocol for the real-time surface.
//!
//! Every frame is a JSON text message of the form `{"event": <name>, "data": {...}}`
//! with kebab-case event names and camelCase fields.

mod client;
mod server;

pub use client::{ClientEvent, ExportKind, SignalInput, StrokeInput};
pub use server::{ParticipantView, ServerEvent, Signal};
