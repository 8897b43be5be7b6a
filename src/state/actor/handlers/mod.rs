//! Coordinator event handlers.
//!
//! Each submodule handles a category of [`CoordinatorEvent`](super::CoordinatorEvent)
//! messages processed by [`Coordinator`](super::Coordinator).

pub mod broadcast;
pub mod content;
pub mod membership;
pub mod presence;
pub mod queries;
pub mod signaling;
