//! Actor model for room session state.
//!
//! The `Coordinator` owns every room, participant and connection binding in a
//! single Tokio task. Connection tasks, the admin HTTP surface and timers talk
//! to it only through `CoordinatorEvent` messages, so each event runs to
//! completion against a consistent view of the world.
//!
//! # Architecture
//!
//! - **State Ownership**: registry, participant maps and the connection table
//!   live inside the actor; nothing is shared behind locks.
//! - **Timers**: grace and purge timers are detached tasks that sleep and post
//!   an event carrying the generation they were armed with. A timer whose
//!   generation no longer matches is a no-op.
//! - **Delivery**: outbound events go through each connection's bounded queue
//!   with `try_send`; a slow client never stalls the actor.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, error};

use crate::error::RoomError;
use crate::metrics;
use crate::proto::ClientEvent;
use crate::state::{ConnId, ConnectionTable, RoomRegistry};
use crate::telemetry::{EventTimer, spans};

mod handle;
mod handlers;
mod types;

pub use handle::CoordinatorHandle;
pub use types::*;

const EVENT_QUEUE: usize = 1024;

/// The room session coordinator.
pub struct Coordinator {
    settings: Settings,
    registry: RoomRegistry,
    connections: ConnectionTable,
    /// Used by timers to post back into the actor. Weak, so the actor stops
    /// once every handle is gone.
    self_tx: mpsc::WeakSender<CoordinatorEvent>,
}

impl Coordinator {
    pub fn new(settings: Settings, self_tx: mpsc::WeakSender<CoordinatorEvent>) -> Self {
        let registry = RoomRegistry::new(settings.rooms.max_participants);
        Self {
            settings,
            registry,
            connections: ConnectionTable::default(),
            self_tx,
        }
    }

    /// Create a coordinator and spawn it.
    pub fn spawn(settings: Settings) -> CoordinatorHandle {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE);
        let coordinator = Self::new(settings, tx.downgrade());

        tokio::spawn(async move {
            coordinator.run(rx).await;
        });

        CoordinatorHandle::new(tx)
    }

    /// The main actor loop.
    pub async fn run(mut self, mut rx: mpsc::Receiver<CoordinatorEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle_event(event);
        }
        debug!("Coordinator stopped");
    }

    pub fn handle_event(&mut self, event: CoordinatorEvent) {
        let mut membership_changed = true;
        match event {
            CoordinatorEvent::Attach { conn_id, sender } => {
                self.connections.attach(conn_id, sender);
            }
            CoordinatorEvent::Client { conn_id, event } => {
                membership_changed = !event.is_content();
                self.handle_client(conn_id, event);
            }
            CoordinatorEvent::Detach { conn_id } => {
                self.handle_detach(&conn_id);
            }
            CoordinatorEvent::GraceExpired {
                room_id,
                user_id,
                generation,
            } => {
                self.handle_grace_expired(&room_id, &user_id, generation);
            }
            CoordinatorEvent::PurgeDue { room_id, generation } => {
                self.handle_purge(&room_id, generation);
            }
            CoordinatorEvent::CreateRoom {
                owner,
                owner_name,
                reply_tx,
            } => {
                let _ = reply_tx.send(self.create_detached_room(owner, owner_name));
            }
            CoordinatorEvent::FindRoom {
                friendly_name,
                reply_tx,
            } => {
                membership_changed = false;
                let _ = reply_tx.send(self.registry.find_by_friendly_name(&friendly_name).cloned());
            }
            CoordinatorEvent::Health { reply_tx } => {
                membership_changed = false;
                let _ = reply_tx.send(self.health());
            }
            CoordinatorEvent::Stats { reply_tx } => {
                membership_changed = false;
                let _ = reply_tx.send(self.stats());
            }
            CoordinatorEvent::ListRooms { reply_tx } => {
                membership_changed = false;
                let _ = reply_tx.send(self.list_rooms());
            }
            CoordinatorEvent::RoomDetail { room_id, reply_tx } => {
                membership_changed = false;
                let _ = reply_tx.send(self.room_detail(&room_id));
            }
        }

        if membership_changed {
            self.refresh_gauges();
        }
    }

    /// Run one client event and turn a failure into a caller-directed reply.
    fn handle_client(&mut self, conn_id: ConnId, event: ClientEvent) {
        if self.connections.get(&conn_id).is_none() {
            debug!(conn_id = %conn_id, "Event from unknown connection ignored");
            return;
        }

        let name = event.name();
        let span = spans::event(name, &conn_id, self.connections.user_of(&conn_id).map(String::as_str));
        let _enter = span.enter();
        let _timer = EventTimer::new(name);

        let context = event
            .room_hint()
            .cloned()
            .or_else(|| self.connections.room_of(&conn_id).cloned());
        let join_path = event.is_join();

        if let Err(err) = self.dispatch(&conn_id, event) {
            metrics::record_event_error(name, err.error_code());
            match &err {
                RoomError::Internal(detail) => {
                    error!(error = %detail, room_id = ?context, "Event handling failed");
                }
                other => debug!(error = %other, room_id = ?context, "Event rejected"),
            }
            let reply = match context {
                Some(ref room_id) if join_path => err.to_join_event(room_id),
                ref room_id => err.to_event(room_id.as_ref()),
            };
            self.send_to(&conn_id, reply);
        }
    }

    fn dispatch(&mut self, conn_id: &ConnId, event: ClientEvent) -> Result<(), RoomError> {
        use handlers::membership::JoinIntent;
        use handlers::signaling::SignalKind;

        match event {
            ClientEvent::CreateRoom { user_id, user_name } => self.handle_create_room(conn_id, user_id, user_name),
            ClientEvent::JoinRoom {
                room_id,
                user_id,
                user_name,
                is_room_owner,
            } => self.handle_join(
                conn_id,
                JoinIntent {
                    room_id,
                    user_id,
                    user_name,
                    claims_owner: is_room_owner,
                },
            ),
            ClientEvent::Reconnect {
                room_id,
                user_id,
                user_name,
            } => self.handle_join(
                conn_id,
                JoinIntent {
                    room_id,
                    user_id,
                    user_name,
                    claims_owner: false,
                },
            ),
            ClientEvent::JoinRequest { room_id, user, user_name } => self.handle_join(
                conn_id,
                JoinIntent {
                    room_id,
                    user_id: user,
                    user_name,
                    claims_owner: false,
                },
            ),
            ClientEvent::Invite { room_id, invitee } => self.handle_invite(conn_id, &room_id, invitee),
            ClientEvent::AcceptJoin { room_id, user } => self.handle_decision(conn_id, &room_id, &user, true),
            ClientEvent::RejectJoin { room_id, user } => self.handle_decision(conn_id, &room_id, &user, false),
            ClientEvent::DeleteRoom { room_id, user } => self.handle_delete_room(conn_id, &room_id, user),
            ClientEvent::LeaveRoom { room_id } => self.handle_leave(conn_id, room_id),
            ClientEvent::ChatMessage { room_id, message } => self.handle_chat(conn_id, room_id, message),
            ClientEvent::AskQuestion { room_id, question } => self.handle_ask(conn_id, room_id, question),
            ClientEvent::AnswerQuestion {
                room_id,
                question_id,
                answer,
            } => self.handle_answer(conn_id, room_id, &question_id, answer),
            ClientEvent::CreatePoll {
                room_id,
                question,
                options,
            } => self.handle_create_poll(conn_id, room_id, question, options),
            ClientEvent::VotePoll {
                room_id,
                poll_id,
                option_index,
            } => self.handle_vote(conn_id, room_id, &poll_id, option_index),
            ClientEvent::WhiteboardDraw { room_id, stroke } => self.handle_draw(conn_id, room_id, stroke),
            ClientEvent::WhiteboardData { room_id, strokes } => self.handle_whiteboard_batch(conn_id, room_id, strokes),
            ClientEvent::WhiteboardClear { room_id } => self.handle_whiteboard_clear(conn_id, room_id),
            ClientEvent::ExportData { room_id, kind } => self.handle_export(conn_id, room_id, kind),
            ClientEvent::Offer(signal) => self.handle_signal(conn_id, SignalKind::Offer, signal),
            ClientEvent::Answer(signal) => self.handle_signal(conn_id, SignalKind::Answer, signal),
            ClientEvent::IceCandidate(signal) => self.handle_signal(conn_id, SignalKind::IceCandidate, signal),
            ClientEvent::SetUserId { user_id } => self.handle_set_user_id(conn_id, user_id),
        }
    }

    fn refresh_gauges(&self) {
        let mut rooms = 0;
        let mut participants = 0;
        for room in self.registry.active_rooms() {
            rooms += 1;
            participants += room.participants.len();
        }
        metrics::set_room_gauges(rooms, participants);
    }
}

/// Sleep, then post `event` back into the coordinator.
///
/// The returned handle lets the caller abort the timer when the state it
/// guards changes first.
fn spawn_timer(
    tx: &mpsc::WeakSender<CoordinatorEvent>,
    delay: Duration,
    event: CoordinatorEvent,
) -> AbortHandle {
    let tx = tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Some(tx) = tx.upgrade() {
            let _ = tx.send(event).await;
        }
    })
    .abort_handle()
}
