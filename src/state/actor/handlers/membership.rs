//! Room creation, admission, invitations, join decisions, leave and delete.
//!
//! Admission order for a join attempt:
//! 1. missing room + owner claim: create it and admit the owner
//! 2. missing room: `RoomNotFound`
//! 3. inactive room: `RoomInactive`
//! 4. already a participant: rebind (reconnect), never counted twice
//! 5. at capacity: `RoomFull`
//! 6. owner or invited: admit
//! 7. anyone else: queue a join request for the owner, up to
//!    `limits.max_join_requests` per room
//!
//! The connection's identity and room binding only change once one of
//! these steps has admitted or queued the attempt.

use chrono::Utc;
use tracing::{debug, info};

use super::super::{Coordinator, CoordinatorEvent, CreatedRoom, spawn_timer};
use crate::error::{RoomError, RoomResult};
use crate::proto::ServerEvent;
use crate::state::{ConnId, JoinRequestEntry, Participant, Presence, RoomId, UserId};

/// A join attempt as received from a client.
pub struct JoinIntent {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub user_name: Option<String>,
    pub claims_owner: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Create,
    Rejoin,
    Admit,
    Queue,
}

fn require(value: &str, field: &str) -> RoomResult {
    if value.trim().is_empty() {
        return Err(RoomError::ValidationFailed(format!("{field} is required")));
    }
    Ok(())
}

fn display_name(user_name: Option<String>, user_id: &UserId) -> String {
    user_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| user_id.clone())
}

impl Coordinator {
    /// Bind `user_id` to the connection. A connection that switches identity
    /// leaves the room its previous identity was in.
    pub(crate) fn bind_identity(&mut self, conn_id: &ConnId, user_id: &UserId) -> RoomResult {
        require(user_id, "userId")?;
        let switching = self
            .connections
            .user_of(conn_id)
            .is_some_and(|current| current != user_id);
        if switching && let Some(room_id) = self.connections.room_of(conn_id).cloned() {
            self.depart(conn_id, &room_id);
        }
        self.connections.bind_user(conn_id, user_id);
        Ok(())
    }

    /// Leave the current room if the connection is bound to a different one.
    fn leave_other_room(&mut self, conn_id: &ConnId, room_id: &str) {
        if let Some(current) = self.connections.room_of(conn_id).cloned()
            && current != room_id
        {
            self.depart(conn_id, &current);
        }
    }

    pub(crate) fn handle_set_user_id(&mut self, conn_id: &ConnId, user_id: UserId) -> RoomResult {
        self.bind_identity(conn_id, &user_id)?;
        debug!(conn_id = %conn_id, user_id = %user_id, "Identity bound");
        Ok(())
    }

    pub(crate) fn handle_create_room(
        &mut self,
        conn_id: &ConnId,
        user_id: Option<UserId>,
        user_name: Option<String>,
    ) -> RoomResult {
        let user_id = user_id
            .filter(|u| !u.trim().is_empty())
            .or_else(|| self.connections.user_of(conn_id).cloned())
            .ok_or_else(|| RoomError::ValidationFailed("userId is required".into()))?;
        let name = display_name(user_name, &user_id);

        let room = self.registry.create(&user_id, &name)?;
        let room_id = room.id.clone();
        let friendly_name = room.friendly_name.clone();
        self.bind_identity(conn_id, &user_id)?;
        self.leave_other_room(conn_id, &room_id);

        info!(room_id = %room_id, user_id = %user_id, friendly_name = %friendly_name, "Room created");
        self.send_to(
            conn_id,
            ServerEvent::RoomCreated {
                room_id: room_id.clone(),
                friendly_name,
            },
        );
        self.admit_connected(conn_id, &room_id, &user_id, &name)
    }

    /// Admin-created room. The owner is admitted without a connection and has
    /// one grace period to show up.
    pub(crate) fn create_detached_room(&mut self, owner: UserId, owner_name: Option<String>) -> RoomResult<CreatedRoom> {
        require(&owner, "owner")?;
        let name = display_name(owner_name, &owner);
        let grace = self.settings.rooms.grace_period();

        let room = self.registry.create(&owner, &name)?;
        let created = CreatedRoom {
            room_id: room.id.clone(),
            friendly_name: room.friendly_name.clone(),
        };
        let (presence, generation) = Presence::detached(Utc::now());
        let timer = spawn_timer(
            &self.self_tx,
            grace,
            CoordinatorEvent::GraceExpired {
                room_id: created.room_id.clone(),
                user_id: owner.clone(),
                generation,
            },
        );
        room.admit(Participant {
            user_id: owner.clone(),
            display_name: name,
            connection_id: None,
            is_owner: true,
            joined_at: Utc::now(),
            presence,
        })
        .presence
        .arm(timer);

        info!(room_id = %created.room_id, user_id = %owner, "Room created for detached owner");
        Ok(created)
    }

    /// Decide how a join attempt is admitted without touching any state.
    fn admission_for(&self, room_id: &RoomId, user_id: &UserId, claims_owner: bool) -> RoomResult<Admission> {
        let Some(room) = self.registry.get(room_id) else {
            if claims_owner {
                return Ok(Admission::Create);
            }
            return Err(RoomError::RoomNotFound(room_id.clone()));
        };
        if !room.is_active {
            return Err(RoomError::RoomInactive(room_id.clone()));
        }
        if room.participants.contains_key(user_id) {
            return Ok(Admission::Rejoin);
        }
        if room.is_full() {
            return Err(RoomError::RoomFull(room_id.clone()));
        }
        if room.owner_id == *user_id || room.invites.contains(user_id) {
            return Ok(Admission::Admit);
        }
        if !room.is_pending(user_id) && room.join_requests.len() >= self.settings.limits.max_join_requests {
            return Err(RoomError::ValidationFailed("too many pending join requests".into()));
        }
        Ok(Admission::Queue)
    }

    pub(crate) fn handle_join(&mut self, conn_id: &ConnId, intent: JoinIntent) -> RoomResult {
        let JoinIntent {
            room_id,
            user_id,
            user_name,
            claims_owner,
        } = intent;
        require(&room_id, "roomId")?;
        require(&user_id, "userId")?;
        let name = display_name(user_name, &user_id);

        let admission = self.admission_for(&room_id, &user_id, claims_owner)?;
        self.bind_identity(conn_id, &user_id)?;

        if admission == Admission::Create {
            self.leave_other_room(conn_id, &room_id);
            self.registry.create_with_id(room_id.clone(), &user_id, &name)?;
            info!(room_id = %room_id, user_id = %user_id, "Room created on owner join");
            return self.admit_connected(conn_id, &room_id, &user_id, &name);
        }

        // an identity switch inside the target room may have ended it
        self.registry.active_mut(&room_id)?;
        match admission {
            Admission::Rejoin => {
                self.leave_other_room(conn_id, &room_id);
                self.rejoin(conn_id, &room_id, &user_id)
            }
            Admission::Admit => {
                self.leave_other_room(conn_id, &room_id);
                self.admit_connected(conn_id, &room_id, &user_id, &name)
            }
            Admission::Queue | Admission::Create => self.queue_request(conn_id, room_id, user_id, name),
        }
    }

    fn queue_request(&mut self, conn_id: &ConnId, room_id: RoomId, user_id: UserId, name: String) -> RoomResult {
        let room = self.registry.active_mut(&room_id)?;
        let queued = room.enqueue_request(&user_id, &name);
        let owner_conn = room.owner_connection().cloned();
        debug!(room_id = %room_id, user_id = %user_id, queued, "Join request pending");

        self.send_to(conn_id, ServerEvent::JoinPending { room_id: room_id.clone() });
        if let Some(owner_conn) = owner_conn {
            self.send_to(
                &owner_conn,
                ServerEvent::JoinRequest {
                    room_id,
                    user: user_id,
                    user_name: name,
                },
            );
        }
        Ok(())
    }

    /// An existing participant joins again, possibly from a new connection.
    fn rejoin(&mut self, conn_id: &ConnId, room_id: &RoomId, user_id: &UserId) -> RoomResult {
        let room = self
            .registry
            .get_mut(room_id)
            .ok_or_else(|| RoomError::Internal(format!("room {room_id} vanished during rejoin")))?;
        let participant = room
            .participants
            .get_mut(user_id)
            .ok_or_else(|| RoomError::Internal(format!("participant {user_id} vanished during rejoin")))?;

        let previous = participant.connection_id.replace(conn_id.clone());
        let resumed = participant.presence.reconnect();
        let user_name = participant.display_name.clone();

        if let Some(previous) = previous
            && &previous != conn_id
        {
            self.connections.unbind_room(&previous, room_id);
        }
        self.connections.bind_room(conn_id, Some(room_id.clone()));
        self.send_room_state(conn_id, room_id, user_id);

        if resumed {
            info!(room_id = %room_id, user_id = %user_id, "Participant reconnected within grace period");
            self.broadcast(
                room_id,
                ServerEvent::UserReconnected {
                    room_id: room_id.clone(),
                    user_id: user_id.clone(),
                    user_name,
                },
                Some(conn_id),
            );
            self.broadcast_participants(room_id);
        } else {
            debug!(room_id = %room_id, user_id = %user_id, "Participant rebound to new connection");
        }
        Ok(())
    }

    /// Add a connected participant and announce them.
    fn admit_connected(&mut self, conn_id: &ConnId, room_id: &RoomId, user_id: &UserId, name: &str) -> RoomResult {
        let room = self
            .registry
            .get_mut(room_id)
            .ok_or_else(|| RoomError::Internal(format!("room {room_id} vanished during admission")))?;
        let is_owner = room.owner_id == *user_id;
        room.admit(Participant {
            user_id: user_id.clone(),
            display_name: name.to_string(),
            connection_id: Some(conn_id.clone()),
            is_owner,
            joined_at: Utc::now(),
            presence: Presence::connected(),
        });
        self.connections.bind_room(conn_id, Some(room_id.clone()));
        info!(room_id = %room_id, user_id = %user_id, is_owner, "Participant admitted");

        self.send_room_state(conn_id, room_id, user_id);
        self.broadcast(
            room_id,
            ServerEvent::UserJoined {
                room_id: room_id.clone(),
                user_id: user_id.clone(),
                user_name: name.to_string(),
            },
            Some(conn_id),
        );
        self.broadcast_participants(room_id);
        Ok(())
    }

    pub(crate) fn handle_invite(&mut self, conn_id: &ConnId, room_id: &RoomId, invitee: UserId) -> RoomResult {
        require(&invitee, "invitee")?;
        let inviter = self.connections.user_of(conn_id).cloned().ok_or(RoomError::NotMember)?;
        let owner_only = self.settings.rooms.owner_only_invites;

        let room = self.registry.active_mut(room_id)?;
        if owner_only && room.owner_id != inviter {
            return Err(RoomError::NotOwner);
        }
        if !owner_only && !room.participants.contains_key(&inviter) {
            return Err(RoomError::NotMember);
        }
        if !room.invites.contains(&invitee) && room.invites.len() >= self.settings.limits.max_invites {
            return Err(RoomError::ValidationFailed("too many outstanding invites".into()));
        }
        let added = room.invites.insert(invitee.clone());
        debug!(room_id = %room_id, inviter = %inviter, invitee = %invitee, added, "Invite recorded");

        self.send_to(
            conn_id,
            ServerEvent::InviteSent {
                room_id: room_id.clone(),
                invitee,
            },
        );
        Ok(())
    }

    /// Owner accepts or rejects a queued join request.
    pub(crate) fn handle_decision(&mut self, conn_id: &ConnId, room_id: &RoomId, target: &UserId, accept: bool) -> RoomResult {
        let decider = self.connections.user_of(conn_id).cloned().ok_or(RoomError::NotOwner)?;
        let room = self.registry.active_mut(room_id)?;
        if room.owner_id != decider {
            return Err(RoomError::NotOwner);
        }
        if !room.is_pending(target) {
            return Err(RoomError::InvalidTarget(target.clone()));
        }
        if accept && room.is_full() {
            return Err(RoomError::RoomFull(room_id.clone()));
        }
        let entry = room
            .take_request(target)
            .ok_or_else(|| RoomError::InvalidTarget(target.clone()))?;

        if accept {
            self.admit_approved(room_id, entry)?;
        } else {
            info!(room_id = %room_id, user_id = %target, "Join request rejected");
            if let Some(target_conn) = self.connections.conn_of_user(target).cloned() {
                self.send_to(&target_conn, ServerEvent::JoinRejected { room_id: room_id.clone() });
            }
        }

        self.send_to(
            conn_id,
            ServerEvent::JoinRequestResolved {
                room_id: room_id.clone(),
                user: target.clone(),
                accepted: accept,
            },
        );
        Ok(())
    }

    /// Admit an accepted requester. Their latest connection is bound into the
    /// room; without one they are admitted detached with a grace timer.
    fn admit_approved(&mut self, room_id: &RoomId, entry: JoinRequestEntry) -> RoomResult {
        let JoinRequestEntry {
            user_id, display_name, ..
        } = entry;
        let target_conn = self.connections.conn_of_user(&user_id).cloned();
        if let Some(ref conn) = target_conn {
            self.leave_other_room(conn, room_id);
        }
        let grace = self.settings.rooms.grace_period();

        let room = self
            .registry
            .get_mut(room_id)
            .ok_or_else(|| RoomError::Internal(format!("room {room_id} vanished during approval")))?;
        let is_owner = room.owner_id == user_id;
        match target_conn {
            Some(ref conn) => {
                room.admit(Participant {
                    user_id: user_id.clone(),
                    display_name: display_name.clone(),
                    connection_id: Some(conn.clone()),
                    is_owner,
                    joined_at: Utc::now(),
                    presence: Presence::connected(),
                });
            }
            None => {
                let (presence, generation) = Presence::detached(Utc::now());
                let participant = room.admit(Participant {
                    user_id: user_id.clone(),
                    display_name: display_name.clone(),
                    connection_id: None,
                    is_owner,
                    joined_at: Utc::now(),
                    presence,
                });
                let timer = spawn_timer(
                    &self.self_tx,
                    grace,
                    CoordinatorEvent::GraceExpired {
                        room_id: room_id.clone(),
                        user_id: user_id.clone(),
                        generation,
                    },
                );
                participant.presence.arm(timer);
            }
        }
        let friendly_name = room.friendly_name.clone();
        let members = room.participant_views();
        info!(room_id = %room_id, user_id = %user_id, connected = target_conn.is_some(), "Join request accepted");

        if let Some(ref conn) = target_conn {
            self.connections.bind_room(conn, Some(room_id.clone()));
            self.send_to(
                conn,
                ServerEvent::JoinApproved {
                    room_id: room_id.clone(),
                    friendly_name,
                    members,
                },
            );
            self.send_whiteboard_snapshot(conn, room_id);
        }
        self.broadcast(
            room_id,
            ServerEvent::MemberJoined {
                room_id: room_id.clone(),
                user: user_id,
                user_name: display_name,
            },
            None,
        );
        self.broadcast_participants(room_id);
        Ok(())
    }

    pub(crate) fn handle_delete_room(&mut self, conn_id: &ConnId, room_id: &RoomId, user: Option<UserId>) -> RoomResult {
        let requester = self
            .connections
            .user_of(conn_id)
            .cloned()
            .or(user)
            .ok_or(RoomError::NotOwner)?;
        let room = self.registry.active_mut(room_id)?;
        if room.owner_id != requester {
            return Err(RoomError::NotOwner);
        }
        info!(room_id = %room_id, user_id = %requester, "Room deleted by owner");
        self.end_room(room_id, "deleted by owner");
        Ok(())
    }

    pub(crate) fn handle_leave(&mut self, conn_id: &ConnId, room_id: Option<RoomId>) -> RoomResult {
        let user_id = self.connections.user_of(conn_id).cloned().ok_or(RoomError::NotMember)?;
        let room_id = room_id
            .or_else(|| self.connections.room_of(conn_id).cloned())
            .ok_or(RoomError::NotMember)?;
        let room = self.registry.active_mut(&room_id)?;

        if !room.participants.contains_key(&user_id) {
            // withdrawing a pending request
            if room.take_request(&user_id).is_some() {
                debug!(room_id = %room_id, user_id = %user_id, "Join request withdrawn");
                self.send_to(conn_id, ServerEvent::LeftRoom { room_id });
                return Ok(());
            }
            return Err(RoomError::NotMember);
        }

        self.depart(conn_id, &room_id);
        Ok(())
    }

    /// Remove the connection's user from `room_id` immediately.
    pub(crate) fn depart(&mut self, conn_id: &ConnId, room_id: &RoomId) {
        self.connections.unbind_room(conn_id, room_id);
        let Some(user_id) = self.connections.user_of(conn_id).cloned() else {
            return;
        };
        let Some(room) = self.registry.get_mut(room_id).filter(|r| r.is_active) else {
            return;
        };
        let Some(mut participant) = room.participants.remove(&user_id) else {
            return;
        };
        participant.presence.remove();
        info!(room_id = %room_id, user_id = %user_id, "Participant left");

        self.send_to(conn_id, ServerEvent::LeftRoom { room_id: room_id.clone() });
        self.after_removal(room_id, participant, false);
    }

    /// Common tail of every permanent removal.
    ///
    /// The owner's removal ends the room. Otherwise peers are told (unless
    /// they already saw a temporary `user-left`) and an empty room is retired.
    pub(crate) fn after_removal(&mut self, room_id: &RoomId, participant: Participant, peers_notified: bool) {
        if participant.is_owner {
            self.end_room(room_id, "owner left");
            return;
        }

        if !peers_notified {
            self.broadcast(
                room_id,
                ServerEvent::UserLeft {
                    room_id: room_id.clone(),
                    user_id: participant.user_id.clone(),
                    user_name: participant.display_name.clone(),
                    temporary: false,
                },
                None,
            );
        }
        self.broadcast_participants(room_id);

        let empty = self
            .registry
            .get(room_id)
            .is_some_and(|room| room.participants.is_empty());
        if empty {
            self.retire_room(room_id);
        }
    }

    /// Tell everyone the room is gone, unbind their connections and
    /// deactivate it.
    pub(crate) fn end_room(&mut self, room_id: &RoomId, reason: &str) {
        let Some(room) = self.registry.get(room_id) else {
            return;
        };
        let mut recipients = room.live_connections(None);
        recipients.extend(
            room.join_requests
                .iter()
                .filter_map(|r| self.connections.conn_of_user(&r.user_id))
                .cloned(),
        );
        let bound: Vec<ConnId> = room
            .participants
            .values()
            .filter_map(|p| p.connection_id.clone())
            .collect();

        let event = ServerEvent::RoomDeleted {
            room_id: room_id.clone(),
            reason: reason.to_string(),
        };
        for conn in &recipients {
            self.send_to(conn, event.clone());
        }
        for conn in &bound {
            self.connections.unbind_room(conn, room_id);
        }
        info!(room_id = %room_id, reason, notified = recipients.len(), "Room ended");
        self.retire_room(room_id);
    }

    /// Deactivate and schedule the purge of the record.
    pub(crate) fn retire_room(&mut self, room_id: &RoomId) {
        let Some(generation) = self.registry.deactivate(room_id) else {
            return;
        };
        let timer = spawn_timer(
            &self.self_tx,
            self.settings.rooms.purge_delay(),
            CoordinatorEvent::PurgeDue {
                room_id: room_id.clone(),
                generation,
            },
        );
        self.registry.arm_purge(room_id, timer);
        debug!(room_id = %room_id, "Room deactivated, purge scheduled");
    }
}
