//! Room and participant records.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use tokio::task::AbortHandle;

use super::content::RoomContent;
use super::presence::{ConnectionState, Presence};
use super::{ConnId, RoomId, UserId};
use crate::proto::ParticipantView;

#[derive(Debug)]
pub struct Participant {
    pub user_id: UserId,
    pub display_name: String,
    pub connection_id: Option<ConnId>,
    pub is_owner: bool,
    pub joined_at: DateTime<Utc>,
    pub presence: Presence,
}

impl Participant {
    pub fn view(&self) -> ParticipantView {
        ParticipantView {
            user_id: self.user_id.clone(),
            user_name: self.display_name.clone(),
            is_owner: self.is_owner,
            state: self.presence.state(),
            joined_at: self.joined_at,
            disconnected_at: self.presence.disconnected_at(),
        }
    }

    /// Connection to deliver to, if the participant is live.
    pub fn live_connection(&self) -> Option<&ConnId> {
        match self.presence.state() {
            ConnectionState::Connected => self.connection_id.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JoinRequestEntry {
    pub user_id: UserId,
    pub display_name: String,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Room {
    pub id: RoomId,
    pub friendly_name: String,
    pub owner_id: UserId,
    pub owner_name: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub max_participants: usize,
    pub participants: HashMap<UserId, Participant>,
    pub invites: HashSet<UserId>,
    pub join_requests: VecDeque<JoinRequestEntry>,
    pub content: RoomContent,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub purge_generation: u64,
    pub(super) purge_timer: Option<AbortHandle>,
}

impl Room {
    pub fn new(
        id: RoomId,
        friendly_name: String,
        owner_id: UserId,
        owner_name: String,
        max_participants: usize,
    ) -> Self {
        Self {
            id,
            friendly_name,
            owner_id,
            owner_name,
            created_at: Utc::now(),
            is_active: true,
            max_participants,
            participants: HashMap::new(),
            invites: HashSet::new(),
            join_requests: VecDeque::new(),
            content: RoomContent::default(),
            deactivated_at: None,
            purge_generation: 0,
            purge_timer: None,
        }
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.max_participants
    }

    pub fn is_pending(&self, user_id: &str) -> bool {
        self.join_requests.iter().any(|r| r.user_id == user_id)
    }

    /// Queue a join request. Returns false if the user is already queued.
    pub fn enqueue_request(&mut self, user_id: &UserId, display_name: &str) -> bool {
        if self.is_pending(user_id) {
            return false;
        }
        self.join_requests.push_back(JoinRequestEntry {
            user_id: user_id.clone(),
            display_name: display_name.to_string(),
            requested_at: Utc::now(),
        });
        true
    }

    pub fn take_request(&mut self, user_id: &str) -> Option<JoinRequestEntry> {
        let idx = self.join_requests.iter().position(|r| r.user_id == user_id)?;
        self.join_requests.remove(idx)
    }

    /// Add a participant, dropping any queued request for the same user.
    pub fn admit(&mut self, participant: Participant) -> &mut Participant {
        self.take_request(&participant.user_id);
        let user_id = participant.user_id.clone();
        self.participants.entry(user_id).or_insert(participant)
    }

    pub fn owner_connection(&self) -> Option<&ConnId> {
        self.participants.get(&self.owner_id)?.live_connection()
    }

    /// Live connections of every participant, optionally skipping one.
    pub fn live_connections(&self, exclude: Option<&ConnId>) -> Vec<ConnId> {
        self.participants
            .values()
            .filter_map(Participant::live_connection)
            .filter(|conn| Some(*conn) != exclude)
            .cloned()
            .collect()
    }

    pub fn participant_views(&self) -> Vec<ParticipantView> {
        let mut views: Vec<ParticipantView> = self.participants.values().map(Participant::view).collect();
        views.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.user_id.cmp(&b.user_id)));
        views
    }

    pub fn connected_count(&self) -> usize {
        self.participants.values().filter(|p| p.presence.is_connected()).count()
    }

    /// Drop all membership and content. Participants' grace timers are
    /// aborted as their presence records are dropped.
    pub fn clear(&mut self) {
        self.participants.clear();
        self.invites.clear();
        self.join_requests.clear();
        self.content = RoomContent::default();
    }

    pub(super) fn cancel_purge(&mut self) {
        if let Some(timer) = self.purge_timer.take() {
            timer.abort();
        }
    }
}

impl Drop for Room {
    fn drop(&mut self) {
        self.cancel_purge();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(user_id: &str) -> Participant {
        Participant {
            user_id: user_id.to_string(),
            display_name: user_id.to_uppercase(),
            connection_id: Some(format!("conn-{user_id}")),
            is_owner: false,
            joined_at: Utc::now(),
            presence: Presence::connected(),
        }
    }

    fn room() -> Room {
        Room::new("r1".into(), "azul-leon-1".into(), "u1".into(), "Ana".into(), 2)
    }

    #[test]
    fn enqueue_is_idempotent() {
        let mut room = room();
        assert!(room.enqueue_request(&"u2".to_string(), "Bo"));
        assert!(!room.enqueue_request(&"u2".to_string(), "Bo"));
        assert_eq!(room.join_requests.len(), 1);
    }

    #[test]
    fn admit_removes_pending_entry() {
        let mut room = room();
        room.enqueue_request(&"u2".to_string(), "Bo");
        room.admit(participant("u2"));
        assert!(!room.is_pending("u2"));
        assert!(room.participants.contains_key("u2"));
    }

    #[test]
    fn capacity_counts_participants() {
        let mut room = room();
        room.admit(participant("u1"));
        assert!(!room.is_full());
        room.admit(participant("u2"));
        assert!(room.is_full());
    }

    #[test]
    fn live_connections_skip_grace_and_excluded() {
        let mut room = room();
        room.admit(participant("u1"));
        room.admit(participant("u2"));
        if let Some(p) = room.participants.get_mut("u2") {
            p.presence.begin_grace(Utc::now());
        }
        assert_eq!(room.live_connections(None), vec!["conn-u1".to_string()]);
        assert!(room.live_connections(Some(&"conn-u1".to_string())).is_empty());
    }
}
