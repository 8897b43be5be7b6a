//! Room registry: id and friendly-name indexes over room records.
//!
//! Inactive rooms stay in the registry until their purge timer fires so
//! lookups can tell "recently deleted" apart from "never existed".

use std::collections::HashMap;

use chrono::Utc;
use tokio::task::AbortHandle;

use super::names::NameGenerator;
use super::room::Room;
use super::uid::new_room_id;
use super::{RoomId, UserId};
use crate::error::{RoomError, RoomResult};

pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
    by_name: HashMap<String, RoomId>,
    names: NameGenerator,
    max_participants: usize,
}

impl RoomRegistry {
    pub fn new(max_participants: usize) -> Self {
        Self::with_names(max_participants, NameGenerator::new())
    }

    pub fn with_names(max_participants: usize, names: NameGenerator) -> Self {
        Self {
            rooms: HashMap::new(),
            by_name: HashMap::new(),
            names,
            max_participants,
        }
    }

    /// Create a room with a freshly allocated id.
    pub fn create(&mut self, owner_id: &UserId, owner_name: &str) -> RoomResult<&mut Room> {
        self.create_with_id(new_room_id(), owner_id, owner_name)
    }

    /// Create a room under a caller-supplied id.
    ///
    /// Fails with `DuplicateRoom` if any record, active or awaiting purge,
    /// already uses the id.
    pub fn create_with_id(&mut self, id: RoomId, owner_id: &UserId, owner_name: &str) -> RoomResult<&mut Room> {
        if id.trim().is_empty() {
            return Err(RoomError::ValidationFailed("room id is required".into()));
        }
        if self.rooms.contains_key(&id) {
            return Err(RoomError::DuplicateRoom(id));
        }

        let by_name = &self.by_name;
        let friendly_name = self.names.generate(&id, |name| by_name.contains_key(name));
        self.by_name.insert(friendly_name.clone(), id.clone());

        let room = Room::new(
            id.clone(),
            friendly_name,
            owner_id.clone(),
            owner_name.to_string(),
            self.max_participants,
        );
        Ok(self.rooms.entry(id).or_insert(room))
    }

    pub fn get(&self, id: &str) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(id)
    }

    /// Look up an active room id by its friendly name.
    pub fn find_by_friendly_name(&self, name: &str) -> Option<&RoomId> {
        self.by_name.get(name)
    }

    /// Active room, or the error a caller should see.
    pub fn active_mut(&mut self, id: &str) -> RoomResult<&mut Room> {
        match self.rooms.get_mut(id) {
            Some(room) if room.is_active => Ok(room),
            Some(_) => Err(RoomError::RoomInactive(id.to_string())),
            None => Err(RoomError::RoomNotFound(id.to_string())),
        }
    }

    /// Flip the room inactive and clear its state.
    ///
    /// Returns the purge generation to arm a purge timer with, or `None` if
    /// the room was unknown or already inactive.
    pub fn deactivate(&mut self, id: &str) -> Option<u64> {
        let room = self.rooms.get_mut(id)?;
        if !room.is_active {
            return None;
        }
        room.is_active = false;
        room.deactivated_at = Some(Utc::now());
        room.clear();
        room.cancel_purge();
        room.purge_generation += 1;
        if self.by_name.get(&room.friendly_name) == Some(&room.id) {
            self.by_name.remove(&room.friendly_name);
        }
        Some(room.purge_generation)
    }

    /// Store the handle of the purge timer armed for the current generation.
    pub fn arm_purge(&mut self, id: &str, handle: AbortHandle) {
        match self.rooms.get_mut(id) {
            Some(room) => {
                room.cancel_purge();
                room.purge_timer = Some(handle);
            }
            None => handle.abort(),
        }
    }

    /// Remove an inactive record. Stale generations are ignored.
    pub fn purge(&mut self, id: &str, generation: u64) -> bool {
        let due = matches!(
            self.rooms.get(id),
            Some(room) if !room.is_active && room.purge_generation == generation
        );
        if due {
            self.rooms.remove(id);
        }
        due
    }

    pub fn active_rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values().filter(|r| r.is_active)
    }

    pub fn active_count(&self) -> usize {
        self.active_rooms().count()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> RoomRegistry {
        RoomRegistry::with_names(50, NameGenerator::seeded(42))
    }

    #[test]
    fn create_indexes_friendly_name() {
        let mut reg = registry();
        let (id, name) = {
            let room = reg.create(&"u1".to_string(), "Ana").unwrap();
            (room.id.clone(), room.friendly_name.clone())
        };
        assert_eq!(reg.find_by_friendly_name(&name), Some(&id));
        assert_eq!(reg.active_count(), 1);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut reg = registry();
        reg.create_with_id("r1".into(), &"u1".to_string(), "Ana").unwrap();
        let err = reg.create_with_id("r1".into(), &"u2".to_string(), "Bo").unwrap_err();
        assert_eq!(err, RoomError::DuplicateRoom("r1".into()));
    }

    #[test]
    fn friendly_names_are_unique_among_active_rooms() {
        let mut reg = registry();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let name = reg.create(&"u1".to_string(), "Ana").unwrap().friendly_name.clone();
            assert!(seen.insert(name));
        }
    }

    #[test]
    fn fallback_names_stay_unique_when_vocabulary_is_exhausted() {
        let mut reg = registry();
        for name in NameGenerator::vocabulary() {
            reg.by_name.insert(name, "elsewhere".into());
        }

        let mut ids = Vec::new();
        for i in 0..40 {
            let id = format!("abcdefgh-{i}");
            reg.create_with_id(id.clone(), &"u1".to_string(), "Ana").unwrap();
            ids.push(id);
        }
        for id in &ids {
            let name = reg.get(id).unwrap().friendly_name.clone();
            assert_eq!(reg.find_by_friendly_name(&name), Some(id), "{name} points elsewhere");
        }
    }

    #[test]
    fn deactivate_then_purge() {
        let mut reg = registry();
        let name = reg.create_with_id("r1".into(), &"u1".to_string(), "Ana").unwrap().friendly_name.clone();

        let generation = reg.deactivate("r1").unwrap();
        assert!(reg.find_by_friendly_name(&name).is_none());
        assert_eq!(reg.active_mut("r1").unwrap_err(), RoomError::RoomInactive("r1".into()));
        assert!(reg.deactivate("r1").is_none());

        assert!(!reg.purge("r1", generation + 1));
        assert!(reg.purge("r1", generation));
        assert!(reg.get("r1").is_none());
        assert_eq!(reg.active_mut("r1").unwrap_err(), RoomError::RoomNotFound("r1".into()));
    }

    #[test]
    fn purge_ignores_active_rooms() {
        let mut reg = registry();
        reg.create_with_id("r1".into(), &"u1".to_string(), "Ana").unwrap();
        assert!(!reg.purge("r1", 0));
        assert_eq!(reg.len(), 1);
    }
}
