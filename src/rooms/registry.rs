use std::collections::{HashMap, HashSet};

use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use super::RoomKey;

/// Process-wide room membership map.
///
/// Created at process start, cleared at shutdown. Mutated only through the
/// [`RoomManager`](super::RoomManager); handlers never touch it directly, so
/// the in-memory registry could be swapped for a broker-backed one without
/// changing the event router.
pub struct RoomRegistry {
    /// room -> member connection ids
    rooms: DashMap<RoomKey, HashSet<Uuid>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Add a connection to a room. Returns false if it was already a member.
    pub fn join(&self, room: RoomKey, connection_id: Uuid) -> bool {
        self.rooms.entry(room).or_default().insert(connection_id)
    }

    /// Remove a connection from a room, dropping the room when it empties.
    pub fn leave(&self, room: &RoomKey, connection_id: &Uuid) {
        if let Some(mut members) = self.rooms.get_mut(room) {
            members.remove(connection_id);
            let empty = members.is_empty();
            drop(members);
            if empty {
                self.rooms.remove_if(room, |_, members| members.is_empty());
            }
        }
    }

    pub fn contains(&self, room: &RoomKey, connection_id: &Uuid) -> bool {
        self.rooms
            .get(room)
            .map(|members| members.contains(connection_id))
            .unwrap_or(false)
    }

    /// Current member connection ids of a room.
    pub fn members(&self, room: &RoomKey) -> Vec<Uuid> {
        self.rooms
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn member_count(&self, room: &RoomKey) -> usize {
        self.rooms.get(room).map(|members| members.len()).unwrap_or(0)
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Whether a connection appears in any room.
    pub fn is_member_anywhere(&self, connection_id: &Uuid) -> bool {
        self.rooms
            .iter()
            .any(|entry| entry.value().contains(connection_id))
    }

    pub fn stats(&self) -> RoomStats {
        let mut rooms = HashMap::new();
        for entry in self.rooms.iter() {
            rooms.insert(entry.key().to_string(), entry.value().len());
        }
        RoomStats {
            active_rooms: rooms.len(),
            rooms,
        }
    }

    /// Drop all rooms. Part of the registry's shutdown lifecycle.
    pub fn clear(&self) {
        self.rooms.clear();
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomStats {
    pub active_rooms: usize,
    pub rooms: HashMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_is_idempotent() {
        let registry = RoomRegistry::new();
        let conn = Uuid::new_v4();
        let room = RoomKey::document("d1");

        assert!(registry.join(room.clone(), conn));
        assert!(!registry.join(room.clone(), conn));
        assert_eq!(registry.member_count(&room), 1);
    }

    #[test]
    fn test_empty_room_is_dropped() {
        let registry = RoomRegistry::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let room = RoomKey::conversation("c1");

        registry.join(room.clone(), a);
        registry.join(room.clone(), b);
        assert_eq!(registry.room_count(), 1);

        registry.leave(&room, &a);
        assert_eq!(registry.room_count(), 1);
        assert_eq!(registry.member_count(&room), 1);

        registry.leave(&room, &b);
        assert_eq!(registry.room_count(), 0);
        assert!(!registry.contains(&room, &b));
    }

    #[test]
    fn test_leave_unknown_room_is_noop() {
        let registry = RoomRegistry::new();
        registry.leave(&RoomKey::user("nobody"), &Uuid::new_v4());
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn test_is_member_anywhere() {
        let registry = RoomRegistry::new();
        let conn = Uuid::new_v4();
        assert!(!registry.is_member_anywhere(&conn));

        registry.join(RoomKey::user("u1"), conn);
        assert!(registry.is_member_anywhere(&conn));
    }
}
