//! Ephemeral per-user presence.
//!
//! Status strings are client-supplied and rebroadcast verbatim; there is no
//! enum validation and no persistence. State lives for the duration of a
//! connection and is lost on restart. No snapshot is sent on connect: a
//! client learns a peer's status only from that peer's next status change.

use dashmap::DashMap;

/// Status broadcast when a connection goes away.
pub const STATUS_OFFLINE: &str = "offline";

pub struct PresenceTracker {
    /// user_id -> current status string
    statuses: DashMap<String, String>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self {
            statuses: DashMap::new(),
        }
    }

    /// Record a user's status, returning the previous one if any.
    pub fn set(&self, user_id: &str, status: &str) -> Option<String> {
        self.statuses
            .insert(user_id.to_string(), status.to_string())
    }

    pub fn get(&self, user_id: &str) -> Option<String> {
        self.statuses.get(user_id).map(|s| s.clone())
    }

    /// Drop a user's record on disconnect.
    pub fn remove(&self, user_id: &str) -> Option<String> {
        self.statuses.remove(user_id).map(|(_, status)| status)
    }

    /// Number of users with a tracked status.
    pub fn tracked_users(&self) -> usize {
        self.statuses.len()
    }

    pub fn clear(&self) {
        self.statuses.clear();
    }
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arbitrary_status_strings() {
        let tracker = PresenceTracker::new();

        // Any string is accepted, not just a known enum
        assert!(tracker.set("u1", "online").is_none());
        assert_eq!(tracker.set("u1", "typing"), Some("online".to_string()));
        tracker.set("u1", "in-the-library");
        assert_eq!(tracker.get("u1"), Some("in-the-library".to_string()));
    }

    #[test]
    fn test_remove_on_disconnect() {
        let tracker = PresenceTracker::new();
        tracker.set("u1", "online");
        assert_eq!(tracker.tracked_users(), 1);

        assert_eq!(tracker.remove("u1"), Some("online".to_string()));
        assert_eq!(tracker.tracked_users(), 0);
        assert!(tracker.remove("u1").is_none());
    }
}
