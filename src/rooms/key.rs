use std::fmt;

/// Identifier of a broadcast room.
///
/// Closed set of room kinds; the wire format is `<kind>:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomKey {
    /// All participants of a conversation.
    Conversation(String),
    /// All collaborators on a document.
    Document(String),
    /// Per-user channel, auto-joined at connection time.
    User(String),
}

impl RoomKey {
    pub fn conversation(id: impl Into<String>) -> Self {
        Self::Conversation(id.into())
    }

    pub fn document(id: impl Into<String>) -> Self {
        Self::Document(id.into())
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conversation(id) => write!(f, "conversation:{}", id),
            Self::Document(id) => write!(f, "document:{}", id),
            Self::User(id) => write!(f, "user:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        assert_eq!(RoomKey::conversation("c1").to_string(), "conversation:c1");
        assert_eq!(RoomKey::document("d1").to_string(), "document:d1");
        assert_eq!(RoomKey::user("u1").to_string(), "user:u1");
    }

    #[test]
    fn test_equality_across_kinds() {
        // Same id under different kinds must be different rooms
        assert_ne!(RoomKey::conversation("x"), RoomKey::document("x"));
        assert_eq!(RoomKey::document("x"), RoomKey::document("x"));
    }
}
