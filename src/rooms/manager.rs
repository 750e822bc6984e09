use std::sync::Arc;

use crate::connection_manager::ConnectionHandle;
use crate::error::AppError;
use crate::membership::MembershipStore;
use crate::metrics;

use super::{RoomKey, RoomRegistry};

/// Applies the join-time authorization checks and mutates the registry.
///
/// Authorization is evaluated exactly once, at join time. A failed check is
/// a silent no-op toward the client: nothing is sent back, so room existence
/// is not leaked to unauthorized users.
pub struct RoomManager {
    registry: Arc<RoomRegistry>,
    membership: Arc<dyn MembershipStore>,
}

impl RoomManager {
    pub fn new(registry: Arc<RoomRegistry>, membership: Arc<dyn MembershipStore>) -> Self {
        Self {
            registry,
            membership,
        }
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Join the conversation room if the user is a recorded participant.
    /// Returns whether the connection is now a member.
    pub async fn join_conversation(
        &self,
        conn: &Arc<ConnectionHandle>,
        conversation_id: &str,
    ) -> Result<bool, AppError> {
        let allowed = self
            .membership
            .is_conversation_participant(conversation_id, &conn.user_id)
            .await?;

        if !allowed {
            metrics::JOINS_DENIED_TOTAL.inc();
            tracing::debug!(
                connection_id = %conn.id,
                user_id = %conn.user_id,
                conversation_id = %conversation_id,
                "Join dropped: not a conversation participant"
            );
            return Ok(false);
        }

        self.join(conn, RoomKey::conversation(conversation_id)).await;
        Ok(true)
    }

    /// Join the document room if the user belongs to the owning project.
    /// Returns whether the connection is now a member.
    pub async fn join_document(
        &self,
        conn: &Arc<ConnectionHandle>,
        document_id: &str,
    ) -> Result<bool, AppError> {
        let allowed = self
            .membership
            .can_access_document(document_id, &conn.user_id)
            .await?;

        if !allowed {
            metrics::JOINS_DENIED_TOTAL.inc();
            tracing::debug!(
                connection_id = %conn.id,
                user_id = %conn.user_id,
                document_id = %document_id,
                "Join dropped: no access to document"
            );
            return Ok(false);
        }

        self.join(conn, RoomKey::document(document_id)).await;
        Ok(true)
    }

    /// Every connection is subscribed to its own user room; no check needed.
    pub async fn join_user_room(&self, conn: &Arc<ConnectionHandle>) {
        self.join(conn, RoomKey::user(&conn.user_id)).await;
    }

    /// Membership check for routing events already inside a session.
    pub async fn is_member(&self, conn: &ConnectionHandle, room: &RoomKey) -> bool {
        conn.rooms.read().await.contains(room)
    }

    /// Release every membership held by a connection.
    pub async fn leave_all(&self, conn: &ConnectionHandle) {
        let rooms: Vec<RoomKey> = conn.rooms.write().await.drain().collect();
        for room in &rooms {
            self.registry.leave(room, &conn.id);
        }

        if !rooms.is_empty() {
            tracing::debug!(
                connection_id = %conn.id,
                released = rooms.len(),
                "Released room memberships"
            );
        }
    }

    async fn join(&self, conn: &Arc<ConnectionHandle>, room: RoomKey) {
        self.registry.join(room.clone(), conn.id);
        conn.rooms.write().await.insert(room.clone());

        tracing::debug!(
            connection_id = %conn.id,
            room = %room,
            "Joined room"
        );
    }
}
