use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::connection_manager::{ConnectionError, ConnectionHandle, ConnectionManager};
use crate::fanout::FanoutDispatcher;
use crate::metrics;
use crate::presence::{PresenceTracker, STATUS_OFFLINE};
use crate::rooms::{RoomKey, RoomManager};

use super::message::{ClientEvent, MessageIn, MessageOut, OutboundMessage, ServerEvent};

/// Dispatches inbound client events and owns the connection lifecycle.
///
/// Handlers are best-effort: a failed lookup or an unauthorized event is
/// logged and swallowed, never surfaced to the peer, and never closes the
/// connection. An authenticated connection only ends on transport timeout
/// or explicit client disconnect.
pub struct EventRouter {
    connections: Arc<ConnectionManager>,
    rooms: Arc<RoomManager>,
    presence: Arc<PresenceTracker>,
    fanout: Arc<FanoutDispatcher>,
}

impl EventRouter {
    pub fn new(
        connections: Arc<ConnectionManager>,
        rooms: Arc<RoomManager>,
        presence: Arc<PresenceTracker>,
        fanout: Arc<FanoutDispatcher>,
    ) -> Self {
        Self {
            connections,
            rooms,
            presence,
            fanout,
        }
    }

    /// Admit an authenticated connection: register it and auto-join its
    /// user room. No presence is broadcast on connect; peers learn about
    /// this user from their next `set-presence`.
    pub async fn connect(
        &self,
        user_id: String,
        email: String,
        sender: mpsc::Sender<OutboundMessage>,
    ) -> Result<Arc<ConnectionHandle>, ConnectionError> {
        let handle = self.connections.register(user_id, email, sender)?;
        self.rooms.join_user_room(&handle).await;
        Ok(handle)
    }

    /// Tear down a connection: release every room membership, drop the
    /// presence record, and emit exactly one process-wide offline event.
    ///
    /// Idempotent: the registry hands out the handle only once, so a socket
    /// teardown racing the stale reaper broadcasts a single `offline`.
    pub async fn disconnect(&self, connection_id: Uuid) {
        let Some(handle) = self.connections.remove(connection_id) else {
            return;
        };

        self.rooms.leave_all(&handle).await;
        self.presence.remove(&handle.user_id);

        self.fanout
            .broadcast_all(ServerEvent::presence_change(
                handle.user_id.clone(),
                STATUS_OFFLINE,
            ))
            .await;

        tracing::info!(
            connection_id = %connection_id,
            user_id = %handle.user_id,
            "Connection disconnected"
        );
    }

    /// Handle one inbound event for a connection.
    #[tracing::instrument(
        name = "ws.event",
        skip(self, conn, event),
        fields(
            connection_id = %conn.id,
            user_id = %conn.user_id,
            event = event.name()
        )
    )]
    pub async fn handle(&self, conn: &Arc<ConnectionHandle>, event: ClientEvent) {
        metrics::record_event(event.name());

        match event {
            ClientEvent::JoinConversation { conversation_id } => {
                self.handle_join_conversation(conn, conversation_id).await;
            }
            ClientEvent::JoinDocument { document_id } => {
                self.handle_join_document(conn, document_id).await;
            }
            ClientEvent::DocumentChange {
                document_id,
                content,
                position,
            } => {
                self.handle_document_change(conn, document_id, content, position)
                    .await;
            }
            ClientEvent::NewMessage {
                conversation_id,
                message,
            } => {
                self.handle_new_message(conn, conversation_id, message).await;
            }
            ClientEvent::Typing {
                conversation_id,
                is_typing,
            } => {
                self.handle_typing(conn, conversation_id, is_typing).await;
            }
            ClientEvent::SetPresence { status } => {
                self.handle_set_presence(conn, status).await;
            }
            ClientEvent::Ping => {
                let _ = conn.send(ServerEvent::Pong).await;
            }
        }
    }

    async fn handle_join_conversation(&self, conn: &Arc<ConnectionHandle>, conversation_id: String) {
        // Unauthorized joins are dropped without a reply; lookup failures
        // abort this event only.
        match self.rooms.join_conversation(conn, &conversation_id).await {
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    connection_id = %conn.id,
                    conversation_id = %conversation_id,
                    error = %e,
                    "Participant lookup failed, join dropped"
                );
            }
        }
    }

    async fn handle_join_document(&self, conn: &Arc<ConnectionHandle>, document_id: String) {
        let joined = match self.rooms.join_document(conn, &document_id).await {
            Ok(joined) => joined,
            Err(e) => {
                tracing::warn!(
                    connection_id = %conn.id,
                    document_id = %document_id,
                    error = %e,
                    "Document access lookup failed, join dropped"
                );
                return;
            }
        };

        if joined {
            self.fanout
                .send_to_room(
                    &RoomKey::document(&document_id),
                    Some(conn.id),
                    ServerEvent::UserJoined {
                        user_id: conn.user_id.clone(),
                        document_id,
                    },
                )
                .await;
        }
    }

    async fn handle_document_change(
        &self,
        conn: &Arc<ConnectionHandle>,
        document_id: String,
        content: String,
        position: u64,
    ) {
        let room = RoomKey::document(&document_id);
        if !self.rooms.is_member(conn, &room).await {
            tracing::debug!(
                connection_id = %conn.id,
                document_id = %document_id,
                "document-change from non-member dropped"
            );
            return;
        }

        // Re-broadcast verbatim; concurrent edits are not reconciled here,
        // last write wins on the client.
        self.fanout
            .send_to_room(
                &room,
                Some(conn.id),
                ServerEvent::DocumentChange {
                    document_id,
                    content,
                    position,
                    user_id: conn.user_id.clone(),
                },
            )
            .await;
    }

    async fn handle_new_message(
        &self,
        conn: &Arc<ConnectionHandle>,
        conversation_id: String,
        message: MessageIn,
    ) {
        let room = RoomKey::conversation(&conversation_id);
        if !self.rooms.is_member(conn, &room).await {
            tracing::debug!(
                connection_id = %conn.id,
                conversation_id = %conversation_id,
                "new-message from non-member dropped"
            );
            return;
        }

        let message = MessageOut {
            id: message.id,
            content: message.content,
            sender_id: conn.user_id.clone(),
            created_at: message.created_at,
        };

        self.fanout
            .send_to_room(
                &room,
                Some(conn.id),
                ServerEvent::NewMessage {
                    conversation_id,
                    message,
                },
            )
            .await;
    }

    async fn handle_typing(
        &self,
        conn: &Arc<ConnectionHandle>,
        conversation_id: String,
        is_typing: bool,
    ) {
        let room = RoomKey::conversation(&conversation_id);
        if !self.rooms.is_member(conn, &room).await {
            tracing::debug!(
                connection_id = %conn.id,
                conversation_id = %conversation_id,
                "typing from non-member dropped"
            );
            return;
        }

        self.fanout
            .send_to_room(
                &room,
                Some(conn.id),
                ServerEvent::UserTyping {
                    user_id: conn.user_id.clone(),
                    is_typing,
                },
            )
            .await;
    }

    async fn handle_set_presence(&self, conn: &Arc<ConnectionHandle>, status: String) {
        // Any status string is accepted and rebroadcast verbatim, to every
        // connection process-wide, the sender included.
        self.presence.set(&conn.user_id, &status);

        self.fanout
            .broadcast_all(ServerEvent::presence_change(conn.user_id.clone(), status))
            .await;
    }
}
