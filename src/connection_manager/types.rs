//! Connection handle and related types

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::rooms::RoomKey;
use crate::websocket::{OutboundMessage, ServerEvent};

/// Handle for a single WebSocket connection.
///
/// Owned by the event router for the connection's lifetime; everything here
/// is transient and dies with the connection.
pub struct ConnectionHandle {
    pub id: Uuid,
    pub user_id: String,
    pub email: String,
    pub sender: mpsc::Sender<OutboundMessage>,
    pub connected_at: DateTime<Utc>,
    /// Last activity timestamp (Unix seconds), lock-free updates
    last_activity: AtomicI64,
    /// Rooms this connection has joined
    pub rooms: RwLock<HashSet<RoomKey>>,
}

impl ConnectionHandle {
    pub fn new(user_id: String, email: String, sender: mpsc::Sender<OutboundMessage>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            email,
            sender,
            connected_at: now,
            last_activity: AtomicI64::new(now.timestamp()),
            rooms: RwLock::new(HashSet::new()),
        }
    }

    pub fn update_activity(&self) {
        self.last_activity
            .store(Utc::now().timestamp(), Ordering::Relaxed);
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.last_activity.load(Ordering::Relaxed), 0)
            .unwrap_or_else(Utc::now)
    }

    /// Send a ServerEvent (serialized when written to the socket)
    pub async fn send(
        &self,
        event: ServerEvent,
    ) -> Result<(), mpsc::error::SendError<OutboundMessage>> {
        self.sender.send(OutboundMessage::Raw(event)).await
    }

    /// Send a pre-serialized message (for efficient fan-out)
    pub async fn send_preserialized(
        &self,
        message: OutboundMessage,
    ) -> Result<(), mpsc::error::SendError<OutboundMessage>> {
        self.sender.send(message).await
    }

    /// Number of rooms this connection is currently in
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

/// Error returned when connection limits are exceeded
#[derive(Debug, Clone)]
pub enum ConnectionError {
    TotalLimitExceeded { current: usize, max: usize },
    UserLimitExceeded { user_id: String, current: usize, max: usize },
}

impl std::fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TotalLimitExceeded { current, max } => {
                write!(f, "Total connection limit exceeded ({}/{})", current, max)
            }
            Self::UserLimitExceeded {
                user_id,
                current,
                max,
            } => {
                write!(
                    f,
                    "User {} connection limit exceeded ({}/{})",
                    user_id, current, max
                )
            }
        }
    }
}

impl std::error::Error for ConnectionError {}

/// Limits for connection management
#[derive(Debug, Clone, Copy)]
pub struct ConnectionLimits {
    pub max_connections: usize,
    pub max_connections_per_user: usize,
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self {
            max_connections: 10000,
            max_connections_per_user: 5,
        }
    }
}
