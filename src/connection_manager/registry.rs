use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::websocket::OutboundMessage;

use super::{ConnectionError, ConnectionHandle, ConnectionLimits, ConnectionStats};

/// Manages all active WebSocket connections
pub struct ConnectionManager {
    /// connection_id -> ConnectionHandle
    connections: DashMap<Uuid, Arc<ConnectionHandle>>,
    /// user_id -> Set<connection_id> (supports multiple devices)
    user_index: DashMap<String, HashSet<Uuid>>,
    limits: ConnectionLimits,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::with_limits(ConnectionLimits::default())
    }

    pub fn with_limits(limits: ConnectionLimits) -> Self {
        Self {
            connections: DashMap::new(),
            user_index: DashMap::new(),
            limits,
        }
    }

    /// Register a new connection, enforcing connection limits
    pub fn register(
        &self,
        user_id: String,
        email: String,
        sender: mpsc::Sender<OutboundMessage>,
    ) -> Result<Arc<ConnectionHandle>, ConnectionError> {
        let total = self.connections.len();
        if total >= self.limits.max_connections {
            return Err(ConnectionError::TotalLimitExceeded {
                current: total,
                max: self.limits.max_connections,
            });
        }

        let user_count = self
            .user_index
            .get(&user_id)
            .map(|conns| conns.len())
            .unwrap_or(0);
        if user_count >= self.limits.max_connections_per_user {
            return Err(ConnectionError::UserLimitExceeded {
                user_id,
                current: user_count,
                max: self.limits.max_connections_per_user,
            });
        }

        let handle = Arc::new(ConnectionHandle::new(user_id.clone(), email, sender));
        let conn_id = handle.id;

        self.connections.insert(conn_id, handle.clone());
        self.user_index.entry(user_id).or_default().insert(conn_id);

        tracing::info!(
            connection_id = %conn_id,
            user_id = %handle.user_id,
            "Connection registered"
        );

        Ok(handle)
    }

    /// Remove a connection from the registry.
    ///
    /// Returns the handle exactly once; a second call for the same id (e.g.
    /// socket teardown racing the stale reaper) returns None, which is what
    /// makes disconnect processing idempotent.
    pub fn remove(&self, connection_id: Uuid) -> Option<Arc<ConnectionHandle>> {
        let (_, handle) = self.connections.remove(&connection_id)?;

        if let Some(mut user_conns) = self.user_index.get_mut(&handle.user_id) {
            user_conns.remove(&connection_id);
            if user_conns.is_empty() {
                drop(user_conns);
                self.user_index
                    .remove_if(&handle.user_id, |_, conns| conns.is_empty());
            }
        }

        tracing::info!(
            connection_id = %connection_id,
            user_id = %handle.user_id,
            "Connection unregistered"
        );

        Some(handle)
    }

    /// Get connection by ID
    pub fn get(&self, connection_id: Uuid) -> Option<Arc<ConnectionHandle>> {
        self.connections.get(&connection_id).map(|h| h.clone())
    }

    /// Get all connections for a user
    pub fn get_user_connections(&self, user_id: &str) -> Vec<Arc<ConnectionHandle>> {
        self.user_index
            .get(user_id)
            .map(|conn_ids| {
                conn_ids
                    .iter()
                    .filter_map(|id| self.connections.get(id).map(|h| h.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get all connections
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.connections.iter().map(|r| r.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            total_connections: self.connections.len(),
            unique_users: self.user_index.len(),
        }
    }

    /// Find connections that have been inactive for longer than the timeout
    pub fn find_stale_connections(&self, timeout_secs: u64) -> Vec<Uuid> {
        let now = Utc::now();
        let timeout = chrono::Duration::seconds(timeout_secs as i64);

        self.connections
            .iter()
            .filter(|entry| now.signed_duration_since(entry.value().last_activity()) > timeout)
            .map(|entry| *entry.key())
            .collect()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
