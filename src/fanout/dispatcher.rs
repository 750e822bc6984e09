use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use uuid::Uuid;

use crate::connection_manager::{ConnectionHandle, ConnectionManager};
use crate::metrics;
use crate::rooms::{RoomKey, RoomRegistry};
use crate::websocket::{OutboundMessage, ServerEvent};

/// Maximum number of concurrent message sends
const MAX_CONCURRENT_SENDS: usize = 100;

/// Threshold for pre-serializing once instead of per connection
const PRESERIALIZATION_THRESHOLD: usize = 4;

/// Result of a fan-out attempt
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryResult {
    /// Number of connections the event was delivered to
    pub delivered: usize,
    /// Number of connections that failed to receive
    pub failed: usize,
}

/// Counters for the fan-out dispatcher
#[derive(Debug, Default)]
struct FanoutStats {
    room_events: AtomicU64,
    broadcast_events: AtomicU64,
    total_delivered: AtomicU64,
    total_failed: AtomicU64,
}

/// Snapshot of fan-out statistics
#[derive(Debug, Clone, Serialize)]
pub struct FanoutStatsSnapshot {
    pub room_events: u64,
    pub broadcast_events: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
}

/// Delivers events to sets of connections.
///
/// Delivery is at-most-once and best-effort: a closed or saturated outbound
/// channel counts as a failure and is only recorded, never retried.
pub struct FanoutDispatcher {
    connections: Arc<ConnectionManager>,
    rooms: Arc<RoomRegistry>,
    stats: FanoutStats,
}

impl FanoutDispatcher {
    pub fn new(connections: Arc<ConnectionManager>, rooms: Arc<RoomRegistry>) -> Self {
        Self {
            connections,
            rooms,
            stats: FanoutStats::default(),
        }
    }

    pub fn stats(&self) -> FanoutStatsSnapshot {
        FanoutStatsSnapshot {
            room_events: self.stats.room_events.load(Ordering::Relaxed),
            broadcast_events: self.stats.broadcast_events.load(Ordering::Relaxed),
            total_delivered: self.stats.total_delivered.load(Ordering::Relaxed),
            total_failed: self.stats.total_failed.load(Ordering::Relaxed),
        }
    }

    /// Send an event to every member of a room, excluding `exclude` (the
    /// originating connection, so clients never echo their own actions).
    #[tracing::instrument(
        name = "fanout.room",
        skip(self, event),
        fields(room = %room)
    )]
    pub async fn send_to_room(
        &self,
        room: &RoomKey,
        exclude: Option<Uuid>,
        event: ServerEvent,
    ) -> DeliveryResult {
        let targets: Vec<Arc<ConnectionHandle>> = self
            .rooms
            .members(room)
            .into_iter()
            .filter(|id| Some(*id) != exclude)
            .filter_map(|id| self.connections.get(id))
            .collect();

        let result = self.send_to_connections(&targets, &event).await;

        self.stats.room_events.fetch_add(1, Ordering::Relaxed);
        self.record(&result);

        tracing::debug!(
            room = %room,
            delivered = result.delivered,
            failed = result.failed,
            "Fanned out room event"
        );

        result
    }

    /// Send an event to every connected client process-wide.
    #[tracing::instrument(name = "fanout.broadcast", skip(self, event))]
    pub async fn broadcast_all(&self, event: ServerEvent) -> DeliveryResult {
        let targets = self.connections.all_connections();
        let result = self.send_to_connections(&targets, &event).await;

        self.stats.broadcast_events.fetch_add(1, Ordering::Relaxed);
        self.record(&result);

        tracing::debug!(
            delivered = result.delivered,
            failed = result.failed,
            "Broadcast event to all connections"
        );

        result
    }

    fn record(&self, result: &DeliveryResult) {
        self.stats
            .total_delivered
            .fetch_add(result.delivered as u64, Ordering::Relaxed);
        self.stats
            .total_failed
            .fetch_add(result.failed as u64, Ordering::Relaxed);
        metrics::EVENTS_DELIVERED_TOTAL.inc_by(result.delivered as u64);
        metrics::EVENTS_FAILED_TOTAL.inc_by(result.failed as u64);
    }

    /// Send one event to a list of connections with bounded parallelism.
    /// Larger sends serialize the event once and share the bytes.
    async fn send_to_connections(
        &self,
        connections: &[Arc<ConnectionHandle>],
        event: &ServerEvent,
    ) -> DeliveryResult {
        if connections.is_empty() {
            return DeliveryResult {
                delivered: 0,
                failed: 0,
            };
        }

        // Small sends stay sequential without pre-serialization
        if connections.len() <= 3 {
            let mut delivered = 0;
            let mut failed = 0;
            for conn in connections {
                match conn.send(event.clone()).await {
                    Ok(_) => delivered += 1,
                    Err(_) => failed += 1,
                }
            }
            return DeliveryResult { delivered, failed };
        }

        let outbound = if connections.len() >= PRESERIALIZATION_THRESHOLD {
            match OutboundMessage::preserialized(event) {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to pre-serialize event, falling back");
                    OutboundMessage::Raw(event.clone())
                }
            }
        } else {
            OutboundMessage::Raw(event.clone())
        };

        let delivered = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        {
            let delivered = &delivered;
            let failed = &failed;
            stream::iter(connections)
                .for_each_concurrent(MAX_CONCURRENT_SENDS, |conn| {
                    let msg = outbound.clone();
                    async move {
                        match conn.send_preserialized(msg).await {
                            Ok(_) => {
                                delivered.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(_) => {
                                failed.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                })
                .await;
        }

        DeliveryResult {
            delivered: delivered.load(Ordering::Relaxed),
            failed: failed.load(Ordering::Relaxed),
        }
    }
}
