use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::broadcast;
use tokio::time::timeout;

use crate::config::WebSocketConfig;
use crate::connection_manager::ConnectionManager;
use crate::websocket::{EventRouter, ServerEvent};

/// Timeout for individual heartbeat send operations
const HEARTBEAT_SEND_TIMEOUT_MS: u64 = 5000;

/// Maximum concurrent heartbeat sends to avoid overwhelming the system
const MAX_CONCURRENT_HEARTBEATS: usize = 1000;

/// Background task for heartbeat and liveness cleanup.
///
/// A connection that stops responding is treated exactly like an explicit
/// disconnect: reaping goes through the router's disconnect path, so rooms
/// are released and the offline presence broadcast fires.
pub struct HeartbeatTask {
    config: WebSocketConfig,
    connection_manager: Arc<ConnectionManager>,
    router: Arc<EventRouter>,
    shutdown: broadcast::Receiver<()>,
}

impl HeartbeatTask {
    pub fn new(
        config: WebSocketConfig,
        connection_manager: Arc<ConnectionManager>,
        router: Arc<EventRouter>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            connection_manager,
            router,
            shutdown,
        }
    }

    /// Run the heartbeat and cleanup loops until shutdown
    pub async fn run(mut self) {
        let heartbeat_interval = Duration::from_secs(self.config.heartbeat_interval);
        let cleanup_interval = Duration::from_secs(self.config.cleanup_interval);
        let connection_timeout = self.config.connection_timeout;

        let mut heartbeat_timer = tokio::time::interval(heartbeat_interval);
        let mut cleanup_timer = tokio::time::interval(cleanup_interval);

        // Skip immediate first tick
        heartbeat_timer.tick().await;
        cleanup_timer.tick().await;

        tracing::info!(
            heartbeat_interval_secs = self.config.heartbeat_interval,
            cleanup_interval_secs = self.config.cleanup_interval,
            connection_timeout_secs = connection_timeout,
            "Heartbeat task started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Heartbeat task received shutdown signal");
                    break;
                }
                _ = heartbeat_timer.tick() => {
                    self.send_heartbeats().await;
                }
                _ = cleanup_timer.tick() => {
                    self.reap_stale_connections(connection_timeout).await;
                }
            }
        }

        tracing::info!("Heartbeat task stopped");
    }

    /// Send heartbeat to all connections in parallel with batching
    async fn send_heartbeats(&self) {
        let connections = self.connection_manager.all_connections();
        let total_count = connections.len();

        if total_count == 0 {
            return;
        }

        let start = Instant::now();
        let sent = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        let timed_out = Arc::new(AtomicUsize::new(0));

        for batch in connections.chunks(MAX_CONCURRENT_HEARTBEATS) {
            let futures: Vec<_> = batch
                .iter()
                .map(|handle| {
                    let sent = sent.clone();
                    let failed = failed.clone();
                    let timed_out = timed_out.clone();
                    let handle = handle.clone();

                    async move {
                        let send_timeout = Duration::from_millis(HEARTBEAT_SEND_TIMEOUT_MS);
                        match timeout(send_timeout, handle.send(ServerEvent::Heartbeat)).await {
                            Ok(Ok(_)) => {
                                sent.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(Err(_)) => {
                                failed.fetch_add(1, Ordering::Relaxed);
                                tracing::debug!(
                                    connection_id = %handle.id,
                                    "Failed to send heartbeat, connection may be dead"
                                );
                            }
                            Err(_) => {
                                timed_out.fetch_add(1, Ordering::Relaxed);
                                tracing::debug!(
                                    connection_id = %handle.id,
                                    timeout_ms = HEARTBEAT_SEND_TIMEOUT_MS,
                                    "Heartbeat send timed out"
                                );
                            }
                        }
                    }
                })
                .collect();

            join_all(futures).await;
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            total = total_count,
            sent = sent.load(Ordering::Relaxed),
            failed = failed.load(Ordering::Relaxed),
            timed_out = timed_out.load(Ordering::Relaxed),
            elapsed_ms = elapsed_ms,
            "Heartbeat round completed"
        );

        if elapsed_ms > (self.config.heartbeat_interval * 1000 / 2) {
            tracing::warn!(
                elapsed_ms = elapsed_ms,
                heartbeat_interval_ms = self.config.heartbeat_interval * 1000,
                connections = total_count,
                "Heartbeat round took more than 50% of interval"
            );
        }
    }

    /// Disconnect connections whose last activity exceeds the timeout
    async fn reap_stale_connections(&self, timeout_secs: u64) {
        let stale = self.connection_manager.find_stale_connections(timeout_secs);

        if stale.is_empty() {
            return;
        }

        let count = stale.len();
        for conn_id in stale {
            tracing::info!(connection_id = %conn_id, "Disconnecting stale connection");
            self.router.disconnect(conn_id).await;
        }

        tracing::info!(
            removed = count,
            timeout_secs = timeout_secs,
            "Reaped stale connections"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::FanoutDispatcher;
    use crate::membership::MemoryMembershipStore;
    use crate::presence::PresenceTracker;
    use crate::rooms::{RoomManager, RoomRegistry};
    use crate::websocket::OutboundMessage;
    use tokio::sync::mpsc;

    fn create_test_router(
        connection_manager: Arc<ConnectionManager>,
    ) -> Arc<EventRouter> {
        let rooms = Arc::new(RoomRegistry::new());
        let membership = Arc::new(MemoryMembershipStore::new());
        let presence = Arc::new(PresenceTracker::new());
        let fanout = Arc::new(FanoutDispatcher::new(
            connection_manager.clone(),
            rooms.clone(),
        ));
        let manager = Arc::new(RoomManager::new(rooms, membership));
        Arc::new(EventRouter::new(
            connection_manager,
            manager,
            presence,
            fanout,
        ))
    }

    #[tokio::test]
    async fn test_heartbeat_task_shutdown() {
        let config = WebSocketConfig::default();
        let connection_manager = Arc::new(ConnectionManager::new());
        let router = create_test_router(connection_manager.clone());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task = HeartbeatTask::new(config, connection_manager, router, shutdown_rx);

        let handle = tokio::spawn(async move {
            task.run().await;
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("Task should complete")
            .expect("Task should not panic");
    }

    #[tokio::test]
    async fn test_heartbeat_sends_to_connections() {
        let config = WebSocketConfig {
            heartbeat_interval: 1,
            connection_timeout: 60,
            cleanup_interval: 60,
        };
        let connection_manager = Arc::new(ConnectionManager::new());
        let router = create_test_router(connection_manager.clone());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let (tx, mut rx) = mpsc::channel::<OutboundMessage>(10);
        let _handle = connection_manager
            .register("user1".to_string(), "user1@example.edu".to_string(), tx)
            .unwrap();

        let task = HeartbeatTask::new(config, connection_manager, router, shutdown_rx);
        let task_handle = tokio::spawn(async move {
            task.run().await;
        });

        let msg = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("Should receive heartbeat")
            .expect("Channel should not be closed");

        assert!(matches!(
            msg,
            OutboundMessage::Raw(ServerEvent::Heartbeat)
        ));

        shutdown_tx.send(()).unwrap();
        let _ = task_handle.await;
    }

    #[tokio::test]
    async fn test_stale_connection_reaped_like_disconnect() {
        let config = WebSocketConfig {
            heartbeat_interval: 60,
            connection_timeout: 0,
            cleanup_interval: 60,
        };
        let connection_manager = Arc::new(ConnectionManager::new());
        let router = create_test_router(connection_manager.clone());
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let (tx, _rx) = mpsc::channel::<OutboundMessage>(10);
        let stale = router
            .connect("sleepy".to_string(), "sleepy@example.edu".to_string(), tx)
            .await
            .unwrap();

        // A second connection observes the offline broadcast
        let (tx2, mut rx2) = mpsc::channel::<OutboundMessage>(10);
        let watcher = router
            .connect("watcher".to_string(), "watcher@example.edu".to_string(), tx2)
            .await
            .unwrap();

        // Let the stale connection age past the zero-second timeout, but
        // keep the watcher fresh so only one connection is reaped
        tokio::time::sleep(Duration::from_millis(1100)).await;
        watcher.update_activity();

        let task = HeartbeatTask::new(
            config.clone(),
            connection_manager.clone(),
            router.clone(),
            shutdown_rx,
        );
        task.reap_stale_connections(config.connection_timeout).await;

        assert!(connection_manager.get(stale.id).is_none());

        let msg = rx2.try_recv().expect("watcher should see offline broadcast");
        let event: ServerEvent = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert!(matches!(
            event,
            ServerEvent::PresenceChange { ref user_id, ref status }
                if user_id == "sleepy" && status == "offline"
        ));
    }
}
