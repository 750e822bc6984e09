//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::connection_manager::ConnectionStats;
use crate::fanout::FanoutStatsSnapshot;
use crate::rooms::RoomStats;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub connections: ConnectionHealthResponse,
    pub rooms: RoomHealthResponse,
    pub presence: PresenceHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct ConnectionHealthResponse {
    pub total: usize,
    pub unique_users: usize,
}

#[derive(Debug, Serialize)]
pub struct RoomHealthResponse {
    pub active: usize,
}

#[derive(Debug, Serialize)]
pub struct PresenceHealthResponse {
    pub tracked_users: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub connections: ConnectionStats,
    pub rooms: RoomStats,
    pub fanout: FanoutStatsSnapshot,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = state.start_time.elapsed().as_secs();
    let conn_stats = state.connection_manager.stats();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        connections: ConnectionHealthResponse {
            total: conn_stats.total_connections,
            unique_users: conn_stats.unique_users,
        },
        rooms: RoomHealthResponse {
            active: state.rooms.room_count(),
        },
        presence: PresenceHealthResponse {
            tracked_users: state.presence.tracked_users(),
        },
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        connections: state.connection_manager.stats(),
        rooms: state.rooms.stats(),
        fanout: state.fanout.stats(),
    })
}
