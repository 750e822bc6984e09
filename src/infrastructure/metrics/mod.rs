//! Prometheus metrics for the realtime gateway.
//!
//! Covers connection lifecycle, inbound event counts, and fan-out delivery
//! outcomes. Gauges for registry sizes are refreshed on scrape by the
//! `/metrics` handler.

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "gateway";

lazy_static! {
    // ============================================================================
    // Connection Metrics
    // ============================================================================

    /// Total number of active WebSocket connections
    pub static ref CONNECTIONS_TOTAL: IntGauge = register_int_gauge!(
        format!("{}_connections_total", METRIC_PREFIX),
        "Total number of active WebSocket connections"
    ).unwrap();

    /// Number of unique connected users
    pub static ref USERS_CONNECTED: IntGauge = register_int_gauge!(
        format!("{}_users_connected", METRIC_PREFIX),
        "Number of unique connected users"
    ).unwrap();

    /// Number of rooms with at least one member
    pub static ref ROOMS_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_rooms_active", METRIC_PREFIX),
        "Number of rooms with at least one member"
    ).unwrap();

    /// Number of users with a tracked presence status
    pub static ref PRESENCE_TRACKED: IntGauge = register_int_gauge!(
        format!("{}_presence_tracked", METRIC_PREFIX),
        "Number of users with a tracked presence status"
    ).unwrap();

    /// WebSocket connections opened since start
    pub static ref WS_CONNECTIONS_OPENED: IntCounter = register_int_counter!(
        format!("{}_ws_connections_opened_total", METRIC_PREFIX),
        "WebSocket connections opened since start"
    ).unwrap();

    /// WebSocket connections closed since start
    pub static ref WS_CONNECTIONS_CLOSED: IntCounter = register_int_counter!(
        format!("{}_ws_connections_closed_total", METRIC_PREFIX),
        "WebSocket connections closed since start"
    ).unwrap();

    /// WebSocket connection duration in seconds
    pub static ref WS_CONNECTION_DURATION: Histogram = register_histogram!(
        format!("{}_ws_connection_duration_seconds", METRIC_PREFIX),
        "WebSocket connection duration in seconds",
        vec![1.0, 10.0, 60.0, 300.0, 1800.0, 3600.0, 14400.0]
    ).unwrap();

    // ============================================================================
    // Event Metrics
    // ============================================================================

    /// Inbound client events by type
    pub static ref EVENTS_RECEIVED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_events_received_total", METRIC_PREFIX),
        "Inbound client events by type",
        &["event"]
    ).unwrap();

    /// Events delivered to connections
    pub static ref EVENTS_DELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_events_delivered_total", METRIC_PREFIX),
        "Events successfully delivered to connections"
    ).unwrap();

    /// Deliveries that failed (closed or saturated outbound channel)
    pub static ref EVENTS_FAILED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_events_failed_total", METRIC_PREFIX),
        "Event deliveries that failed"
    ).unwrap();

    /// Joins dropped because the authorization check failed
    pub static ref JOINS_DENIED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_joins_denied_total", METRIC_PREFIX),
        "Room joins dropped because the authorization check failed"
    ).unwrap();
}

/// Record an inbound client event by wire name.
pub fn record_event(event: &str) {
    EVENTS_RECEIVED_TOTAL.with_label_values(&[event]).inc();
}

/// Encode all registered metrics in Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode_to_string(&metric_families)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics() {
        WS_CONNECTIONS_OPENED.inc();
        record_event("ping");

        let output = encode_metrics().unwrap();
        assert!(output.contains("gateway_ws_connections_opened_total"));
        assert!(output.contains("gateway_events_received_total"));
    }
}
