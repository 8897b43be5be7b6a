//! Prometheus metrics collection for conflux.
//!
//! Exposed on the admin HTTP listener at `/metrics`.
//!
//! - `conflux_events_total{event}` - Client events processed by name
//! - `conflux_event_duration_seconds{event}` - Event handling latency
//! - `conflux_event_errors_total{event,error}` - Events answered with an error
//! - `conflux_event_fanout` - Recipients per room broadcast
//! - `conflux_deliveries_dropped_total{reason}` - Outbound events not delivered

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Gauges
// ========================================================================

/// Currently open WebSocket connections.
pub static CONNECTED_SOCKETS: OnceLock<IntGauge> = OnceLock::new();

/// Active rooms.
pub static ACTIVE_ROOMS: OnceLock<IntGauge> = OnceLock::new();

/// Participants across all active rooms, connected or in grace.
pub static PARTICIPANTS: OnceLock<IntGauge> = OnceLock::new();

// ========================================================================
// Counters and histograms
// ========================================================================

/// Client events processed by name.
pub static EVENT_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Event handling latency by name.
pub static EVENT_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Event errors by name and error code.
pub static EVENT_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Recipients per room broadcast.
pub static EVENT_FANOUT: OnceLock<Histogram> = OnceLock::new();

/// Outbound deliveries dropped (queue full or connection closed).
pub static DELIVERIES_DROPPED: OnceLock<IntCounterVec> = OnceLock::new();

/// Participants removed after their grace period ran out.
pub static GRACE_EXPIRATIONS: OnceLock<IntCounter> = OnceLock::new();

/// Frames rejected by the per-connection flood limiter.
pub static RATE_LIMITED: OnceLock<IntCounter> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at startup before any metrics are recorded. Recording
/// before `init` is a no-op.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(CONNECTED_SOCKETS, IntGauge::new("conflux_connected_sockets", "Open WebSocket connections"));
    register!(ACTIVE_ROOMS, IntGauge::new("conflux_active_rooms", "Active rooms"));
    register!(PARTICIPANTS, IntGauge::new("conflux_participants", "Participants in active rooms"));

    register!(EVENT_COUNTER, IntCounterVec::new(Opts::new("conflux_events_total", "Client events processed by name"), &["event"]));
    register!(EVENT_LATENCY, HistogramVec::new(
        HistogramOpts::new("conflux_event_duration_seconds", "Client event latency by name")
            .buckets(vec![0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        &["event"]));
    register!(EVENT_ERRORS, IntCounterVec::new(Opts::new("conflux_event_errors_total", "Client events answered with an error"), &["event", "error"]));
    register!(EVENT_FANOUT, Histogram::with_opts(
        HistogramOpts::new("conflux_event_fanout", "Recipients per room broadcast")
            .buckets(vec![1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0])));
    register!(DELIVERIES_DROPPED, IntCounterVec::new(Opts::new("conflux_deliveries_dropped_total", "Outbound events not delivered"), &["reason"]));
    register!(GRACE_EXPIRATIONS, IntCounter::new("conflux_grace_expirations_total", "Participants removed after the grace period"));
    register!(RATE_LIMITED, IntCounter::new("conflux_rate_limited_total", "Frames rejected by flood control"));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Record a processed client event with latency.
#[inline]
pub fn record_event(event: &str, duration_secs: f64) {
    if let Some(c) = EVENT_COUNTER.get() {
        c.with_label_values(&[event]).inc();
    }
    if let Some(h) = EVENT_LATENCY.get() {
        h.with_label_values(&[event]).observe(duration_secs);
    }
}

#[inline]
pub fn record_event_error(event: &str, error: &str) {
    if let Some(c) = EVENT_ERRORS.get() {
        c.with_label_values(&[event, error]).inc();
    }
}

#[inline]
pub fn record_fanout(recipients: usize) {
    if let Some(h) = EVENT_FANOUT.get() {
        h.observe(recipients as f64);
    }
}

#[inline]
pub fn record_dropped_delivery(reason: &str) {
    if let Some(c) = DELIVERIES_DROPPED.get() {
        c.with_label_values(&[reason]).inc();
    }
}

#[inline]
pub fn record_grace_expiration() {
    if let Some(c) = GRACE_EXPIRATIONS.get() {
        c.inc();
    }
}

#[inline]
pub fn record_rate_limited() {
    if let Some(c) = RATE_LIMITED.get() {
        c.inc();
    }
}

#[inline]
pub fn inc_connected_sockets() {
    if let Some(g) = CONNECTED_SOCKETS.get() {
        g.inc();
    }
}

#[inline]
pub fn dec_connected_sockets() {
    if let Some(g) = CONNECTED_SOCKETS.get() {
        g.dec();
    }
}

/// Refresh the room gauges from a fresh count.
#[inline]
pub fn set_room_gauges(active_rooms: usize, participants: usize) {
    if let Some(g) = ACTIVE_ROOMS.get() {
        g.set(active_rooms as i64);
    }
    if let Some(g) = PARTICIPANTS.get() {
        g.set(participants as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_lifecycle() {
        init();

        record_event("chat-message", 0.001);
        record_event_error("join-room", "room_full");
        set_room_gauges(3, 7);

        let output = gather_metrics();
        assert!(output.contains("conflux_events_total"));
        assert!(output.contains("conflux_event_errors_total"));
        assert!(output.contains("conflux_active_rooms 3"));
    }
}
