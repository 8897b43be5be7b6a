//! Telemetry utilities for event timing and tracing spans.

use std::time::Instant;

/// Guard for timing event handling and recording metrics.
///
/// Records event latency when dropped.
pub struct EventTimer {
    event: &'static str,
    start: Instant,
}

impl EventTimer {
    /// Start timing an event.
    pub fn new(event: &'static str) -> Self {
        Self {
            event,
            start: Instant::now(),
        }
    }
}

impl Drop for EventTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_event(self.event, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use std::net::SocketAddr;
    use tracing::{Span, info_span};

    /// Create a span for a client connection.
    pub fn connection(conn_id: &str, addr: &SocketAddr) -> Span {
        info_span!("connection", conn_id = %conn_id, addr = %addr)
    }

    /// Create a span for one dispatched client event.
    pub fn event(name: &str, conn_id: &str, user_id: Option<&str>) -> Span {
        if let Some(user_id) = user_id {
            info_span!("event", name = %name, conn_id = %conn_id, user_id = %user_id)
        } else {
            info_span!("event", name = %name, conn_id = %conn_id)
        }
    }
}
