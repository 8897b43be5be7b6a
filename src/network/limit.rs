//! Per-connection flood protection.
//!
//! A token bucket refills at `messages_per_second` up to `message_burst`.
//! Each inbound frame costs one token. Frames arriving with an empty bucket
//! are dropped; after [`MAX_STRIKES`] consecutive drops the connection is
//! closed.

use tokio::time::Instant;

/// Consecutive throttled frames tolerated before disconnecting.
pub const MAX_STRIKES: u32 = 3;

/// Token bucket rate limiter.
pub struct RateLimiter {
    tokens: f32,
    last_check: Instant,
    rate: f32,
    capacity: f32,
}

impl RateLimiter {
    /// `rate` tokens are added per second, up to `capacity`.
    pub fn new(rate: f32, capacity: f32) -> Self {
        Self {
            tokens: capacity,
            last_check: Instant::now(),
            rate,
            capacity,
        }
    }

    /// Consume a token if one is available.
    pub fn check(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_check).as_secs_f32();
        self.last_check = now;

        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Throttle,
    Disconnect,
}

/// Rate limiter plus the consecutive-violation counter.
pub struct FloodGuard {
    limiter: RateLimiter,
    strikes: u32,
}

impl FloodGuard {
    pub fn new(rate: f32, burst: f32) -> Self {
        Self {
            limiter: RateLimiter::new(rate, burst),
            strikes: 0,
        }
    }

    pub fn check(&mut self) -> Verdict {
        if self.limiter.check() {
            self.strikes = 0;
            return Verdict::Allow;
        }
        self.strikes += 1;
        crate::metrics::record_rate_limited();
        if self.strikes >= MAX_STRIKES {
            Verdict::Disconnect
        } else {
            Verdict::Throttle
        }
    }
}
