//! Per-participant presence state machine.
//!
//! ```text
//! Connected --(disconnect)--> GracePeriod --(grace timeout)--> Removed
//! GracePeriod --(reconnect)--> Connected
//! Connected --(leave / room delete)--> Removed
//! ```
//!
//! Every transition bumps a generation counter. Grace timers carry the
//! generation they were armed with, so a timer that fires after the
//! participant reconnected (or left and rejoined) is recognised as stale.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::AbortHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionState {
    Connected,
    GracePeriod,
    Removed,
}

#[derive(Debug)]
pub struct Presence {
    state: ConnectionState,
    disconnected_at: Option<DateTime<Utc>>,
    generation: u64,
    timer: Option<AbortHandle>,
}

impl Presence {
    /// A participant bound to a live connection.
    pub fn connected() -> Self {
        Self {
            state: ConnectionState::Connected,
            disconnected_at: None,
            generation: 0,
            timer: None,
        }
    }

    /// A participant admitted without a live connection.
    ///
    /// Starts directly in the grace period so an abandoned admission is
    /// reclaimed like any other disconnect. Returns the presence and the
    /// generation the grace timer must be armed with.
    pub fn detached(now: DateTime<Utc>) -> (Self, u64) {
        let presence = Self {
            state: ConnectionState::GracePeriod,
            disconnected_at: Some(now),
            generation: 1,
            timer: None,
        };
        (presence, 1)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn disconnected_at(&self) -> Option<DateTime<Utc>> {
        self.disconnected_at
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Connected -> GracePeriod. Returns the new generation, or `None` if the
    /// participant was not connected.
    pub fn begin_grace(&mut self, now: DateTime<Utc>) -> Option<u64> {
        if self.state != ConnectionState::Connected {
            return None;
        }
        self.cancel_timer();
        self.state = ConnectionState::GracePeriod;
        self.disconnected_at = Some(now);
        self.generation += 1;
        Some(self.generation)
    }

    /// Bind to a live connection again.
    ///
    /// Returns true when this ended a grace period. Calling it on an already
    /// connected participant is a plain rebind and returns false.
    pub fn reconnect(&mut self) -> bool {
        match self.state {
            ConnectionState::GracePeriod => {
                self.cancel_timer();
                self.state = ConnectionState::Connected;
                self.disconnected_at = None;
                self.generation += 1;
                true
            }
            ConnectionState::Connected | ConnectionState::Removed => false,
        }
    }

    /// Grace timeout. Only succeeds if still in the grace period that armed
    /// the timer.
    pub fn expire(&mut self, generation: u64) -> bool {
        if self.state != ConnectionState::GracePeriod || self.generation != generation {
            return false;
        }
        self.timer = None;
        self.state = ConnectionState::Removed;
        self.generation += 1;
        true
    }

    /// Explicit leave or room deletion.
    pub fn remove(&mut self) {
        self.cancel_timer();
        self.state = ConnectionState::Removed;
        self.disconnected_at = None;
        self.generation += 1;
    }

    /// Store the handle of the grace timer armed for the current generation.
    pub fn arm(&mut self, handle: AbortHandle) {
        self.cancel_timer();
        self.timer = Some(handle);
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for Presence {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn grace_then_reconnect_clears_disconnect_time() {
        let mut presence = Presence::connected();
        let generation = presence.begin_grace(Utc::now()).unwrap();
        assert_eq!(presence.state(), ConnectionState::GracePeriod);
        assert!(presence.disconnected_at().is_some());

        assert!(presence.reconnect());
        assert!(presence.is_connected());
        assert!(presence.disconnected_at().is_none());

        // the timer armed before the reconnect is now stale
        assert!(!presence.expire(generation));
        assert!(presence.is_connected());
    }

    #[test]
    fn expire_removes_when_generation_matches() {
        let mut presence = Presence::connected();
        let generation = presence.begin_grace(Utc::now()).unwrap();
        assert!(presence.expire(generation));
        assert_eq!(presence.state(), ConnectionState::Removed);
        assert!(!presence.expire(generation));
    }

    #[test]
    fn stale_generation_from_earlier_grace_is_ignored() {
        let mut presence = Presence::connected();
        let first = presence.begin_grace(Utc::now()).unwrap();
        presence.reconnect();
        let second = presence.begin_grace(Utc::now()).unwrap();

        assert!(!presence.expire(first));
        assert!(presence.expire(second));
    }

    #[test]
    fn begin_grace_requires_connected() {
        let mut presence = Presence::connected();
        presence.remove();
        assert!(presence.begin_grace(Utc::now()).is_none());
        assert!(!presence.reconnect());
    }

    #[test]
    fn detached_admission_starts_in_grace() {
        let (mut presence, generation) = Presence::detached(Utc::now());
        assert_eq!(presence.state(), ConnectionState::GracePeriod);
        assert!(presence.expire(generation));
    }

    #[tokio::test]
    async fn reconnect_aborts_armed_timer() {
        let mut presence = Presence::connected();
        presence.begin_grace(Utc::now());
        let task = tokio::spawn(tokio::time::sleep(Duration::from_secs(3600)));
        presence.arm(task.abort_handle());

        presence.reconnect();
        let err = task.await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
