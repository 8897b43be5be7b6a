//! Room lifecycle policy.

use serde::Deserialize;
use std::time::Duration;

/// Room lifecycle configuration.
///
/// Controls admission capacity and the two-stage teardown of abandoned rooms:
/// a participant is kept for `grace_period_secs` after their connection drops,
/// and an emptied room's record is kept for `purge_delay_secs` after it is
/// deactivated so late lookups can report it as recently deleted.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomsConfig {
    /// Maximum participants per room (default: 50).
    #[serde(default = "default_max_participants")]
    pub max_participants: usize,
    /// Seconds a disconnected participant is kept before removal (default: 30).
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,
    /// Seconds an inactive room record is kept before purge (default: 300).
    #[serde(default = "default_purge_delay")]
    pub purge_delay_secs: u64,
    /// Only the room owner may add users to the invite set (default: true).
    #[serde(default = "default_true")]
    pub owner_only_invites: bool,
}

impl RoomsConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    pub fn purge_delay(&self) -> Duration {
        Duration::from_secs(self.purge_delay_secs)
    }
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            max_participants: default_max_participants(),
            grace_period_secs: default_grace_period(),
            purge_delay_secs: default_purge_delay(),
            owner_only_invites: true,
        }
    }
}

fn default_max_participants() -> usize {
    50
}

fn default_grace_period() -> u64 {
    30
}

fn default_purge_delay() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_correct() {
        let cfg = RoomsConfig::default();
        assert_eq!(cfg.max_participants, 50);
        assert_eq!(cfg.grace_period(), Duration::from_secs(30));
        assert_eq!(cfg.purge_delay(), Duration::from_secs(300));
        assert!(cfg.owner_only_invites);
    }

    #[test]
    fn partial_table_keeps_other_defaults() {
        let cfg: RoomsConfig = toml::from_str("grace_period_secs = 5").unwrap();
        assert_eq!(cfg.grace_period_secs, 5);
        assert_eq!(cfg.max_participants, 50);
        assert!(cfg.owner_only_invites);
    }
}
