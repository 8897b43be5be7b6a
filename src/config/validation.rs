//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("rooms.max_participants must be at least 1")]
    ZeroCapacity,
    #[error("rooms.grace_period_secs must be at least 1")]
    ZeroGracePeriod,
    #[error("rooms.purge_delay_secs ({purge}) must not be shorter than the grace period ({grace})")]
    PurgeBeforeGrace { purge: u64, grace: u64 },
    #[error("http.address must differ from listen.address")]
    SharedListenAddress,
    #[error("limits.{0} must be greater than zero")]
    ZeroLimit(&'static str),
    #[error("limits.max_poll_options must be at least 2, got {0}")]
    TooFewPollOptions(usize),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.trim().is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    let rooms = &config.rooms;
    if rooms.max_participants == 0 {
        errors.push(ValidationError::ZeroCapacity);
    }
    if rooms.grace_period_secs == 0 {
        errors.push(ValidationError::ZeroGracePeriod);
    }
    if rooms.purge_delay_secs < rooms.grace_period_secs {
        errors.push(ValidationError::PurgeBeforeGrace {
            purge: rooms.purge_delay_secs,
            grace: rooms.grace_period_secs,
        });
    }

    if let Some(ref http) = config.http
        && http.address == config.listen.address
    {
        errors.push(ValidationError::SharedListenAddress);
    }

    let limits = &config.limits;
    let zero_checks: [(&'static str, bool); 10] = [
        ("max_message_length", limits.max_message_length == 0),
        ("max_chat_history", limits.max_chat_history == 0),
        ("max_whiteboard_strokes", limits.max_whiteboard_strokes == 0),
        ("max_join_requests", limits.max_join_requests == 0),
        ("max_invites", limits.max_invites == 0),
        ("outbound_queue", limits.outbound_queue == 0),
        ("max_frame_bytes", limits.max_frame_bytes == 0),
        ("canvas_size", limits.canvas_size <= 0.0),
        ("max_stroke_width", limits.max_stroke_width < 1.0),
        ("messages_per_second", limits.messages_per_second <= 0.0),
    ];
    for (field, invalid) in zero_checks {
        if invalid {
            errors.push(ValidationError::ZeroLimit(field));
        }
    }
    if limits.max_poll_options < 2 {
        errors.push(ValidationError::TooFewPollOptions(limits.max_poll_options));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        toml::from_str(
            r#"
            [listen]
            address = "127.0.0.1:3001"

            [http]
            address = "127.0.0.1:3000"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&base_config()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = base_config();
        config.server.name = "  ".to_string();
        config.rooms.max_participants = 0;
        config.rooms.grace_period_secs = 600;
        config.limits.max_poll_options = 1;

        let errors = validate(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::MissingServerName));
        assert!(errors.contains(&ValidationError::ZeroCapacity));
        assert!(errors.contains(&ValidationError::PurgeBeforeGrace {
            purge: 300,
            grace: 600
        }));
        assert!(errors.contains(&ValidationError::TooFewPollOptions(1)));
    }

    #[test]
    fn rejects_shared_listener_address() {
        let mut config = base_config();
        if let Some(http) = config.http.as_mut() {
            http.address = config.listen.address;
        }
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::SharedListenAddress]);
    }

    #[test]
    fn rejects_zero_limits() {
        let mut config = base_config();
        config.limits.outbound_queue = 0;
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::ZeroLimit("outbound_queue")]);
    }

    #[test]
    fn example_config_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.toml");
        let config = Config::load(path).unwrap();
        assert!(validate(&config).is_ok());
        assert!(config.http.is_some());
    }
}
