//! Payload, history and flood limits.

use serde::Deserialize;

/// Limits applied to room content and client connections.
///
/// Content streams are append-only but capped: once a stream reaches its cap
/// the oldest entries are evicted first.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum characters kept from a chat message, question or answer (default: 1000).
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    /// Chat messages retained per room (default: 1000).
    #[serde(default = "default_max_chat_history")]
    pub max_chat_history: usize,
    /// Whiteboard strokes retained per room (default: 10000).
    #[serde(default = "default_max_whiteboard_strokes")]
    pub max_whiteboard_strokes: usize,
    /// Polls retained per room (default: 100).
    #[serde(default = "default_max_polls")]
    pub max_polls: usize,
    /// Questions retained per room (default: 500).
    #[serde(default = "default_max_questions")]
    pub max_questions: usize,
    /// Maximum options accepted in a single poll (default: 10).
    #[serde(default = "default_max_poll_options")]
    pub max_poll_options: usize,
    /// Join requests queued per room awaiting the owner (default: 100).
    #[serde(default = "default_max_join_requests")]
    pub max_join_requests: usize,
    /// Outstanding invites per room (default: 500).
    #[serde(default = "default_max_invites")]
    pub max_invites: usize,
    /// Whiteboard coordinates are clamped into `0..=canvas_size` (default: 10000).
    #[serde(default = "default_canvas_size")]
    pub canvas_size: f64,
    /// Upper bound for stroke width (default: 50).
    #[serde(default = "default_max_stroke_width")]
    pub max_stroke_width: f64,
    /// Outbound frames buffered per connection before deliveries are dropped (default: 256).
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
    /// Largest accepted inbound frame in bytes (default: 65536).
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
    /// Sustained inbound events per second per connection (default: 50).
    #[serde(default = "default_messages_per_second")]
    pub messages_per_second: f32,
    /// Inbound burst capacity per connection (default: 100).
    #[serde(default = "default_message_burst")]
    pub message_burst: f32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_length: default_max_message_length(),
            max_chat_history: default_max_chat_history(),
            max_whiteboard_strokes: default_max_whiteboard_strokes(),
            max_polls: default_max_polls(),
            max_questions: default_max_questions(),
            max_poll_options: default_max_poll_options(),
            max_join_requests: default_max_join_requests(),
            max_invites: default_max_invites(),
            canvas_size: default_canvas_size(),
            max_stroke_width: default_max_stroke_width(),
            outbound_queue: default_outbound_queue(),
            max_frame_bytes: default_max_frame_bytes(),
            messages_per_second: default_messages_per_second(),
            message_burst: default_message_burst(),
        }
    }
}

fn default_max_message_length() -> usize {
    1000
}

fn default_max_chat_history() -> usize {
    1000
}

fn default_max_whiteboard_strokes() -> usize {
    10_000
}

fn default_max_polls() -> usize {
    100
}

fn default_max_questions() -> usize {
    500
}

fn default_max_poll_options() -> usize {
    10
}

fn default_max_join_requests() -> usize {
    100
}

fn default_max_invites() -> usize {
    500
}

fn default_canvas_size() -> f64 {
    10_000.0
}

fn default_max_stroke_width() -> f64 {
    50.0
}

fn default_outbound_queue() -> usize {
    256
}

fn default_max_frame_bytes() -> usize {
    64 * 1024
}

fn default_messages_per_second() -> f32 {
    50.0
}

fn default_message_burst() -> f32 {
    100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_correct() {
        let config = LimitsConfig::default();
        assert_eq!(config.max_message_length, 1000);
        assert_eq!(config.max_chat_history, 1000);
        assert_eq!(config.max_whiteboard_strokes, 10_000);
        assert_eq!(config.max_polls, 100);
        assert_eq!(config.max_questions, 500);
        assert_eq!(config.max_poll_options, 10);
        assert_eq!(config.max_join_requests, 100);
        assert_eq!(config.max_invites, 500);
        assert_eq!(config.outbound_queue, 256);
        assert_eq!(config.max_frame_bytes, 65536);
    }

    #[test]
    fn deserialize_partial_config_uses_defaults() {
        let toml_str = r#"
            max_chat_history = 20
        "#;
        let config: LimitsConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.max_chat_history, 20);
        assert_eq!(config.max_polls, 100);
        assert_eq!(config.canvas_size, 10_000.0);
    }
}
