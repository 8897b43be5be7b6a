//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Top-level config struct and loading (Config, ServerConfig)
//! - [`listen`]: WebSocket and admin HTTP listener configuration
//! - [`rooms`]: Room lifecycle policy (capacity, grace period, purge delay)
//! - [`limits`]: Payload, history and flood limits
//! - [`validation`]: Startup validation

mod limits;
mod listen;
mod rooms;
mod types;
mod validation;

pub use limits::LimitsConfig;
pub use listen::{HttpConfig, ListenConfig};
pub use rooms::RoomsConfig;
pub use types::{Config, ConfigError, LogFormat, ServerConfig};
pub use validation::{ValidationError, validate};
