// Copyright 2025 Cowboy AI, LLC.

//! Mediator configuration

use crate::errors::ConfigError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How event handlers are run concurrently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FanOutMode {
    /// One tokio task per handler, joined before `broadcast` returns
    #[default]
    Spawned,
    /// All handler futures polled together on the calling task
    Inline,
}

/// Configuration for a [`Mediator`](crate::Mediator)
///
/// Missing fields take their defaults:
///
/// ```rust
/// use cim_mediator::{FanOutMode, MediatorConfig};
///
/// let config = MediatorConfig::from_json_str(r#"{ "fan_out": "inline" }"#).unwrap();
/// assert_eq!(config.fan_out, FanOutMode::Inline);
/// assert!(config.warn_on_unhandled_events);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MediatorConfig {
    /// Event fan-out execution mode
    pub fan_out: FanOutMode,
    /// Log a warning when an event has no subscriber
    pub warn_on_unhandled_events: bool,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            fan_out: FanOutMode::Spawned,
            warn_on_unhandled_events: true,
        }
    }
}

impl MediatorConfig {
    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the fan-out mode
    pub fn with_fan_out(mut self, fan_out: FanOutMode) -> Self {
        self.fan_out = fan_out;
        self
    }

    /// Toggle the unhandled-event warning
    pub fn with_unhandled_event_warnings(mut self, enabled: bool) -> Self {
        self.warn_on_unhandled_events = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn defaults() {
        let config = MediatorConfig::default();
        assert_eq!(config.fan_out, FanOutMode::Spawned);
        assert!(config.warn_on_unhandled_events);
        assert_eq!(MediatorConfig::from_json_str("{}").unwrap(), config);
    }

    #[test_case(r#"{"fan_out":"spawned"}"#, FanOutMode::Spawned ; "spawned")]
    #[test_case(r#"{"fan_out":"inline"}"#, FanOutMode::Inline ; "inline")]
    fn parses_fan_out(json: &str, expected: FanOutMode) {
        assert_eq!(MediatorConfig::from_json_str(json).unwrap().fan_out, expected);
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(MediatorConfig::from_json_str(r#"{"fan_out":"sequential"}"#).is_err());
    }

    #[test]
    fn builder_methods() {
        let config = MediatorConfig::default()
            .with_fan_out(FanOutMode::Inline)
            .with_unhandled_event_warnings(false);
        assert_eq!(
            config,
            MediatorConfig {
                fan_out: FanOutMode::Inline,
                warn_on_unhandled_events: false,
            }
        );
    }

    #[test]
    fn schema_lists_fields() {
        let schema = serde_json::to_value(schemars::schema_for!(MediatorConfig)).unwrap();
        let properties = &schema["properties"];
        assert!(properties.get("fan_out").is_some());
        assert!(properties.get("warn_on_unhandled_events").is_some());
    }
}
