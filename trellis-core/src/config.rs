//! Runtime configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.
//!
//! ```json
//! {
//!     "default_thread_safety": "synchronized",
//!     "binding_settle_limit": 8,
//!     "marshal_core_updates": false
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::reactive::{Binder, ThreadSafety, DEFAULT_SETTLE_LIMIT};

/// Tunables for properties, bindings and core glue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactiveConfig {
    /// Notifier variant for properties created through a `ViewContext`.
    pub default_thread_safety: ThreadSafety,

    /// Maximum write rounds a bidirectional binding performs to settle.
    pub binding_settle_limit: u32,

    /// Route core updates through the dispatcher when called off the main
    /// thread. When false they run on the calling thread.
    pub marshal_core_updates: bool,
}

impl Default for ReactiveConfig {
    fn default() -> Self {
        Self {
            default_thread_safety: ThreadSafety::Simple,
            binding_settle_limit: DEFAULT_SETTLE_LIMIT,
            marshal_core_updates: true,
        }
    }
}

impl ReactiveConfig {
    /// Parse a config from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a config from JSON bytes.
    pub fn from_json_slice(json: &[u8]) -> Result<Self, ConfigError> {
        Ok(serde_json::from_slice(json)?)
    }

    /// A binder using the configured settle limit.
    pub fn binder(&self) -> Binder {
        Binder::new(self.binding_settle_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config = ReactiveConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ReactiveConfig::default());
        assert_eq!(config.binding_settle_limit, 16);
        assert!(config.marshal_core_updates);
    }

    #[test]
    fn partial_config() {
        let config = ReactiveConfig::from_json_slice(
            br#"{ "default_thread_safety": "synchronized", "binding_settle_limit": 4 }"#,
        )
        .unwrap();

        assert_eq!(config.default_thread_safety, ThreadSafety::Synchronized);
        assert_eq!(config.binder().settle_limit(), 4);
        assert!(config.marshal_core_updates);
    }

    #[test]
    fn malformed_config_is_an_error() {
        let err = ReactiveConfig::from_json_str(r#"{ "binding_settle_limit": "many" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = ReactiveConfig {
            default_thread_safety: ThreadSafety::Synchronized,
            binding_settle_limit: 3,
            marshal_core_updates: false,
        };

        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(ReactiveConfig::from_json_str(&json).unwrap(), config);
    }
}
