//! World configuration.

use serde::{Deserialize, Serialize};

use crate::signature::SIGNATURE_BITS;

/// Configuration for a [`World`](crate::World).
///
/// Deserializes with every field optional, so a host can embed it in its own
/// configuration file and only spell out what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Maximum number of component types. At most [`SIGNATURE_BITS`].
    pub max_component_types: usize,
    /// Log every entity creation and destruction.
    pub log_lifecycle: bool,
    /// Number of values each component store preallocates.
    pub initial_capacity: usize,
}

impl WorldConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_component_types: SIGNATURE_BITS,
            log_lifecycle: false,
            initial_capacity: 0,
        }
    }

    /// Limit the number of registrable component types.
    #[must_use]
    pub fn with_max_component_types(mut self, max: usize) -> Self {
        self.max_component_types = max;
        self
    }

    /// Turn entity lifecycle logging on or off.
    #[must_use]
    pub fn with_lifecycle_logging(mut self, enabled: bool) -> Self {
        self.log_lifecycle = enabled;
        self
    }

    /// Preallocate `capacity` values in every component store.
    #[must_use]
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_uses_full_signature() {
        let config = WorldConfig::default();
        assert_eq!(config.max_component_types, SIGNATURE_BITS);
        assert!(!config.log_lifecycle);
        assert_eq!(config.initial_capacity, 0);
    }

    #[test]
    fn test_builder() {
        let config = WorldConfig::new()
            .with_max_component_types(8)
            .with_lifecycle_logging(true)
            .with_initial_capacity(1024);
        assert_eq!(config.max_component_types, 8);
        assert!(config.log_lifecycle);
        assert_eq!(config.initial_capacity, 1024);
    }

    #[test]
    fn test_partial_deserialization() {
        let config: WorldConfig = serde_json::from_str(r#"{ "log_lifecycle": true }"#).unwrap();
        assert!(config.log_lifecycle);
        assert_eq!(config.max_component_types, SIGNATURE_BITS);
    }
}
