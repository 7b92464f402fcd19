//! Configuration hints for the constraint container.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Capacity and verbosity hints for a constraint container.
///
/// Capacities pre-size the unordered back-reference index; they are pure
/// performance hints and never bound how many objects a store can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegistryConfig {
    /// Expected node count, used to pre-size the back-reference index.
    pub node_capacity: usize,
    /// Expected element count, used to pre-size the elemental-load index.
    pub element_capacity: usize,
    /// Whether duplicate-tag adds are logged (they are refused either way).
    pub log_duplicates: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            node_capacity: 256,
            element_capacity: 256,
            log_duplicates: true,
        }
    }
}

impl RegistryConfig {
    /// Create a config sized for a model with roughly `nodes` nodes.
    #[must_use]
    pub fn with_node_capacity(nodes: usize) -> Self {
        Self {
            node_capacity: nodes,
            ..Default::default()
        }
    }

    /// Silence duplicate-add logging.
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.log_duplicates = false;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.node_capacity, 256);
        assert!(config.log_duplicates);
    }

    #[test]
    fn test_quiet() {
        let config = RegistryConfig::with_node_capacity(16).quiet();
        assert_eq!(config.node_capacity, 16);
        assert!(!config.log_duplicates);
    }
}
