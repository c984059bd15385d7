//! Configuration for the fuzzer

use crate::error::{FuzzError, FuzzResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How node-valued candidates are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueStrategy {
    /// Coin flip between reusing an existing node and instantiating a new one.
    #[default]
    Mixed,
    /// Only reuse existing nodes.
    ReuseOnly,
    /// Only instantiate new nodes.
    InstantiateOnly,
}

/// Configuration for the fuzzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Property names never selected for mutation
    pub excluded_properties: BTreeSet<String>,
    /// Narrate every decision to the diagnostics sink
    pub narrate: bool,
    /// Properties whose name starts with this prefix are unset before they
    /// are set
    pub unset_before_set_prefix: Option<String>,
    pub value_strategy: ValueStrategy,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            excluded_properties: BTreeSet::new(),
            narrate: false,
            unset_before_set_prefix: Some("base_".to_string()),
            value_strategy: ValueStrategy::Mixed,
        }
    }
}

impl FuzzConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(source: &str) -> FuzzResult<Self> {
        serde_json::from_str(source).map_err(|e| FuzzError::config(e.to_string()))
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_excluded<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_properties.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_narration(mut self, narrate: bool) -> Self {
        self.narrate = narrate;
        self
    }

    pub fn with_unset_before_set_prefix(mut self, prefix: Option<String>) -> Self {
        self.unset_before_set_prefix = prefix;
        self
    }

    pub fn with_value_strategy(mut self, strategy: ValueStrategy) -> Self {
        self.value_strategy = strategy;
        self
    }

    /// Whether a write to `name` must be preceded by an unset.
    pub fn forces_unset_before_set(&self, name: &str) -> bool {
        self.unset_before_set_prefix
            .as_deref()
            .map(|prefix| !prefix.is_empty() && name.starts_with(prefix))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ========== TEST: defaults ==========
    #[test]
    fn test_defaults() {
        let config = FuzzConfig::new();

        assert_eq!(config.seed, 42);
        assert!(!config.narrate);
        assert!(config.forces_unset_before_set("base_Class"));
        assert!(!config.forces_unset_before_set("name"));
    }

    // ========== TEST: from_json_partial ==========
    #[test]
    fn test_from_json_partial() {
        // GIVEN a JSON document naming only some fields
        let source = r#"{ "seed": 7, "excluded_properties": ["rating"], "value_strategy": "reuse_only" }"#;

        // WHEN loaded
        let config = FuzzConfig::from_json(source).unwrap();

        // THEN given fields are read and the rest default
        assert_eq!(
            config,
            FuzzConfig::new()
                .with_seed(7)
                .with_excluded(["rating"])
                .with_value_strategy(ValueStrategy::ReuseOnly)
        );
    }

    // ========== TEST: from_json_invalid ==========
    #[test]
    fn test_from_json_invalid() {
        let result = FuzzConfig::from_json("{ \"seed\": \"many\" }");

        assert!(matches!(result, Err(FuzzError::Config(_))));
    }

    // ========== TEST: prefix_disabled ==========
    #[test]
    fn test_prefix_disabled() {
        let config = FuzzConfig::new().with_unset_before_set_prefix(None);

        assert!(!config.forces_unset_before_set("base_Class"));
    }
}
