//! Feature definitions, per-entity feature vectors, and the extractor trait.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::entity::{Entity, EntityKind};
use crate::core::errors::Result;
use crate::core::parse_index::ParseIndex;

/// Declares one feature a registered extractor contributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureDefinition {
    /// Unique feature name, used as the key in raw/normalized maps.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Expected minimum, used by bounded normalizers.
    pub min: f64,
    /// Expected maximum, used by bounded normalizers.
    pub max: f64,
    /// Value substituted when the extractor cannot compute this feature.
    pub default: f64,
}

impl FeatureDefinition {
    /// Build a feature definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        min: f64,
        max: f64,
        default: f64,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            min,
            max,
            default,
        }
    }
}

/// The registry of every feature name known to the pipeline, populated by
/// extractors at construction time. Every entity ends up with every
/// registered feature (using the per-feature default where an extractor did
/// not supply a value).
#[derive(Debug, Default, Clone)]
pub struct FeatureRegistry {
    definitions: HashMap<String, FeatureDefinition>,
}

impl FeatureRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feature definition, keyed by its name.
    pub fn register(&mut self, definition: FeatureDefinition) {
        self.definitions.insert(definition.name.clone(), definition);
    }

    /// All registered feature names, sorted for determinism.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.definitions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Look up a feature's definition.
    pub fn get(&self, name: &str) -> Option<&FeatureDefinition> {
        self.definitions.get(name)
    }

    /// Default value for a feature, or `0.0` if unregistered.
    pub fn default_of(&self, name: &str) -> f64 {
        self.definitions.get(name).map(|d| d.default).unwrap_or(0.0)
    }
}

/// Raw feature values for one entity, filled in by extractors and later
/// rewritten in place with normalized `[0,1]` values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    /// The entity this vector describes.
    pub entity_id: String,
    /// Raw feature values, keyed by feature name.
    pub raw: HashMap<String, f64>,
    /// Normalized feature values in `[0,1]`, populated by the normalizer.
    pub normalized: HashMap<String, f64>,
}

impl FeatureVector {
    /// Create an empty vector for an entity.
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            raw: HashMap::new(),
            normalized: HashMap::new(),
        }
    }

    /// Ensure every feature in `registry` is present in `raw`, filling gaps
    /// with the feature's default value.
    pub fn fill_defaults(&mut self, registry: &FeatureRegistry) {
        for name in registry.feature_names() {
            self.raw.entry(name.clone()).or_insert_with(|| registry.default_of(&name));
        }
    }
}

/// Per-entity context made available to extractors: the frozen parse index
/// plus the feature registry extractors register into.
pub struct ExtractionContext<'a> {
    /// The frozen, shared parse index.
    pub index: &'a ParseIndex,
}

/// An extractor computes a fixed set of named features for supported entity
/// kinds. Each extractor owns its feature names exclusively — no two
/// extractors write the same key, which is what makes concurrent writes to
/// an entity's metrics map safe without per-key locking.
#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    /// Stable extractor name (used in diagnostics).
    fn name(&self) -> &str;

    /// Features this extractor contributes to the registry.
    fn features(&self) -> &[FeatureDefinition];

    /// Entity kinds this extractor applies to.
    fn supports(&self, kind: EntityKind) -> bool;

    /// Compute raw feature values for one entity. Extractors must never
    /// panic; a feature that cannot be computed is simply omitted (the
    /// caller substitutes the registered default and records a diagnostic).
    async fn extract(&self, entity: &Entity, ctx: &ExtractionContext<'_>) -> Result<HashMap<String, f64>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_defaults_only_adds_missing_keys() {
        let mut registry = FeatureRegistry::new();
        registry.register(FeatureDefinition::new("loc", "lines of code", 0.0, 10000.0, 0.0));
        registry.register(FeatureDefinition::new("cyclomatic", "cyclomatic complexity", 1.0, 200.0, 1.0));

        let mut vector = FeatureVector::new("python://a.py::foo");
        vector.raw.insert("loc".to_string(), 42.0);
        vector.fill_defaults(&registry);

        assert_eq!(vector.raw.get("loc"), Some(&42.0));
        assert_eq!(vector.raw.get("cyclomatic"), Some(&1.0));
    }
}
