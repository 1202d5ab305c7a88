//! C4: Feature Extractors.
//!
//! Each extractor owns a disjoint set of feature names; after the parse
//! index is frozen, extractors run concurrently over entities via `rayon`
//! (spec §5/§9), writing only into their own keys of each entity's raw
//! feature map.

pub mod clone;
pub mod complexity;
pub mod graph;
pub mod refactoring;

use std::collections::HashMap;

use futures::executor::block_on;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::core::diagnostics::DiagnosticSink;
use crate::core::featureset::{ExtractionContext, FeatureExtractor, FeatureRegistry, FeatureVector};
use crate::core::parse_index::ParseIndex;

/// Build the feature registry from every enabled extractor's declarations.
pub fn build_registry(extractors: &[Box<dyn FeatureExtractor>]) -> FeatureRegistry {
    let mut registry = FeatureRegistry::new();
    for extractor in extractors {
        for feature in extractor.features() {
            registry.register(feature.clone());
        }
    }
    registry
}

/// Run every extractor over every entity in `index`, in parallel across
/// entities. A feature an extractor fails to compute (or declines because
/// the entity kind is unsupported) falls back to its registered default;
/// per-feature failures are recorded as diagnostics and never abort the run
/// (spec §4.4, §7 `FeatureExtractionError`).
pub fn extract_all(
    index: &ParseIndex,
    extractors: &[Box<dyn FeatureExtractor>],
    registry: &FeatureRegistry,
    diagnostics: &mut DiagnosticSink,
) -> Vec<FeatureVector> {
    let entities: Vec<_> = index.entities().collect();
    debug!(entities = entities.len(), extractors = extractors.len(), "running feature extraction");

    // Each entity's vector is built independently; rayon shards the entity
    // list across worker threads while every extractor call borrows the same
    // frozen, read-only `ParseIndex`.
    let (vectors, failures): (Vec<_>, Vec<_>) = entities
        .par_iter()
        .map(|entity| {
            let ctx = ExtractionContext { index };
            let mut vector = FeatureVector::new(entity.id.clone());
            let mut local_failures = Vec::new();

            for extractor in extractors {
                if !extractor.supports(entity.kind) {
                    continue;
                }
                // Extractors never actually suspend (no real `.await`s), so a
                // plain `block_on` is enough here; no tokio runtime context
                // is required on rayon's worker threads.
                match block_on(extractor.extract(entity, &ctx)) {
                    Ok(raw) => vector.raw.extend(raw),
                    Err(err) => {
                        local_failures.push(format!(
                            "feature extraction error in {} for {}: {err}",
                            extractor.name(),
                            entity.id
                        ));
                    }
                }
            }

            vector.fill_defaults(registry);
            (vector, local_failures)
        })
        .unzip();

    for failure in failures.into_iter().flatten() {
        warn!("{failure}");
        diagnostics.error(failure, None);
    }

    vectors
}

/// LOC for every entity id, used as a ranking tie-break key.
pub fn loc_by_entity(index: &ParseIndex) -> HashMap<String, usize> {
    index.entities().map(|e| (e.id.clone(), e.loc())).collect()
}
