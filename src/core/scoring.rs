//! Composite scoring and deterministic ranking.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::featureset::FeatureVector;

/// One entity's composite score and the normalized features that fed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedEntity {
    /// The entity id this score describes.
    pub entity_id: String,
    /// Composite score in `[0,1]`.
    pub score: f64,
    /// Normalized feature values contributing to the score.
    pub contributing_features: HashMap<String, f64>,
}

/// Feature-name -> weight map. Missing weights default to 0 (feature ignored).
pub type Weights = HashMap<String, f64>;

/// Rank entities by composite score, descending, truncated to `top_k`.
///
/// Composite score = `sum(weight_f * normalized_f) / sum(weight_f)`.
/// Ties break by LOC descending, then entity id ascending, for determinism.
pub fn rank(
    vectors: &[FeatureVector],
    weights: &Weights,
    loc_by_entity: &HashMap<String, usize>,
    top_k: usize,
) -> Vec<RankedEntity> {
    let weight_sum: f64 = weights.values().sum();

    let mut scored: Vec<RankedEntity> = vectors
        .iter()
        .map(|vector| {
            let score = if weight_sum <= 0.0 {
                0.0
            } else {
                let weighted: f64 = weights
                    .iter()
                    .map(|(feature, weight)| {
                        weight * vector.normalized.get(feature).copied().unwrap_or(0.0)
                    })
                    .sum();
                (weighted / weight_sum).clamp(0.0, 1.0)
            };
            RankedEntity {
                entity_id: vector.entity_id.clone(),
                score,
                contributing_features: vector.normalized.clone(),
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                let loc_a = loc_by_entity.get(&a.entity_id).copied().unwrap_or(0);
                let loc_b = loc_by_entity.get(&b.entity_id).copied().unwrap_or(0);
                loc_b.cmp(&loc_a)
            })
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });

    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(id: &str, cyclomatic: f64, long_method: f64) -> FeatureVector {
        let mut v = FeatureVector::new(id);
        v.normalized.insert("cyclomatic".into(), cyclomatic);
        v.normalized.insert("long_method".into(), long_method);
        v
    }

    #[test]
    fn missing_weight_defaults_to_zero() {
        let vectors = vec![vector("a", 1.0, 0.0), vector("b", 0.0, 1.0)];
        let mut weights = Weights::new();
        weights.insert("cyclomatic".into(), 1.0);
        let loc = HashMap::new();
        let ranked = rank(&vectors, &weights, &loc, 10);
        assert_eq!(ranked[0].entity_id, "a");
        assert_eq!(ranked[0].score, 1.0);
        assert_eq!(ranked[1].score, 0.0);
    }

    #[test]
    fn ties_break_by_loc_then_id() {
        let vectors = vec![vector("z", 0.5, 0.5), vector("a", 0.5, 0.5)];
        let mut weights = Weights::new();
        weights.insert("cyclomatic".into(), 1.0);
        weights.insert("long_method".into(), 1.0);
        let mut loc = HashMap::new();
        loc.insert("z".to_string(), 10);
        loc.insert("a".to_string(), 10);
        let ranked = rank(&vectors, &weights, &loc, 10);
        // equal score, equal loc -> id ascending
        assert_eq!(ranked[0].entity_id, "a");
        assert_eq!(ranked[1].entity_id, "z");
    }

    #[test]
    fn determinism_across_repeated_runs() {
        let vectors = vec![
            vector("c", 0.9, 0.1),
            vector("a", 0.9, 0.1),
            vector("b", 0.2, 0.8),
        ];
        let mut weights = Weights::new();
        weights.insert("cyclomatic".into(), 2.0);
        weights.insert("long_method".into(), 1.0);
        let loc = HashMap::new();

        let first = rank(&vectors, &weights, &loc, 10);
        let second = rank(&vectors, &weights, &loc, 10);
        let first_ids: Vec<_> = first.iter().map(|r| r.entity_id.clone()).collect();
        let second_ids: Vec<_> = second.iter().map(|r| r.entity_id.clone()).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn top_k_truncates() {
        let vectors = vec![vector("a", 1.0, 0.0), vector("b", 0.5, 0.0), vector("c", 0.0, 0.0)];
        let mut weights = Weights::new();
        weights.insert("cyclomatic".into(), 1.0);
        let loc = HashMap::new();
        let ranked = rank(&vectors, &weights, &loc, 2);
        assert_eq!(ranked.len(), 2);
    }
}
