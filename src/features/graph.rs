//! Graph feature extractor (spec §4.4): fan-in/out, approximate betweenness
//! centrality, SCC participation, and SCC size, computed from the import
//! graph (file entities) and the optional call graph (function/method
//! entities).

use std::collections::HashMap;

use async_trait::async_trait;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::core::entity::{Entity, EntityKind};
use crate::core::errors::Result;
use crate::core::featureset::{ExtractionContext, FeatureDefinition, FeatureExtractor};
use crate::core::graph_algo::{betweenness_centrality, nontrivial_sccs};
use crate::core::parse_index::EntityGraph;

/// Default sample count for approximated betweenness (spec §4.2/§9: the
/// prototype's default of 64, used unless a caller documents a deviation).
pub const DEFAULT_CENTRALITY_SAMPLES: usize = 64;

pub struct GraphExtractor {
    features: Vec<FeatureDefinition>,
    centrality_samples: usize,
}

impl GraphExtractor {
    pub fn new(centrality_samples: usize) -> Self {
        Self {
            features: vec![
                FeatureDefinition::new("graph.fan_in", "import/call in-degree", 0.0, 500.0, 0.0),
                FeatureDefinition::new("graph.fan_out", "import/call out-degree", 0.0, 500.0, 0.0),
                FeatureDefinition::new("graph.betweenness", "approximate betweenness centrality", 0.0, 1.0, 0.0),
                FeatureDefinition::new("graph.in_scc", "participates in a nontrivial SCC", 0.0, 1.0, 0.0),
                FeatureDefinition::new("graph.scc_size", "size of the containing SCC", 0.0, 10000.0, 0.0),
            ],
            centrality_samples,
        }
    }
}

impl Default for GraphExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_CENTRALITY_SAMPLES)
    }
}

fn metrics_for_node(graph: &EntityGraph, node: petgraph::graph::NodeIndex, samples: usize) -> HashMap<String, f64> {
    let fan_in = graph.edges_directed(node, Direction::Incoming).count();
    let fan_out = graph.edges_directed(node, Direction::Outgoing).count();
    let betweenness = betweenness_centrality(graph, samples);
    let sccs = nontrivial_sccs(graph);
    let containing_scc = sccs.iter().find(|c| c.contains(&node));

    let mut out = HashMap::new();
    out.insert("graph.fan_in".to_string(), fan_in as f64);
    out.insert("graph.fan_out".to_string(), fan_out as f64);
    out.insert("graph.betweenness".to_string(), betweenness.get(&node).copied().unwrap_or(0.0));
    out.insert("graph.in_scc".to_string(), if containing_scc.is_some() { 1.0 } else { 0.0 });
    out.insert("graph.scc_size".to_string(), containing_scc.map(|c| c.len()).unwrap_or(0) as f64);
    out
}

#[async_trait]
impl FeatureExtractor for GraphExtractor {
    fn name(&self) -> &str {
        "graph"
    }

    fn features(&self) -> &[FeatureDefinition] {
        &self.features
    }

    fn supports(&self, kind: EntityKind) -> bool {
        matches!(kind, EntityKind::File | EntityKind::Function | EntityKind::Method)
    }

    async fn extract(&self, entity: &Entity, ctx: &ExtractionContext<'_>) -> Result<HashMap<String, f64>> {
        if entity.kind == EntityKind::File {
            if let Some(node) = ctx.index.import_node(&entity.id) {
                return Ok(metrics_for_node(ctx.index.import_graph(), node, self.centrality_samples));
            }
        } else if let Some(call_graph) = ctx.index.call_graph() {
            if let Some(node) = ctx.index.call_node(&entity.id) {
                return Ok(metrics_for_node(call_graph, node, self.centrality_samples));
            }
        }
        Ok(HashMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::SourceLocation;
    use crate::core::parse_index::{ParseIndexBuilder, PartialParseIndex};

    fn file_entity(path: &str) -> Entity {
        Entity {
            id: Entity::make_id("python", path, None),
            name: path.to_string(),
            kind: EntityKind::File,
            location: SourceLocation {
                file_path: path.to_string(),
                start_line: 1,
                end_line: 1,
                start_column: 1,
                end_column: 1,
            },
            language: "python".into(),
            parent: None,
            children: vec![],
            raw_text: String::new(),
            signature: None,
            docstring: None,
            parameters: vec![],
            return_type: None,
            fields: vec![],
            imports: vec![],
            metrics: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn hub_file_has_higher_fan_in_than_leaf() {
        let mut builder = ParseIndexBuilder::new();
        let hub = file_entity("hub.py");
        let a = file_entity("a.py");
        let b = file_entity("b.py");
        let hub_id = hub.id.clone();
        let a_id = a.id.clone();
        let b_id = b.id.clone();
        builder.merge(PartialParseIndex {
            entities: vec![hub, a, b],
            import_edges: vec![(a_id.clone(), hub_id.clone()), (b_id.clone(), hub_id.clone())],
            call_edges: vec![],
        });
        let index = builder.build();
        let ctx = ExtractionContext { index: &index };
        let extractor = GraphExtractor::new(64);

        let hub_entity = index.entity(&hub_id).unwrap().clone();
        let leaf_entity = index.entity(&a_id).unwrap().clone();
        let hub_metrics = extractor.extract(&hub_entity, &ctx).await.unwrap();
        let leaf_metrics = extractor.extract(&leaf_entity, &ctx).await.unwrap();

        assert_eq!(hub_metrics["graph.fan_in"], 2.0);
        assert_eq!(leaf_metrics["graph.fan_in"], 0.0);
        let _ = b_id;
    }
}
