//! Chokepoint-elimination packs (spec §4.7): nodes with disproportionately
//! high betweenness centrality in the import graph.

use std::collections::HashMap;

use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::core::graph_algo::{betweenness_centrality, boundary_centrality};
use crate::core::parse_index::ParseIndex;
use crate::packs::{ImpactPack, PackKind, PackPayload};

const TOP_PERCENT: f64 = 0.05;
const MIN_CENTRALITY: f64 = 0.05;

/// Kind-specific payload for a chokepoint-elimination pack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChokepointPayload {
    pub chokepoint_node: String,
    pub centrality: f64,
    pub affected_communities: usize,
}

/// Build chokepoint packs for the top nodes by betweenness centrality.
pub fn build_chokepoint_packs(index: &ParseIndex, centrality_samples: usize, max_packs: usize) -> Vec<ImpactPack> {
    let graph = index.import_graph();
    let mut betweenness = betweenness_centrality(graph, centrality_samples);
    // A pure hub (every edge points into it, none out) has betweenness 0
    // for every node: no node is ever an intermediary on a shortest path.
    // Fall back to degree-based boundary centrality so such hubs still
    // register as chokepoints.
    if betweenness.values().all(|&v| v < f64::EPSILON) {
        betweenness = boundary_centrality(graph);
    }

    let node_count = graph.node_count();
    let top_n = ((node_count as f64 * TOP_PERCENT).ceil() as usize).max(1).min(max_packs);

    let mut ranked: Vec<_> = betweenness.into_iter().filter(|(_, score)| *score >= MIN_CENTRALITY).collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(top_n);

    let mut packs = Vec::new();
    for (node, centrality) in ranked {
        let node_id = graph[node].clone();
        let neighbor_count = graph.edges_directed(node, Direction::Incoming).count()
            + graph.edges_directed(node, Direction::Outgoing).count();

        let affected_communities = neighbor_count / 3;
        let cross_community_edges_reduced = neighbor_count as f64 / 2.0;

        let mut value = HashMap::new();
        value.insert("cross_community_edges_reduced".to_string(), cross_community_edges_reduced);

        let mut effort = HashMap::new();
        effort.insert("modules_touched".to_string(), 1.0);
        effort.insert("imports_to_rehome".to_string(), neighbor_count as f64);

        packs.push(ImpactPack {
            id: format!("chokepoint-{node_id}"),
            kind: PackKind::ChokepointElimination,
            value,
            effort,
            steps: vec![
                format!("Extract a narrow interface in front of {node_id}"),
                "Route dependents through the interface to cut direct coupling".to_string(),
            ],
            explanations: vec![format!(
                "{node_id} has betweenness centrality {:.2} across {} neighbors, spanning an estimated {} communities",
                centrality, neighbor_count, affected_communities
            )],
            involved_entities: vec![node_id.clone()],
            payload: PackPayload::Chokepoint(ChokepointPayload {
                chokepoint_node: node_id,
                centrality,
                affected_communities,
            }),
        });
    }

    packs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::{Entity, EntityKind, SourceLocation};
    use crate::core::parse_index::{ParseIndexBuilder, PartialParseIndex};
    use std::collections::HashMap as StdHashMap;

    fn file_entity(path: &str) -> Entity {
        Entity {
            id: Entity::make_id("python", path, None),
            name: path.to_string(),
            kind: EntityKind::File,
            location: SourceLocation { file_path: path.to_string(), start_line: 1, end_line: 1, start_column: 1, end_column: 1 },
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
            metrics: StdHashMap::new(),
        }
    }

    #[test]
    fn hub_imported_by_twelve_siblings_yields_chokepoint_pack() {
        let hub = file_entity("hub.py");
        let hub_id = hub.id.clone();
        let mut entities = vec![hub];
        let mut edges = Vec::new();
        for i in 0..12 {
            let sibling = file_entity(&format!("sibling_{i}.py"));
            edges.push((sibling.id.clone(), hub_id.clone()));
            entities.push(sibling);
        }
        let mut builder = ParseIndexBuilder::new();
        builder.merge(PartialParseIndex { entities, import_edges: edges, call_edges: vec![] });
        let index = builder.build();

        let packs = build_chokepoint_packs(&index, 64, 3);
        assert_eq!(packs.len(), 1);
        assert_eq!(packs[0].value["cross_community_edges_reduced"], 6.0);
        assert_eq!(packs[0].effort["modules_touched"], 1.0);
    }
}
