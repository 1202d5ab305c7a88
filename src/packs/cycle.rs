//! Cycle-cut packs (spec §4.7): one pack per nontrivial SCC in the import
//! graph, with a feedback-vertex-set approximation as the cut set.

use std::collections::HashMap;

use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::core::graph_algo::{feedback_vertex_set, nontrivial_sccs};
use crate::core::parse_index::ParseIndex;
use crate::packs::{ImpactPack, PackKind, PackPayload};

/// Kind-specific payload for a cycle-cut pack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CyclePayload {
    pub scc_members: Vec<String>,
    pub cut_nodes: Vec<String>,
}

/// Build one pack per nontrivial strongly connected component of the import
/// graph.
pub fn build_cycle_packs(index: &ParseIndex, centrality_samples: usize) -> Vec<ImpactPack> {
    let graph = index.import_graph();
    let mut packs = Vec::new();

    for (i, scc) in nontrivial_sccs(graph).into_iter().enumerate() {
        let cut = feedback_vertex_set(graph, &scc, centrality_samples);
        if cut.is_empty() {
            continue;
        }

        let scc_members: Vec<String> = scc.iter().map(|&n| graph[n].clone()).collect();
        let cut_nodes: Vec<String> = cut.iter().map(|&n| graph[n].clone()).collect();

        let cut_size = cut.len() as f64;
        let cycles_removed = 2.0 * cut_size;
        let scc_count_delta = cut_size - 1.0;
        let path_length_improvement = (0.1 * cut_size).min(0.5);

        let imports_to_rehome: f64 = cut
            .iter()
            .map(|&n| {
                (graph.edges_directed(n, Direction::Incoming).count()
                    + graph.edges_directed(n, Direction::Outgoing).count()) as f64
            })
            .sum::<f64>()
            .min(20.0);

        let mut value = HashMap::new();
        value.insert("cycles_removed".to_string(), cycles_removed);
        value.insert("scc_count_delta".to_string(), scc_count_delta);
        value.insert("path_length_improvement".to_string(), path_length_improvement);

        let mut effort = HashMap::new();
        effort.insert("modules_touched".to_string(), cut_size);
        effort.insert("imports_to_rehome".to_string(), imports_to_rehome);

        let first_cut = cut_nodes.first().cloned().unwrap_or_default();
        let mut steps = vec![format!("Extract an interface or facade for {first_cut}")];
        steps.push("Invert dependencies through the interface".to_string());
        if cut_nodes.len() > 1 {
            steps.push("Move shared utilities to a common module".to_string());
        }

        packs.push(ImpactPack {
            id: format!("cycle-{i}"),
            kind: PackKind::CycleCut,
            value,
            effort,
            steps,
            explanations: vec![format!(
                "{} modules form a dependency cycle; cutting {} of them breaks it",
                scc_members.len(),
                cut_nodes.len()
            )],
            involved_entities: scc_members.clone(),
            payload: PackPayload::Cycle(CyclePayload { scc_members, cut_nodes }),
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
    fn three_file_cycle_yields_one_pack_with_cut_size_one() {
        let a = file_entity("A.py");
        let b = file_entity("B.py");
        let c = file_entity("C.py");
        let (a_id, b_id, c_id) = (a.id.clone(), b.id.clone(), c.id.clone());
        let mut builder = ParseIndexBuilder::new();
        builder.merge(PartialParseIndex {
            entities: vec![a, b, c],
            import_edges: vec![(a_id.clone(), b_id.clone()), (b_id.clone(), c_id.clone()), (c_id, a_id)],
            call_edges: vec![],
        });
        let index = builder.build();

        let packs = build_cycle_packs(&index, 64);
        assert_eq!(packs.len(), 1);
        let PackPayload::Cycle(payload) = &packs[0].payload else { panic!("wrong payload") };
        assert_eq!(payload.scc_members.len(), 3);
        assert_eq!(payload.cut_nodes.len(), 1);
        assert!(packs[0].value["cycles_removed"] >= 2.0);
        assert!(packs[0].steps[0].contains("interface") || packs[0].steps[0].contains("facade"));
    }

    #[test]
    fn acyclic_graph_yields_no_cycle_packs() {
        let a = file_entity("A.py");
        let b = file_entity("B.py");
        let (a_id, b_id) = (a.id.clone(), b.id.clone());
        let mut builder = ParseIndexBuilder::new();
        builder.merge(PartialParseIndex {
            entities: vec![a, b],
            import_edges: vec![(a_id, b_id)],
            call_edges: vec![],
        });
        let index = builder.build();
        assert!(build_cycle_packs(&index, 64).is_empty());
    }
}
