//! Graph-theoretic primitives shared by feature extractors and the impact
//! pack builder: sampled betweenness centrality, SCC membership, and the
//! feedback-vertex-set approximation used for cycle packs.
//!
//! Resolves spec §9 Open Question (a): cyclicity is decided with
//! [`petgraph::algo::is_cyclic_directed`] (equivalently, an SCC of size > 1),
//! never an iterator-truthiness proxy.

use std::collections::{HashMap, VecDeque};

use petgraph::algo::kosaraju_scc;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::core::parse_index::EntityGraph;

/// Strongly connected components of size >= 2, each a list of node indices.
pub fn nontrivial_sccs(graph: &EntityGraph) -> Vec<Vec<NodeIndex>> {
    kosaraju_scc(graph)
        .into_iter()
        .filter(|component| component.len() >= 2)
        .collect()
}

/// Whether the subgraph induced by `nodes` is cyclic, decided by an explicit
/// SCC-size check rather than any iterator-truthiness shortcut.
pub fn induced_subgraph_is_cyclic(graph: &EntityGraph, nodes: &[NodeIndex]) -> bool {
    let node_set: std::collections::HashSet<NodeIndex> = nodes.iter().copied().collect();
    let sub = graph.filter_map(
        |idx, weight| if node_set.contains(&idx) { Some(weight.clone()) } else { None },
        |_, weight| Some(*weight),
    );
    petgraph::algo::is_cyclic_directed(&sub)
}

/// Betweenness centrality over every node, approximated by sampling `k`
/// source nodes (exact when `|V| <= 10`, per spec §4.2/§4.4).
///
/// Uses Brandes' single-source accumulation, unweighted (BFS shortest
/// paths), normalized by the number of sampled sources so results stay
/// comparable across graphs of different size.
pub fn betweenness_centrality(graph: &EntityGraph, max_samples: usize) -> HashMap<NodeIndex, f64> {
    let node_count = graph.node_count();
    let mut scores: HashMap<NodeIndex, f64> = graph.node_indices().map(|n| (n, 0.0)).collect();
    if node_count < 3 {
        return scores;
    }

    let k = if node_count <= 10 { node_count } else { max_samples.min(node_count) };
    let sources: Vec<NodeIndex> = graph.node_indices().take(k).collect();

    for source in &sources {
        brandes_single_source(graph, *source, &mut scores);
    }

    let normalization = sources.len().max(1) as f64;
    for value in scores.values_mut() {
        *value /= normalization;
    }
    scores
}

/// One source's contribution to betweenness, accumulated into `scores`.
fn brandes_single_source(graph: &EntityGraph, source: NodeIndex, scores: &mut HashMap<NodeIndex, f64>) {
    let mut stack = Vec::new();
    let mut predecessors: HashMap<NodeIndex, Vec<NodeIndex>> = HashMap::new();
    let mut sigma: HashMap<NodeIndex, f64> = graph.node_indices().map(|n| (n, 0.0)).collect();
    let mut distance: HashMap<NodeIndex, i64> = graph.node_indices().map(|n| (n, -1)).collect();

    sigma.insert(source, 1.0);
    distance.insert(source, 0);

    let mut queue = VecDeque::new();
    queue.push_back(source);

    while let Some(v) = queue.pop_front() {
        stack.push(v);
        for edge in graph.edges_directed(v, Direction::Outgoing) {
            let w = edge.target();
            if distance[&w] < 0 {
                distance.insert(w, distance[&v] + 1);
                queue.push_back(w);
            }
            if distance[&w] == distance[&v] + 1 {
                *sigma.get_mut(&w).unwrap() += sigma[&v];
                predecessors.entry(w).or_default().push(v);
            }
        }
    }

    let mut delta: HashMap<NodeIndex, f64> = graph.node_indices().map(|n| (n, 0.0)).collect();
    while let Some(w) = stack.pop() {
        if let Some(preds) = predecessors.get(&w) {
            for &v in preds {
                let contribution = (sigma[&v] / sigma[&w]) * (1.0 + delta[&w]);
                *delta.get_mut(&v).unwrap() += contribution;
            }
        }
        if w != source {
            *scores.get_mut(&w).unwrap() += delta[&w];
        }
    }
}

/// Degree-based fallback centrality, normalized to `[0,1]` by the maximum
/// possible degree. Betweenness is zero for every node of a pure hub graph
/// (a star with all edges pointing into the hub has no node that sits
/// strictly between two others on any shortest path, since every path is a
/// single hop into the hub and stops there) — this approximates
/// "disproportionately connected" structurally instead of via shortest-path
/// intermediacy, for the graphs where betweenness alone cannot see a hub.
pub fn boundary_centrality(graph: &EntityGraph) -> HashMap<NodeIndex, f64> {
    let denom = graph.node_count().saturating_sub(1).max(1) as f64;
    graph
        .node_indices()
        .map(|n| {
            let degree = graph.edges_directed(n, Direction::Incoming).count()
                + graph.edges_directed(n, Direction::Outgoing).count();
            (n, (degree as f64 / denom).min(1.0))
        })
        .collect()
}

/// Greedy feedback-vertex-set approximation for one strongly connected
/// component (spec §4.7 Cycle packs):
///
/// repeatedly score every remaining node as
/// `0.5*betweenness + 0.3*(in+out degree) + 0.2*edges-to-outside-SCC`,
/// remove the top-scored node, and loop until the remaining induced
/// subgraph is acyclic. Capped at 100 iterations.
pub fn feedback_vertex_set(graph: &EntityGraph, scc_nodes: &[NodeIndex], centrality_samples: usize) -> Vec<NodeIndex> {
    let mut remaining: Vec<NodeIndex> = scc_nodes.to_vec();
    let mut cut = Vec::new();

    for _ in 0..100 {
        if remaining.len() < 2 || !induced_subgraph_is_cyclic(graph, &remaining) {
            break;
        }

        let scc_set: std::collections::HashSet<NodeIndex> = remaining.iter().copied().collect();
        let betweenness = betweenness_centrality(graph, centrality_samples);

        let mut best: Option<(NodeIndex, f64)> = None;
        for &node in &remaining {
            let in_degree = graph.edges_directed(node, Direction::Incoming).count();
            let out_degree = graph.edges_directed(node, Direction::Outgoing).count();
            let outside_edges = graph
                .edges_directed(node, Direction::Outgoing)
                .filter(|e| !scc_set.contains(&e.target()))
                .count()
                + graph
                    .edges_directed(node, Direction::Incoming)
                    .filter(|e| !scc_set.contains(&e.source()))
                    .count();

            let score = 0.5 * betweenness.get(&node).copied().unwrap_or(0.0)
                + 0.3 * (in_degree + out_degree) as f64
                + 0.2 * outside_edges as f64;

            if best.map(|(_, best_score)| score > best_score).unwrap_or(true) {
                best = Some((node, score));
            }
        }

        let Some((worst, _)) = best else { break };
        remaining.retain(|&n| n != worst);
        cut.push(worst);
    }

    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle_graph(len: usize) -> EntityGraph {
        let mut graph = EntityGraph::new();
        let nodes: Vec<NodeIndex> = (0..len).map(|i| graph.add_node(format!("n{i}"))).collect();
        for i in 0..len {
            graph.add_edge(nodes[i], nodes[(i + 1) % len], ());
        }
        graph
    }

    #[test]
    fn acyclic_subgraph_has_empty_cut() {
        let mut graph = EntityGraph::new();
        let a = graph.add_node("a".to_string());
        let b = graph.add_node("b".to_string());
        graph.add_edge(a, b, ());
        let cut = feedback_vertex_set(&graph, &[a, b], 64);
        assert!(cut.is_empty());
    }

    #[test]
    fn three_cycle_is_cut_by_one_node() {
        let graph = cycle_graph(3);
        let nodes: Vec<NodeIndex> = graph.node_indices().collect();
        let cut = feedback_vertex_set(&graph, &nodes, 64);
        assert_eq!(cut.len(), 1);
        let remaining: Vec<NodeIndex> = nodes.into_iter().filter(|n| !cut.contains(n)).collect();
        assert!(!induced_subgraph_is_cyclic(&graph, &remaining));
    }

    #[test]
    fn betweenness_is_zero_for_small_graphs() {
        let graph = cycle_graph(2);
        let scores = betweenness_centrality(&graph, 64);
        assert!(scores.values().all(|&v| v == 0.0));
    }

    #[test]
    fn hub_has_higher_betweenness_than_leaves() {
        // Star graph: hub -> leaf_i, leaf_i -> hub (round trip so BFS reaches everyone).
        let mut graph = EntityGraph::new();
        let hub = graph.add_node("hub".to_string());
        let leaves: Vec<NodeIndex> = (0..5).map(|i| graph.add_node(format!("leaf{i}"))).collect();
        for &leaf in &leaves {
            graph.add_edge(hub, leaf, ());
            graph.add_edge(leaf, hub, ());
        }
        let scores = betweenness_centrality(&graph, 64);
        let hub_score = scores[&hub];
        let leaf_score = scores[&leaves[0]];
        assert!(hub_score > leaf_score);
    }

    #[test]
    fn betweenness_is_zero_for_pure_sink_hub() {
        // Sink hub: every sibling imports the hub, the hub imports no one.
        // No node is ever an intermediary on a shortest path, so betweenness
        // degenerates to zero for every node including the hub itself.
        let mut graph = EntityGraph::new();
        let hub = graph.add_node("hub".to_string());
        for i in 0..12 {
            let sibling = graph.add_node(format!("sibling{i}"));
            graph.add_edge(sibling, hub, ());
        }
        let scores = betweenness_centrality(&graph, 64);
        assert!(scores.values().all(|&v| v == 0.0));
    }

    #[test]
    fn boundary_centrality_ranks_sink_hub_above_siblings() {
        let mut graph = EntityGraph::new();
        let hub = graph.add_node("hub".to_string());
        let mut siblings = Vec::new();
        for i in 0..12 {
            siblings.push(graph.add_node(format!("sibling{i}")));
        }
        for &sibling in &siblings {
            graph.add_edge(sibling, hub, ());
        }
        let scores = boundary_centrality(&graph);
        assert_eq!(scores[&hub], 1.0);
        assert!(scores[&siblings[0]] < scores[&hub]);
    }

    #[test]
    fn nontrivial_sccs_filters_singletons() {
        let mut graph = EntityGraph::new();
        let a = graph.add_node("a".to_string());
        let b = graph.add_node("b".to_string());
        graph.add_node("isolated".to_string());
        graph.add_edge(a, b, ());
        graph.add_edge(b, a, ());
        let sccs = nontrivial_sccs(&graph);
        assert_eq!(sccs.len(), 1);
        assert_eq!(sccs[0].len(), 2);
    }
}
