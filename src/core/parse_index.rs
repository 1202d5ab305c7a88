//! The merged parse index: entity map plus import and call graphs.
//!
//! Built once by [`ParseIndexBuilder`] in a single-threaded merge step, then
//! frozen into a read-only [`ParseIndex`] shared across feature-extraction
//! threads (§5: "constructed in a single-threaded merge step, then frozen").

use std::collections::HashMap;

use ahash::AHashMap;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, info};

use crate::core::entity::{Entity, EntityKind};

/// A directed graph over file or function/method entity ids.
pub type EntityGraph = DiGraph<String, ()>;

/// The merged corpus: every entity, plus the import graph and optional call graph.
#[derive(Debug, Default)]
pub struct ParseIndex {
    entities: AHashMap<String, Entity>,
    file_to_entity: AHashMap<String, String>,
    by_kind: AHashMap<EntityKind, Vec<String>>,
    by_file: AHashMap<String, Vec<String>>,

    import_graph: EntityGraph,
    import_node_index: AHashMap<String, NodeIndex>,

    call_graph: Option<EntityGraph>,
    call_node_index: AHashMap<String, NodeIndex>,
}

impl ParseIndex {
    /// Look up an entity by id.
    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// All entities, in no particular order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Total entity count.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// The file entity id for a given file path.
    pub fn file_entity_id(&self, file_path: &str) -> Option<&str> {
        self.file_to_entity.get(file_path).map(String::as_str)
    }

    /// Every file path known to the index.
    pub fn file_paths(&self) -> impl Iterator<Item = &String> {
        self.file_to_entity.keys()
    }

    /// Number of distinct files represented.
    pub fn file_count(&self) -> usize {
        self.file_to_entity.len()
    }

    /// Entities of a given kind.
    pub fn by_kind(&self, kind: EntityKind) -> &[String] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entities declared within a given file.
    pub fn by_file(&self, file_path: &str) -> &[String] {
        self.by_file.get(file_path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The file-level import graph.
    pub fn import_graph(&self) -> &EntityGraph {
        &self.import_graph
    }

    /// The node index for a file id in the import graph, if present.
    pub fn import_node(&self, file_id: &str) -> Option<NodeIndex> {
        self.import_node_index.get(file_id).copied()
    }

    /// The optional function/method call graph.
    pub fn call_graph(&self) -> Option<&EntityGraph> {
        self.call_graph.as_ref()
    }

    /// The node index for an entity id in the call graph, if present.
    pub fn call_node(&self, entity_id: &str) -> Option<NodeIndex> {
        self.call_node_index.get(entity_id).copied()
    }

    /// Children of an entity, resolved through the entity map.
    pub fn children_of<'a>(&'a self, entity_id: &str) -> Vec<&'a Entity> {
        self.entity(entity_id)
            .map(|e| e.children.iter().filter_map(|c| self.entity(c)).collect())
            .unwrap_or_default()
    }

    /// Verify the two universal graph invariants from spec §8:
    /// every node in either graph is a key in the entity map.
    pub fn validate_invariants(&self) -> Result<(), String> {
        for node in self.import_graph.node_weights() {
            if !self.entities.contains_key(node) {
                return Err(format!("import graph node {node} missing from entity map"));
            }
        }
        if let Some(call_graph) = &self.call_graph {
            for node in call_graph.node_weights() {
                if !self.entities.contains_key(node) {
                    return Err(format!("call graph node {node} missing from entity map"));
                }
            }
        }
        for entity in self.entities.values() {
            for child in &entity.children {
                if !self.entities.contains_key(child) {
                    return Err(format!(
                        "entity {} references missing child {child}",
                        entity.id
                    ));
                }
            }
        }
        Ok(())
    }
}

/// One language adapter's output, ready to be merged into a [`ParseIndex`].
#[derive(Debug, Default)]
pub struct PartialParseIndex {
    /// Entities produced for this language, in pre-order per file.
    pub entities: Vec<Entity>,
    /// File-to-file import edges: `(importer_file_id, imported_file_id)`.
    pub import_edges: Vec<(String, String)>,
    /// Function/method call edges: `(caller_entity_id, callee_entity_id)`.
    pub call_edges: Vec<(String, String)>,
}

/// Builds a [`ParseIndex`] by merging per-language [`PartialParseIndex`] values.
///
/// Entity ids are language-prefixed, so merging is collision-free: a plain
/// concatenation of entity maps followed by a union of edge sets.
#[derive(Debug, Default)]
pub struct ParseIndexBuilder {
    entities: AHashMap<String, Entity>,
    import_edges: Vec<(String, String)>,
    call_edges: Vec<(String, String)>,
    any_call_edges_declared: bool,
}

impl ParseIndexBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one language's partial index into the builder.
    pub fn merge(&mut self, partial: PartialParseIndex) {
        if !partial.call_edges.is_empty() {
            self.any_call_edges_declared = true;
        }
        for entity in partial.entities {
            self.entities.insert(entity.id.clone(), entity);
        }
        self.import_edges.extend(partial.import_edges);
        self.call_edges.extend(partial.call_edges);
    }

    /// Finish the merge, building graphs and derived caches.
    pub fn build(self) -> ParseIndex {
        let mut file_to_entity = HashMap::new();
        let mut by_kind: AHashMap<EntityKind, Vec<String>> = AHashMap::new();
        let mut by_file: AHashMap<String, Vec<String>> = AHashMap::new();

        // Deterministic merge: sort entity ids before populating caches so
        // re-running over the same inputs yields byte-identical orderings.
        let mut ids: Vec<String> = self.entities.keys().cloned().collect();
        ids.sort();

        for id in &ids {
            let entity = &self.entities[id];
            if entity.is_file() {
                file_to_entity.insert(entity.location.file_path.clone(), entity.id.clone());
            }
            by_kind.entry(entity.kind).or_default().push(id.clone());
            by_file
                .entry(entity.location.file_path.clone())
                .or_default()
                .push(id.clone());
        }

        // Import-graph nodes are file entities; call-graph nodes are
        // function/method entities (spec §3: "owns ... a directed import
        // graph with file entities as nodes ... an optional directed call
        // graph with function/method entities as nodes").
        let file_ids: Vec<String> = ids
            .iter()
            .filter(|id| self.entities[id.as_str()].is_file())
            .cloned()
            .collect();
        let callable_ids: Vec<String> = ids
            .iter()
            .filter(|id| {
                matches!(
                    self.entities[id.as_str()].kind,
                    EntityKind::Function | EntityKind::Method
                )
            })
            .cloned()
            .collect();

        let (import_graph, import_node_index) = build_graph(&file_ids, &self.import_edges);

        let (call_graph, call_node_index) = if self.any_call_edges_declared {
            let (graph, index) = build_graph(&callable_ids, &self.call_edges);
            (Some(graph), index)
        } else {
            (None, AHashMap::new())
        };

        info!(
            entities = self.entities.len(),
            files = file_to_entity.len(),
            import_edges = import_graph.edge_count(),
            call_edges = call_graph.as_ref().map(|g| g.edge_count()).unwrap_or(0),
            "merged parse index"
        );
        debug!(import_nodes = import_graph.node_count(), "import graph size");

        ParseIndex {
            entities: self.entities,
            file_to_entity: file_to_entity.into_iter().collect(),
            by_kind,
            by_file,
            import_graph,
            import_node_index,
            call_graph,
            call_node_index,
        }
    }
}

/// Build a directed graph whose nodes are exactly `ids`, adding one edge per
/// `(from, to)` pair in `edges` whose endpoints are both present in `ids`.
/// An edge naming an entity outside the node set (e.g. a resolved import
/// pointing at a non-file id) is silently dropped.
fn build_graph(ids: &[String], edges: &[(String, String)]) -> (EntityGraph, AHashMap<String, NodeIndex>) {
    let mut graph = EntityGraph::new();
    let mut node_index = AHashMap::new();

    for id in ids {
        let idx = graph.add_node(id.clone());
        node_index.insert(id.clone(), idx);
    }

    for (from, to) in edges {
        if let (Some(&a), Some(&b)) = (node_index.get(from), node_index.get(to)) {
            graph.add_edge(a, b, ());
        }
    }

    (graph, node_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::SourceLocation;
    use std::collections::HashMap as StdHashMap;

    fn file_entity(lang: &str, path: &str) -> Entity {
        Entity {
            id: Entity::make_id(lang, path, None),
            name: path.to_string(),
            kind: EntityKind::File,
            location: SourceLocation {
                file_path: path.to_string(),
                start_line: 1,
                end_line: 1,
                start_column: 1,
                end_column: 1,
            },
            language: lang.to_string(),
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
    fn merge_is_collision_free_across_languages() {
        let mut builder = ParseIndexBuilder::new();
        builder.merge(PartialParseIndex {
            entities: vec![file_entity("python", "a.py")],
            import_edges: vec![],
            call_edges: vec![],
        });
        builder.merge(PartialParseIndex {
            entities: vec![file_entity("rust", "a.py")],
            import_edges: vec![],
            call_edges: vec![],
        });
        let index = builder.build();
        assert_eq!(index.entity_count(), 2);
    }

    #[test]
    fn import_edge_with_missing_endpoint_is_ignored() {
        let mut builder = ParseIndexBuilder::new();
        let a = file_entity("python", "a.py");
        let a_id = a.id.clone();
        builder.merge(PartialParseIndex {
            entities: vec![a],
            import_edges: vec![(a_id, "python://missing.py".to_string())],
            call_edges: vec![],
        });
        let index = builder.build();
        assert_eq!(index.import_graph().edge_count(), 0);
        assert!(index.validate_invariants().is_ok());
    }

    #[test]
    fn single_file_no_imports_has_one_node_zero_edges() {
        let mut builder = ParseIndexBuilder::new();
        builder.merge(PartialParseIndex {
            entities: vec![file_entity("python", "a.py")],
            import_edges: vec![],
            call_edges: vec![],
        });
        let index = builder.build();
        assert_eq!(index.import_graph().node_count(), 1);
        assert_eq!(index.import_graph().edge_count(), 0);
    }

    #[test]
    fn import_graph_nodes_are_file_entities_only() {
        let mut file = file_entity("python", "a.py");
        let mut func = file.clone();
        func.id = Entity::make_id("python", "a.py", Some("foo"));
        func.kind = EntityKind::Function;
        func.name = "foo".to_string();
        file.children.push(func.id.clone());
        func.parent = Some(file.id.clone());

        let mut builder = ParseIndexBuilder::new();
        builder.merge(PartialParseIndex {
            entities: vec![file, func],
            import_edges: vec![],
            call_edges: vec![],
        });
        let index = builder.build();
        assert_eq!(index.import_graph().node_count(), 1);
    }

    #[test]
    fn call_graph_nodes_are_function_or_method_entities_only() {
        let mut file = file_entity("python", "a.py");
        let mut caller = file.clone();
        caller.id = Entity::make_id("python", "a.py", Some("caller"));
        caller.kind = EntityKind::Function;
        caller.name = "caller".to_string();
        let mut callee = file.clone();
        callee.id = Entity::make_id("python", "a.py", Some("callee"));
        callee.kind = EntityKind::Function;
        callee.name = "callee".to_string();
        file.children.extend([caller.id.clone(), callee.id.clone()]);
        caller.parent = Some(file.id.clone());
        callee.parent = Some(file.id.clone());
        let (caller_id, callee_id) = (caller.id.clone(), callee.id.clone());

        let mut builder = ParseIndexBuilder::new();
        builder.merge(PartialParseIndex {
            entities: vec![file, caller, callee],
            import_edges: vec![],
            call_edges: vec![(caller_id, callee_id)],
        });
        let index = builder.build();
        let call_graph = index.call_graph().expect("call graph present");
        assert_eq!(call_graph.node_count(), 2);
        assert_eq!(call_graph.edge_count(), 1);
    }
}
