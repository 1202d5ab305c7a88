//! Shared tree-walking, import resolution, and adapter-status machinery used
//! by every per-language adapter.

use std::collections::HashMap;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Tree};

use crate::core::diagnostics::DiagnosticSink;
use crate::core::entity::{Entity, EntityKind, SourceLocation};
use crate::core::errors::Result;
use crate::core::parse_index::PartialParseIndex;

/// One node-kind -> entity-kind mapping rule for a language's grammar.
pub struct NodeRule {
    pub node_kind: &'static str,
    pub entity_kind: EntityKind,
}

/// Walks a tree-sitter tree in pre-order, turning nodes whose kind matches a
/// [`NodeRule`] into [`Entity`] values with parent/child wiring, in source
/// order (spec §5: deterministic pre-order emission per file).
pub struct EntityWalker<'a> {
    pub language: &'a str,
    pub file_path: &'a str,
    pub source: &'a [u8],
    pub rules: &'a [NodeRule],
    pub name_field: &'static str,
    pub params_field: &'static str,
}

impl<'a> EntityWalker<'a> {
    /// Walk the tree, producing the file entity plus every nested entity.
    pub fn walk(&self, tree: &Tree) -> Vec<Entity> {
        let mut entities = Vec::new();
        let mut anon_counter = 0usize;

        let file_id = Entity::make_id(self.language, self.file_path, None);
        let root = tree.root_node();
        let file_entity = Entity {
            id: file_id.clone(),
            name: self.file_path.to_string(),
            kind: EntityKind::File,
            location: self.location_for(&root),
            language: self.language.to_string(),
            parent: None,
            children: Vec::new(),
            raw_text: self.text(&root),
            signature: None,
            docstring: None,
            parameters: Vec::new(),
            return_type: None,
            fields: Vec::new(),
            imports: Vec::new(),
            metrics: HashMap::new(),
        };
        entities.push(file_entity);

        let mut stack: Vec<(String, Vec<String>)> = vec![(file_id.clone(), Vec::new())];
        let mut qualified_stack: Vec<String> = Vec::new();

        self.visit(root, &mut stack, &mut qualified_stack, &mut entities, &mut anon_counter);

        // Pop remaining stack frames into their parents' children lists.
        while stack.len() > 1 {
            let (id, children) = stack.pop().unwrap();
            if let Some(entity) = entities.iter_mut().find(|e| e.id == id) {
                entity.children = children;
            }
            let (_, parent_children) = stack.last_mut().unwrap();
            parent_children.push(id);
        }
        let (_, root_children) = stack.pop().unwrap();
        if let Some(entity) = entities.iter_mut().find(|e| e.id == file_id) {
            entity.children = root_children;
        }

        entities
    }

    fn visit(
        &self,
        node: Node,
        stack: &mut Vec<(String, Vec<String>)>,
        qualified_stack: &mut Vec<String>,
        entities: &mut Vec<Entity>,
        anon_counter: &mut usize,
    ) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            let matched_kind = self
                .rules
                .iter()
                .find(|rule| rule.node_kind == child.kind())
                .map(|rule| rule.entity_kind);

            if let Some(kind) = matched_kind {
                let name = self.name_of(&child, kind, anon_counter);
                qualified_stack.push(name.clone());
                let qualified_name = qualified_stack.join(".");
                let id = Entity::make_id(self.language, self.file_path, Some(&qualified_name));

                let entity = Entity {
                    id: id.clone(),
                    name,
                    kind,
                    location: self.location_for(&child),
                    language: self.language.to_string(),
                    parent: Some(stack.last().unwrap().0.clone()),
                    children: Vec::new(),
                    raw_text: self.text(&child),
                    signature: self.signature_of(&child),
                    docstring: None,
                    parameters: self.parameters_of(&child),
                    return_type: None,
                    fields: Vec::new(),
                    imports: Vec::new(),
                    metrics: HashMap::new(),
                };
                entities.push(entity);

                stack.push((id, Vec::new()));
                self.visit(child, stack, qualified_stack, entities, anon_counter);
                let (finished_id, finished_children) = stack.pop().unwrap();
                if let Some(e) = entities.iter_mut().find(|e| e.id == finished_id) {
                    e.children = finished_children;
                }
                stack.last_mut().unwrap().1.push(finished_id);
                qualified_stack.pop();
            } else {
                self.visit(child, stack, qualified_stack, entities, anon_counter);
            }
        }
    }

    fn name_of(&self, node: &Node, kind: EntityKind, anon_counter: &mut usize) -> String {
        if let Some(name_node) = node.child_by_field_name(self.name_field) {
            self.text(&name_node)
        } else {
            *anon_counter += 1;
            kind.fallback_name(*anon_counter)
        }
    }

    fn signature_of(&self, node: &Node) -> Option<String> {
        let full = self.text(node);
        full.lines().next().map(|line| line.trim().to_string())
    }

    fn parameters_of(&self, node: &Node) -> Vec<String> {
        let Some(params_node) = node.child_by_field_name(self.params_field) else {
            return Vec::new();
        };
        let mut cursor = params_node.walk();
        params_node
            .children(&mut cursor)
            .filter(|c| c.kind() == "identifier" || c.kind().ends_with("_parameter"))
            .map(|c| self.text(&c))
            .filter(|t| !t.is_empty() && t != "," && t != "(" && t != ")")
            .collect()
    }

    fn text(&self, node: &Node) -> String {
        node.utf8_text(self.source).unwrap_or_default().to_string()
    }

    fn location_for(&self, node: &Node) -> SourceLocation {
        let start = node.start_position();
        let end = node.end_position();
        SourceLocation::from_positions(self.file_path, start.row, start.column, end.row, end.column)
    }
}

/// Collect the raw text of every top-level statement whose node kind is one
/// of `kinds` (e.g. `import_statement`). Each language adapter parses the
/// returned strings into [`ParsedImport`] values using its own grammar
/// knowledge; there is no regex layer, only the AST.
pub fn top_level_import_texts(root: Node, source: &[u8], kinds: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if kinds.contains(&child.kind()) {
            out.push(child.utf8_text(source).unwrap_or_default().to_string());
        }
    }
    out
}

/// A raw import extracted from the importer's source text.
#[derive(Debug, Clone)]
pub struct ParsedImport {
    /// The dotted or slash-delimited module specifier, without leading dots.
    pub module: String,
    /// Number of leading dots (0 for absolute imports).
    pub relative_level: usize,
}

impl ParsedImport {
    pub fn is_relative(&self) -> bool {
        self.relative_level > 0
    }
}

/// Per-language conventions the import resolver needs.
pub struct ImportConventions {
    /// File extensions to try appending to a resolved module path, in order.
    pub extensions: &'static [&'static str],
    /// Package-init filename stem (e.g. `__init__` for Python, `mod` for Rust).
    pub package_init: &'static str,
    /// Separator used in dotted module specifiers (`.` for Python, `/` for JS/TS/Go).
    pub separator: char,
}

/// Resolve one import to a file path already present in `corpus_files`,
/// implementing the relative/absolute resolution strategies from spec §4.2.
pub fn resolve_import(
    importer_path: &str,
    import: &ParsedImport,
    corpus_files: &[String],
    conventions: &ImportConventions,
) -> Option<String> {
    if import.is_relative() {
        resolve_relative(importer_path, import, corpus_files, conventions)
    } else {
        resolve_absolute(import, corpus_files, conventions)
    }
}

fn importer_dir(importer_path: &str) -> Vec<String> {
    let mut parts: Vec<String> = importer_path.split('/').map(String::from).collect();
    parts.pop(); // drop filename
    parts
}

fn module_segments(module: &str, separator: char) -> Vec<String> {
    module
        .split(separator)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn resolve_relative(
    importer_path: &str,
    import: &ParsedImport,
    corpus_files: &[String],
    conventions: &ImportConventions,
) -> Option<String> {
    let mut base = importer_dir(importer_path);
    // level=1 means "same directory" (a single leading dot); each additional
    // dot climbs one more directory.
    for _ in 1..import.relative_level {
        base.pop();
    }
    let mut candidate_parts = base;
    candidate_parts.extend(module_segments(&import.module, conventions.separator));
    let candidate_base = candidate_parts.join("/");

    try_candidate_base(&candidate_base, corpus_files, conventions)
}

fn resolve_absolute(
    import: &ParsedImport,
    corpus_files: &[String],
    conventions: &ImportConventions,
) -> Option<String> {
    let segments = module_segments(&import.module, conventions.separator);
    if segments.is_empty() {
        return None;
    }

    // Strategy 1: direct filename stem match.
    let last = segments.last().unwrap();
    if let Some(found) = corpus_files.iter().find(|f| file_stem(f) == *last) {
        return Some(found.clone());
    }

    // Strategy 2: full dotted path -> slash path substring match.
    let full_path = segments.join("/");
    if let Some(found) = corpus_files.iter().find(|f| f.contains(&full_path)) {
        return Some(found.clone());
    }

    // Strategy 3: last-two-segments path match.
    if segments.len() >= 2 {
        let last_two = segments[segments.len() - 2..].join("/");
        if let Some(found) = corpus_files.iter().find(|f| f.contains(&last_two)) {
            return Some(found.clone());
        }
    }

    // Strategy 4: package-init match.
    try_candidate_base(&full_path, corpus_files, conventions)
}

fn try_candidate_base(
    candidate_base: &str,
    corpus_files: &[String],
    conventions: &ImportConventions,
) -> Option<String> {
    for ext in conventions.extensions {
        let candidate = format!("{candidate_base}.{ext}");
        if let Some(found) = corpus_files.iter().find(|f| f.ends_with(&candidate)) {
            return Some(found.clone());
        }
    }
    for ext in conventions.extensions {
        let candidate = format!("{candidate_base}/{}.{ext}", conventions.package_init);
        if let Some(found) = corpus_files.iter().find(|f| f.ends_with(&candidate)) {
            return Some(found.clone());
        }
    }
    None
}

fn file_stem(path: &str) -> &str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name.split('.').next().unwrap_or(file_name)
}

/// Best-effort call-graph detection: scans raw text for bareword-call and
/// dotted-call patterns, emitting an edge when the callee name matches a
/// known function/method entity. Self-edges are suppressed unless the body
/// references its own name past the definition line (heuristic recursion).
pub fn detect_calls(entities: &[Entity]) -> Vec<(String, String)> {
    let callable: HashMap<&str, &str> = entities
        .iter()
        .filter(|e| e.kind.is_callable_or_type() && e.kind != EntityKind::Class)
        .map(|e| (e.name.as_str(), e.id.as_str()))
        .collect();

    let mut edges = Vec::new();
    for caller in entities {
        if !caller.kind.is_callable_or_type() || caller.kind == EntityKind::Class {
            continue;
        }
        let body = caller.raw_text.as_str();
        let header_end = caller.signature.as_ref().map(String::len).unwrap_or(0);
        let body_after_header = body.get(header_end.min(body.len())..).unwrap_or("");

        for (&name, &callee_id) in &callable {
            if name == caller.name {
                // heuristic recursion: only count if the name reappears after
                // the definition line.
                if body_after_header.contains(&format!("{name}(")) {
                    edges.push((caller.id.clone(), callee_id.to_string()));
                }
                continue;
            }
            let bareword = format!("{name}(");
            let dotted = format!(".{name}(");
            if body.contains(&bareword) || body.contains(&dotted) {
                edges.push((caller.id.clone(), callee_id.to_string()));
            }
        }
    }
    edges
}

/// Availability and diagnostic state for one language adapter, registered
/// once at construction and read many times (observability, skip logic).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterStatus {
    pub language: String,
    pub available: bool,
    pub features_supported: Vec<String>,
    pub initialization_error: Option<String>,
}

impl AdapterStatus {
    pub fn available(language: impl Into<String>, features: Vec<String>) -> Self {
        Self {
            language: language.into(),
            available: true,
            features_supported: features,
            initialization_error: None,
        }
    }

    pub fn unavailable(language: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            available: false,
            features_supported: Vec::new(),
            initialization_error: Some(error.into()),
        }
    }
}

/// Process-wide, init-once/read-many registry of adapter availability.
/// `DashMap` gives concurrent adapters lock-free reads/writes on distinct
/// language keys, matching the teacher's use of `DashMap` for its own
/// concurrent per-entity/per-detector maps.
pub static ADAPTER_REGISTRY: Lazy<DashMap<String, AdapterStatus>> = Lazy::new(DashMap::new);

/// Register (or overwrite) a language's adapter status.
pub fn register_adapter_status(status: AdapterStatus) {
    ADAPTER_REGISTRY.insert(status.language.clone(), status);
}

/// Snapshot of every registered adapter's status, sorted by language tag.
pub fn adapter_statuses() -> Vec<AdapterStatus> {
    let mut statuses: Vec<AdapterStatus> = ADAPTER_REGISTRY.iter().map(|entry| entry.value().clone()).collect();
    statuses.sort_by(|a, b| a.language.cmp(&b.language));
    statuses
}

/// The contract every language adapter implements (spec §4.2).
pub trait LanguageAdapter: Send + Sync {
    /// Canonical language tag, e.g. `python`.
    fn language(&self) -> &str;

    /// File extensions (without leading dot) this adapter claims.
    fn file_extensions(&self) -> &[&str];

    /// Parse a batch of files belonging to this language into a
    /// [`PartialParseIndex`]. Per-file parse failures are recorded as
    /// diagnostics and skipped; the rest of the batch completes.
    fn parse_index(
        &self,
        files: &[String],
        corpus_files: &[String],
        diagnostics: &mut DiagnosticSink,
    ) -> Result<PartialParseIndex>;
}
