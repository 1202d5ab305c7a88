//! Rust language adapter.

use tree_sitter::Parser;

use crate::core::diagnostics::DiagnosticSink;
use crate::core::entity::EntityKind;
use crate::core::errors::Result;
use crate::core::parse_index::PartialParseIndex;

use super::common::{
    detect_calls, register_adapter_status, resolve_import, top_level_import_texts, AdapterStatus,
    EntityWalker, ImportConventions, LanguageAdapter, NodeRule, ParsedImport,
};

const RULES: &[NodeRule] = &[
    NodeRule { node_kind: "mod_item", entity_kind: EntityKind::Module },
    NodeRule { node_kind: "struct_item", entity_kind: EntityKind::Struct },
    NodeRule { node_kind: "enum_item", entity_kind: EntityKind::Enum },
    NodeRule { node_kind: "trait_item", entity_kind: EntityKind::Trait },
    NodeRule { node_kind: "function_item", entity_kind: EntityKind::Function },
];

const CONVENTIONS: ImportConventions = ImportConventions {
    extensions: &["rs"],
    package_init: "mod",
    separator: '/',
};

/// Tree-sitter-backed adapter for `.rs` sources.
pub struct RustAdapter;

impl RustAdapter {
    pub fn new() -> Self {
        register_adapter_status(AdapterStatus::available(
            "rust",
            vec!["structs".into(), "enums".into(), "traits".into(), "functions".into(), "imports".into()],
        ));
        Self
    }
}

impl Default for RustAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one `use_declaration` node's text into zero or more [`ParsedImport`]
/// values. `::` is normalized to `/` so the shared resolver's single-char
/// separator convention applies; `crate::`/`self::`/`super::` prefixes map to
/// the relative/absolute distinction the resolver expects.
fn parse_import_text(text: &str) -> Vec<ParsedImport> {
    let Some(rest) = text.trim().strip_prefix("use ") else {
        return Vec::new();
    };
    let rest = rest.trim_end_matches(';').trim();
    // Drop brace groups (`use a::b::{c, d};`) down to the common prefix;
    // a full fan-out over grouped imports is not attempted.
    let path = rest.split('{').next().unwrap_or(rest).trim_end_matches("::").trim();
    let path = path.split(" as ").next().unwrap_or(path).trim();
    if path.is_empty() {
        return Vec::new();
    }

    let (relative_level, module) = if let Some(stripped) = path.strip_prefix("crate::") {
        (0, stripped.to_string())
    } else if let Some(stripped) = path.strip_prefix("self::") {
        (1, stripped.to_string())
    } else {
        let mut level = 0usize;
        let mut remaining = path;
        while let Some(stripped) = remaining.strip_prefix("super::") {
            level += 1;
            remaining = stripped;
        }
        if level > 0 {
            (level, remaining.to_string())
        } else {
            (0, path.to_string())
        }
    };

    vec![ParsedImport { module: module.replace("::", "/"), relative_level }]
}

impl LanguageAdapter for RustAdapter {
    fn language(&self) -> &str {
        "rust"
    }

    fn file_extensions(&self) -> &[&str] {
        &["rs"]
    }

    fn parse_index(
        &self,
        files: &[String],
        corpus_files: &[String],
        diagnostics: &mut DiagnosticSink,
    ) -> Result<PartialParseIndex> {
        let mut partial = PartialParseIndex::default();
        let mut parser = Parser::new();
        let language: tree_sitter::Language = tree_sitter_rust::LANGUAGE.into();
        parser
            .set_language(&language)
            .map_err(|err| crate::core::errors::CoreError::config(err.to_string()))?;

        for file in files {
            let source = match std::fs::read_to_string(file) {
                Ok(source) => source,
                Err(err) => {
                    diagnostics.error(format!("failed to read {file}: {err}"), Some(file.clone()));
                    continue;
                }
            };
            let Some(tree) = parser.parse(&source, None) else {
                diagnostics.error(format!("tree-sitter failed to parse {file}"), Some(file.clone()));
                continue;
            };

            let walker = EntityWalker {
                language: "rust",
                file_path: file,
                source: source.as_bytes(),
                rules: RULES,
                name_field: "name",
                params_field: "parameters",
            };
            let mut entities = walker.walk(&tree);

            let import_texts =
                top_level_import_texts(tree.root_node(), source.as_bytes(), &["use_declaration"]);
            let imports: Vec<ParsedImport> =
                import_texts.iter().flat_map(|text| parse_import_text(text)).collect();

            let file_id = entities[0].id.clone();
            for import in &imports {
                entities[0].imports.push(import.module.clone());
                if let Some(resolved) = resolve_import(file, import, corpus_files, &CONVENTIONS) {
                    let resolved_id = crate::core::entity::Entity::make_id("rust", &resolved, None);
                    partial.import_edges.push((file_id.clone(), resolved_id));
                }
            }

            partial.call_edges.extend(detect_calls(&entities));
            partial.entities.extend(entities);
        }

        Ok(partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_crate_relative_import() {
        let parsed = parse_import_text("use crate::core::entity::Entity;");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].module, "core/entity/Entity");
        assert_eq!(parsed[0].relative_level, 0);
    }

    #[test]
    fn parses_super_import() {
        let parsed = parse_import_text("use super::common::LanguageAdapter;");
        assert_eq!(parsed[0].relative_level, 1);
        assert_eq!(parsed[0].module, "common/LanguageAdapter");
    }

    #[test]
    fn strips_grouped_import_braces() {
        let parsed = parse_import_text("use std::collections::{HashMap, HashSet};");
        assert_eq!(parsed[0].module, "std/collections");
    }
}
