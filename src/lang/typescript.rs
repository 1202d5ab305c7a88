//! TypeScript language adapter.

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
    NodeRule { node_kind: "class_declaration", entity_kind: EntityKind::Class },
    NodeRule { node_kind: "interface_declaration", entity_kind: EntityKind::Interface },
    NodeRule { node_kind: "method_definition", entity_kind: EntityKind::Method },
    NodeRule { node_kind: "function_declaration", entity_kind: EntityKind::Function },
];

const CONVENTIONS: ImportConventions = ImportConventions {
    extensions: &["ts", "tsx"],
    package_init: "index",
    separator: '/',
};

/// Tree-sitter-backed adapter for `.ts`/`.tsx` sources.
pub struct TypeScriptAdapter;

impl TypeScriptAdapter {
    pub fn new() -> Self {
        register_adapter_status(AdapterStatus::available(
            "typescript",
            vec!["classes".into(), "interfaces".into(), "functions".into(), "imports".into()],
        ));
        Self
    }
}

impl Default for TypeScriptAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one `import_statement` node's text into zero or one
/// [`ParsedImport`] value (same specifier-quoting convention as JavaScript).
fn parse_import_text(text: &str) -> Option<ParsedImport> {
    let quote_start = text.find(['"', '\''])?;
    let quote_char = text.as_bytes()[quote_start] as char;
    let rest = &text[quote_start + 1..];
    let quote_end = rest.find(quote_char)?;
    let specifier = &rest[..quote_end];

    let dots = specifier.chars().take_while(|c| *c == '.').count();
    if dots > 0 {
        let level = if specifier.starts_with("./") { 1 } else { dots.max(1) };
        let trimmed = specifier.trim_start_matches(|c| c == '.' || c == '/');
        Some(ParsedImport { module: trimmed.to_string(), relative_level: level })
    } else {
        Some(ParsedImport { module: specifier.to_string(), relative_level: 0 })
    }
}

impl LanguageAdapter for TypeScriptAdapter {
    fn language(&self) -> &str {
        "typescript"
    }

    fn file_extensions(&self) -> &[&str] {
        &["ts", "tsx"]
    }

    fn parse_index(
        &self,
        files: &[String],
        corpus_files: &[String],
        diagnostics: &mut DiagnosticSink,
    ) -> Result<PartialParseIndex> {
        let mut partial = PartialParseIndex::default();
        let mut parser = Parser::new();
        let language: tree_sitter::Language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into();
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
                language: "typescript",
                file_path: file,
                source: source.as_bytes(),
                rules: RULES,
                name_field: "name",
                params_field: "parameters",
            };
            let mut entities = walker.walk(&tree);

            let import_texts =
                top_level_import_texts(tree.root_node(), source.as_bytes(), &["import_statement"]);
            let imports: Vec<ParsedImport> =
                import_texts.iter().filter_map(|text| parse_import_text(text)).collect();

            let file_id = entities[0].id.clone();
            for import in &imports {
                entities[0].imports.push(import.module.clone());
                if let Some(resolved) = resolve_import(file, import, corpus_files, &CONVENTIONS) {
                    let resolved_id = crate::core::entity::Entity::make_id("typescript", &resolved, None);
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
    fn parses_relative_import() {
        let parsed = parse_import_text("import { Helper } from './util/helper';").unwrap();
        assert_eq!(parsed.module, "util/helper");
        assert_eq!(parsed.relative_level, 1);
    }

    #[test]
    fn parses_package_import() {
        let parsed = parse_import_text("import express from 'express';").unwrap();
        assert_eq!(parsed.module, "express");
        assert_eq!(parsed.relative_level, 0);
    }
}
