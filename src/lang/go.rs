//! Go language adapter.

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
    NodeRule { node_kind: "type_declaration", entity_kind: EntityKind::Struct },
    NodeRule { node_kind: "method_declaration", entity_kind: EntityKind::Method },
    NodeRule { node_kind: "function_declaration", entity_kind: EntityKind::Function },
];

const CONVENTIONS: ImportConventions = ImportConventions {
    extensions: &["go"],
    package_init: "doc",
    separator: '/',
};

/// Tree-sitter-backed adapter for `.go` sources.
///
/// Go has no relative imports (every import is an absolute module path), so
/// every parsed import carries `relative_level: 0`; the shared resolver's
/// relative branch is simply never taken for this language.
pub struct GoAdapter;

impl GoAdapter {
    pub fn new() -> Self {
        register_adapter_status(AdapterStatus::available(
            "go",
            vec!["structs".into(), "functions".into(), "methods".into(), "imports".into()],
        ));
        Self
    }
}

impl Default for GoAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one `import_declaration` node's text into zero or more
/// [`ParsedImport`] values, handling both the single-spec (`import "fmt"`)
/// and grouped (`import (\n\t"fmt"\n\t"os"\n)`) forms.
fn parse_import_text(text: &str) -> Vec<ParsedImport> {
    let Some(rest) = text.trim().strip_prefix("import") else {
        return Vec::new();
    };
    let rest = rest.trim();
    let body = rest.strip_prefix('(').and_then(|r| r.strip_suffix(')')).unwrap_or(rest);

    body.lines()
        .filter_map(|line| {
            let line = line.trim();
            // Drop an optional local alias (e.g. `f "fmt"`) by keeping only
            // the quoted segment.
            let start = line.find('"')?;
            let rest = &line[start + 1..];
            let end = rest.find('"')?;
            let module = rest[..end].to_string();
            if module.is_empty() {
                None
            } else {
                Some(ParsedImport { module, relative_level: 0 })
            }
        })
        .collect()
}

impl LanguageAdapter for GoAdapter {
    fn language(&self) -> &str {
        "go"
    }

    fn file_extensions(&self) -> &[&str] {
        &["go"]
    }

    fn parse_index(
        &self,
        files: &[String],
        corpus_files: &[String],
        diagnostics: &mut DiagnosticSink,
    ) -> Result<PartialParseIndex> {
        let mut partial = PartialParseIndex::default();
        let mut parser = Parser::new();
        let language: tree_sitter::Language = tree_sitter_go::LANGUAGE.into();
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
                language: "go",
                file_path: file,
                source: source.as_bytes(),
                rules: RULES,
                name_field: "name",
                params_field: "parameters",
            };
            let mut entities = walker.walk(&tree);

            let import_texts =
                top_level_import_texts(tree.root_node(), source.as_bytes(), &["import_declaration"]);
            let imports: Vec<ParsedImport> =
                import_texts.iter().flat_map(|text| parse_import_text(text)).collect();

            let file_id = entities[0].id.clone();
            for import in &imports {
                entities[0].imports.push(import.module.clone());
                if let Some(resolved) = resolve_import(file, import, corpus_files, &CONVENTIONS) {
                    let resolved_id = crate::core::entity::Entity::make_id("go", &resolved, None);
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
    fn parses_single_import() {
        let parsed = parse_import_text("import \"fmt\"");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].module, "fmt");
        assert_eq!(parsed[0].relative_level, 0);
    }

    #[test]
    fn parses_grouped_imports() {
        let parsed = parse_import_text("import (\n\t\"fmt\"\n\t\"os\"\n)");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].module, "fmt");
        assert_eq!(parsed[1].module, "os");
    }

    #[test]
    fn parses_aliased_import() {
        let parsed = parse_import_text("import (\n\tf \"fmt\"\n)");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].module, "fmt");
    }
}
