//! Python language adapter.

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
    NodeRule { node_kind: "class_definition", entity_kind: EntityKind::Class },
    NodeRule { node_kind: "function_definition", entity_kind: EntityKind::Function },
];

const CONVENTIONS: ImportConventions = ImportConventions {
    extensions: &["py"],
    package_init: "__init__",
    separator: '.',
};

/// Tree-sitter-backed adapter for `.py` sources.
pub struct PythonAdapter;

impl PythonAdapter {
    pub fn new() -> Self {
        register_adapter_status(AdapterStatus::available(
            "python",
            vec!["classes".into(), "functions".into(), "imports".into()],
        ));
        Self
    }
}

impl Default for PythonAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one `import_statement` or `import_from_statement` node's text into
/// zero or more [`ParsedImport`] values.
fn parse_import_text(text: &str) -> Vec<ParsedImport> {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix("from ") {
        let Some((module_part, _names)) = rest.split_once(" import") else {
            return Vec::new();
        };
        let module_part = module_part.trim();
        let dots = module_part.chars().take_while(|c| *c == '.').count();
        let module = module_part.trim_start_matches('.').to_string();
        vec![ParsedImport { module, relative_level: dots }]
    } else if let Some(rest) = text.strip_prefix("import ") {
        rest.split(',')
            .map(|part| {
                let module = part.split(" as ").next().unwrap_or(part).trim().to_string();
                ParsedImport { module, relative_level: 0 }
            })
            .filter(|p| !p.module.is_empty())
            .collect()
    } else {
        Vec::new()
    }
}

impl LanguageAdapter for PythonAdapter {
    fn language(&self) -> &str {
        "python"
    }

    fn file_extensions(&self) -> &[&str] {
        &["py"]
    }

    fn parse_index(
        &self,
        files: &[String],
        corpus_files: &[String],
        diagnostics: &mut DiagnosticSink,
    ) -> Result<PartialParseIndex> {
        let mut partial = PartialParseIndex::default();
        let mut parser = Parser::new();
        let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
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
                language: "python",
                file_path: file,
                source: source.as_bytes(),
                rules: RULES,
                name_field: "name",
                params_field: "parameters",
            };
            let mut entities = walker.walk(&tree);

            let import_texts = top_level_import_texts(
                tree.root_node(),
                source.as_bytes(),
                &["import_statement", "import_from_statement"],
            );
            let imports: Vec<ParsedImport> =
                import_texts.iter().flat_map(|text| parse_import_text(text)).collect();

            let file_id = entities[0].id.clone();
            for import in &imports {
                entities[0].imports.push(import.module.clone());
                if let Some(resolved) = resolve_import(file, import, corpus_files, &CONVENTIONS) {
                    let resolved_id = crate::core::entity::Entity::make_id("python", &resolved, None);
                    partial.import_edges.push((file_id.clone(), resolved_id));
                }
            }

            partial.call_edges.extend(detect_calls(&entities));
            partial.entities.extend(entities);
        }

        Ok(partial)
    }
}
