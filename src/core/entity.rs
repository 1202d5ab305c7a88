//! The uniform entity model shared by every language adapter.
//!
//! Entities never hold direct references to each other — parent/child links
//! are ids, resolved through the owning [`crate::core::parse_index::ParseIndex`].
//! This keeps ownership simple (no interior pointers, no reference counting
//! cycles) at the cost of a hash lookup per traversal step.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The closed set of entity kinds the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    File,
    Module,
    Class,
    Method,
    Function,
    Property,
    Variable,
    Interface,
    Enum,
    Struct,
    Trait,
}

impl EntityKind {
    /// Stable lowercase tag, used in identifiers and reports.
    pub fn tag(self) -> &'static str {
        match self {
            EntityKind::File => "file",
            EntityKind::Module => "module",
            EntityKind::Class => "class",
            EntityKind::Method => "method",
            EntityKind::Function => "function",
            EntityKind::Property => "property",
            EntityKind::Variable => "variable",
            EntityKind::Interface => "interface",
            EntityKind::Enum => "enum",
            EntityKind::Struct => "struct",
            EntityKind::Trait => "trait",
        }
    }

    /// Fallback name for an anonymous/unnamed node of this kind.
    pub fn fallback_name(self, counter: usize) -> String {
        format!("anonymous_{}_{}", self.tag(), counter)
    }

    /// Kinds the complexity/refactoring extractors operate over.
    pub fn is_callable_or_type(self) -> bool {
        matches!(
            self,
            EntityKind::Function | EntityKind::Method | EntityKind::Class
        )
    }
}

/// A 1-based, inclusive source span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Path relative to the analysis root.
    pub file_path: String,
    /// First line, inclusive, 1-based.
    pub start_line: usize,
    /// Last line, inclusive, 1-based.
    pub end_line: usize,
    /// First column, inclusive, 1-based.
    pub start_column: usize,
    /// Last column, inclusive, 1-based.
    pub end_column: usize,
}

impl SourceLocation {
    /// Build a location from 0-based tree-sitter row/column pairs.
    pub fn from_positions(
        file_path: impl Into<String>,
        start_row: usize,
        start_col: usize,
        end_row: usize,
        end_col: usize,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            start_line: start_row + 1,
            end_line: end_row + 1,
            start_column: start_col + 1,
            end_column: end_col + 1,
        }
    }

    /// Number of lines the span covers (inclusive).
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Whether `self` fully contains `other` (same file, bounds dominate).
    pub fn contains(&self, other: &SourceLocation) -> bool {
        if self.file_path != other.file_path {
            return false;
        }
        let start_ok = (self.start_line, self.start_column) <= (other.start_line, other.start_column);
        let end_ok = (self.end_line, self.end_column) >= (other.end_line, other.end_column);
        start_ok && end_ok
    }

    /// Whether `line` falls within `[start_line, end_line]`.
    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }
}

/// A single code unit: file, class, function, etc.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Globally unique id: `<language>://<file-path>::<qualified-name>`.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Kind drawn from the closed [`EntityKind`] set.
    pub kind: EntityKind,
    /// Source location.
    pub location: SourceLocation,
    /// Originating language tag (e.g. `python`, `typescript`).
    pub language: String,
    /// Parent entity id, if any. File entities have none.
    pub parent: Option<String>,
    /// Child entity ids, in source order.
    pub children: Vec<String>,
    /// Raw source text spanning `location`.
    pub raw_text: String,
    /// Textual signature (e.g. `def foo(a, b):`), if extractable.
    pub signature: Option<String>,
    /// Docstring/doc-comment text, if present.
    pub docstring: Option<String>,
    /// Parameter names, in declaration order.
    pub parameters: Vec<String>,
    /// Declared return type, if the language surfaces one.
    pub return_type: Option<String>,
    /// Field/member names, for class-like entities.
    pub fields: Vec<String>,
    /// Raw import specifiers found within this entity (file entities only, typically).
    pub imports: Vec<String>,
    /// Extracted numeric metrics. Populated by feature extractors; each
    /// extractor writes only the keys it owns.
    pub metrics: HashMap<String, f64>,
}

impl Entity {
    /// Build the normative identifier for an entity.
    ///
    /// File entities omit the `::<qualified-name>` suffix.
    pub fn make_id(language: &str, file_path: &str, qualified_name: Option<&str>) -> String {
        match qualified_name {
            Some(name) if !name.is_empty() => format!("{language}://{file_path}::{name}"),
            _ => format!("{language}://{file_path}"),
        }
    }

    /// Lines of code for this entity (`end_line - start_line + 1`).
    pub fn loc(&self) -> usize {
        self.location.line_count()
    }

    /// Whether this entity is the topmost entity of a file (no parent).
    pub fn is_file(&self) -> bool {
        self.kind == EntityKind::File && self.parent.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_entity_omits_qualified_name_suffix() {
        let id = Entity::make_id("python", "a/b.py", None);
        assert_eq!(id, "python://a/b.py");
    }

    #[test]
    fn entity_with_qualified_name_includes_suffix() {
        let id = Entity::make_id("python", "a/b.py", Some("Foo.bar"));
        assert_eq!(id, "python://a/b.py::Foo.bar");
    }

    #[test]
    fn containment_respects_file_and_bounds() {
        let outer = SourceLocation {
            file_path: "a.py".into(),
            start_line: 1,
            end_line: 100,
            start_column: 1,
            end_column: 1,
        };
        let inner = SourceLocation {
            file_path: "a.py".into(),
            start_line: 10,
            end_line: 20,
            start_column: 1,
            end_column: 1,
        };
        let other_file = SourceLocation {
            file_path: "b.py".into(),
            ..inner.clone()
        };
        assert!(outer.contains(&inner));
        assert!(!outer.contains(&other_file));
        assert!(!inner.contains(&outer));
    }

    #[test]
    fn line_count_is_inclusive() {
        let loc = SourceLocation {
            file_path: "a.py".into(),
            start_line: 10,
            end_line: 10,
            start_column: 1,
            end_column: 5,
        };
        assert_eq!(loc.line_count(), 1);
    }
}
