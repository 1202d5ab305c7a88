//! Coverage-improvement packs (spec §4.7): segments of consecutive
//! uncovered lines, grouped by enclosing entity and then by file.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::entity::{Entity, EntityKind, SourceLocation};
use crate::core::inputs::CoverageReport;
use crate::core::parse_index::ParseIndex;
use crate::packs::{ImpactPack, PackKind, PackPayload};

const MIN_SEGMENT_SIZE: usize = 3;
const PRIORITY_THRESHOLD: f64 = 0.3;

/// One uncovered segment's extracted context, ready for a report renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageSegment {
    pub start_line: usize,
    pub end_line: usize,
    pub entity_id: Option<String>,
    pub entity_name: Option<String>,
    pub context_lines: Vec<(usize, String)>,
    pub complexity_hints: Vec<String>,
    pub priority: f64,
}

/// Kind-specific payload for a coverage-improvement pack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoveragePayload {
    pub file_path: String,
    pub segments: Vec<CoverageSegment>,
}

fn complexity_hints_for_line(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let mut hints = Vec::new();
    if trimmed.starts_with("if ") || trimmed.starts_with("if(") || trimmed.contains(" if ") {
        hints.push("conditional".to_string());
    }
    if trimmed.starts_with("except") || trimmed.starts_with("catch") || trimmed.contains("rescue") {
        hints.push("exception handler".to_string());
    }
    if trimmed.starts_with("def ") || trimmed.starts_with("fn ") || trimmed.starts_with("function ")
        || trimmed.starts_with("func ") || trimmed.starts_with("class ")
    {
        hints.push("definition".to_string());
    }
    if trimmed.starts_with("for ") || trimmed.starts_with("while ") || trimmed.starts_with("return ") {
        hints.push("control flow".to_string());
    }
    if trimmed.contains("&&") || trimmed.contains("||") || trimmed.contains(" and ") || trimmed.contains(" or ") {
        hints.push("logical operation".to_string());
    }
    hints
}

fn enclosing_entity<'a>(index: &'a ParseIndex, file_path: &str, start: usize, end: usize) -> Option<&'a Entity> {
    let span = SourceLocation { file_path: file_path.to_string(), start_line: start, end_line: end, start_column: 1, end_column: 1 };
    index
        .by_file(file_path)
        .iter()
        .filter_map(|id| index.entity(id))
        .filter(|e| matches!(e.kind, EntityKind::Function | EntityKind::Method | EntityKind::Class) && e.location.contains(&span))
        .min_by_key(|e| e.loc())
}

fn extract_context(lines: &[&str], start: usize, end: usize) -> Vec<(usize, String)> {
    let mut context = Vec::new();
    let first = start;
    context.push((first, lines.get(first - 1).copied().unwrap_or("").to_string()));
    if end - start + 1 >= 5 {
        let middle = (start + end) / 2;
        context.push((middle, lines.get(middle - 1).copied().unwrap_or("").to_string()));
    }
    if end != start {
        context.push((end, lines.get(end - 1).copied().unwrap_or("").to_string()));
    }
    context.truncate(5);
    context
}

fn segment_priority(size: usize, entity: Option<&Entity>, hint_count: usize) -> f64 {
    let size_term = 0.4 * (size as f64 / 20.0).min(1.0);
    let is_function = entity.map(|e| matches!(e.kind, EntityKind::Function | EntityKind::Method)).unwrap_or(false);
    let is_class = entity.map(|e| e.kind == EntityKind::Class).unwrap_or(false);
    let function_term = 0.3 * if is_function { 1.0 } else { 0.0 };
    let class_term = 0.2 * if is_class { 1.0 } else { 0.0 };
    let hint_term = 0.3 * (hint_count as f64 / 10.0).min(1.0);
    let is_public = entity.map(|e| !e.name.starts_with('_')).unwrap_or(true);
    let public_term = 0.1 * if is_public { 1.0 } else { 0.0 };
    size_term + function_term + class_term + hint_term + public_term
}

/// Build one coverage pack per file with at least one high-priority segment.
pub fn build_coverage_packs(index: &ParseIndex, report: &CoverageReport) -> Vec<ImpactPack> {
    let mut packs = Vec::new();

    let mut file_paths: Vec<&String> = report.files.keys().collect();
    file_paths.sort();

    for file_path in file_paths {
        let Ok(source) = std::fs::read_to_string(file_path) else {
            continue;
        };
        let lines: Vec<&str> = source.lines().collect();

        let mut segments = Vec::new();
        for (start, end) in report.segments(file_path, MIN_SEGMENT_SIZE) {
            let entity = enclosing_entity(index, file_path, start, end);
            let segment_lines = &lines[(start.saturating_sub(1)).min(lines.len())..end.min(lines.len())];
            let hints: Vec<String> = segment_lines.iter().flat_map(|l| complexity_hints_for_line(l)).collect();
            let priority = segment_priority(end - start + 1, entity, hints.len());

            segments.push(CoverageSegment {
                start_line: start,
                end_line: end,
                entity_id: entity.map(|e| e.id.clone()),
                entity_name: entity.map(|e| e.name.clone()),
                context_lines: extract_context(&lines, start, end),
                complexity_hints: hints,
                priority,
            });
        }

        let high_priority: Vec<CoverageSegment> =
            segments.into_iter().filter(|s| s.priority >= PRIORITY_THRESHOLD).collect();
        if high_priority.is_empty() {
            continue;
        }

        let uncovered_lines: usize = high_priority.iter().map(|s| s.end_line - s.start_line + 1).sum();
        let coverage_gain = report.files.get(file_path).map(|f| {
            100.0 - f.coverage_percentage
        }).unwrap_or(0.0);

        let mut value = HashMap::new();
        value.insert("coverage_gain".to_string(), coverage_gain);
        value.insert("lines_to_cover".to_string(), uncovered_lines as f64);

        let mut effort = HashMap::new();
        effort.insert("loc_touched".to_string(), 2.0 * uncovered_lines as f64);

        let involved_entities: Vec<String> = high_priority.iter().filter_map(|s| s.entity_id.clone()).collect();
        let steps: Vec<String> = high_priority
            .iter()
            .map(|s| {
                format!(
                    "Add tests covering lines {}-{}{}",
                    s.start_line,
                    s.end_line,
                    s.entity_name.as_ref().map(|n| format!(" in {n}")).unwrap_or_default()
                )
            })
            .collect();

        packs.push(ImpactPack {
            id: format!("coverage-{file_path}"),
            kind: PackKind::CoverageImprovement,
            value,
            effort,
            steps,
            explanations: vec![format!(
                "{} uncovered segments in {file_path} totalling {uncovered_lines} lines",
                high_priority.len()
            )],
            involved_entities,
            payload: PackPayload::Coverage(CoveragePayload { file_path: file_path.clone(), segments: high_priority }),
        });
    }

    packs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::{Entity, EntityKind};
    use crate::core::inputs::FileCoverage;
    use crate::core::parse_index::{ParseIndexBuilder, PartialParseIndex};
    use std::collections::HashMap as StdHashMap;
    use tempfile::NamedTempFile;
    use std::io::Write;

    #[test]
    fn two_segments_in_one_function_yield_one_pack_with_two_segments() {
        let mut file = NamedTempFile::new().unwrap();
        for i in 1..=80 {
            writeln!(file, "line {i} if condition and other:").unwrap();
        }
        let path = file.path().to_string_lossy().to_string();

        let foo = Entity {
            id: "python://x.py::foo".into(),
            name: "foo".into(),
            kind: EntityKind::Function,
            location: crate::core::entity::SourceLocation { file_path: path.clone(), start_line: 45, end_line: 80, start_column: 1, end_column: 1 },
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
        };
        let mut builder = ParseIndexBuilder::new();
        builder.merge(PartialParseIndex { entities: vec![foo], import_edges: vec![], call_edges: vec![] });
        let index = builder.build();

        let mut report = CoverageReport::default();
        report.files.insert(
            path.clone(),
            FileCoverage {
                uncovered_lines: (50..=60).chain(70..=75).collect(),
                total_lines: 80,
                covered_lines: 63,
                coverage_percentage: 78.75,
            },
        );

        let packs = build_coverage_packs(&index, &report);
        assert_eq!(packs.len(), 1);
        let PackPayload::Coverage(payload) = &packs[0].payload else { panic!("wrong payload") };
        assert_eq!(payload.segments.len(), 2);
        assert!(payload.segments.iter().all(|s| s.entity_name.as_deref() == Some("foo")));
        assert!(packs[0].effort["loc_touched"] >= 34.0);
    }
}
