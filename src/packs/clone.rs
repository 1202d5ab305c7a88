//! Clone-consolidation packs (spec §4.7).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::inputs::CloneGroup;
use crate::core::parse_index::ParseIndex;
use crate::packs::{ImpactPack, PackKind, PackPayload};

/// Per-language filename/symbol convention for an extracted clone template.
fn language_convention(language: &str) -> (&'static str, &'static str) {
    match language {
        "python" => ("shared.py", "snake_case"),
        "javascript" => ("shared.js", "camelCase"),
        "typescript" => ("shared.ts", "camelCase"),
        "rust" => ("shared.rs", "snake_case"),
        "go" => ("shared.go", "PascalCase"),
        _ => ("shared.txt", "snake_case"),
    }
}

/// Kind-specific payload for a clone-consolidation pack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClonePayload {
    pub medoid_entity_id: Option<String>,
    pub member_count: usize,
    pub template_parameters: Vec<String>,
    pub optional_blocks: Vec<String>,
    pub target_path: String,
    pub target_symbol: String,
}

/// Naive token-level diff: count positions where whitespace-split tokens
/// differ between two texts, capped at `max_parameters`. A concrete
/// token-diff algorithm for optional-block extraction is not implemented
/// (spec §9 Open Question c) — `optional_blocks` is always empty.
fn estimate_parameters(medoid_text: &str, other_text: &str, max_parameters: usize) -> Vec<String> {
    let medoid_tokens: Vec<&str> = medoid_text.split_whitespace().collect();
    let other_tokens: Vec<&str> = other_text.split_whitespace().collect();
    let shared_len = medoid_tokens.len().min(other_tokens.len());

    let mut params = Vec::new();
    for i in 0..shared_len {
        if medoid_tokens[i] != other_tokens[i] {
            params.push(format!("param_{}", params.len() + 1));
            if params.len() >= max_parameters {
                break;
            }
        }
    }
    params
}

/// Nearest common ancestor directory of a set of `/`-separated paths.
fn common_ancestor_dir(paths: &[String]) -> String {
    let split: Vec<Vec<&str>> = paths.iter().map(|p| p.split('/').collect()).collect();
    let Some(first) = split.first() else {
        return String::new();
    };
    let mut common = Vec::new();
    'outer: for i in 0..first.len().saturating_sub(1) {
        let segment = first[i];
        for other in &split[1..] {
            if other.get(i) != Some(&segment) {
                break 'outer;
            }
        }
        common.push(segment);
    }
    common.join("/")
}

/// Build one pack per clone group surviving the similarity/total-loc filter.
pub fn build_clone_packs(
    index: &ParseIndex,
    groups: &[CloneGroup],
    min_similarity: f64,
    min_total_loc: usize,
    max_parameters: usize,
) -> Vec<ImpactPack> {
    let mut packs = Vec::new();

    for group in groups {
        if !group.all_meet_similarity(min_similarity) {
            continue;
        }
        if group.total_lines() < min_total_loc {
            continue;
        }
        if group.members.len() < 2 {
            continue;
        }

        // Medoid: the member whose own similarity score (our stand-in for
        // "summed similarity to all others", since the input carries one
        // scalar per member rather than a full pairwise matrix — see
        // DESIGN.md) is highest.
        let medoid = group
            .members
            .iter()
            .max_by(|a, b| a.similarity.partial_cmp(&b.similarity).unwrap_or(std::cmp::Ordering::Equal))
            .expect("non-empty, checked above");

        let medoid_entity = medoid
            .entity_id
            .as_ref()
            .and_then(|id| index.entity(id))
            .or_else(|| {
                index
                    .entities()
                    .find(|e| e.location.file_path == medoid.path && e.location.contains_line(medoid.line_bounds().0))
            });

        let medoid_text = medoid_entity.map(|e| e.raw_text.as_str()).unwrap_or("");

        let mut parameters = Vec::new();
        for member in &group.members {
            if std::ptr::eq(member, medoid) {
                continue;
            }
            let member_entity = member
                .entity_id
                .as_ref()
                .and_then(|id| index.entity(id))
                .or_else(|| {
                    index.entities().find(|e| {
                        e.location.file_path == member.path && e.location.contains_line(member.line_bounds().0)
                    })
                });
            let member_text = member_entity.map(|e| e.raw_text.as_str()).unwrap_or("");
            let diff = estimate_parameters(medoid_text, member_text, max_parameters);
            if diff.len() > parameters.len() {
                parameters = diff;
            }
        }
        let capped = if parameters.len() >= max_parameters {
            vec!["config".to_string()]
        } else {
            parameters
        };

        let language = medoid_entity.map(|e| e.language.as_str()).unwrap_or("unknown");
        let (filename, symbol_style) = language_convention(language);
        let paths: Vec<String> = group.members.iter().map(|m| m.path.clone()).collect();
        let target_dir = common_ancestor_dir(&paths);
        let target_path = if target_dir.is_empty() {
            filename.to_string()
        } else {
            format!("{target_dir}/{filename}")
        };
        let target_symbol = format!("extracted_{symbol_style}");

        let dup_loc_removed = group.total_lines() as f64;
        let score_drop_estimate = (0.2 * dup_loc_removed / 1000.0).min(0.2);
        let call_sites = group.members.len() as f64;
        let loc_touched = dup_loc_removed + 2.0 * call_sites;

        let mut value = HashMap::new();
        value.insert("dup_loc_removed".to_string(), dup_loc_removed);
        value.insert("score_drop_estimate".to_string(), score_drop_estimate);

        let mut effort = HashMap::new();
        effort.insert("loc_touched".to_string(), loc_touched);
        effort.insert("call_sites".to_string(), call_sites);

        let mut steps = vec![format!("Extract body to {target_path}")];
        if !capped.is_empty() {
            steps.push(format!("Add parameters: {}", capped.join(", ")));
        }
        steps.push(format!(
            "Replace {} clones with calls to {target_symbol}, preserving exception and return contracts",
            group.members.len()
        ));

        let involved_entities: Vec<String> = group
            .members
            .iter()
            .filter_map(|m| m.entity_id.clone())
            .collect();

        packs.push(ImpactPack {
            id: format!("clone-{}", group.group_id),
            kind: PackKind::CloneConsolidation,
            value,
            effort,
            steps,
            explanations: vec![format!(
                "{} near-duplicate locations share {} cloned lines at >= {:.0}% similarity",
                group.members.len(),
                group.total_lines(),
                group.max_similarity() * 100.0
            )],
            involved_entities,
            payload: PackPayload::Clone(ClonePayload {
                medoid_entity_id: medoid.entity_id.clone(),
                member_count: group.members.len(),
                template_parameters: capped,
                optional_blocks: Vec::new(),
                target_path,
                target_symbol,
            }),
        });
    }

    packs
}
