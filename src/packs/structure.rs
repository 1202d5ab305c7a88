//! Structure packs (spec §4.7): file-split packs for oversized files whose
//! entity graph partitions into cohesive communities, and branch-reorg
//! packs for overcrowded directories.
//!
//! Community partitioning itself is an external collaborator (spec §9); this
//! module only consumes a pre-computed [`CommunityAssignment`] per file.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::core::inputs::CommunityAssignment;
use crate::core::parse_index::ParseIndex;
use crate::packs::{ImpactPack, PackKind, PackPayload};

/// Kind-specific payload, covering both file-split and branch-reorg packs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StructurePayload {
    FileSplit { file_path: String, community_count: usize, suggested_files: Vec<String> },
    BranchReorg { directory: String, file_count: usize, suggested_subdirectories: Vec<String> },
}

/// Imbalance gain: how much more even the split is than the current
/// single-file concentration, in `[0,1]` (1.0 = perfectly even communities).
fn imbalance_gain(community_sizes: &[usize]) -> f64 {
    let total: usize = community_sizes.iter().sum();
    if total == 0 || community_sizes.len() < 2 {
        return 0.0;
    }
    let ideal = total as f64 / community_sizes.len() as f64;
    let deviation: f64 = community_sizes.iter().map(|&s| (s as f64 - ideal).abs()).sum();
    (1.0 - (deviation / total as f64)).clamp(0.0, 1.0)
}

/// Build one file-split pack per file exceeding `large_file_lines` whose
/// community assignment partitions into at least two communities.
pub fn build_file_split_packs(
    index: &ParseIndex,
    assignments: &HashMap<String, CommunityAssignment>,
    large_file_lines: usize,
) -> Vec<ImpactPack> {
    let mut packs = Vec::new();

    let mut file_paths: Vec<&String> = assignments.keys().collect();
    file_paths.sort();

    for file_path in file_paths {
        let Some(file_id) = index.file_entity_id(file_path) else { continue };
        let Some(file_entity) = index.entity(file_id) else { continue };
        if file_entity.loc() < large_file_lines {
            continue;
        }

        let assignment = &assignments[file_path];
        let community_count = assignment.community_count();
        if community_count < 2 {
            continue;
        }

        let mut sizes: HashMap<usize, usize> = HashMap::new();
        for &community in assignment.entity_to_community.values() {
            *sizes.entry(community).or_default() += 1;
        }
        let size_values: Vec<usize> = sizes.values().copied().collect();
        let gain = imbalance_gain(&size_values);

        let stem = file_path.rsplit('/').next().unwrap_or(file_path).rsplit('.').nth(1).unwrap_or("module");
        let suggested_files: Vec<String> = (0..community_count).map(|i| format!("{stem}_part{}.{}", i + 1, file_path.rsplit('.').next().unwrap_or("rs"))).collect();

        let mut value = HashMap::new();
        value.insert("imbalance_gain".to_string(), gain);

        let mut effort = HashMap::new();
        effort.insert("modules_touched".to_string(), community_count as f64);

        let involved_entities: Vec<String> = assignment.entity_to_community.keys().cloned().collect();

        packs.push(ImpactPack {
            id: format!("structure-split-{file_path}"),
            kind: PackKind::StructureSplit,
            value,
            effort,
            steps: vec![format!(
                "Split {file_path} into {community_count} cohesive modules: {}",
                suggested_files.join(", ")
            )],
            explanations: vec![format!(
                "{file_path} has {} lines partitioned into {community_count} loosely-coupled communities",
                file_entity.loc()
            )],
            involved_entities,
            payload: PackPayload::Structure(StructurePayload::FileSplit {
                file_path: file_path.clone(),
                community_count,
                suggested_files,
            }),
        });
    }

    packs
}

/// Build one branch-reorg pack per directory exceeding `overcrowding`
/// files, grouping its files by their per-file dominant community (file's
/// first listed entity's community, if assigned).
pub fn build_branch_reorg_packs(
    index: &ParseIndex,
    assignments: &HashMap<String, CommunityAssignment>,
    overcrowding_threshold: usize,
) -> Vec<ImpactPack> {
    let mut by_dir: HashMap<String, Vec<String>> = HashMap::new();
    for file_path in index.file_paths() {
        let dir = file_path.rsplit_once('/').map(|(d, _)| d.to_string()).unwrap_or_default();
        by_dir.entry(dir).or_default().push(file_path.clone());
    }

    let mut packs = Vec::new();
    let mut dirs: Vec<&String> = by_dir.keys().collect();
    dirs.sort();

    for dir in dirs {
        let files = &by_dir[dir];
        if files.len() <= overcrowding_threshold {
            continue;
        }

        let mut communities: HashSet<usize> = HashSet::new();
        for file in files {
            if let Some(assignment) = assignments.get(file) {
                communities.extend(assignment.entity_to_community.values().copied());
            }
        }
        let subdir_count = communities.len().max(2);
        let suggested_subdirectories: Vec<String> = (0..subdir_count).map(|i| format!("{dir}/group_{}", i + 1)).collect();

        let mut value = HashMap::new();
        value.insert("imbalance_gain".to_string(), (files.len() as f64 / overcrowding_threshold as f64 - 1.0).min(1.0));

        let mut effort = HashMap::new();
        effort.insert("modules_touched".to_string(), files.len() as f64);

        packs.push(ImpactPack {
            id: format!("structure-reorg-{dir}"),
            kind: PackKind::StructureSplit,
            value,
            effort,
            steps: vec![format!(
                "Create subdirectories under {dir}: {}",
                suggested_subdirectories.join(", ")
            )],
            explanations: vec![format!("{dir} holds {} files, above the overcrowding threshold of {overcrowding_threshold}", files.len())],
            involved_entities: files.iter().filter_map(|f| index.file_entity_id(f).map(str::to_string)).collect(),
            payload: PackPayload::Structure(StructurePayload::BranchReorg {
                directory: dir.clone(),
                file_count: files.len(),
                suggested_subdirectories,
            }),
        });
    }

    packs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imbalance_gain_is_zero_for_single_community() {
        assert_eq!(imbalance_gain(&[10]), 0.0);
    }

    #[test]
    fn imbalance_gain_is_positive_for_even_split() {
        let gain = imbalance_gain(&[10, 10]);
        assert!(gain > 0.5);
    }
}
