//! C7: Impact Pack Builder.
//!
//! Builds the five pack families (spec §4.7), ranks them by value/effort,
//! and applies the non-overlap selection policy. Each family is its own
//! module with a distinct construction algorithm; this module owns the
//! shared [`ImpactPack`] sum type plus ranking/selection.

pub mod chokepoint;
pub mod clone;
pub mod coverage;
pub mod cycle;
pub mod structure;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// The five pack families (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackKind {
    CloneConsolidation,
    CycleCut,
    ChokepointElimination,
    CoverageImprovement,
    StructureSplit,
}

/// Kind-specific payload, carried alongside the shared pack fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "payload_kind")]
pub enum PackPayload {
    Clone(clone::ClonePayload),
    Cycle(cycle::CyclePayload),
    Chokepoint(chokepoint::ChokepointPayload),
    Coverage(coverage::CoveragePayload),
    Structure(structure::StructurePayload),
}

/// One recommended refactor action (spec §3 Impact pack).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactPack {
    pub id: String,
    pub kind: PackKind,
    /// Kind-dependent value metrics (e.g. `lines_removed`, `cycles_removed`).
    pub value: HashMap<String, f64>,
    /// Kind-dependent effort metrics (e.g. `loc_touched`, `call_sites`).
    pub effort: HashMap<String, f64>,
    pub steps: Vec<String>,
    pub explanations: Vec<String>,
    /// Entity ids this pack touches; used by the non-overlap selection policy.
    pub involved_entities: Vec<String>,
    pub payload: PackPayload,
}

impl ImpactPack {
    /// `value / max(effort, 1.0)`, the ranking key for every family
    /// (spec/SPEC_FULL §4.7 ranking formulas, one closed-form scalar per
    /// family computed from the kind-dependent maps above).
    pub fn value_effort_ratio(&self) -> f64 {
        let value = family_value_score(self.kind, &self.value);
        let effort = family_effort_score(self.kind, &self.effort);
        value / effort.max(1.0)
    }
}

/// Per-family value score, ported from the prototype's
/// `ImpactPackBuilder._calculate_value_score` (see DESIGN.md).
fn family_value_score(kind: PackKind, value: &HashMap<String, f64>) -> f64 {
    let get = |k: &str| value.get(k).copied().unwrap_or(0.0);
    match kind {
        PackKind::CloneConsolidation => get("dup_loc_removed") / 100.0 + get("score_drop_estimate") * 10.0,
        PackKind::CycleCut => get("cycles_removed") + 0.5 * get("scc_count_delta") + 10.0 * get("path_length_improvement"),
        PackKind::ChokepointElimination => get("cross_community_edges_reduced") * 2.0,
        PackKind::CoverageImprovement => {
            get("coverage_gain") * 0.1 + (get("lines_to_cover") / 50.0).min(2.0) * 0.5
        }
        PackKind::StructureSplit => get("imbalance_gain"),
    }
}

/// Per-family effort score, ported from the prototype's
/// `ImpactPackBuilder._calculate_effort_score`.
fn family_effort_score(kind: PackKind, effort: &HashMap<String, f64>) -> f64 {
    let get = |k: &str| effort.get(k).copied().unwrap_or(0.0);
    match kind {
        PackKind::CloneConsolidation => get("loc_touched") / 10.0 + get("call_sites"),
        PackKind::CycleCut => get("modules_touched") + get("imports_to_rehome") / 3.0,
        PackKind::ChokepointElimination => get("modules_touched") + get("imports_to_rehome") / 5.0,
        PackKind::CoverageImprovement => get("loc_touched") / 20.0,
        PackKind::StructureSplit => get("modules_touched"),
    }
}

/// Rank every pack by value/effort descending (stable, ties keep insertion
/// order) then, if `non_overlap` is set, drop any pack whose involved-entity
/// set intersects an already-selected pack's, finally truncating to
/// `max_packs` (spec §4.7).
pub fn rank_and_select(mut packs: Vec<ImpactPack>, non_overlap: bool, max_packs: usize) -> Vec<ImpactPack> {
    packs.sort_by(|a, b| {
        b.value_effort_ratio()
            .partial_cmp(&a.value_effort_ratio())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    if !non_overlap {
        packs.truncate(max_packs);
        return packs;
    }

    let mut selected = Vec::new();
    let mut claimed: HashSet<String> = HashSet::new();
    for pack in packs {
        if selected.len() >= max_packs {
            break;
        }
        let overlaps = pack.involved_entities.iter().any(|id| claimed.contains(id));
        if overlaps {
            continue;
        }
        claimed.extend(pack.involved_entities.iter().cloned());
        selected.push(pack);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(id: &str, entities: &[&str], value: f64, effort: f64) -> ImpactPack {
        let mut v = HashMap::new();
        v.insert("cross_community_edges_reduced".to_string(), value / 2.0);
        let mut e = HashMap::new();
        e.insert("modules_touched".to_string(), effort);
        ImpactPack {
            id: id.to_string(),
            kind: PackKind::ChokepointElimination,
            value: v,
            effort: e,
            steps: vec![],
            explanations: vec![],
            involved_entities: entities.iter().map(|s| s.to_string()).collect(),
            payload: PackPayload::Chokepoint(chokepoint::ChokepointPayload {
                chokepoint_node: "n".into(),
                centrality: 0.1,
                affected_communities: 1,
            }),
        }
    }

    #[test]
    fn non_overlap_drops_packs_sharing_entities() {
        let packs = vec![
            pack("high", &["a", "b"], 10.0, 1.0),
            pack("overlapping", &["b", "c"], 9.0, 1.0),
            pack("disjoint", &["d"], 1.0, 1.0),
        ];
        let selected = rank_and_select(packs, true, 20);
        let ids: Vec<_> = selected.iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec!["high", "disjoint"]);
    }

    #[test]
    fn max_packs_truncates_after_selection() {
        let packs = vec![
            pack("a", &["1"], 10.0, 1.0),
            pack("b", &["2"], 9.0, 1.0),
            pack("c", &["3"], 8.0, 1.0),
        ];
        let selected = rank_and_select(packs, true, 2);
        assert_eq!(selected.len(), 2);
    }
}
