//! Clone feature extractor (spec §4.4): clone-mass, clone-group count, max
//! similarity, and total peer locations, derived from pre-computed clone
//! groups (an external collaborator's output — this extractor never hashes
//! tokens itself).

use std::collections::HashMap;

use async_trait::async_trait;

use crate::core::entity::{Entity, EntityKind};
use crate::core::errors::Result;
use crate::core::featureset::{ExtractionContext, FeatureDefinition, FeatureExtractor};
use crate::core::inputs::CloneGroup;

pub struct CloneExtractor {
    features: Vec<FeatureDefinition>,
    groups: Vec<CloneGroup>,
}

impl CloneExtractor {
    pub fn new(groups: Vec<CloneGroup>) -> Self {
        Self {
            features: vec![
                FeatureDefinition::new("clone.mass", "overlapping cloned lines / entity LOC", 0.0, 1.0, 0.0),
                FeatureDefinition::new("clone.group_count", "clone groups this entity participates in", 0.0, 100.0, 0.0),
                FeatureDefinition::new("clone.max_similarity", "max similarity across participating groups", 0.0, 1.0, 0.0),
                FeatureDefinition::new("clone.peer_count", "total peer locations across participating groups", 0.0, 1000.0, 0.0),
            ],
            groups,
        }
    }

    /// Groups this entity participates in, matched by entity id (preferred)
    /// or by path + line-range containment (fallback when groups were
    /// computed without resolved entity ids).
    fn participating_groups<'a>(&'a self, entity: &Entity) -> Vec<&'a CloneGroup> {
        self.groups
            .iter()
            .filter(|group| {
                group.members.iter().any(|member| {
                    if let Some(id) = &member.entity_id {
                        if id == &entity.id {
                            return true;
                        }
                    }
                    if member.path != entity.location.file_path {
                        return false;
                    }
                    let (start, end) = member.line_bounds();
                    start <= entity.location.end_line && end >= entity.location.start_line
                })
            })
            .collect()
    }
}

#[async_trait]
impl FeatureExtractor for CloneExtractor {
    fn name(&self) -> &str {
        "clone"
    }

    fn features(&self) -> &[FeatureDefinition] {
        &self.features
    }

    fn supports(&self, kind: EntityKind) -> bool {
        matches!(kind, EntityKind::Function | EntityKind::Method | EntityKind::Class)
    }

    async fn extract(&self, entity: &Entity, _ctx: &ExtractionContext<'_>) -> Result<HashMap<String, f64>> {
        let participating = self.participating_groups(entity);
        if participating.is_empty() {
            return Ok(HashMap::new());
        }

        let loc = entity.loc().max(1) as f64;
        let overlapping_lines: usize = participating
            .iter()
            .flat_map(|g| g.members.iter())
            .filter(|m| m.path == entity.location.file_path)
            .map(|m| {
                let (start, end) = m.line_bounds();
                let clipped_start = start.max(entity.location.start_line);
                let clipped_end = end.min(entity.location.end_line);
                clipped_end.saturating_sub(clipped_start) + 1
            })
            .sum();

        let clone_mass = (overlapping_lines as f64 / loc).clamp(0.0, 1.0);
        let max_similarity = participating.iter().map(|g| g.max_similarity()).fold(0.0, f64::max);
        let peer_count: usize = participating.iter().map(|g| g.members.len().saturating_sub(1)).sum();

        let mut out = HashMap::new();
        out.insert("clone.mass".to_string(), clone_mass);
        out.insert("clone.group_count".to_string(), participating.len() as f64);
        out.insert("clone.max_similarity".to_string(), max_similarity);
        out.insert("clone.peer_count".to_string(), peer_count as f64);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::SourceLocation;
    use crate::core::inputs::CloneMember;
    use crate::core::parse_index::ParseIndexBuilder;

    fn entity_at(path: &str, start: usize, end: usize) -> Entity {
        Entity {
            id: format!("python://{path}::foo"),
            name: "foo".into(),
            kind: EntityKind::Function,
            location: SourceLocation {
                file_path: path.to_string(),
                start_line: start,
                end_line: end,
                start_column: 1,
                end_column: 1,
            },
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
            metrics: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn entity_in_clone_group_gets_nonzero_mass() {
        let entity = entity_at("a.py", 1, 30);
        let groups = vec![CloneGroup {
            group_id: "g1".into(),
            members: vec![
                CloneMember { entity_id: None, path: "a.py".into(), line_range: "1-30".into(), similarity: 1.0 },
                CloneMember { entity_id: None, path: "b.py".into(), line_range: "1-30".into(), similarity: 1.0 },
            ],
        }];
        let index = ParseIndexBuilder::new().build();
        let ctx = ExtractionContext { index: &index };
        let extractor = CloneExtractor::new(groups);
        let out = extractor.extract(&entity, &ctx).await.unwrap();
        assert_eq!(out["clone.mass"], 1.0);
        assert_eq!(out["clone.peer_count"], 1.0);
        assert_eq!(out["clone.max_similarity"], 1.0);
    }

    #[tokio::test]
    async fn entity_outside_any_group_yields_empty_map() {
        let entity = entity_at("c.py", 1, 30);
        let index = ParseIndexBuilder::new().build();
        let ctx = ExtractionContext { index: &index };
        let extractor = CloneExtractor::new(vec![]);
        let out = extractor.extract(&entity, &ctx).await.unwrap();
        assert!(out.is_empty());
    }
}
