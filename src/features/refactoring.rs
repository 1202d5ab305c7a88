//! Refactoring-signal extractor (spec §4.4): long-method, complex-conditional,
//! large-class, parameter-bloat, and depth-bloat flags, each paired with a
//! magnitude (the excess over threshold, clamped at 0).

use std::collections::HashMap;

use async_trait::async_trait;

use crate::core::entity::{Entity, EntityKind};
use crate::core::errors::Result;
use crate::core::featureset::{ExtractionContext, FeatureDefinition, FeatureExtractor};

const LONG_METHOD_THRESHOLD: f64 = 50.0;
const COMPLEX_CONDITIONAL_THRESHOLD: f64 = 4.0;
const LARGE_CLASS_LOC_THRESHOLD: f64 = 200.0;
const LARGE_CLASS_MEMBER_THRESHOLD: f64 = 12.0;
const PARAMETER_BLOAT_THRESHOLD: f64 = 6.0;
const DEPTH_BLOAT_THRESHOLD: f64 = 4.0;

fn flag_and_magnitude(value: f64, threshold: f64) -> (f64, f64) {
    if value >= threshold {
        (1.0, value - threshold)
    } else {
        (0.0, 0.0)
    }
}

/// Maximum count of logical operators (`&&`, `||`, `and`, `or`) found within
/// any single line, approximating "inside any single predicate".
fn max_logical_operators_per_line(text: &str) -> f64 {
    text.lines()
        .map(|line| {
            (line.matches("&&").count()
                + line.matches("||").count()
                + line.matches(" and ").count()
                + line.matches(" or ").count()) as f64
        })
        .fold(0.0, f64::max)
}

fn max_nesting_depth(text: &str) -> f64 {
    let mut brace_depth: i64 = 0;
    let mut max_depth = 0i64;
    for line in text.lines() {
        let trimmed = line.trim_start();
        let indent_level = ((line.len() - trimmed.len()) / 4) as i64;
        let opens = line.matches('{').count() as i64;
        let closes = line.matches('}').count() as i64;
        max_depth = max_depth.max(brace_depth.max(0) + indent_level);
        brace_depth += opens - closes;
    }
    max_depth as f64
}

pub struct RefactoringSignalExtractor {
    features: Vec<FeatureDefinition>,
}

impl RefactoringSignalExtractor {
    pub fn new() -> Self {
        Self {
            features: vec![
                FeatureDefinition::new("refactoring.long_method", "LOC >= 50", 0.0, 1.0, 0.0),
                FeatureDefinition::new("refactoring.long_method_magnitude", "LOC over threshold", 0.0, 10000.0, 0.0),
                FeatureDefinition::new("refactoring.complex_conditional", "logical operators in a predicate >= 4", 0.0, 1.0, 0.0),
                FeatureDefinition::new("refactoring.complex_conditional_magnitude", "operators over threshold", 0.0, 100.0, 0.0),
                FeatureDefinition::new("refactoring.large_class", "class LOC >= 200 and members >= 12", 0.0, 1.0, 0.0),
                FeatureDefinition::new("refactoring.large_class_magnitude", "members over threshold", 0.0, 1000.0, 0.0),
                FeatureDefinition::new("refactoring.parameter_bloat", "parameter count >= 6", 0.0, 1.0, 0.0),
                FeatureDefinition::new("refactoring.parameter_bloat_magnitude", "parameters over threshold", 0.0, 100.0, 0.0),
                FeatureDefinition::new("refactoring.depth_bloat", "nesting depth >= 4", 0.0, 1.0, 0.0),
                FeatureDefinition::new("refactoring.depth_bloat_magnitude", "depth over threshold", 0.0, 50.0, 0.0),
            ],
        }
    }
}

impl Default for RefactoringSignalExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeatureExtractor for RefactoringSignalExtractor {
    fn name(&self) -> &str {
        "refactoring"
    }

    fn features(&self) -> &[FeatureDefinition] {
        &self.features
    }

    fn supports(&self, kind: EntityKind) -> bool {
        matches!(kind, EntityKind::Function | EntityKind::Method | EntityKind::Class)
    }

    async fn extract(&self, entity: &Entity, _ctx: &ExtractionContext<'_>) -> Result<HashMap<String, f64>> {
        let mut out = HashMap::new();

        let (long_flag, long_mag) = flag_and_magnitude(entity.loc() as f64, LONG_METHOD_THRESHOLD);
        out.insert("refactoring.long_method".to_string(), long_flag);
        out.insert("refactoring.long_method_magnitude".to_string(), long_mag);

        let (cond_flag, cond_mag) =
            flag_and_magnitude(max_logical_operators_per_line(&entity.raw_text), COMPLEX_CONDITIONAL_THRESHOLD);
        out.insert("refactoring.complex_conditional".to_string(), cond_flag);
        out.insert("refactoring.complex_conditional_magnitude".to_string(), cond_mag);

        if entity.kind == EntityKind::Class {
            let member_count = entity.children.len() as f64;
            let large = entity.loc() as f64 >= LARGE_CLASS_LOC_THRESHOLD && member_count >= LARGE_CLASS_MEMBER_THRESHOLD;
            let (_, member_mag) = flag_and_magnitude(member_count, LARGE_CLASS_MEMBER_THRESHOLD);
            out.insert("refactoring.large_class".to_string(), if large { 1.0 } else { 0.0 });
            out.insert(
                "refactoring.large_class_magnitude".to_string(),
                if large { member_mag } else { 0.0 },
            );
        } else {
            out.insert("refactoring.large_class".to_string(), 0.0);
            out.insert("refactoring.large_class_magnitude".to_string(), 0.0);
        }

        let (param_flag, param_mag) =
            flag_and_magnitude(entity.parameters.len() as f64, PARAMETER_BLOAT_THRESHOLD);
        out.insert("refactoring.parameter_bloat".to_string(), param_flag);
        out.insert("refactoring.parameter_bloat_magnitude".to_string(), param_mag);

        let (depth_flag, depth_mag) =
            flag_and_magnitude(max_nesting_depth(&entity.raw_text), DEPTH_BLOAT_THRESHOLD);
        out.insert("refactoring.depth_bloat".to_string(), depth_flag);
        out.insert("refactoring.depth_bloat_magnitude".to_string(), depth_mag);

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::SourceLocation;
    use crate::core::parse_index::ParseIndexBuilder;

    fn function_entity(loc: usize, params: usize, text: &str) -> Entity {
        Entity {
            id: "python://a.py::foo".into(),
            name: "foo".into(),
            kind: EntityKind::Function,
            location: SourceLocation {
                file_path: "a.py".into(),
                start_line: 1,
                end_line: loc,
                start_column: 1,
                end_column: 1,
            },
            language: "python".into(),
            parent: None,
            children: vec![],
            raw_text: text.to_string(),
            signature: None,
            docstring: None,
            parameters: (0..params).map(|i| format!("p{i}")).collect(),
            return_type: None,
            fields: vec![],
            imports: vec![],
            metrics: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn eighty_line_function_with_four_params_trips_long_method_and_params() {
        let entity = function_entity(80, 4, "if a and b and c and d:\n    pass");
        let index = ParseIndexBuilder::new().build();
        let ctx = ExtractionContext { index: &index };
        let extractor = RefactoringSignalExtractor::new();
        let out = extractor.extract(&entity, &ctx).await.unwrap();
        assert_eq!(out["refactoring.long_method"], 1.0);
        assert_eq!(out["refactoring.long_method_magnitude"], 30.0);
        assert_eq!(out["refactoring.complex_conditional"], 1.0);
        assert_eq!(out["refactoring.parameter_bloat"], 0.0);
    }

    #[tokio::test]
    async fn short_function_trips_no_flags() {
        let entity = function_entity(5, 1, "return 1");
        let index = ParseIndexBuilder::new().build();
        let ctx = ExtractionContext { index: &index };
        let extractor = RefactoringSignalExtractor::new();
        let out = extractor.extract(&entity, &ctx).await.unwrap();
        assert_eq!(out["refactoring.long_method"], 0.0);
        assert_eq!(out["refactoring.parameter_bloat"], 0.0);
        assert_eq!(out["refactoring.depth_bloat"], 0.0);
    }
}
