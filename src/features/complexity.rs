//! Complexity feature extractor (spec §4.4): cyclomatic, cognitive, max
//! nesting depth, parameter count, and lines of code for functions, methods,
//! and classes.
//!
//! Operates purely on `Entity::raw_text` (spec §9: the tree may be dropped
//! after parsing; extractors that only need text keep working either way).
//! Decision-point and nesting detection use a keyword/brace scan that is
//! intentionally language-agnostic rather than per-grammar, trading a little
//! precision for one implementation shared by every adapter.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::core::entity::{Entity, EntityKind};
use crate::core::errors::Result;
use crate::core::featureset::{ExtractionContext, FeatureDefinition, FeatureExtractor};

const BRANCH_KEYWORDS: &[&str] = &[
    "if ", "if(", "elif ", "elseif ", "elif(", "else if", "for ", "for(", "while ", "while(",
    "case ", "catch ", "catch(", "except ", "except:", "except(",
];
const SHORT_CIRCUIT: &[&str] = &["&&", "||", " and ", " or "];

/// Counts every occurrence of `needle` in `text`, including overlaps-free
/// successive matches (simple substring scan, not a tokenizer).
fn count_occurrences(text: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    text.matches(needle).count()
}

fn cyclomatic_complexity(text: &str) -> usize {
    let mut count = 1; // spec: decision points, plus 1
    for kw in BRANCH_KEYWORDS {
        count += count_occurrences(text, kw);
    }
    for op in SHORT_CIRCUIT {
        count += count_occurrences(text, op);
    }
    count
}

/// Per-line nesting depth, approximated by brace depth for curly-brace
/// languages and indentation level (4 spaces per level) otherwise.
fn nesting_depths(text: &str) -> Vec<usize> {
    let mut depths = Vec::new();
    let mut brace_depth: i64 = 0;
    for line in text.lines() {
        let trimmed = line.trim_start();
        let indent_level = (line.len() - trimmed.len()) / 4;
        let opens = line.matches('{').count() as i64;
        let closes = line.matches('}').count() as i64;
        let depth_here = brace_depth.max(0) as usize + indent_level;
        depths.push(depth_here);
        brace_depth += opens - closes;
    }
    depths
}

fn cognitive_complexity(text: &str) -> usize {
    let depths = nesting_depths(text);
    let mut total = 0usize;
    for (line, depth) in text.lines().zip(depths.iter()) {
        let mut line_decisions = 0usize;
        for kw in BRANCH_KEYWORDS {
            line_decisions += count_occurrences(line, kw);
        }
        for op in SHORT_CIRCUIT {
            line_decisions += count_occurrences(line, op);
        }
        if line_decisions > 0 {
            total += line_decisions * (1 + depth);
        }
    }
    total
}

fn max_nesting_depth(text: &str) -> usize {
    nesting_depths(text).into_iter().max().unwrap_or(0)
}

/// Complexity feature extractor.
pub struct ComplexityExtractor {
    features: Vec<FeatureDefinition>,
}

impl ComplexityExtractor {
    pub fn new() -> Self {
        Self {
            features: vec![
                FeatureDefinition::new("complexity.cyclomatic", "cyclomatic complexity", 1.0, 200.0, 1.0),
                FeatureDefinition::new("complexity.cognitive", "cognitive complexity", 0.0, 500.0, 0.0),
                FeatureDefinition::new("complexity.max_nesting_depth", "maximum nesting depth", 0.0, 20.0, 0.0),
                FeatureDefinition::new("complexity.parameter_count", "parameter count", 0.0, 30.0, 0.0),
                FeatureDefinition::new("complexity.loc", "lines of code", 0.0, 20000.0, 1.0),
            ],
        }
    }
}

impl Default for ComplexityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeatureExtractor for ComplexityExtractor {
    fn name(&self) -> &str {
        "complexity"
    }

    fn features(&self) -> &[FeatureDefinition] {
        &self.features
    }

    fn supports(&self, kind: EntityKind) -> bool {
        matches!(kind, EntityKind::Function | EntityKind::Method | EntityKind::Class)
    }

    async fn extract(&self, entity: &Entity, _ctx: &ExtractionContext<'_>) -> Result<HashMap<String, f64>> {
        let mut out = HashMap::new();
        out.insert("complexity.cyclomatic".to_string(), cyclomatic_complexity(&entity.raw_text) as f64);
        out.insert("complexity.cognitive".to_string(), cognitive_complexity(&entity.raw_text) as f64);
        out.insert("complexity.max_nesting_depth".to_string(), max_nesting_depth(&entity.raw_text) as f64);
        out.insert("complexity.parameter_count".to_string(), entity.parameters.len() as f64);
        out.insert("complexity.loc".to_string(), entity.loc() as f64);
        Ok(out)
    }
}
