//! Pre-parsed external inputs the pack builder consumes (spec §6).
//!
//! Clone-group detection (token hashing/similarity) and coverage-report
//! parsing are external collaborators; this crate only accepts their
//! already-structured output. Likewise, community partitioning for
//! structure packs is an external input — the core consumes assignments,
//! it does not compute graph communities itself.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One member of a clone group: a single cloned location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneMember {
    /// The entity id this clone location belongs to, if resolved.
    pub entity_id: Option<String>,
    /// File path of the clone.
    pub path: String,
    /// Inclusive 1-based line range, e.g. `"10-40"`.
    pub line_range: String,
    /// Pairwise similarity to the group's medoid, in `[0,1]`.
    pub similarity: f64,
}

impl CloneMember {
    /// Parse `line_range` into `(start, end)`, defaulting to `(1, 1)` on
    /// malformed input rather than failing the whole group.
    pub fn line_bounds(&self) -> (usize, usize) {
        let mut parts = self.line_range.splitn(2, '-');
        let start = parts.next().and_then(|s| s.trim().parse().ok()).unwrap_or(1);
        let end = parts.next().and_then(|s| s.trim().parse().ok()).unwrap_or(start);
        (start, end.max(start))
    }

    /// Number of lines this member spans.
    pub fn line_count(&self) -> usize {
        let (start, end) = self.line_bounds();
        end - start + 1
    }
}

/// A group of near-duplicate code locations, pre-computed externally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneGroup {
    /// Stable group id from the external detector.
    pub group_id: String,
    pub members: Vec<CloneMember>,
}

impl CloneGroup {
    /// Whether every member meets `threshold` similarity.
    pub fn all_meet_similarity(&self, threshold: f64) -> bool {
        !self.members.is_empty() && self.members.iter().all(|m| m.similarity >= threshold)
    }

    /// Total cloned lines summed across members.
    pub fn total_lines(&self) -> usize {
        self.members.iter().map(|m| m.line_count()).sum()
    }

    /// Maximum pairwise similarity represented in this group.
    pub fn max_similarity(&self) -> f64 {
        self.members.iter().map(|m| m.similarity).fold(0.0, f64::max)
    }
}

/// Per-file coverage, as produced by an external coverage-report parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCoverage {
    /// Sorted, 1-based uncovered line numbers.
    pub uncovered_lines: Vec<usize>,
    pub total_lines: usize,
    pub covered_lines: usize,
    pub coverage_percentage: f64,
}

/// The full coverage input: file path -> per-file coverage, plus an overall
/// percentage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverageReport {
    pub files: HashMap<String, FileCoverage>,
    pub total_coverage_percentage: f64,
}

impl CoverageReport {
    /// Group consecutive uncovered lines into segments of `min_size` lines
    /// or more (spec §4.7 Coverage packs).
    pub fn segments(&self, file_path: &str, min_size: usize) -> Vec<(usize, usize)> {
        let Some(file) = self.files.get(file_path) else {
            return Vec::new();
        };
        let mut segments = Vec::new();
        let mut iter = file.uncovered_lines.iter().copied();
        let Some(mut start) = iter.next() else {
            return segments;
        };
        let mut prev = start;
        for line in iter {
            if line == prev + 1 {
                prev = line;
                continue;
            }
            if prev - start + 1 >= min_size {
                segments.push((start, prev));
            }
            start = line;
            prev = line;
        }
        if prev - start + 1 >= min_size {
            segments.push((start, prev));
        }
        segments
    }
}

/// External community assignment for one file's entity graph: entity id ->
/// community index. Produced by a partitioning collaborator (spec §9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommunityAssignment {
    pub entity_to_community: HashMap<String, usize>,
}

impl CommunityAssignment {
    /// Number of distinct communities represented.
    pub fn community_count(&self) -> usize {
        self.entity_to_community
            .values()
            .collect::<std::collections::HashSet<_>>()
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_bounds_parses_inclusive_range() {
        let member = CloneMember {
            entity_id: None,
            path: "a.py".into(),
            line_range: "10-40".into(),
            similarity: 0.9,
        };
        assert_eq!(member.line_bounds(), (10, 40));
        assert_eq!(member.line_count(), 31);
    }

    #[test]
    fn segments_groups_consecutive_uncovered_lines() {
        let mut report = CoverageReport::default();
        report.files.insert(
            "x.py".into(),
            FileCoverage {
                uncovered_lines: vec![50, 51, 52, 53, 54, 55, 56, 57, 58, 59, 60, 70, 71, 72, 73, 74, 75],
                total_lines: 100,
                covered_lines: 83,
                coverage_percentage: 83.0,
            },
        );
        let segments = report.segments("x.py", 3);
        assert_eq!(segments, vec![(50, 60), (70, 75)]);
    }

    #[test]
    fn all_lines_uncovered_yields_single_segment_equal_to_span() {
        let mut report = CoverageReport::default();
        report.files.insert(
            "y.py".into(),
            FileCoverage {
                uncovered_lines: (1..=20).collect(),
                total_lines: 20,
                covered_lines: 0,
                coverage_percentage: 0.0,
            },
        );
        let segments = report.segments("y.py", 3);
        assert_eq!(segments, vec![(1, 20)]);
    }
}
