//! Analysis configuration.
//!
//! This crate never loads or validates a configuration *file* — that is an
//! external collaborator's job (§1: "configuration file loading and
//! validation" is out of scope). `AnalysisConfig` is the in-memory value a
//! caller hands the pipeline, already parsed from whatever format (YAML,
//! JSON, TOML) the surrounding tool supports.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::errors::{CoreError, Result};
use crate::core::normalizer::NormalizationScheme;

/// Granularity at which entities are emitted and scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    File,
    Function,
}

impl Default for Granularity {
    fn default() -> Self {
        Granularity::Function
    }
}

/// Per-family impact-pack toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackFamilyToggles {
    #[serde(default = "default_true")]
    pub clone_consolidation: bool,
    #[serde(default = "default_true")]
    pub cycle_cut: bool,
    #[serde(default = "default_true")]
    pub chokepoint_elimination: bool,
    #[serde(default = "default_true")]
    pub coverage_improvement: bool,
    #[serde(default = "default_true")]
    pub structure_split: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PackFamilyToggles {
    fn default() -> Self {
        Self {
            clone_consolidation: true,
            cycle_cut: true,
            chokepoint_elimination: true,
            coverage_improvement: true,
            structure_split: true,
        }
    }
}

/// Impact-pack construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackConfig {
    #[serde(default)]
    pub enable: PackFamilyToggles,
    #[serde(default = "PackConfig::default_max_packs")]
    pub max_packs: usize,
    #[serde(default = "default_true")]
    pub non_overlap: bool,
    #[serde(default = "PackConfig::default_centrality_samples")]
    pub centrality_samples: usize,
    #[serde(default = "PackConfig::default_min_similarity")]
    pub clone_min_similarity: f64,
    #[serde(default = "PackConfig::default_min_total_loc")]
    pub clone_min_total_loc: usize,
    #[serde(default = "PackConfig::default_max_parameters")]
    pub clone_max_parameters: usize,
}

impl PackConfig {
    const fn default_max_packs() -> usize {
        20
    }
    const fn default_centrality_samples() -> usize {
        64
    }
    const fn default_min_similarity() -> f64 {
        0.85
    }
    const fn default_min_total_loc() -> usize {
        60
    }
    const fn default_max_parameters() -> usize {
        6
    }
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            enable: PackFamilyToggles::default(),
            max_packs: Self::default_max_packs(),
            non_overlap: true,
            centrality_samples: Self::default_centrality_samples(),
            clone_min_similarity: Self::default_min_similarity(),
            clone_min_total_loc: Self::default_min_total_loc(),
            clone_max_parameters: Self::default_max_parameters(),
        }
    }
}

/// Coverage-report wiring. The report itself is parsed externally; this
/// crate only needs to know where to look and which pre-parsed format hint
/// to expect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverageConfig {
    pub report_path: Option<String>,
    pub format_hint: Option<String>,
}

/// Structure-analysis thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureConfig {
    #[serde(default = "StructureConfig::default_large_file_lines")]
    pub large_file_lines: usize,
    #[serde(default = "StructureConfig::default_overcrowded_files")]
    pub overcrowded_directory_files: usize,
}

impl StructureConfig {
    const fn default_large_file_lines() -> usize {
        500
    }
    const fn default_overcrowded_files() -> usize {
        25
    }
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            large_file_lines: Self::default_large_file_lines(),
            overcrowded_directory_files: Self::default_overcrowded_files(),
        }
    }
}

/// The full, already-validated analysis configuration (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Root paths to analyze. Must be non-empty.
    pub roots: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Enabled language tags; empty means "all adapters available".
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub granularity: Granularity,
    #[serde(default = "AnalysisConfig::default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub weights: HashMap<String, f64>,
    #[serde(default)]
    pub normalizer: HashMap<String, NormalizationScheme>,
    #[serde(default)]
    pub packs: PackConfig,
    #[serde(default)]
    pub coverage: CoverageConfig,
    #[serde(default)]
    pub structure: StructureConfig,
}

impl AnalysisConfig {
    const fn default_top_k() -> usize {
        50
    }

    /// Validate required fields. This is the only "validation" this crate
    /// performs — it is a structural sanity check, not config-file parsing.
    pub fn validate(&self) -> Result<()> {
        if self.roots.is_empty() {
            return Err(CoreError::config_field(
                "at least one root path is required",
                "roots",
            ));
        }
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            include: Vec::new(),
            exclude: Vec::new(),
            languages: Vec::new(),
            granularity: Granularity::default(),
            top_k: Self::default_top_k(),
            weights: HashMap::new(),
            normalizer: HashMap::new(),
            packs: PackConfig::default(),
            coverage: CoverageConfig::default(),
            structure: StructureConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_empty_roots() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_at_least_one_root() {
        let mut config = AnalysisConfig::default();
        config.roots.push("./src".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn round_trips_through_json() {
        let mut config = AnalysisConfig::default();
        config.roots.push("./src".to_string());
        let json = serde_json::to_string(&config).expect("serialize");
        let back: AnalysisConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.roots, config.roots);
    }
}
