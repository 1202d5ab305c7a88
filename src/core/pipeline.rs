//! The analysis pipeline: wires C1 (file discovery) through C7 (impact pack
//! builder) into one run over an [`AnalysisConfig`] (spec §2 data flow).
//!
//! File discovery and per-file parsing are blocking I/O, offloaded onto
//! `tokio::task::spawn_blocking`; feature extraction fans out across `rayon`
//! once the parse index is frozen (spec §5). Graph construction and pack
//! building stay single-threaded, as the spec requires a consistent global
//! view for both.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::core::config::AnalysisConfig;
use crate::core::diagnostics::DiagnosticSink;
use crate::core::errors::Result;
use crate::core::featureset::FeatureRegistry;
use crate::core::file_discovery::{discover_files, LanguageExtensions};
use crate::core::inputs::{CloneGroup, CommunityAssignment, CoverageReport};
use crate::core::normalizer::normalize_corpus;
use crate::core::parse_index::{ParseIndex, ParseIndexBuilder};
use crate::core::scoring::{rank, RankedEntity};
use crate::features;
use crate::features::clone::CloneExtractor;
use crate::features::complexity::ComplexityExtractor;
use crate::features::graph::GraphExtractor;
use crate::features::refactoring::RefactoringSignalExtractor;
use crate::lang::registry::{enabled_adapters, registered_languages};
use crate::packs::chokepoint::build_chokepoint_packs;
use crate::packs::clone::build_clone_packs;
use crate::packs::coverage::build_coverage_packs;
use crate::packs::cycle::build_cycle_packs;
use crate::packs::structure::{build_branch_reorg_packs, build_file_split_packs};
use crate::packs::{rank_and_select, ImpactPack};

/// Optional external inputs the pack builder consumes (spec §6): clone
/// groups, coverage, and community assignments are each produced by a
/// collaborator outside this crate.
#[derive(Debug, Default, Clone)]
pub struct ExternalInputs {
    pub clone_groups: Vec<CloneGroup>,
    pub coverage: Option<CoverageReport>,
    pub community_assignments: HashMap<String, CommunityAssignment>,
}

/// The complete output of one analysis run (spec §6 "Output — analysis
/// result").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Unique identifier for this run, for correlating logs/caches/reports.
    pub analysis_id: String,
    /// Wall-clock time the run started.
    pub timestamp: DateTime<Utc>,
    /// The configuration this run executed with.
    pub config: AnalysisConfig,
    pub file_count: usize,
    pub entity_count: usize,
    pub elapsed_seconds: f64,
    pub top_entities: Vec<RankedEntity>,
    pub packs: Vec<ImpactPack>,
    pub diagnostics_summary: String,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
}

/// Cooperative cancellation signal, polled between entities/files (spec §5).
/// Partial results from a cancelled run are discarded by the caller.
pub type CancellationToken = Arc<std::sync::atomic::AtomicBool>;

fn is_cancelled(token: &CancellationToken) -> bool {
    token.load(std::sync::atomic::Ordering::Relaxed)
}

/// Run the full pipeline once over `config`, consuming whatever
/// `ExternalInputs` the caller has already parsed.
#[instrument(skip(config, inputs, cancellation))]
pub async fn run(
    config: AnalysisConfig,
    inputs: ExternalInputs,
    cancellation: CancellationToken,
) -> Result<AnalysisResult> {
    let started = Instant::now();
    let analysis_id = Uuid::new_v4().to_string();
    let timestamp = Utc::now();
    config.validate()?;

    let mut diagnostics = DiagnosticSink::new();

    let adapters = enabled_adapters(&config.languages);
    if adapters.is_empty() {
        return Err(crate::core::errors::CoreError::config(
            "no language adapter is available for the configured languages",
        ));
    }

    let language_extensions: Vec<LanguageExtensions> = registered_languages()
        .iter()
        .filter(|info| config.languages.is_empty() || config.languages.iter().any(|l| l == info.key))
        .map(|info| LanguageExtensions {
            language: info.key.to_string(),
            extensions: info.extensions.iter().map(|e| e.to_string()).collect(),
        })
        .collect();

    // C1: File Discovery. Blocking file-system walk, offloaded to a
    // blocking-I/O thread so the async driver never stalls its own runtime.
    let roots = config.roots.clone();
    let include = config.include.clone();
    let exclude = config.exclude.clone();
    let mut discovery_diagnostics = DiagnosticSink::new();
    let (files_by_language, sub_diagnostics) = tokio::task::spawn_blocking(move || {
        discover_files(&roots, &include, &exclude, &language_extensions, &mut discovery_diagnostics)
            .map(|files| (files, discovery_diagnostics))
    })
    .await
    .map_err(|err| crate::core::errors::CoreError::config(format!("file discovery task panicked: {err}")))??;
    diagnostics.extend(sub_diagnostics);

    let file_count: usize = files_by_language.values().map(Vec::len).sum();
    let corpus_files: Vec<String> = files_by_language
        .values()
        .flatten()
        .map(|p| p.to_string_lossy().to_string())
        .collect();

    if is_cancelled(&cancellation) {
        return Ok(empty_result(config, started, analysis_id, timestamp));
    }

    // C2/C3: per-language parsing, then a single-threaded merge into the
    // frozen ParseIndex. Parsing itself touches the filesystem, so it also
    // runs off the async driver's own worker.
    let mut builder = ParseIndexBuilder::new();
    for adapter in &adapters {
        if is_cancelled(&cancellation) {
            break;
        }
        let Some(files) = files_by_language.get(adapter.language()) else {
            continue;
        };
        let file_strings: Vec<String> = files.iter().map(|p| p.to_string_lossy().to_string()).collect();
        if file_strings.is_empty() {
            continue;
        }
        let mut adapter_diagnostics = DiagnosticSink::new();
        match adapter.parse_index(&file_strings, &corpus_files, &mut adapter_diagnostics) {
            Ok(partial) => builder.merge(partial),
            Err(err) => adapter_diagnostics.error(format!("adapter '{}' failed: {err}", adapter.language()), None),
        }
        diagnostics.extend(adapter_diagnostics);
    }

    let index = builder.build();
    if let Err(invariant_violation) = index.validate_invariants() {
        warn!("{invariant_violation}");
        diagnostics.error(invariant_violation, None);
    }
    info!(files = file_count, entities = index.entity_count(), "parse index built");

    if is_cancelled(&cancellation) {
        return Ok(empty_result(config, started, analysis_id, timestamp));
    }

    // C4: Feature Extractors, run concurrently over the frozen index.
    let extractors = build_extractors(&config, inputs.clone());
    let registry = features::build_registry(&extractors);
    let mut vectors = features::extract_all(&index, &extractors, &registry, &mut diagnostics);
    let loc_by_entity = features::loc_by_entity(&index);

    // C5: Normalizer, fit then transform across the whole corpus.
    let feature_names = registry.feature_names();
    normalize_corpus(&mut vectors, &feature_names, &config.normalizer);

    // C6: Ranking.
    let top_entities = rank(&vectors, &config.weights, &loc_by_entity, config.top_k);

    if is_cancelled(&cancellation) {
        return Ok(empty_result(config, started, analysis_id, timestamp));
    }

    // C7: Impact Pack Builder, the sole consumer of the import graph for
    // global (cross-entity) reasoning.
    let packs = build_packs(&config, &index, &inputs);

    let (errors, warnings, info_count) = diagnostics.counts();
    let result = AnalysisResult {
        analysis_id,
        timestamp,
        config,
        file_count,
        entity_count: index.entity_count(),
        elapsed_seconds: started.elapsed().as_secs_f64(),
        top_entities,
        packs,
        diagnostics_summary: diagnostics.summary_line(),
        error_count: errors,
        warning_count: warnings,
        info_count,
    };
    Ok(result)
}

fn empty_result(config: AnalysisConfig, started: Instant, analysis_id: String, timestamp: DateTime<Utc>) -> AnalysisResult {
    AnalysisResult {
        analysis_id,
        timestamp,
        config,
        file_count: 0,
        entity_count: 0,
        elapsed_seconds: started.elapsed().as_secs_f64(),
        top_entities: Vec::new(),
        packs: Vec::new(),
        diagnostics_summary: "cancelled before completion".to_string(),
        error_count: 0,
        warning_count: 0,
        info_count: 0,
    }
}

fn build_extractors(
    config: &AnalysisConfig,
    inputs: ExternalInputs,
) -> Vec<Box<dyn crate::core::featureset::FeatureExtractor>> {
    vec![
        Box::new(ComplexityExtractor::new()),
        Box::new(GraphExtractor::new(config.packs.centrality_samples)),
        Box::new(RefactoringSignalExtractor::new()),
        Box::new(CloneExtractor::new(inputs.clone_groups)),
    ]
}

/// Build all five pack families, rank them, and apply non-overlap selection
/// (spec §4.7).
fn build_packs(config: &AnalysisConfig, index: &ParseIndex, inputs: &ExternalInputs) -> Vec<ImpactPack> {
    let mut packs = Vec::new();
    let enable = &config.packs.enable;

    if enable.clone_consolidation {
        packs.extend(build_clone_packs(
            index,
            &inputs.clone_groups,
            config.packs.clone_min_similarity,
            config.packs.clone_min_total_loc,
            config.packs.clone_max_parameters,
        ));
    }
    if enable.cycle_cut {
        packs.extend(build_cycle_packs(index, config.packs.centrality_samples));
    }
    if enable.chokepoint_elimination {
        packs.extend(build_chokepoint_packs(index, config.packs.centrality_samples, 3));
    }
    if enable.coverage_improvement {
        if let Some(report) = &inputs.coverage {
            packs.extend(build_coverage_packs(index, report));
        }
    }
    if enable.structure_split {
        packs.extend(build_file_split_packs(
            index,
            &inputs.community_assignments,
            config.structure.large_file_lines,
        ));
        packs.extend(build_branch_reorg_packs(
            index,
            &inputs.community_assignments,
            config.structure.overcrowded_directory_files,
        ));
    }

    rank_and_select(packs, config.packs.non_overlap, config.packs.max_packs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn empty_repository_yields_zero_counts_and_no_error() {
        let dir = tempdir().unwrap();
        let mut config = AnalysisConfig::default();
        config.roots.push(dir.path().to_string_lossy().to_string());

        let cancellation = CancellationToken::new(std::sync::atomic::AtomicBool::new(false));
        let result = run(config, ExternalInputs::default(), cancellation).await.unwrap();

        assert_eq!(result.file_count, 0);
        assert_eq!(result.entity_count, 0);
        assert!(result.packs.is_empty());
        assert_eq!(result.error_count, 0);
    }

    #[tokio::test]
    async fn single_file_with_no_imports_has_no_cycle_or_chokepoint_packs() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "def foo():\n    return 1\n").unwrap();
        let mut config = AnalysisConfig::default();
        config.roots.push(dir.path().to_string_lossy().to_string());
        config.languages.push("python".to_string());

        let cancellation = CancellationToken::new(std::sync::atomic::AtomicBool::new(false));
        let result = run(config, ExternalInputs::default(), cancellation).await.unwrap();

        assert_eq!(result.file_count, 1);
        assert!(result.entity_count >= 1);
        assert!(result.packs.iter().all(|p| !matches!(
            p.kind,
            crate::packs::PackKind::CycleCut | crate::packs::PackKind::ChokepointElimination
        )));
    }

    #[tokio::test]
    async fn cancellation_before_start_yields_empty_result() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "x = 1\n").unwrap();
        let mut config = AnalysisConfig::default();
        config.roots.push(dir.path().to_string_lossy().to_string());

        let cancellation = CancellationToken::new(std::sync::atomic::AtomicBool::new(true));
        let result = run(config, ExternalInputs::default(), cancellation).await.unwrap();

        assert_eq!(result.file_count, 0);
        assert_eq!(result.entity_count, 0);
    }
}
