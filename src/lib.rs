//! # codewright-rs: multi-language refactor-opportunity analysis core
//!
//! This crate is the analysis core of a static code-analysis engine: it
//! ingests multi-language source repositories and produces a ranked list of
//! refactoring opportunities ("impact packs") — clone consolidations, cycle
//! cuts, architectural chokepoints, coverage gaps, and structural
//! reorganizations.
//!
//! The pipeline, in dependency order:
//!
//! 1. **File discovery** ([`core::file_discovery`]) — enumerate candidate
//!    source files, honoring include/exclude globs and VCS-ignore metadata.
//! 2. **Language adapters** ([`lang`]) — parse files of one language into a
//!    uniform [`core::entity::Entity`] set via `tree-sitter`.
//! 3. **Parse index** ([`core::parse_index`]) — merge per-language output
//!    into one entity map plus import and call graphs.
//! 4. **Feature extractors** ([`features`]) — compute per-entity numeric
//!    features: complexity, graph centrality, refactoring-smell signals,
//!    clone mass.
//! 5. **Normalizer** ([`core::normalizer`]) — fit a distribution per feature
//!    across the corpus, then transform raw values into `[0,1]`.
//! 6. **Ranking** ([`core::scoring`]) — combine normalized features into a
//!    composite priority score and sort entities.
//! 7. **Impact pack builder** ([`packs`]) — synthesize ranked refactor
//!    recommendations from the parse index, clone groups, and optional
//!    coverage/structure inputs.
//!
//! [`core::pipeline::run`] wires all seven stages together. Command-line
//! entry points, configuration-file loading, report rendering, disk
//! caching, coverage-report parsing, and clone token-hashing are treated as
//! external collaborators with narrow input contracts — this crate never
//! performs them itself.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "mimalloc")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Core analysis algorithms and shared data structures.
pub mod core {
    //! Entity model, parse index, configuration, errors, diagnostics,
    //! normalization, scoring, and the pipeline that drives all seven
    //! pipeline stages end to end.

    pub mod config;
    pub mod diagnostics;
    pub mod entity;
    pub mod errors;
    pub mod featureset;
    pub mod file_discovery;
    pub mod graph_algo;
    pub mod inputs;
    pub mod normalizer;
    pub mod parse_index;
    pub mod pipeline;
    pub mod scoring;
}

/// Per-entity numeric feature extractors (complexity, graph, refactoring
/// signals, clone mass).
pub mod features;

/// Language-specific `tree-sitter` adapters plus the adapter registry.
pub mod lang {
    //! One adapter per supported language, sharing the tree-walking and
    //! import-resolution machinery in [`common`].

    pub mod common;
    pub mod go;
    pub mod javascript;
    pub mod python;
    pub mod registry;
    pub mod rust;
    pub mod typescript;

    pub use common::{AdapterStatus, EntityWalker, LanguageAdapter};
    pub use registry::{adapter_for_language, enabled_adapters, language_key_for_path, registered_languages};
}

/// Impact-pack synthesis: the five pack families, ranking, and non-overlap
/// selection.
pub mod packs;

pub use core::config::AnalysisConfig;
pub use core::errors::{CoreError, Result};
pub use core::pipeline::{run, AnalysisResult, CancellationToken, ExternalInputs};

/// Library version, matching `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
