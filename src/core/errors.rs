//! Error types for the analysis core.
//!
//! Mirrors the error-kind taxonomy in the design: configuration errors are
//! fatal, per-file/per-entity/per-extractor errors are recovered locally and
//! recorded as diagnostics instead of aborting the run.

use thiserror::Error;

/// Result alias used throughout the analysis core.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors produced by the analysis core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration or missing required roots. Fatal.
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable description.
        message: String,
        /// Offending configuration field, if identifiable.
        field: Option<String>,
    },

    /// A single file failed to parse. Recorded as a diagnostic, file skipped.
    #[error("parse error in {language} ({file_path}): {message}")]
    Parse {
        /// Source language tag.
        language: String,
        /// File that failed to parse.
        file_path: String,
        /// Error description.
        message: String,
    },

    /// No adapter registered for a requested language.
    #[error("language not supported: {language}")]
    LanguageNotSupported {
        /// Requested language tag.
        language: String,
    },

    /// A single feature failed to compute for a single entity.
    #[error("feature extraction error in {extractor} for {entity_id}: {message}")]
    FeatureExtraction {
        /// Extractor name.
        extractor: String,
        /// Entity the feature was being computed for.
        entity_id: String,
        /// Error description.
        message: String,
    },

    /// Cache corrupted or unreadable; the run bypasses it.
    #[error("cache error: {message}")]
    Cache {
        /// Error description.
        message: String,
    },

    /// Wrapped I/O error.
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable description.
        message: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    /// Build a [`CoreError::Config`] without a specific field.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: None,
        }
    }

    /// Build a [`CoreError::Config`] naming the offending field.
    pub fn config_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            message: source.to_string(),
            source,
        }
    }
}
