//! Factory utilities for the built-in language adapters (spec §4.2, §9
//! "Adapter polymorphism": a tagged-variant registry keyed by language tag,
//! not an inheritance hierarchy).

use std::path::Path;

use crate::core::errors::{CoreError, Result};
use crate::lang::common::LanguageAdapter;
use crate::lang::go::GoAdapter;
use crate::lang::javascript::JavaScriptAdapter;
use crate::lang::python::PythonAdapter;
use crate::lang::rust::RustAdapter;
use crate::lang::typescript::TypeScriptAdapter;

/// Metadata describing one of the built-in language adapters.
#[derive(Debug, Clone, Copy)]
pub struct LanguageInfo {
    /// Canonical language tag, e.g. `python`.
    pub key: &'static str,
    /// File extensions (without leading dots) the adapter claims.
    pub extensions: &'static [&'static str],
}

const REGISTERED_LANGUAGES: &[LanguageInfo] = &[
    LanguageInfo { key: "python", extensions: &["py"] },
    LanguageInfo { key: "javascript", extensions: &["js", "mjs", "cjs"] },
    LanguageInfo { key: "typescript", extensions: &["ts", "tsx"] },
    LanguageInfo { key: "rust", extensions: &["rs"] },
    LanguageInfo { key: "go", extensions: &["go"] },
];

/// Every language tag this build ships an adapter for.
pub fn registered_languages() -> &'static [LanguageInfo] {
    REGISTERED_LANGUAGES
}

/// Identify the canonical language tag for a file path, by extension.
pub fn language_key_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    REGISTERED_LANGUAGES
        .iter()
        .find(|info| info.extensions.contains(&ext))
        .map(|info| info.key)
}

/// Construct the adapter for a given language tag.
pub fn adapter_for_language(language: &str) -> Result<Box<dyn LanguageAdapter>> {
    match language {
        "python" => Ok(Box::new(PythonAdapter::new())),
        "javascript" => Ok(Box::new(JavaScriptAdapter::new())),
        "typescript" => Ok(Box::new(TypeScriptAdapter::new())),
        "rust" => Ok(Box::new(RustAdapter::new())),
        "go" => Ok(Box::new(GoAdapter::new())),
        other => Err(CoreError::config(format!(
            "no language adapter registered for '{other}'"
        ))),
    }
}

/// Construct every adapter enabled by `languages` (all registered
/// languages when `languages` is empty).
pub fn enabled_adapters(languages: &[String]) -> Vec<Box<dyn LanguageAdapter>> {
    REGISTERED_LANGUAGES
        .iter()
        .filter(|info| languages.is_empty() || languages.iter().any(|l| l == info.key))
        .filter_map(|info| adapter_for_language(info.key).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn resolves_language_by_extension() {
        assert_eq!(language_key_for_path(&PathBuf::from("a.py")), Some("python"));
        assert_eq!(language_key_for_path(&PathBuf::from("a.rs")), Some("rust"));
        assert_eq!(language_key_for_path(&PathBuf::from("a.unknown")), None);
    }

    #[test]
    fn enabled_adapters_empty_filter_returns_all() {
        let adapters = enabled_adapters(&[]);
        assert_eq!(adapters.len(), REGISTERED_LANGUAGES.len());
    }

    #[test]
    fn enabled_adapters_respects_filter() {
        let adapters = enabled_adapters(&["python".to_string()]);
        assert_eq!(adapters.len(), 1);
        assert_eq!(adapters[0].language(), "python");
    }
}
