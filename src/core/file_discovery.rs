//! C1: File Discovery.
//!
//! Enumerates candidate source files from root paths, honoring include and
//! exclude globs, an enabled-languages filter, and (via the `ignore` crate)
//! VCS-ignore metadata. Never reads file contents.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use tracing::warn;

use crate::core::diagnostics::DiagnosticSink;
use crate::core::errors::{CoreError, Result};

/// Files grouped by the language tag whose extension they matched.
pub type FilesByLanguage = HashMap<String, Vec<PathBuf>>;

/// A language's claimed file extensions, used to bucket discovered files.
pub struct LanguageExtensions {
    pub language: String,
    pub extensions: Vec<String>,
}

/// Discover files under `roots`, filtered by glob and language, grouping the
/// survivors by the language tag whose extensions matched.
pub fn discover_files(
    roots: &[String],
    include: &[String],
    exclude: &[String],
    languages: &[LanguageExtensions],
    diagnostics: &mut DiagnosticSink,
) -> Result<FilesByLanguage> {
    if roots.is_empty() {
        return Err(CoreError::config_field(
            "no root paths configured",
            "roots",
        ));
    }

    for root in roots {
        if !Path::new(root).exists() {
            return Err(CoreError::config(format!(
                "root path does not exist: {root}"
            )));
        }
    }

    let include_set = build_globset(include)?;
    let exclude_set = build_globset(exclude)?;

    let extension_to_language = build_extension_map(languages);

    let mut result: FilesByLanguage = HashMap::new();
    let mut total = 0usize;

    for root in roots {
        let walker = WalkBuilder::new(root).hidden(false).build();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    diagnostics.warning(format!("walk error: {err}"), None);
                    continue;
                }
            };
            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }
            let path = entry.path();

            if !include_set.is_empty() && !include_set.is_match(path) {
                continue;
            }
            if exclude_set.is_match(path) {
                continue;
            }

            let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            let Some(language) = extension_to_language.get(extension) else {
                continue;
            };

            result.entry(language.clone()).or_default().push(path.to_path_buf());
            total += 1;
        }
    }

    // Deterministic ordering: sort each language's file list.
    for files in result.values_mut() {
        files.sort();
    }

    if total == 0 {
        warn!("no files found under configured roots");
        diagnostics.warning("no files found under configured roots", None);
    }

    Ok(result)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|err| CoreError::config(format!("invalid glob '{pattern}': {err}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|err| CoreError::config(format!("invalid glob set: {err}")))
}

fn build_extension_map(languages: &[LanguageExtensions]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for lang in languages {
        for ext in &lang.extensions {
            map.insert(ext.clone(), lang.language.clone());
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn python() -> LanguageExtensions {
        LanguageExtensions {
            language: "python".to_string(),
            extensions: vec!["py".to_string()],
        }
    }

    #[test]
    fn missing_root_is_config_error() {
        let mut diagnostics = DiagnosticSink::new();
        let result = discover_files(
            &["/does/not/exist".to_string()],
            &[],
            &[],
            &[python()],
            &mut diagnostics,
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_repository_yields_empty_result_without_error() {
        let dir = tempdir().unwrap();
        let mut diagnostics = DiagnosticSink::new();
        let result = discover_files(
            &[dir.path().to_string_lossy().to_string()],
            &[],
            &[],
            &[python()],
            &mut diagnostics,
        )
        .unwrap();
        assert!(result.is_empty());
        assert!(diagnostics.entries().iter().any(|d| d.message.contains("no files found")));
    }

    #[test]
    fn groups_files_by_language_extension() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "x = 1").unwrap();
        fs::write(dir.path().join("b.txt"), "not code").unwrap();
        let mut diagnostics = DiagnosticSink::new();
        let result = discover_files(
            &[dir.path().to_string_lossy().to_string()],
            &[],
            &[],
            &[python()],
            &mut diagnostics,
        )
        .unwrap();
        assert_eq!(result.get("python").map(Vec::len), Some(1));
    }

    #[test]
    fn exclude_glob_filters_matches() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("vendor/a.py"), "x = 1").unwrap();
        fs::write(dir.path().join("b.py"), "x = 1").unwrap();
        let mut diagnostics = DiagnosticSink::new();
        let result = discover_files(
            &[dir.path().to_string_lossy().to_string()],
            &[],
            &["**/vendor/**".to_string()],
            &[python()],
            &mut diagnostics,
        )
        .unwrap();
        assert_eq!(result.get("python").map(Vec::len), Some(1));
    }
}
