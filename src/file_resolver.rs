//! Finds the file named by a `file=` attribute below a search root.
//!
//! Candidates are enumerated with `ignore`'s walker, sorted by file name at
//! every level, so the first match is stable across runs and platforms. An
//! exact relative path wins; otherwise the pattern is matched as
//! `**/<pattern>` against the trailing path segments.

use globset::{GlobBuilder, GlobMatcher};
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No file matching '{pattern}' found below {root}")]
    NotFound { pattern: String, root: String },
    #[error("Invalid file pattern '{pattern}': {source}")]
    InvalidPattern { pattern: String, source: globset::Error },
    #[error("Failed to read '{path}': {source}")]
    Read { path: String, source: std::io::Error },
}

/// A resolved `file=` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Path relative to the search root, `/`-separated.
    pub relative_path: String,
    pub path: PathBuf,
    pub contents: String,
}

pub struct FileResolver {
    root: PathBuf,
}

impl FileResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `pattern` and reads the first matching file.
    pub fn resolve(&self, pattern: &str) -> Result<ResolvedFile, ResolveError> {
        let wanted = pattern.trim_start_matches("./");
        let matcher = suffix_matcher(wanted)?;
        let candidates = self.candidates();

        let exact = candidates.iter().find(|(relative, _)| relative == wanted);
        let hit = match exact {
            Some(hit) => hit,
            None => {
                let mut matches = candidates.iter().filter(|(relative, _)| matcher.is_match(relative));
                let first = matches.next().ok_or_else(|| ResolveError::NotFound {
                    pattern: pattern.to_string(),
                    root: self.root.display().to_string(),
                })?;
                if matches.next().is_some() {
                    log::warn!(
                        "File pattern '{pattern}' is ambiguous, using '{}'. Use a longer path to pick another.",
                        first.0
                    );
                }
                first
            }
        };

        let (relative_path, path) = hit.clone();
        log::debug!("Resolved file pattern '{pattern}' to {}", path.display());
        let contents = fs::read_to_string(&path).map_err(|source| ResolveError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(ResolvedFile {
            relative_path,
            path,
            contents,
        })
    }

    /// Files below the root in traversal order, with their relative paths.
    fn candidates(&self) -> Vec<(String, PathBuf)> {
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .standard_filters(false)
            .hidden(true)
            .follow_links(true)
            .sort_by_file_name(|a, b| a.cmp(b));

        let mut files = Vec::new();
        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::debug!("Skipping unreadable entry while searching for files: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push((relative, entry.into_path()));
        }
        files
    }
}

fn suffix_matcher(pattern: &str) -> Result<GlobMatcher, ResolveError> {
    let glob = GlobBuilder::new(&format!("**/{pattern}"))
        .literal_separator(true)
        .build()
        .map_err(|source| ResolveError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
    Ok(glob.compile_matcher())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn tree(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().expect("Failed to create temp dir");
        for (path, contents) in files {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, contents).unwrap();
        }
        dir
    }

    #[test]
    fn test_resolve_by_file_name() {
        let dir = tree(&[("src/deep/x.py", "print(1)\n")]);
        let resolved = FileResolver::new(dir.path()).resolve("x.py").unwrap();
        assert_eq!(resolved.relative_path, "src/deep/x.py");
        assert_eq!(resolved.contents, "print(1)\n");
    }

    #[test]
    fn test_exact_relative_path_wins() {
        let dir = tree(&[("a/x.py", "a"), ("x.py", "root"), ("b/x.py", "b")]);
        let resolver = FileResolver::new(dir.path());
        assert_eq!(resolver.resolve("x.py").unwrap().contents, "root");
        assert_eq!(resolver.resolve("b/x.py").unwrap().contents, "b");
        assert_eq!(resolver.resolve("./b/x.py").unwrap().contents, "b");
    }

    #[test]
    fn test_ambiguous_match_is_first_in_sorted_order() {
        let dir = tree(&[("zeta/util.py", "z"), ("alpha/util.py", "a")]);
        let resolved = FileResolver::new(dir.path()).resolve("util.py").unwrap();
        assert_eq!(resolved.relative_path, "alpha/util.py");
    }

    #[test]
    fn test_suffix_must_align_with_segments() {
        let dir = tree(&[("src/myx.py", "no")]);
        let result = FileResolver::new(dir.path()).resolve("x.py");
        assert!(matches!(result, Err(ResolveError::NotFound { .. })));
    }

    #[test]
    fn test_glob_pattern() {
        let dir = tree(&[("scripts/run.rb", "puts 1")]);
        let resolved = FileResolver::new(dir.path()).resolve("*.rb").unwrap();
        assert_eq!(resolved.relative_path, "scripts/run.rb");
    }

    #[test]
    fn test_hidden_files_are_skipped() {
        let dir = tree(&[(".cache/x.py", "hidden")]);
        let result = FileResolver::new(dir.path()).resolve("x.py");
        assert!(matches!(result, Err(ResolveError::NotFound { .. })));
    }

    #[test]
    fn test_not_found_message() {
        let dir = tree(&[]);
        let err = FileResolver::new(dir.path()).resolve("missing.py").unwrap_err();
        assert!(err.to_string().contains("No file matching 'missing.py'"));
    }
}
