//! Document collector: walk a local directory and read indexable files.
//!
//! A file is collected when its name ends with one of the configured
//! extensions, it is not under an excluded glob, it reads as UTF-8, and its
//! trimmed content is non-empty. Unreadable files are skipped with a
//! warning; they never abort the collection.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use repo_chat_core::models::Document;
use repo_chat_core::{Error, Result};

use crate::config::CollectorConfig;

/// Documents found under a root plus counts of what was skipped.
#[derive(Debug, Default)]
pub struct Collection {
    /// Sorted by id.
    pub documents: Vec<Document>,
    pub skipped_unreadable: usize,
    pub skipped_empty: usize,
    pub skipped_extension: usize,
}

/// Collect documents under `root`.
///
/// Document ids and `metadata.path` are the file path as reached from
/// `root` (i.e. `root` joined with the relative path).
///
/// # Errors
///
/// Returns [`Error::Collection`] when `root` is missing or not a directory,
/// or when an exclude glob is invalid.
pub fn collect_documents(root: &Path, cfg: &CollectorConfig) -> Result<Collection> {
    if !root.is_dir() {
        return Err(Error::Collection {
            path: root.display().to_string(),
            reason: "not an existing directory".to_string(),
        });
    }

    let extensions = normalize_extensions(&cfg.extensions);
    let exclude_set = build_globset(&cfg.exclude_globs).map_err(|e| Error::Collection {
        path: root.display().to_string(),
        reason: format!("invalid exclude glob: {}", e),
    })?;

    let mut collection = Collection::default();

    for entry in WalkDir::new(root).follow_links(cfg.follow_symlinks) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                collection.skipped_unreadable += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if exclude_set.is_match(relative) {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if !extensions.iter().any(|ext| file_name.ends_with(ext.as_str())) {
            collection.skipped_extension += 1;
            continue;
        }

        let path_str = path.to_string_lossy().to_string();
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path_str, error = %e, "Skipping unreadable file");
                collection.skipped_unreadable += 1;
                continue;
            }
        };

        if content.trim().is_empty() {
            debug!(path = %path_str, "Skipping empty file");
            collection.skipped_empty += 1;
            continue;
        }

        collection.documents.push(Document::from_path(path_str, content));
    }

    collection.documents.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(collection)
}

/// Ensure every extension starts with a dot.
fn normalize_extensions(exts: &[String]) -> Vec<String> {
    exts.iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .map(|e| {
            if e.starts_with('.') {
                e.to_string()
            } else {
                format!(".{}", e)
            }
        })
        .collect()
}

fn build_globset(patterns: &[String]) -> std::result::Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn ids(c: &Collection, root: &Path) -> Vec<String> {
        c.documents
            .iter()
            .map(|d| {
                Path::new(&d.id)
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_selects_by_extension() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join("a.py"), "def foo(): pass").unwrap();
        fs::write(root.join("b.md"), "# notes").unwrap();
        fs::write(root.join("c.png"), [0x89u8, 0x50, 0x4e, 0x47, 0x00, 0xff]).unwrap();

        let c = collect_documents(root, &CollectorConfig::default()).unwrap();
        assert_eq!(ids(&c, root), vec!["a.py", "b.md"]);
        assert_eq!(c.skipped_extension, 1);
        assert_eq!(c.documents[0].content, "def foo(): pass");
        assert_eq!(c.documents[0].id, c.documents[0].metadata.path);
    }

    #[test]
    fn test_recurses_and_skips_empty() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("src/lib")).unwrap();
        fs::write(root.join("src/lib/util.ts"), "export const x = 1;").unwrap();
        fs::write(root.join("src/app.js"), "console.log(1)").unwrap();
        fs::write(root.join("blank.py"), "   \n\t\n").unwrap();

        let c = collect_documents(root, &CollectorConfig::default()).unwrap();
        assert_eq!(ids(&c, root), vec!["src/app.js", "src/lib/util.ts"]);
        assert_eq!(c.skipped_empty, 1);
    }

    #[test]
    fn test_skips_non_utf8_without_failing() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join("bad.py"), [0xffu8, 0xfe, 0xfd]).unwrap();
        fs::write(root.join("good.py"), "x = 1").unwrap();

        let c = collect_documents(root, &CollectorConfig::default()).unwrap();
        assert_eq!(ids(&c, root), vec!["good.py"]);
        assert_eq!(c.skipped_unreadable, 1);
    }

    #[test]
    fn test_default_excludes_git_dir() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join(".git/hooks")).unwrap();
        fs::write(root.join(".git/hooks/pre-commit.py"), "print(1)").unwrap();
        fs::write(root.join("main.py"), "print(2)").unwrap();

        let c = collect_documents(root, &CollectorConfig::default()).unwrap();
        assert_eq!(ids(&c, root), vec!["main.py"]);
    }

    #[test]
    fn test_configured_extensions_without_dot() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join("lib.rs"), "fn main() {}").unwrap();
        fs::write(root.join("a.py"), "pass").unwrap();

        let cfg = CollectorConfig {
            extensions: vec!["rs".to_string()],
            ..CollectorConfig::default()
        };
        let c = collect_documents(root, &cfg).unwrap();
        assert_eq!(ids(&c, root), vec!["lib.rs"]);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = collect_documents(&tmp.path().join("nope"), &CollectorConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::Collection { .. }));
    }
}
