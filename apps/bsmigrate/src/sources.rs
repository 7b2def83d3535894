//! Input collection: expand glob patterns under a root into decoded files.

use crate::engine::InputFile;
use crate::errors::{MigrateError, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedInput {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct Collected {
    pub files: Vec<InputFile>,
    pub skipped: Vec<SkippedInput>,
}

/// Expand `patterns` relative to `root`. Matches are deduplicated and sorted
/// by path; anything under `exclude` is ignored. Files that cannot be read
/// or are not UTF-8 are reported in `skipped` instead of failing the run.
pub fn collect(root: &Path, patterns: &[String], exclude: Option<&Path>) -> Result<Collected> {
    let mut paths: BTreeSet<PathBuf> = BTreeSet::new();
    for pat in patterns {
        let abs_glob = root.join(pat);
        let pattern = abs_glob.to_string_lossy().to_string();
        let entries = glob::glob(&pattern).map_err(|source| MigrateError::Pattern {
            pattern: pat.clone(),
            source,
        })?;
        for path in entries.flatten() {
            if !path.is_file() {
                continue;
            }
            if exclude.is_some_and(|ex| path.starts_with(ex)) {
                continue;
            }
            paths.insert(path);
        }
    }

    let mut out = Collected::default();
    for path in paths {
        let name = relative_name(root, &path);
        match read_text(&path) {
            Ok(content) => out.files.push(InputFile { name, content }),
            Err(reason) => {
                tracing::warn!(file = %name, %reason, "skipping input");
                out.skipped.push(SkippedInput { path: name, reason });
            }
        }
    }
    tracing::debug!(files = out.files.len(), skipped = out.skipped.len(), "inputs collected");
    Ok(out)
}

/// Read a single file named on the command line.
pub fn read_one(root: &Path, path: &Path) -> Result<InputFile> {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    let name = relative_name(root, &abs);
    let content = read_text(&abs).map_err(|reason| {
        MigrateError::io(
            &name,
            std::io::Error::new(std::io::ErrorKind::InvalidData, reason),
        )
    })?;
    Ok(InputFile { name, content })
}

fn read_text(path: &Path) -> std::result::Result<String, String> {
    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|_| "not valid UTF-8".to_string())
}

/// Forward-slash path of `path` relative to `root`, or the path as given.
pub fn relative_name(root: &Path, path: &Path) -> String {
    let rel = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
