//! Writing the converted file set to disk.

use crate::engine::ConvertedFile;
use crate::errors::{MigrateError, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Overwrite changed files under the repository root.
    InPlace,
    /// Mirror the full converted set under a directory.
    Dir(PathBuf),
}

#[derive(Debug, Default)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    pub unchanged: usize,
    /// Names that would escape the destination; never written.
    pub rejected: Vec<String>,
}

pub fn write_converted(
    root: &Path,
    files: &[ConvertedFile],
    dest: &Destination,
) -> Result<WriteReport> {
    let mut report = WriteReport::default();
    for file in files {
        let Some(rel) = safe_relative(&file.file_name) else {
            tracing::warn!(file = %file.file_name, "refusing to write outside destination");
            report.rejected.push(file.file_name.clone());
            continue;
        };
        let target = match dest {
            Destination::InPlace => {
                if !file.changed {
                    report.unchanged += 1;
                    continue;
                }
                root.join(rel)
            }
            Destination::Dir(dir) => dir.join(rel),
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| MigrateError::io(parent.to_string_lossy(), e))?;
        }
        fs::write(&target, &file.converted_content)
            .map_err(|e| MigrateError::io(target.to_string_lossy(), e))?;
        tracing::debug!(path = %target.display(), "wrote");
        report.written.push(target);
    }
    Ok(report)
}

fn safe_relative(name: &str) -> Option<PathBuf> {
    let p = Path::new(name);
    let ok = !name.is_empty()
        && p.components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    ok.then(|| p.to_path_buf())
}
