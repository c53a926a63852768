//! Filesystem helpers shared by recipes and declaration code

use crate::error::{EngineError, EngineResult};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Collect files under `root` whose extension matches one of `extensions`.
///
/// Results are sorted so declaration order is stable across runs.
pub fn iter_files(root: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
            if extensions.contains(&ext) {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    files
}

/// Re-root `path` from `from_root` into `to_root`, keeping the relative part.
pub fn rebase(path: &Path, from_root: &Path, to_root: &Path) -> EngineResult<PathBuf> {
    let relative = path.strip_prefix(from_root).map_err(|_| {
        EngineError::InvalidTarget(format!(
            "{} is not under {}",
            path.display(),
            from_root.display()
        ))
    })?;
    Ok(to_root.join(relative))
}

/// Copy a file, creating the destination's parent directories.
pub fn copy_file(from: &Path, to: &Path) -> EngineResult<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
    }
    fs::copy(from, to).map_err(|e| EngineError::io(to, e))?;
    Ok(())
}

/// Remove files or directories; missing paths are ignored.
pub fn remove_any<I, P>(paths: I) -> EngineResult<()>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    for path in paths {
        let path = path.as_ref();
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(EngineError::io(path, e)),
        };
        if meta.is_dir() {
            fs::remove_dir_all(path).map_err(|e| EngineError::io(path, e))?;
        } else {
            fs::remove_file(path).map_err(|e| EngineError::io(path, e))?;
        }
    }
    Ok(())
}
