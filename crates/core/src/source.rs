//! Source provider abstraction.
//!
//! The CLI reads script files through a [`SourceProvider`]; editors hand
//! buffers to the checker directly.

use std::path::{Path, PathBuf};

/// File extensions treated as checkable script sources. JSX dialects are
/// not parsed, so `.tsx` and `.jsx` are left out.
pub const SCRIPT_EXTENSIONS: &[&str] = &["ts", "mts", "cts", "js", "mjs", "cjs"];

/// Directories never descended into when collecting sources.
const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "target", "dist"];

pub trait SourceProvider {
    /// Read the source text for a given path.
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error>;

    /// Expand `root` into the script files underneath it, sorted. A path
    /// naming a single file yields that file regardless of extension.
    fn collect_sources(&self, root: &Path) -> Result<Vec<PathBuf>, std::io::Error>;
}

/// True for paths whose extension marks them as script sources. Type
/// declaration files (`.d.ts`) are excluded.
pub fn is_script_path(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if name.ends_with(".d.ts") {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext))
}

/// Filesystem-backed provider.
pub struct FileSystemProvider;

impl FileSystemProvider {
    fn walk(&self, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), std::io::Error> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                let skipped = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| SKIPPED_DIRS.contains(&n));
                if !skipped {
                    self.walk(&path, out)?;
                }
            } else if is_script_path(&path) {
                out.push(path);
            }
        }
        Ok(())
    }
}

impl SourceProvider for FileSystemProvider {
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        std::fs::read_to_string(path)
    }

    fn collect_sources(&self, root: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
        if root.is_file() {
            return Ok(vec![root.to_path_buf()]);
        }
        let mut out = Vec::new();
        self.walk(root, &mut out)?;
        out.sort();
        Ok(out)
    }
}
