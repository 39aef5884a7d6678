//! Path utilities for export destinations

use std::path::{Path, PathBuf};

/// Path helpers shared by the engines and the export coordinator
pub struct PathUtils;

impl PathUtils {
    /// Lowercase file extension
    pub fn get_extension(path: &Path) -> Option<String> {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .filter(|ext| !ext.is_empty())
    }

    /// File stem (name without extension)
    pub fn get_stem(path: &Path) -> Option<String> {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
    }

    /// First path under `dir` named `name` that does not exist yet
    ///
    /// `12_clips` becomes `12_clips (2)`, `12.mp4` becomes `12 (2).mp4`.
    pub fn unique_path(dir: &Path, name: &str) -> PathBuf {
        let candidate = dir.join(name);
        if !candidate.exists() {
            return candidate;
        }

        let as_path = Path::new(name);
        let stem = Self::get_stem(as_path).unwrap_or_else(|| name.to_string());
        let ext = Self::get_extension(as_path);
        let mut n = 2u32;
        loop {
            let file_name = match &ext {
                Some(ext) => format!("{} ({}).{}", stem, n, ext),
                None => format!("{} ({})", stem, n),
            };
            let candidate = dir.join(file_name);
            if !candidate.exists() {
                return candidate;
            }
            n += 1;
        }
    }
}
