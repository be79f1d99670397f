//! Staging directory scanner
//!
//! Recursive discovery of penetrometer CSV files. Unzipped archives often carry
//! platform junk (`__MACOSX`, `._*` resource forks), which is skipped.
//!
//! Symlinks are followed. A link back to an ancestor directory is reported by
//! walkdir as a loop error, logged, and not descended into.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::error::ImportError;

/// CSV file scanner
pub struct FileScanner {
    ignore_patterns: Vec<String>,
}

impl FileScanner {
    /// Create new file scanner with default ignore patterns
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "__MACOSX".to_string(),
                ".git".to_string(),
                "Thumbs.db".to_string(),
            ],
        }
    }

    /// All `*.csv` files under `root_path`, sorted by path
    ///
    /// The extension match is case-insensitive. Unreadable entries are logged
    /// and skipped.
    pub fn scan(&self, root_path: &Path) -> Result<Vec<PathBuf>, ImportError> {
        if !root_path.exists() {
            return Err(ImportError::StagingRootNotFound(root_path.to_path_buf()));
        }

        if !root_path.is_dir() {
            return Err(ImportError::NotADirectory(root_path.to_path_buf()));
        }

        let mut files = Vec::new();

        let walker = WalkDir::new(root_path)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && is_csv(entry.path()) {
                        files.push(entry.path().to_path_buf());
                    }
                }
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                }
            }
        }

        files.sort();
        tracing::debug!("{} CSV files found under {}", files.len(), root_path.display());

        Ok(files)
    }

    fn should_process_entry(&self, entry: &DirEntry) -> bool {
        let file_name = entry.file_name().to_string_lossy();

        if entry.depth() > 0 && file_name.starts_with("._") {
            return false;
        }

        for pattern in &self.ignore_patterns {
            if file_name.contains(pattern.as_str()) {
                return false;
            }
        }

        true
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

/// Name of the directory immediately containing `path`
pub fn parent_folder_name(path: &Path) -> String {
    path.parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_nonexistent_path() {
        let scanner = FileScanner::new();
        let result = scanner.scan(Path::new("/nonexistent/staging"));
        assert!(matches!(result, Err(ImportError::StagingRootNotFound(_))));
    }

    #[test]
    fn test_scan_file_instead_of_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("one.csv");
        fs::write(&file, "x").unwrap();

        let result = FileScanner::new().scan(&file);
        assert!(matches!(result, Err(ImportError::NotADirectory(_))));
    }

    #[test]
    fn test_scan_finds_nested_csv_and_skips_junk() {
        let dir = TempDir::new().unwrap();
        let field = dir.path().join("FIELD001").join("nested");
        fs::create_dir_all(&field).unwrap();
        fs::create_dir_all(dir.path().join("__MACOSX").join("FIELD001")).unwrap();

        fs::write(field.join("b.CSV"), "x").unwrap();
        fs::write(dir.path().join("FIELD001").join("a.csv"), "x").unwrap();
        fs::write(dir.path().join("FIELD001").join("._a.csv"), "x").unwrap();
        fs::write(dir.path().join("FIELD001").join("notes.txt"), "x").unwrap();
        fs::write(dir.path().join("__MACOSX").join("FIELD001").join("a.csv"), "x").unwrap();

        let files = FileScanner::new().scan(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a.csv", "b.CSV"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_follows_symlinks_and_survives_loops() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let field = dir.path().join("FIELD001");
        fs::create_dir_all(&field).unwrap();
        fs::write(outside.path().join("shared.csv"), "x").unwrap();

        std::os::unix::fs::symlink(outside.path().join("shared.csv"), field.join("linked.csv")).unwrap();
        std::os::unix::fs::symlink(dir.path(), field.join("back")).unwrap();

        let files = FileScanner::new().scan(dir.path()).unwrap();
        assert_eq!(files, vec![field.join("linked.csv")]);
        assert_eq!(parent_folder_name(&files[0]), "FIELD001");
    }

    #[test]
    fn test_parent_folder_name() {
        assert_eq!(parent_folder_name(Path::new("/staging/FIELD001/x.csv")), "FIELD001");
        assert_eq!(parent_folder_name(Path::new("x.csv")), "");
    }
}
