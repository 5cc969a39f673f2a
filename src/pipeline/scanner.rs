// file: src/pipeline/scanner.rs
// description: Directory walking and file discovery with filtering
// reference: https://docs.rs/walkdir

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::extractor::FileKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub struct FileScanner {
    skip_patterns: Vec<String>,
    max_file_size: u64,
}

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub relative_path: String,
    pub kind: FileKind,
    pub size: u64,
}

impl FileScanner {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            skip_patterns: config.skip_patterns.clone(),
            max_file_size: (config.max_file_size_mb as u64) * 1_048_576,
        }
    }

    /// Resolves a mix of files and directories. Files named explicitly must
    /// have a supported extension; directories are walked and unsupported
    /// files in them are ignored.
    pub fn scan_paths(&self, paths: &[PathBuf]) -> Result<Vec<ScannedFile>> {
        let mut files = Vec::new();

        for path in paths {
            if path.is_dir() {
                files.extend(self.scan_directory(path)?);
            } else if path.is_file() {
                let kind = crate::utils::Validator::validate_supported_extension(path)?;
                let root = path.parent().unwrap_or(Path::new(""));
                if let Some(file) = self.accept(path, root, kind) {
                    files.push(file);
                }
            } else {
                return Err(PipelineError::Validation(format!(
                    "Path does not exist: {}",
                    path.display()
                )));
            }
        }

        Ok(files)
    }

    pub fn scan_directory(&self, root: &Path) -> Result<Vec<ScannedFile>> {
        info!("Scanning directory: {}", root.display());
        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some(kind) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| FileKind::from_file_name(n).ok())
            else {
                continue;
            };

            if let Some(file) = self.accept(path, root, kind) {
                files.push(file);
            }
        }

        info!("Found {} supported files", files.len());
        Ok(files)
    }

    fn accept(&self, path: &Path, root: &Path, kind: FileKind) -> Option<ScannedFile> {
        if self.should_skip(path) {
            debug!("Skipping file: {}", path.display());
            return None;
        }

        let size = match path.metadata() {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                warn!("Cannot stat {}: {}", path.display(), e);
                return None;
            }
        };

        if self.max_file_size > 0 && size > self.max_file_size {
            warn!(
                "Skipping large file ({} MB): {}",
                size / 1_048_576,
                path.display()
            );
            return None;
        }

        let relative_path = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string();

        Some(ScannedFile {
            path: path.to_path_buf(),
            relative_path,
            kind,
            size,
        })
    }

    fn should_skip(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();

        self.skip_patterns.iter().any(|pattern| {
            if pattern.contains('*') {
                path_str.ends_with(&pattern.replace("*.", "."))
            } else {
                path_str.contains(pattern.as_str())
            }
        })
    }
}
