//! Storage collaborator: lazy line loading, JSON/line saves, retention

use crate::io::{atomic_write, write_lines_atomic};
use globset::GlobBuilder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Pattern(#[from] globset::Error),
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
    #[error("invalid storage path '{0}'")]
    InvalidPath(String),
    #[error("failed to delete {} entries in '{container}'", .failed.len())]
    Cleanup {
        container: String,
        failed: Vec<String>,
    },
}

/// Lazily produced lines
pub type Lines<'a> = Box<dyn Iterator<Item = Result<String, StorageError>> + Send + 'a>;

/// The four operations the engine needs from durable storage
pub trait Storage: Send + Sync {
    /// Lines of every file under `container` matching `pattern`. Path
    /// segments may use `*` and `?`; names starting with `.` or `_` are
    /// skipped.
    fn load(&self, container: &str, pattern: &str) -> Result<Lines<'_>, StorageError>;

    fn save_json(
        &self,
        payload: &serde_json::Value,
        container: &str,
        path: &str,
    ) -> Result<(), StorageError>;

    /// Write a line collection; returns the number of lines written
    fn save_lines(
        &self,
        lines: &mut dyn Iterator<Item = String>,
        container: &str,
        path: &str,
    ) -> Result<usize, StorageError>;

    /// Remove every top-level directory in `container` except `keep`;
    /// returns how many were removed
    fn delete_all_except(&self, container: &str, keep: &str) -> Result<usize, StorageError>;
}

/// Storage on the local filesystem; each container is a directory under `root`
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn container_dir(&self, container: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(relative(container)?))
    }

    fn resolve(&self, container: &str, path: &str) -> Result<PathBuf, StorageError> {
        Ok(self.container_dir(container)?.join(relative(path)?))
    }
}

/// Reject absolute paths and `..` so writes stay inside the store
fn relative(path: &str) -> Result<PathBuf, StorageError> {
    let trimmed = path.trim_start_matches('/');
    let candidate = Path::new(trimmed);
    if trimmed.is_empty()
        || candidate
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(candidate.to_path_buf())
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

/// Expand a segment-wise glob below `base`, sorted for deterministic reads.
/// `*` never crosses a `/`, so matches sit exactly one level per segment.
fn expand_glob(base: &Path, pattern: &str) -> Result<Vec<PathBuf>, StorageError> {
    let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() || !base.is_dir() {
        return Ok(Vec::new());
    }

    let matcher = GlobBuilder::new(&segments.join("/"))
        .literal_separator(true)
        .build()?
        .compile_matcher();

    // min_depth would skip filter_entry for parents; depth is checked per entry
    let walker = WalkDir::new(base)
        .max_depth(segments.len())
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(&entry.file_name().to_string_lossy()));

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.depth() != segments.len() || !entry.file_type().is_file() {
            continue;
        }
        let matched = entry
            .path()
            .strip_prefix(base)
            .map(|relative| matcher.is_match(relative))
            .unwrap_or(false);
        if matched {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

impl Storage for FileStore {
    fn load(&self, container: &str, pattern: &str) -> Result<Lines<'_>, StorageError> {
        let base = self.container_dir(container)?;
        let files = expand_glob(&base, pattern)?;
        tracing::debug!(container, pattern, files = files.len(), "loading lines");

        let lines = files.into_iter().flat_map(|path| -> Lines<'static> {
            match File::open(&path) {
                Ok(file) => Box::new(
                    BufReader::new(file)
                        .lines()
                        .map(|line| line.map_err(StorageError::from)),
                ),
                Err(err) => Box::new(std::iter::once(Err(StorageError::from(err)))),
            }
        });
        Ok(Box::new(lines))
    }

    fn save_json(
        &self,
        payload: &serde_json::Value,
        container: &str,
        path: &str,
    ) -> Result<(), StorageError> {
        let target = self.resolve(container, path)?;
        let json = serde_json::to_string(payload)?;
        atomic_write(&target, json.as_bytes())?;
        tracing::debug!(path = %target.display(), "saved json");
        Ok(())
    }

    fn save_lines(
        &self,
        lines: &mut dyn Iterator<Item = String>,
        container: &str,
        path: &str,
    ) -> Result<usize, StorageError> {
        let target = self.resolve(container, path)?;
        let count = write_lines_atomic(&target, lines)?;
        tracing::debug!(path = %target.display(), lines = count, "saved lines");
        Ok(count)
    }

    fn delete_all_except(&self, container: &str, keep: &str) -> Result<usize, StorageError> {
        let dir = self.container_dir(container)?;
        if !dir.exists() {
            return Ok(0);
        }

        let mut deleted = 0;
        let mut failed = Vec::new();
        for entry in std::fs::read_dir(&dir)?.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if !path.is_dir() || name == keep {
                continue;
            }
            match std::fs::remove_dir_all(&path) {
                Ok(()) => deleted += 1,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "failed to delete");
                    failed.push(name);
                }
            }
        }

        if failed.is_empty() {
            Ok(deleted)
        } else {
            Err(StorageError::Cleanup {
                container: container.to_string(),
                failed,
            })
        }
    }
}
