use crate::errors::{FileOperation, IoError};
use indexmap::IndexMap;
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};
use walkdir::WalkDir;

/// One named unit of build output held in memory.
///
/// The declared size is reported by the build and is what gets logged; it normally equals
/// the content length but the two are kept apart because the build owns both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    content: Vec<u8>,
    size: usize,
}
impl Artifact {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        let content = content.into();
        let size = content.len();

        Self { content, size }
    }

    pub fn with_size(content: impl Into<Vec<u8>>, size: usize) -> Self {
        Self {
            content: content.into(),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn source(&self) -> &[u8] {
        &self.content
    }
}

/// The finalized output of one build cycle, keyed by the path the build assigned.
///
/// Insertion order is kept so artifacts are always processed in the order the build emitted them.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet(pub IndexMap<String, Artifact>);
impl ArtifactSet {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn insert(&mut self, path: impl Into<String>, artifact: Artifact) -> Option<Artifact> {
        self.0.insert(path.into(), artifact)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Artifact)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Loads every file below `root` into memory, keyed by its `/`-separated path relative to `root`.
    ///
    /// # Errors
    ///
    /// Returns an [`IoError`] if the directory cannot be walked or a file cannot be read.
    pub fn from_directory(root: &Path) -> Result<Self, IoError> {
        let mut set = ArtifactSet::new();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(error) => {
                    let path = error.path().unwrap_or(root).to_path_buf();

                    Err(IoError::new(FileOperation::Read, path, error.into()))?
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let full_path = entry.path();
            let relative = full_path.strip_prefix(root).unwrap_or(full_path);
            let key = relative.to_string_lossy().replace('\\', "/");

            let content = std::fs::read(full_path)
                .map_err(|error| IoError::new(FileOperation::Read, full_path.to_path_buf(), error))?;

            log::debug!("loaded artifact '{}' ({} bytes)", key, content.len());

            set.insert(key, Artifact::new(content));
        }

        Ok(set)
    }
}
impl<K: Into<String>> FromIterator<(K, Artifact)> for ArtifactSet {
    fn from_iter<I: IntoIterator<Item = (K, Artifact)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// The output filesystem the build is writing to, as reported by the build integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFileSystem {
    /// The build already writes to persistent disk; nothing is left to materialize.
    Disk,
    /// The build keeps its output in memory (for example a dev server).
    Memory,
}
impl OutputFileSystem {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Disk => "disk",
            Self::Memory => "memory",
        }
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}
impl fmt::Display for OutputFileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
impl FromStr for OutputFileSystem {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "disk" => Ok(Self::Disk),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown output filesystem: {}", other)),
        }
    }
}

/// Resolves `path` against `working_dir` unless it is already absolute.
pub fn resolve(working_dir: &Path, path: &Path) -> PathBuf {
    crate::utils::normalize_path(&working_dir.join(path))
}
