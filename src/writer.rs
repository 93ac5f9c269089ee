//! Writes candidates to disk, skipping those whose content fingerprint has not changed.

use crate::{
    errors::{FileOperation, IoError},
    filter::Candidate,
    reporter::Reporter,
    utils::strip_query,
};
use miette::Diagnostic;
use sha2::{Digest, Sha256};
use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum WriteError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Io(#[from] IoError),
}

/// Hex-encoded SHA-256 digest of an artifact's raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);
impl Fingerprint {
    pub fn of(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);

        Fingerprint(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Destination path → fingerprint of the content last written there.
///
/// Keys are full destination paths, query suffix included. Entries are never removed.
#[derive(Debug, Clone, Default)]
pub struct FingerprintIndex(HashMap<String, Fingerprint>);
impl FingerprintIndex {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn get(&self, destination: &str) -> Option<&Fingerprint> {
        self.0.get(destination)
    }

    pub fn insert(&mut self, destination: String, fingerprint: Fingerprint) -> Option<Fingerprint> {
        self.0.insert(destination, fingerprint)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    SkippedUnchanged,
}

/// Owns the fingerprint index for one plugin instance and performs the actual writes.
#[derive(Debug)]
pub struct HashIndexWriter {
    working_dir: PathBuf,
    index: FingerprintIndex,
}
impl HashIndexWriter {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            index: FingerprintIndex::new(),
        }
    }

    pub fn index(&self) -> &FingerprintIndex {
        &self.index
    }

    /// Writes the candidate unless the index holds an identical fingerprint for its destination.
    ///
    /// Everything after the first `?` in the destination is dropped for the filesystem write,
    /// while the index keeps the full destination as key.
    ///
    /// # Errors
    ///
    /// Returns a [`WriteError`] if the parent directory cannot be created or the file cannot be
    /// written. The index is left untouched in that case.
    pub fn write_if_changed(
        &mut self,
        candidate: &Candidate<'_>,
        use_hash_index: bool,
        reporter: &Reporter,
    ) -> Result<WriteOutcome, WriteError> {
        let artifact = candidate.artifact;

        let fingerprint = if use_hash_index {
            let fingerprint = Fingerprint::of(artifact.source());

            if self.index.get(&candidate.destination) == Some(&fingerprint) {
                reporter.skipped_by_hash(&candidate.asset_path, &candidate.destination);

                return Ok(WriteOutcome::SkippedUnchanged);
            }

            Some(fingerprint)
        } else {
            None
        };

        reporter.written(
            &candidate.asset_path,
            &candidate.destination,
            artifact.size(),
        );

        let target = self.working_dir.join(strip_query(&candidate.destination));

        if let Some(parent) = target.parent() {
            create_directory(parent)?;
        }

        write_file(&target, artifact.source())?;

        if let Some(fingerprint) = fingerprint {
            log::debug!("indexed '{}' as {}", candidate.destination, fingerprint);

            self.index.insert(candidate.destination.clone(), fingerprint);
        }

        Ok(WriteOutcome::Written)
    }
}

/// Creates all directories in the specified path if they do not exist.
fn create_directory(path: &Path) -> Result<(), WriteError> {
    std::fs::create_dir_all(path)
        .map_err(|error| IoError::new(FileOperation::Mkdir, path.into(), error))?;

    Ok(())
}

/// Writes `contents` to `path`, replacing any existing file.
fn write_file(path: &Path, contents: &[u8]) -> Result<(), WriteError> {
    std::fs::write(path, contents)
        .map_err(|error| IoError::new(FileOperation::Write, path.into(), error))?;

    log::debug!("wrote {} bytes to {}", contents.len(), path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::Artifact;

    fn candidate<'a>(destination: &str, artifact: &'a Artifact) -> Candidate<'a> {
        Candidate {
            asset_path: destination.to_string(),
            destination: destination.to_string(),
            artifact,
        }
    }

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        let fingerprint = Fingerprint::of(b"");

        assert_eq!(
            fingerprint.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_first_write_creates_parents_and_indexes() {
        let cwd = tempfile::tempdir().unwrap();
        let mut writer = HashIndexWriter::new(cwd.path());
        let artifact = Artifact::new("console.log(1)");

        let outcome = writer
            .write_if_changed(
                &candidate("dist/js/app.js", &artifact),
                true,
                &Reporter::silent(),
            )
            .unwrap();

        assert_eq!(outcome, WriteOutcome::Written);
        assert_eq!(
            std::fs::read_to_string(cwd.path().join("dist/js/app.js")).unwrap(),
            "console.log(1)"
        );
        assert_eq!(
            writer.index().get("dist/js/app.js"),
            Some(&Fingerprint::of(b"console.log(1)"))
        );
    }

    #[test]
    fn test_unchanged_content_is_skipped() {
        let cwd = tempfile::tempdir().unwrap();
        let mut writer = HashIndexWriter::new(cwd.path());
        let artifact = Artifact::new("console.log(1)");
        let reporter = Reporter::silent();

        writer
            .write_if_changed(&candidate("dist/app.js", &artifact), true, &reporter)
            .unwrap();
        // remove the file so a second write would be observable
        std::fs::remove_file(cwd.path().join("dist/app.js")).unwrap();

        let outcome = writer
            .write_if_changed(&candidate("dist/app.js", &artifact), true, &reporter)
            .unwrap();

        assert_eq!(outcome, WriteOutcome::SkippedUnchanged);
        assert!(!cwd.path().join("dist/app.js").exists());
    }

    #[test]
    fn test_changed_content_is_rewritten() {
        let cwd = tempfile::tempdir().unwrap();
        let mut writer = HashIndexWriter::new(cwd.path());
        let reporter = Reporter::silent();
        let first = Artifact::new("console.log(1)");
        let second = Artifact::new("console.log(2)");

        writer
            .write_if_changed(&candidate("dist/app.js", &first), true, &reporter)
            .unwrap();
        let outcome = writer
            .write_if_changed(&candidate("dist/app.js", &second), true, &reporter)
            .unwrap();

        assert_eq!(outcome, WriteOutcome::Written);
        assert_eq!(
            std::fs::read_to_string(cwd.path().join("dist/app.js")).unwrap(),
            "console.log(2)"
        );
        assert_eq!(
            writer.index().get("dist/app.js"),
            Some(&Fingerprint::of(b"console.log(2)"))
        );
    }

    #[test]
    fn test_disabled_index_always_writes() {
        let cwd = tempfile::tempdir().unwrap();
        let mut writer = HashIndexWriter::new(cwd.path());
        let reporter = Reporter::silent();
        let artifact = Artifact::new("body{}");

        for _ in 0..3 {
            let outcome = writer
                .write_if_changed(&candidate("dist/style.css", &artifact), false, &reporter)
                .unwrap();

            assert_eq!(outcome, WriteOutcome::Written);
        }

        assert!(writer.index().is_empty());
    }

    #[test]
    fn test_query_suffix_shares_file_but_not_index_entry() {
        let cwd = tempfile::tempdir().unwrap();
        let mut writer = HashIndexWriter::new(cwd.path());
        let reporter = Reporter::silent();
        let v1 = Artifact::new("one");
        let v2 = Artifact::new("two");

        writer
            .write_if_changed(&candidate("dist/app.js?v=1", &v1), true, &reporter)
            .unwrap();
        writer
            .write_if_changed(&candidate("dist/app.js?v=2", &v2), true, &reporter)
            .unwrap();

        assert_eq!(writer.index().len(), 2);
        assert_eq!(
            std::fs::read_to_string(cwd.path().join("dist/app.js")).unwrap(),
            "two"
        );
        assert!(!cwd.path().join("dist/app.js?v=1").exists());

        // the first variant is still indexed under its own key and is skipped
        let outcome = writer
            .write_if_changed(&candidate("dist/app.js?v=1", &v1), true, &reporter)
            .unwrap();
        assert_eq!(outcome, WriteOutcome::SkippedUnchanged);
    }

    #[test]
    fn test_failed_write_leaves_index_untouched() {
        let cwd = tempfile::tempdir().unwrap();
        // a regular file where a directory is expected
        std::fs::write(cwd.path().join("dist"), "not a directory").unwrap();
        let mut writer = HashIndexWriter::new(cwd.path());
        let artifact = Artifact::new("console.log(1)");

        let result =
            writer.write_if_changed(&candidate("dist/app.js", &artifact), true, &Reporter::silent());

        assert!(matches!(
            result,
            Err(WriteError::Io(IoError {
                operation: FileOperation::Mkdir,
                ..
            }))
        ));
        assert!(writer.index().is_empty());
    }
}
