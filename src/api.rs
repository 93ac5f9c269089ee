use crate::{
    errors::IoError,
    options::{self, Options},
    plugin::{self, BuildContext, BuildCycle, CycleReport, Materializer},
    vfs::{ArtifactSet, OutputFileSystem},
};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum MaterializeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] options::ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Setup(#[from] plugin::SetupError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Cycle(#[from] plugin::CycleError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Io(#[from] IoError),
}

/// Everything needed to drive a plugin from a staging directory.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    /// Directory whose files stand in for the build's in-memory output.
    pub staging: PathBuf,
    pub context: BuildContext,
    pub options: Options,
    /// Number of build cycles to run through the same plugin instance.
    pub cycles: usize,
}

/// Replays the staging directory as `cycles` consecutive build cycles.
///
/// The staging directory is re-read before every cycle, so files edited in between show up as
/// changed artifacts.
///
/// # Errors
///
/// Returns a [`MaterializeError`] if:
///
/// - The output path cannot be resolved.
/// - The staging directory cannot be read.
/// - A directory or file cannot be created or written to.
pub fn sync(request: SyncRequest) -> Result<Vec<CycleReport>, MaterializeError> {
    let mut plugin = Materializer::new(request.options);

    plugin.initialize(&request.context)?;

    let mut reports = Vec::with_capacity(request.cycles);

    for cycle in 1..=request.cycles {
        let artifacts = load_staging(&request.staging, request.context.filesystem)?;

        log::debug!("cycle {}: {} artifacts", cycle, artifacts.len());

        reports.push(plugin.on_cycle_complete(&BuildCycle::new(artifacts))?);
    }

    Ok(reports)
}

/// Reads and validates an options file.
pub fn check_options(path: &Path) -> Result<Options, MaterializeError> {
    Ok(Options::from_file(path)?)
}

fn load_staging(
    staging: &Path,
    filesystem: OutputFileSystem,
) -> Result<ArtifactSet, MaterializeError> {
    // an inactive plugin never looks at the artifacts
    if !filesystem.is_memory() {
        return Ok(ArtifactSet::new());
    }

    Ok(ArtifactSet::from_directory(staging)?)
}
