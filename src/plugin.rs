//! Two-phase lifecycle tying the filter and the writer to a build process.
//!
//! A [`Materializer`] is constructed once with its [`Options`], initialized once against the
//! [`BuildContext`] describing the build, and then fed one [`BuildCycle`] per completed build.

use crate::{
    filter::{ArtifactFilter, Selection},
    options::Options,
    reporter::Reporter,
    utils::normalize_path,
    vfs::{resolve, ArtifactSet, OutputFileSystem},
    writer::{HashIndexWriter, WriteError, WriteOutcome},
};
use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SetupError {
    #[error("output path is not accessible and no fallback output path is defined")]
    #[diagnostic(
        code(materialize::setup::missing_output_path),
        help("Define a fallback output path (devServer.outputPath)")
    )]
    MissingOutputPath,

    #[error("unable to make working directory '{path}' absolute")]
    #[diagnostic(code(materialize::setup::working_dir))]
    WorkingDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error, Diagnostic)]
pub enum CycleError {
    #[error("build cycle received before initialization succeeded")]
    #[diagnostic(
        code(materialize::cycle::not_initialized),
        help("Call `initialize` with the build context first")
    )]
    NotInitialized,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Write(#[from] WriteError),
}

/// What the build integration knows about the build at setup time.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub filesystem: OutputFileSystem,
    /// The build's own output directory. `/` is treated as unset.
    pub output_path: Option<PathBuf>,
    /// Secondary source for the output directory (the dev server's `outputPath`).
    pub fallback_output_path: Option<PathBuf>,
    pub working_dir: PathBuf,
}
impl BuildContext {
    pub fn new(filesystem: OutputFileSystem, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            filesystem,
            output_path: None,
            fallback_output_path: None,
            working_dir: working_dir.into(),
        }
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_fallback_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.fallback_output_path = Some(path.into());
        self
    }

    /// The working directory as an absolute, normalized path.
    fn absolute_working_dir(&self) -> Result<PathBuf, SetupError> {
        let absolute =
            std::path::absolute(&self.working_dir).map_err(|error| SetupError::WorkingDir {
                path: self.working_dir.clone(),
                source: error,
            })?;

        Ok(normalize_path(&absolute))
    }

    /// Picks the output directory and makes it absolute.
    ///
    /// Dev server wrappers hard-code the output path to `/`, so that value falls through to the
    /// fallback.
    fn resolve_output_path(&self, working_dir: &Path) -> Result<PathBuf, SetupError> {
        let primary = self
            .output_path
            .as_deref()
            .filter(|path| *path != Path::new("/"));

        let chosen = primary
            .or(self.fallback_output_path.as_deref())
            .ok_or(SetupError::MissingOutputPath)?;

        Ok(resolve(working_dir, chosen))
    }
}

/// The payload of one "cycle complete" notification.
#[derive(Debug, Clone, Default)]
pub struct BuildCycle {
    pub errors: Vec<String>,
    pub artifacts: ArtifactSet,
}
impl BuildCycle {
    pub fn new(artifacts: ArtifactSet) -> Self {
        Self {
            errors: Vec::new(),
            artifacts,
        }
    }

    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Filtered,
    Written,
    SkippedUnchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReport {
    pub asset_path: String,
    pub destination: String,
    pub decision: Decision,
}

/// Per-artifact decisions of one processed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub artifacts: Vec<ArtifactReport>,
    idle: bool,
}
impl CycleReport {
    /// A cycle that performed no work (inactive plugin or upstream errors).
    pub fn idle() -> Self {
        Self {
            artifacts: Vec::new(),
            idle: true,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    fn count(&self, decision: Decision) -> usize {
        self.artifacts
            .iter()
            .filter(|report| report.decision == decision)
            .count()
    }

    pub fn written(&self) -> usize {
        self.count(Decision::Written)
    }

    pub fn skipped(&self) -> usize {
        self.count(Decision::SkippedUnchanged)
    }

    pub fn filtered(&self) -> usize {
        self.count(Decision::Filtered)
    }
}

/// Setup result, stored so repeated initialization is a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupState {
    Pending,
    /// The build writes to disk by itself.
    Inactive,
    Active {
        output_path: PathBuf,
        working_dir: PathBuf,
    },
}

/// Materializes in-memory build output on disk, one cycle at a time.
#[derive(Debug)]
pub struct Materializer {
    options: Options,
    reporter: Reporter,
    state: SetupState,
    writer: Option<HashIndexWriter>,
}
impl Materializer {
    pub fn new(options: Options) -> Self {
        let reporter = Reporter::new(options.log);

        reporter.options(&options);

        Self {
            options,
            reporter,
            state: SetupState::Pending,
            writer: None,
        }
    }

    /// Validates a TOML table of options and constructs the plugin from it.
    pub fn from_table(table: toml::Table) -> Result<Self, crate::options::ConfigError> {
        Ok(Self::new(Options::from_table(table)?))
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn state(&self) -> &SetupState {
        &self.state
    }

    pub fn writer(&self) -> Option<&HashIndexWriter> {
        self.writer.as_ref()
    }

    /// Runs one-time setup against the build context and returns whether the plugin is active.
    ///
    /// Only the first call does any work. Later calls return the stored result.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::MissingOutputPath`] when the filesystem is in memory and neither the
    /// output path nor the fallback is usable. The state stays [`SetupState::Pending`] then.
    pub fn initialize(&mut self, context: &BuildContext) -> Result<bool, SetupError> {
        match &self.state {
            SetupState::Active { .. } => return Ok(true),
            SetupState::Inactive => return Ok(false),
            SetupState::Pending => {}
        }

        self.reporter.filesystem(context.filesystem);

        if !context.filesystem.is_memory() {
            log::debug!("build writes to disk itself, staying inactive");
            self.state = SetupState::Inactive;

            return Ok(false);
        }

        let working_dir = context.absolute_working_dir()?;
        let output_path = context.resolve_output_path(&working_dir)?;

        self.reporter.output_path(&output_path);

        self.writer = Some(HashIndexWriter::new(working_dir.clone()));
        self.state = SetupState::Active {
            output_path,
            working_dir,
        };

        Ok(true)
    }

    /// Processes one completed build cycle.
    ///
    /// Cycles that report build errors are ignored, as are all cycles of an inactive plugin.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError::NotInitialized`] before a successful [`Self::initialize`], and
    /// [`CycleError::Write`] on the first failed directory creation or file write. Artifacts after
    /// the failing one are not processed.
    pub fn on_cycle_complete(&mut self, cycle: &BuildCycle) -> Result<CycleReport, CycleError> {
        let (output_path, working_dir) = match &self.state {
            SetupState::Pending => return Err(CycleError::NotInitialized),
            SetupState::Inactive => return Ok(CycleReport::idle()),
            SetupState::Active {
                output_path,
                working_dir,
            } => (output_path, working_dir),
        };

        let Some(writer) = self.writer.as_mut() else {
            return Err(CycleError::NotInitialized);
        };

        if !cycle.errors.is_empty() {
            log::debug!("skipping cycle with {} build errors", cycle.errors.len());

            return Ok(CycleReport::idle());
        }

        self.reporter.cycle_errors(cycle.errors.len());

        let filter = ArtifactFilter::new(output_path, working_dir, self.options.test.as_ref());

        let mut report = CycleReport::default();

        for selection in filter.select_candidates(&cycle.artifacts, &self.reporter) {
            let entry = match selection {
                Selection::Excluded {
                    asset_path,
                    destination,
                } => ArtifactReport {
                    asset_path,
                    destination,
                    decision: Decision::Filtered,
                },
                Selection::Candidate(candidate) => {
                    let outcome = writer.write_if_changed(
                        &candidate,
                        self.options.use_hash_index,
                        &self.reporter,
                    )?;

                    ArtifactReport {
                        asset_path: candidate.asset_path,
                        destination: candidate.destination,
                        decision: match outcome {
                            WriteOutcome::Written => Decision::Written,
                            WriteOutcome::SkippedUnchanged => Decision::SkippedUnchanged,
                        },
                    }
                }
            };

            report.artifacts.push(entry);
        }

        Ok(report)
    }
}
