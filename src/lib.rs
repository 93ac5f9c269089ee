//! Persists the in-memory output of a build to disk, one build cycle at a time.
//!
//! Each completed cycle hands over its artifacts (path → bytes). An [`filter::ArtifactFilter`]
//! maps them onto the output directory and applies the optional `test` pattern, then a
//! [`writer::HashIndexWriter`] writes only the artifacts whose SHA-256 fingerprint differs from
//! the one recorded at the last write.
//!
//! ```no_run
//! use materialize::{Artifact, BuildContext, BuildCycle, Materializer, Options, OutputFileSystem};
//!
//! let mut plugin = Materializer::new(Options::default());
//! let context = BuildContext::new(OutputFileSystem::Memory, std::env::current_dir()?)
//!     .with_output_path("dist");
//!
//! plugin.initialize(&context)?;
//!
//! let cycle = BuildCycle::new(
//!     [("app.js", Artifact::new("console.log(1)"))].into_iter().collect(),
//! );
//! let report = plugin.on_cycle_complete(&cycle)?;
//! assert_eq!(report.written(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod api;
pub mod errors;
pub mod filter;
pub mod options;
pub mod plugin;
pub mod reporter;
pub mod utils;
pub mod vfs;
pub mod writer;

pub use api::MaterializeError;
pub use options::{ConfigError, Options};
pub use plugin::{
    ArtifactReport, BuildContext, BuildCycle, CycleError, CycleReport, Decision, Materializer,
    SetupError, SetupState,
};
pub use vfs::{Artifact, ArtifactSet, OutputFileSystem};
pub use writer::{Fingerprint, FingerprintIndex, HashIndexWriter, WriteOutcome};
