use crate::{options::Options, utils::human_size, vfs::OutputFileSystem};
use colored::Colorize;
use std::path::Path;

const LOG_TAG: &str = "materialize";

/// Prints one line per decision when logging is enabled.
///
/// Every line carries a dimmed `[HH:MM:SS] [materialize]` prefix. Internal details that are not
/// meant for the user go to the `log` facade instead.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    enabled: bool,
}
impl Reporter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn silent() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn emit(&self, message: &str) {
        if !self.enabled {
            return;
        }

        let stamp = chrono::Local::now().format("%H:%M:%S");
        let prefix = format!("[{}] [{}]", stamp, LOG_TAG);

        println!("{} {}", prefix.dimmed(), message);
    }

    fn target(asset_path: &str, destination: &str) -> String {
        format!(
            "asset: {}; destination: {}",
            format!("./{}", asset_path).cyan(),
            format!("./{}", destination).cyan()
        )
    }

    pub fn options(&self, options: &Options) {
        self.emit(&format!("options {}", options));
    }

    pub fn filesystem(&self, filesystem: OutputFileSystem) {
        self.emit(&format!(
            "output filesystem is \"{}\".",
            filesystem.as_str().cyan()
        ));
    }

    pub fn output_path(&self, output_path: &Path) {
        self.emit(&format!(
            "output path is \"{}\".",
            output_path.display().to_string().cyan()
        ));
    }

    pub fn cycle_errors(&self, count: usize) {
        self.emit(&format!(
            "build cycle reported \"{}\" errors.",
            count.to_string().cyan()
        ));
    }

    pub fn skipped_by_filter(&self, asset_path: &str, destination: &str) {
        self.emit(&format!(
            "{} {}",
            Self::target(asset_path, destination),
            "[skipped; does not match test]".yellow()
        ));
    }

    pub fn skipped_by_hash(&self, asset_path: &str, destination: &str) {
        self.emit(&format!(
            "{} {}",
            Self::target(asset_path, destination),
            "[skipped; matched hash index]".yellow()
        ));
    }

    /// Logs a write. `size` is the declared size of the artifact, not its content length.
    pub fn written(&self, asset_path: &str, destination: &str, size: usize) {
        self.emit(&Self::written_line(asset_path, destination, size));
    }

    fn written_line(asset_path: &str, destination: &str, size: usize) -> String {
        format!(
            "{} {} {}",
            Self::target(asset_path, destination),
            "[written]".green(),
            format!("({})", human_size(size as u64)).magenta()
        )
    }
}
