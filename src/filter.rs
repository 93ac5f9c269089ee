//! Selects which artifacts of a cycle are write candidates and where each one lands on disk.

use crate::{
    reporter::Reporter,
    utils::{normalize_path, relative_path, to_slash},
    vfs::{Artifact, ArtifactSet},
};
use regex::Regex;
use std::path::{Path, PathBuf};

/// An artifact that passed the inclusion filter, paired with its destination.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    /// The asset path with any output-root prefix removed. This is what the filter is tested against.
    pub asset_path: String,
    /// Destination relative to the working directory, `/`-separated, query suffix included.
    pub destination: String,
    pub artifact: &'a Artifact,
}

/// Outcome of running one artifact through the filter.
#[derive(Debug, Clone)]
pub enum Selection<'a> {
    Candidate(Candidate<'a>),
    Excluded {
        asset_path: String,
        destination: String,
    },
}

/// Maps asset paths onto the output root and applies the optional `test` pattern.
#[derive(Debug, Clone)]
pub struct ArtifactFilter<'o> {
    output_root: &'o Path,
    working_dir: &'o Path,
    test: Option<&'o Regex>,
}
impl<'o> ArtifactFilter<'o> {
    pub fn new(output_root: &'o Path, working_dir: &'o Path, test: Option<&'o Regex>) -> Self {
        Self {
            output_root,
            working_dir,
            test,
        }
    }

    /// Runs every artifact of the set through the filter, in emit order.
    ///
    /// Excluded artifacts are reported through `reporter` and dropped from the result.
    pub fn select_candidates<'a>(
        &self,
        artifacts: &'a ArtifactSet,
        reporter: &Reporter,
    ) -> Vec<Selection<'a>> {
        artifacts
            .iter()
            .map(|(source_path, artifact)| {
                let selection = self.select(source_path, artifact);

                if let Selection::Excluded {
                    asset_path,
                    destination,
                } = &selection
                {
                    reporter.skipped_by_filter(asset_path, destination);
                }

                selection
            })
            .collect()
    }

    fn select<'a>(&self, source_path: &str, artifact: &'a Artifact) -> Selection<'a> {
        let asset_path = self.strip_output_root(source_path).to_string();
        let destination = self.destination_for(&asset_path);

        match self.test {
            Some(test) if !test.is_match(&asset_path) => Selection::Excluded {
                asset_path,
                destination,
            },
            _ => Selection::Candidate(Candidate {
                asset_path,
                destination,
                artifact,
            }),
        }
    }

    /// Removes a leading occurrence of the output root from `source_path`.
    ///
    /// The root may appear in its absolute form (with or without the leading separator) or
    /// relative to the working directory. A prefix only counts when it ends on a path segment
    /// boundary, so `dist` is stripped from `dist/app.js` but not from `distribution/app.js`.
    pub fn strip_output_root<'s>(&self, source_path: &'s str) -> &'s str {
        let absolute = to_slash(self.output_root);
        let relative = to_slash(&relative_path(self.working_dir, self.output_root));

        let prefixes = [
            absolute.trim_start_matches('/').to_string(),
            relative,
        ];

        let trimmed = source_path.trim_start_matches(['/', '\\']);

        for prefix in prefixes.iter().filter(|p| !p.is_empty()) {
            let Some(rest) = trimmed.strip_prefix(prefix.as_str()) else {
                continue;
            };

            if rest.is_empty() {
                return rest;
            }

            if let Some(rest) = rest.strip_prefix(['/', '\\']) {
                return rest;
            }
        }

        source_path
    }

    /// Joins the stripped asset path onto the output root and expresses it relative to the working directory.
    fn destination_for(&self, asset_path: &str) -> String {
        let joined: PathBuf = normalize_path(
            &self
                .output_root
                .join(asset_path.trim_start_matches(['/', '\\'])),
        );

        to_slash(&relative_path(self.working_dir, &joined))
    }
}
