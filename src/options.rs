use crate::errors::{FileOperation, IoError};
use miette::Diagnostic;
use regex::Regex;
use serde::Deserialize;
use std::{fmt, fs, path::Path, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("options.test value must be an instance of RegExp.")]
    #[diagnostic(
        code(materialize::options::invalid_test),
        help("Set `test` to a regular expression string, or remove it to write every asset")
    )]
    InvalidTest { found: String },

    #[error("options.test value '{pattern}' is not a valid regular expression")]
    #[diagnostic(code(materialize::options::invalid_pattern))]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("options.useHashIndex value must be of boolean type.")]
    #[diagnostic(code(materialize::options::invalid_use_hash_index))]
    InvalidUseHashIndex { found: String },

    #[error("options.log value must be of boolean type.")]
    #[diagnostic(code(materialize::options::invalid_log))]
    InvalidLog { found: String },

    #[error("Unable to parse toml file at '{path}': {source}")]
    #[diagnostic(code(materialize::options::parse_toml), help("Review toml file"))]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Unable to parse options: {source}")]
    #[diagnostic(code(materialize::options::parse), help("Review the options"))]
    Parse {
        #[source]
        source: toml::de::Error,
    },

    #[error("I/O error while loading options")]
    #[diagnostic(code(materialize::options::io))]
    Io(#[from] IoError),
}

/// Options as they appear in a config file, before any type checking.
#[derive(Debug, Deserialize)]
struct RawOptions {
    test: Option<toml::Value>,
    #[serde(rename = "useHashIndex")]
    use_hash_index: Option<toml::Value>,
    log: Option<toml::Value>,
    #[serde(flatten)]
    unknown: toml::Table,
}

/// Construction-time settings. Immutable once built.
#[derive(Debug, Clone)]
pub struct Options {
    /// Only assets whose path matches are written. `None` writes everything.
    pub test: Option<Regex>,
    /// Skip assets whose content fingerprint is unchanged since the last write.
    pub use_hash_index: bool,
    /// Emit one line per decision.
    pub log: bool,
}
impl Default for Options {
    fn default() -> Self {
        Self {
            test: None,
            use_hash_index: true,
            log: true,
        }
    }
}
impl Options {
    pub fn with_test(mut self, test: Regex) -> Self {
        self.test = Some(test);
        self
    }

    pub fn with_hash_index(mut self, use_hash_index: bool) -> Self {
        self.use_hash_index = use_hash_index;
        self
    }

    pub fn with_log(mut self, log: bool) -> Self {
        self.log = log;
        self
    }

    /// Compiles `pattern` and sets it as the inclusion filter.
    pub fn with_test_pattern(self, pattern: &str) -> Result<Self, ConfigError> {
        let test = compile_pattern(pattern)?;

        Ok(self.with_test(test))
    }

    /// Validates a TOML table of user options, filling in defaults for missing keys.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when an option has the wrong type or `test` is not a valid regex.
    pub fn from_table(table: toml::Table) -> Result<Self, ConfigError> {
        let raw = RawOptions::deserialize(toml::Value::Table(table))
            .map_err(|error| ConfigError::Parse { source: error })?;

        Self::from_raw(raw)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawOptions =
            toml::from_str(content).map_err(|error| ConfigError::Parse { source: error })?;

        Self::from_raw(raw)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path)
            .map_err(|error| IoError::new(FileOperation::Read, path.to_path_buf(), error))?;

        let raw: RawOptions = toml::from_str(&content).map_err(|error| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source: error,
        })?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawOptions) -> Result<Self, ConfigError> {
        for key in raw.unknown.keys() {
            log::debug!("ignoring unknown option '{}'", key);
        }

        let defaults = Options::default();

        let test = match raw.test {
            None => defaults.test,
            Some(toml::Value::String(pattern)) => Some(compile_pattern(&pattern)?),
            Some(other) => {
                return Err(ConfigError::InvalidTest {
                    found: other.type_str().to_string(),
                })
            }
        };

        let use_hash_index = match raw.use_hash_index {
            None => defaults.use_hash_index,
            Some(toml::Value::Boolean(value)) => value,
            Some(other) => {
                return Err(ConfigError::InvalidUseHashIndex {
                    found: other.type_str().to_string(),
                })
            }
        };

        let log = match raw.log {
            None => defaults.log,
            Some(toml::Value::Boolean(value)) => value,
            Some(other) => {
                return Err(ConfigError::InvalidLog {
                    found: other.type_str().to_string(),
                })
            }
        };

        Ok(Options {
            test,
            use_hash_index,
            log,
        })
    }
}
impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let test = self
            .test
            .as_ref()
            .map(|re| format!("/{}/", re.as_str()))
            .unwrap_or_else(|| "null".to_string());

        write!(
            f,
            "{{ log: {}, test: {}, useHashIndex: {} }}",
            self.log, test, self.use_hash_index
        )
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|error| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        source: error,
    })
}
