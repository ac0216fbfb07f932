/// Run configuration, loaded from TOML.
///
/// ```toml
/// data_path = "/archive/prod"
/// report_path = "/archive/usage"
/// subdivision = "EMBL-EBI"
/// track = "PRIDE"
/// epoch = "200501"
/// ignored_names = ["bin"]
/// threads = 0
/// ```
///
/// Every key is optional in the file; [`UsageConfig::validate`] checks that
/// the result is usable before a run starts.
use crate::error::UsageError;
use crate::model::{MonthKey, ARCHIVE_EPOCH};
use crate::scanner::classify::DEFAULT_IGNORED;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UsageConfig {
    /// Archive data root to classify and size.
    pub data_path: PathBuf,
    /// Existing directory the report file is written into.
    pub report_path: PathBuf,
    /// Organisation subdivision, embedded in the report file name.
    pub subdivision: String,
    /// Reporting track, embedded in the report file name.
    pub track: String,
    /// First month of the report.
    pub epoch: MonthKey,
    /// Top-level names never accounted.
    pub ignored_names: Vec<String>,
    /// Worker threads for project sizing (0 = one per CPU).
    pub threads: usize,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("."),
            report_path: PathBuf::from("."),
            subdivision: String::new(),
            track: String::new(),
            epoch: ARCHIVE_EPOCH,
            ignored_names: DEFAULT_IGNORED.iter().map(|s| s.to_string()).collect(),
            threads: 0,
        }
    }
}

impl UsageConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, UsageError> {
        toml::from_str(contents)
            .map_err(|e| UsageError::Config(format!("Failed to parse config: {e}")))
    }

    /// Reject identifiers that would produce an unusable report file name.
    pub fn validate(&self) -> Result<(), UsageError> {
        for (field, value) in [("subdivision", &self.subdivision), ("track", &self.track)] {
            if value.trim().is_empty() {
                return Err(UsageError::Config(format!("{field} must not be empty")));
            }
            if value.contains(['/', '\\']) {
                return Err(UsageError::Config(format!(
                    "{field} must not contain path separators: {value:?}"
                )));
            }
        }
        Ok(())
    }

    /// Effective worker count.
    pub fn worker_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<UsageConfig, UsageError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| UsageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    UsageConfig::from_toml_str(&contents)
}
