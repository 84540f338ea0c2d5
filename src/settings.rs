//! Commit tuning knobs.
//!
//! Settings can be built in code, parsed from JSON, or read from
//! `PUBLISH_COMMIT_*` environment variables. Every field has a default, so
//! partial documents are fine.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_PREFIX: &str = "PUBLISH_COMMIT_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{name} must be at least 1")]
    Zero { name: &'static str },

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: String, value: String },

    #[error("settings decode failed: {0}")]
    Decode(String),
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Number of worker threads per batch writer.
    pub write_max_workers: usize,
    /// Items per store write call.
    pub write_batch_size: usize,
    /// Capacity of the bounded queue feeding the workers.
    pub write_queue_size: usize,
    /// Seconds the producer may block on a full queue before giving up.
    pub write_queue_timeout: u64,
    /// Basenames which mark an item as an entry point.
    pub entry_point_files: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            write_max_workers: 10,
            write_batch_size: 25,
            write_queue_size: 1000,
            write_queue_timeout: 60 * 10,
            entry_point_files: [
                "repomd.xml",
                "repomd.xml.asc",
                "PULP_MANIFEST",
                "PULP_MANIFEST.asc",
                "treeinfo",
                "extra_files.json",
            ]
            .iter()
            .map(|name| name.to_string())
            .collect(),
        }
    }
}

impl Settings {
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.write_max_workers = workers;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.write_batch_size = size;
        self
    }

    pub fn with_queue_size(mut self, size: usize) -> Self {
        self.write_queue_size = size;
        self
    }

    pub fn with_queue_timeout(mut self, secs: u64) -> Self {
        self.write_queue_timeout = secs;
        self
    }

    pub fn queue_timeout(&self) -> Duration {
        Duration::from_secs(self.write_queue_timeout)
    }

    /// Parse settings from a JSON document and validate them.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings =
            serde_json::from_str(json).map_err(|e| SettingsError::Decode(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_vars(std::env::vars())
    }

    /// Load settings from an explicit set of `(name, value)` pairs.
    ///
    /// Names without the `PUBLISH_COMMIT_` prefix are ignored; unknown names
    /// with the prefix are ignored as well.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Settings::default();

        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref();
            match name.to_ascii_lowercase().as_str() {
                "write_max_workers" => settings.write_max_workers = parse_var(name, value)?,
                "write_batch_size" => settings.write_batch_size = parse_var(name, value)?,
                "write_queue_size" => settings.write_queue_size = parse_var(name, value)?,
                "write_queue_timeout" => settings.write_queue_timeout = parse_var(name, value)?,
                "entry_point_files" => {
                    settings.entry_point_files = value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                _ => {}
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.write_max_workers == 0 {
            return Err(SettingsError::Zero {
                name: "write_max_workers",
            });
        }
        if self.write_batch_size == 0 {
            return Err(SettingsError::Zero {
                name: "write_batch_size",
            });
        }
        if self.write_queue_size == 0 {
            return Err(SettingsError::Zero {
                name: "write_queue_size",
            });
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, SettingsError> {
    value.trim().parse().map_err(|_| SettingsError::Invalid {
        name: name.to_ascii_lowercase(),
        value: value.to_string(),
    })
}
