//! Loader configuration
//!
//! Built-in defaults, overridden by an optional YAML file, overridden by
//! `METROCAMPUS_*` environment variables. Command-line flags are applied on
//! top by the binary.

use crate::dataset::{DatasetFiles, RecordSet};
use crate::error::{LoadError, LoadResult};
use crate::topology::TopologyConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

pub const ENV_DATA_DIR: &str = "METROCAMPUS_DATA_DIR";
pub const ENV_TARGET: &str = "METROCAMPUS_TARGET";

/// Which store(s) a run loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Graph,
    Document,
    #[default]
    Both,
}

impl TargetKind {
    pub fn includes_graph(&self) -> bool {
        matches!(self, TargetKind::Graph | TargetKind::Both)
    }

    pub fn includes_document(&self) -> bool {
        matches!(self, TargetKind::Document | TargetKind::Both)
    }
}

impl FromStr for TargetKind {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "graph" => Ok(TargetKind::Graph),
            "document" => Ok(TargetKind::Document),
            "both" => Ok(TargetKind::Both),
            other => Err(LoadError::Config(format!(
                "unknown target '{}', expected graph, document or both",
                other
            ))),
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetKind::Graph => "graph",
            TargetKind::Document => "document",
            TargetKind::Both => "both",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub data_dir: PathBuf,
    pub files: DatasetFiles,
    #[serde(flatten)]
    pub topology: TopologyConfig,
    pub target: TargetKind,
    /// Read counts back after loading
    pub verify: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            data_dir: PathBuf::from("data"),
            files: DatasetFiles::default(),
            topology: TopologyConfig::default(),
            target: TargetKind::default(),
            verify: true,
        }
    }
}

impl LoaderConfig {
    pub fn from_yaml_str(text: &str) -> LoadResult<Self> {
        serde_yaml::from_str(text).map_err(|e| LoadError::Config(e.to_string()))
    }

    pub fn from_yaml_file(path: &Path) -> LoadResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text).map_err(|e| LoadError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Apply `METROCAMPUS_*` overrides from a set of variables
    pub fn apply_env_from<I, K, V>(&mut self, vars: I) -> LoadResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            match key.as_ref() {
                ENV_DATA_DIR => {
                    debug!("{} overrides data_dir", ENV_DATA_DIR);
                    self.data_dir = PathBuf::from(value.as_ref());
                }
                ENV_TARGET => {
                    debug!("{} overrides target", ENV_TARGET);
                    self.target = value.as_ref().parse()?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> LoadResult<()> {
        self.apply_env_from(std::env::vars())
    }

    /// Defaults, then `path` if given, then the environment
    pub fn resolve(path: Option<&Path>) -> LoadResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Read the dataset this configuration points at
    pub fn read_records(&self) -> LoadResult<RecordSet> {
        RecordSet::from_dir(&self.data_dir, &self.files)
    }
}
