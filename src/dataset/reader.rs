//! JSON dataset reader

use super::records::{Campus, ColocatedGroup, Line, RecordSet, Station};
use crate::error::{LoadError, LoadResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// File names of the dataset inside its directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetFiles {
    pub lines: String,
    pub stations: String,
    pub campuses: String,
    /// Optional; a missing file means no co-located groups
    pub colocated: String,
}

impl Default for DatasetFiles {
    fn default() -> Self {
        DatasetFiles {
            lines: "lines.json".to_string(),
            stations: "stations.json".to_string(),
            campuses: "campuses.json".to_string(),
            colocated: "colocated.json".to_string(),
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> LoadResult<T> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

impl RecordSet {
    /// Read the record set from `dir`
    pub fn from_dir(dir: &Path, files: &DatasetFiles) -> LoadResult<Self> {
        let lines: Vec<Line> = read_json(&dir.join(&files.lines))?;
        let stations: Vec<Station> = read_json(&dir.join(&files.stations))?;
        let campuses: Vec<Campus> = read_json(&dir.join(&files.campuses))?;

        let colocated_path = dir.join(&files.colocated);
        let colocated: Vec<ColocatedGroup> = if colocated_path.exists() {
            read_json(&colocated_path)?
        } else {
            debug!("No co-located groups at {}", colocated_path.display());
            Vec::new()
        };

        info!(
            "Read dataset from {}: {} lines, {} stations, {} campuses",
            dir.display(),
            lines.len(),
            stations.len(),
            campuses.len()
        );

        Ok(RecordSet {
            lines,
            stations,
            campuses,
            colocated,
        })
    }
}
