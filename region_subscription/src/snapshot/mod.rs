use crate::data_transfer::RegionRecord;
use shared_kernel::region_name::RegionName;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The whole store as written to disk, keyed by region name.
pub type Snapshot = BTreeMap<RegionName, RegionRecord>;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to read snapshot {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Snapshot {} is malformed", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize snapshot")]
    Serialize(#[source] serde_json::Error),
    #[error("Failed to write snapshot {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A single JSON document holding the full store, replaced as a whole on every save.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when no snapshot was written yet.
    pub fn load(&self) -> Result<Option<Snapshot>, PersistenceError> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|source| PersistenceError::Malformed {
                path: self.path.clone(),
                source,
            })
    }

    /// Writes next to the target and renames over it, so readers only ever see a
    /// complete snapshot.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        let content = serde_json::to_vec_pretty(snapshot).map_err(PersistenceError::Serialize)?;
        self.replace_with(&content)
            .map_err(|source| PersistenceError::Write {
                path: self.path.clone(),
                source,
            })
    }

    /// `data.json` is staged as `data.json.tmp`.
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(OsString::from).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn replace_with(&self, content: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let temp_path = self.temp_path();
        let mut file = File::create(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path)
    }
}
