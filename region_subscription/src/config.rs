use crate::change_detection::ChangePolicy;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub snapshot_path: PathBuf,
    #[serde(default)]
    pub change_policy: ChangePolicy,
}
