use crate::data_transfer::RegionRecord;
use crate::snapshot::{PersistenceError, Snapshot, SnapshotFile};
use case_data_source::{CaseDataSource, DataSourceError};
use shared_kernel::recipient_id::RecipientId;
use shared_kernel::region_name::RegionName;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

pub mod describe;
pub mod list_subscribed_regions;
pub mod subscribe;
pub mod unsubscribe;

#[derive(Error, Debug)]
pub enum SubscriptionError {
    #[error("{0} is not tracked")]
    RegionNotFound(RegionName),
    #[error("{recipient} is not subscribed to {region}")]
    NotSubscribed {
        region: RegionName,
        recipient: RecipientId,
    },
    #[error("Failed to fetch metrics for {region}")]
    DataSource {
        region: RegionName,
        #[source]
        source: DataSourceError,
    },
}

impl SubscriptionError {
    /// Nothing to do for the caller: the region or the pairing does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SubscriptionError::RegionNotFound(_) | SubscriptionError::NotSubscribed { .. }
        )
    }
}

/// Shared by the conversational handlers and the refresh loop; every operation
/// runs under the lock.
pub type SharedStore = Arc<Mutex<SubscriptionStore>>;

/// Region → latest metrics → recipients. A region is tracked exactly as long as
/// it has at least one recipient, and every change is written to the snapshot.
pub struct SubscriptionStore {
    regions: Snapshot,
    snapshot: SnapshotFile,
    data_source: Arc<dyn CaseDataSource>,
}

impl SubscriptionStore {
    /// Starts empty when no snapshot exists yet. A snapshot that cannot be read is
    /// an error, so it is never replaced by an empty store.
    #[tracing::instrument(err, skip(data_source), level = "info")]
    pub fn open(
        snapshot: SnapshotFile,
        data_source: Arc<dyn CaseDataSource>,
    ) -> Result<Self, PersistenceError> {
        let regions = match snapshot.load()? {
            Some(mut regions) => {
                regions.retain(|name, record| {
                    let keep = !record.recipients.is_empty();
                    if !keep {
                        tracing::warn!(region = %name, "Dropping region without recipients");
                    }
                    keep
                });
                tracing::info!(regions = regions.len(), "Loaded snapshot");
                regions
            }
            None => {
                tracing::info!(path = %snapshot.path().display(), "No snapshot yet, starting empty");
                Snapshot::new()
            }
        };
        Ok(Self {
            regions,
            snapshot,
            data_source,
        })
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    pub fn get(&self, region: &str) -> Option<&RegionRecord> {
        self.regions.get(region)
    }

    pub fn regions(&self) -> impl Iterator<Item = (&RegionName, &RegionRecord)> {
        self.regions.iter()
    }

    pub fn tracked_regions(&self) -> Vec<RegionName> {
        self.regions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub(crate) fn record_mut(&mut self, region: &str) -> Option<&mut RegionRecord> {
        self.regions.get_mut(region)
    }

    /// A failed write is retried once, then logged; the in-memory state stays
    /// authoritative and the next mutation writes a fresh snapshot.
    pub(crate) fn persist(&self) {
        if let Err(err) = save_with_retry(|| self.snapshot.save(&self.regions)) {
            tracing::error!(error = ?err, "Failed to save snapshot, keeping in-memory state");
        }
    }
}

fn save_with_retry<Save>(mut save: Save) -> Result<(), PersistenceError>
where
    Save: FnMut() -> Result<(), PersistenceError>,
{
    let Err(first_attempt) = save() else {
        return Ok(());
    };
    tracing::warn!(error = ?first_attempt, "Failed to save snapshot, retrying");
    save()
}
