pub mod change_detection;
pub mod config;
pub mod contracts;
pub mod data_transfer;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod testing;

pub use change_detection::{ChangeDetector, ChangePolicy};
pub use contracts::{SharedStore, SubscriptionError, SubscriptionStore};
pub use data_transfer::{RegionRecord, RegionUpdate};
pub use snapshot::{PersistenceError, SnapshotFile};
