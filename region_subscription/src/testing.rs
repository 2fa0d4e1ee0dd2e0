use crate::contracts::SubscriptionStore;
use crate::snapshot::SnapshotFile;
use anyhow::anyhow;
use async_trait::async_trait;
use case_data_source::matching::filter_matches;
use case_data_source::{CaseDataSource, DataSourceError, LookupMode, RegionMetrics};
use shared_kernel::region_name::RegionName;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// In-memory data source; names are resolved case-insensitively like the real
/// service does.
#[derive(Default)]
pub(crate) struct FakeDataSource {
    metrics: Mutex<BTreeMap<String, RegionMetrics>>,
    failing: Mutex<BTreeSet<String>>,
    fetches: AtomicUsize,
}

impl FakeDataSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&self, name: &str, cases: u64, deaths: u64) {
        self.metrics.lock().unwrap().insert(
            name.to_lowercase(),
            RegionMetrics {
                name: RegionName::from(name),
                cases,
                deaths,
                cases7_per_100k: Some(12.5),
                last_update: format!("{cases}/{deaths}"),
            },
        );
        self.failing.lock().unwrap().remove(&name.to_lowercase());
    }

    pub(crate) fn fail(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_lowercase());
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaseDataSource for FakeDataSource {
    async fn fetch_region(&self, region: &RegionName) -> Result<RegionMetrics, DataSourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let key = region.as_ref().to_lowercase();
        if self.failing.lock().unwrap().contains(&key) {
            return Err(DataSourceError::Request(anyhow!("service unavailable")));
        }
        self.metrics
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| DataSourceError::NoMatch(region.inner()))
    }

    async fn lookup(
        &self,
        query: &str,
        mode: LookupMode,
    ) -> Result<Vec<RegionName>, DataSourceError> {
        let names = self
            .metrics
            .lock()
            .unwrap()
            .values()
            .map(|metrics| metrics.name.clone())
            .collect::<Vec<_>>();
        Ok(filter_matches(names, query, mode))
    }
}

pub(crate) fn open_store(dir: &TempDir, source: Arc<FakeDataSource>) -> SubscriptionStore {
    SubscriptionStore::open(SnapshotFile::new(dir.path().join("data.json")), source).unwrap()
}
