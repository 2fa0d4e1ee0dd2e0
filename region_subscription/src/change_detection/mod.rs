use crate::contracts::SubscriptionStore;
use crate::data_transfer::RegionRecord;
use case_data_source::{CaseDataSource, RegionMetrics};
use serde::Deserialize;
use shared_kernel::region_name::RegionName;
use std::sync::Arc;

/// When a fresh observation counts as a change worth announcing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangePolicy {
    /// Any difference in cases or deaths.
    AnyDifference,
    /// A difference in cases or deaths whose new value is positive. A zero from the
    /// service usually means an outage, not a real drop.
    #[default]
    PositiveAndChanged,
}

impl ChangePolicy {
    pub fn has_changed(&self, stored: &RegionRecord, fresh: &RegionMetrics) -> bool {
        let cases_changed = fresh.cases != stored.cases;
        let deaths_changed = fresh.deaths != stored.deaths;
        match self {
            ChangePolicy::AnyDifference => cases_changed || deaths_changed,
            ChangePolicy::PositiveAndChanged => {
                (fresh.cases > 0 && cases_changed) || (fresh.deaths > 0 && deaths_changed)
            }
        }
    }
}

pub struct ChangeDetector {
    data_source: Arc<dyn CaseDataSource>,
    policy: ChangePolicy,
}

impl ChangeDetector {
    pub fn new(data_source: Arc<dyn CaseDataSource>, policy: ChangePolicy) -> Self {
        Self {
            data_source,
            policy,
        }
    }

    /// Fetches every tracked region and stores the ones that changed, with their
    /// deltas. A region that cannot be fetched keeps its previous state and does
    /// not stop the cycle. The snapshot is written once, after all regions.
    #[tracing::instrument(skip_all, fields(policy = ?self.policy), level = "info")]
    pub async fn refresh_all(&self, store: &mut SubscriptionStore) -> Vec<RegionName> {
        let tracked = store.tracked_regions();
        let mut changed = Vec::new();
        let mut failed = 0usize;

        for region in &tracked {
            let fresh = match self.data_source.fetch_region(region).await {
                Ok(fresh) => fresh,
                Err(err) => {
                    failed += 1;
                    tracing::warn!(region = %region, error = ?err, "Failed to refresh region");
                    continue;
                }
            };
            let Some(record) = store.record_mut(region.as_ref()) else {
                continue;
            };
            if self.policy.has_changed(record, &fresh) {
                record.observe(fresh);
                changed.push(region.clone());
            }
        }

        if !changed.is_empty() {
            store.persist();
        }
        tracing::info!(
            tracked = tracked.len(),
            changed = changed.len(),
            failed,
            "Refresh cycle finished"
        );
        changed
    }
}
