use crate::contracts::{SubscriptionError, SubscriptionStore};
use crate::data_transfer::RegionRecord;
use shared_kernel::recipient_id::RecipientId;
use shared_kernel::region_name::RegionName;
use std::collections::btree_map::Entry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionOutcome {
    /// The region was not tracked before; its metrics were fetched.
    Created(RegionName),
    Added(RegionName),
    AlreadySubscribed(RegionName),
}

impl SubscriptionOutcome {
    pub fn region(&self) -> &RegionName {
        match self {
            SubscriptionOutcome::Created(region)
            | SubscriptionOutcome::Added(region)
            | SubscriptionOutcome::AlreadySubscribed(region) => region,
        }
    }
}

impl SubscriptionStore {
    /// Subscribing twice is not an error. A region seen for the first time is
    /// fetched from the data source and stored under the name the source reports;
    /// if that fetch fails nothing is stored.
    #[tracing::instrument(err, skip(self), level = "info")]
    pub async fn add_subscription(
        &mut self,
        region: RegionName,
        recipient: RecipientId,
    ) -> Result<SubscriptionOutcome, SubscriptionError> {
        if let Some(record) = self.regions.get_mut(&region) {
            if !record.recipients.insert(recipient) {
                return Ok(SubscriptionOutcome::AlreadySubscribed(region));
            }
            self.persist();
            return Ok(SubscriptionOutcome::Added(region));
        }

        let metrics = self
            .data_source
            .fetch_region(&region)
            .await
            .map_err(|source| SubscriptionError::DataSource {
                region: region.clone(),
                source,
            })?;

        let outcome = match self.regions.entry(metrics.name.clone()) {
            Entry::Occupied(mut tracked) => {
                let name = tracked.key().clone();
                if !tracked.get_mut().recipients.insert(recipient) {
                    return Ok(SubscriptionOutcome::AlreadySubscribed(name));
                }
                SubscriptionOutcome::Added(name)
            }
            Entry::Vacant(untracked) => {
                let name = untracked.key().clone();
                untracked.insert(RegionRecord::first_observation(metrics, recipient));
                SubscriptionOutcome::Created(name)
            }
        };
        self.persist();
        Ok(outcome)
    }
}
