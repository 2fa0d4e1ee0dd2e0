use crate::contracts::{SubscriptionError, SubscriptionStore};
use crate::data_transfer::RegionUpdate;
use shared_kernel::region_name::RegionName;

impl SubscriptionStore {
    pub fn describe(&self, region: &str) -> Result<String, SubscriptionError> {
        self.regions
            .get_key_value(region)
            .map(|(name, record)| record.describe(name).to_string())
            .ok_or_else(|| SubscriptionError::RegionNotFound(RegionName::from(region)))
    }

    /// `None` once the region stopped being tracked.
    pub fn update_for(&self, region: &str) -> Option<RegionUpdate> {
        self.regions
            .get_key_value(region)
            .map(|(name, record)| RegionUpdate {
                region: name.clone(),
                recipients: record.recipients.iter().copied().collect(),
                description: record.describe(name).to_string(),
            })
    }

    pub fn updates_for(&self, regions: &[RegionName]) -> Vec<RegionUpdate> {
        regions
            .iter()
            .filter_map(|region| self.update_for(region.as_ref()))
            .collect()
    }
}
