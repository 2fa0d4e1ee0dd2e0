use crate::contracts::SubscriptionStore;
use shared_kernel::recipient_id::RecipientId;
use shared_kernel::region_name::RegionName;

impl SubscriptionStore {
    pub fn regions_for(&self, recipient: RecipientId) -> Vec<RegionName> {
        self.regions
            .iter()
            .filter(|(_, record)| record.recipients.contains(&recipient))
            .map(|(region, _)| region.clone())
            .collect()
    }
}
