use crate::contracts::{SubscriptionError, SubscriptionStore};
use shared_kernel::recipient_id::RecipientId;
use shared_kernel::region_name::RegionName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    RecipientRemoved,
    /// The recipient was the last one, so the region is no longer tracked.
    RegionDeleted,
}

impl SubscriptionStore {
    /// Unknown regions and pairings are the caller's "nothing to do" case and are
    /// not logged as errors.
    #[tracing::instrument(skip(self), level = "info")]
    pub fn remove_subscription(
        &mut self,
        region: &str,
        recipient: RecipientId,
    ) -> Result<RemovalOutcome, SubscriptionError> {
        let record = self
            .regions
            .get_mut(region)
            .ok_or_else(|| SubscriptionError::RegionNotFound(RegionName::from(region)))?;
        if !record.recipients.remove(&recipient) {
            return Err(SubscriptionError::NotSubscribed {
                region: RegionName::from(region),
                recipient,
            });
        }

        let outcome = if record.recipients.is_empty() {
            self.regions.remove(region);
            RemovalOutcome::RegionDeleted
        } else {
            RemovalOutcome::RecipientRemoved
        };
        self.persist();
        Ok(outcome)
    }

    /// Drops an unreachable recipient from every region and returns those regions.
    #[tracing::instrument(skip(self), level = "info")]
    pub fn remove_recipient_everywhere(&mut self, recipient: RecipientId) -> Vec<RegionName> {
        let mut removed_from = Vec::new();
        self.regions.retain(|region, record| {
            if record.recipients.remove(&recipient) {
                removed_from.push(region.clone());
            }
            !record.recipients.is_empty()
        });
        if !removed_from.is_empty() {
            self.persist();
        }
        removed_from
    }
}
