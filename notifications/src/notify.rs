use crate::contracts::send_notification::{DeliveryError, DeliveryStrategy, RegionNotification};
use futures::stream::{self, StreamExt};
use shared_kernel::recipient_id::RecipientId;
use std::collections::BTreeSet;
use std::sync::Arc;

const MAX_CONCURRENT_DELIVERIES: usize = 8;

pub struct Notifier {
    strategy: Arc<dyn DeliveryStrategy>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
    /// Recipients that can no longer be reached and should be unsubscribed everywhere.
    pub unreachable: BTreeSet<RecipientId>,
}

impl Notifier {
    pub fn new(strategy: Arc<dyn DeliveryStrategy>) -> Self {
        Self { strategy }
    }

    #[tracing::instrument(skip_all, fields(regions = notifications.len()), level = "info")]
    pub async fn dispatch(&self, notifications: Vec<RegionNotification>) -> DispatchReport {
        let deliveries = notifications.iter().flat_map(|notification| {
            notification
                .recipients
                .iter()
                .map(move |recipient| (notification, *recipient))
        });

        let mut results = stream::iter(deliveries)
            .map(|(notification, recipient)| async move {
                let result = self.strategy.deliver(recipient, &notification.text).await;
                (notification, result)
            })
            .buffer_unordered(MAX_CONCURRENT_DELIVERIES);

        let mut report = DispatchReport::default();
        while let Some((notification, result)) = results.next().await {
            match result {
                Ok(()) => report.delivered += 1,
                Err(DeliveryError::RecipientUnreachable { recipient, reason }) => {
                    tracing::warn!(region = %notification.region, %recipient, reason = %reason, "Recipient unreachable");
                    report.unreachable.insert(recipient);
                }
                Err(err) => {
                    tracing::error!(region = %notification.region, error = ?err, "Error sending notification");
                    report.failed += 1;
                }
            }
        }
        tracing::info!(
            delivered = report.delivered,
            failed = report.failed,
            unreachable = report.unreachable.len(),
            "Notifications dispatched"
        );
        report
    }
}
