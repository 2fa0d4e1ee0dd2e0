use crate::config::Settings;
use anyhow::Context;
use case_data_source::{CaseDataSource, RkiCaseDataSource};
use itertools::Itertools;
use notifications::contracts::send_notification::telegram::TelegramDelivery;
use notifications::contracts::send_notification::RegionNotification;
use notifications::notify::{DispatchReport, Notifier};
use region_subscription::snapshot::SnapshotFile;
use region_subscription::{ChangeDetector, RegionUpdate, SharedStore, SubscriptionStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

pub mod config;

pub fn convert_updates_to_notifications(updates: Vec<RegionUpdate>) -> Vec<RegionNotification> {
    updates
        .into_iter()
        .map(|update| RegionNotification {
            region: update.region,
            recipients: update.recipients,
            text: update.description,
        })
        .collect_vec()
}

/// One refresh cycle: detect changed regions, announce them, and forget
/// recipients that can no longer be reached.
pub struct RefreshAndNotify {
    store: SharedStore,
    detector: ChangeDetector,
    notifier: Notifier,
}

impl RefreshAndNotify {
    pub fn new(store: SharedStore, detector: ChangeDetector, notifier: Notifier) -> Self {
        Self {
            store,
            detector,
            notifier,
        }
    }

    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let data_source: Arc<dyn CaseDataSource> =
            Arc::new(RkiCaseDataSource::new(settings.data_source));
        let store = SubscriptionStore::open(
            SnapshotFile::new(settings.store.snapshot_path),
            data_source.clone(),
        )
        .context("Failed to load the subscription snapshot")?;
        let detector = ChangeDetector::new(data_source, settings.store.change_policy);
        let notifier = Notifier::new(Arc::new(TelegramDelivery::new(settings.telegram)));
        Ok(Self::new(store.into_shared(), detector, notifier))
    }

    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    /// The store is not locked while messages are sent.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn run_cycle(&self) -> DispatchReport {
        let updates = {
            let mut store = self.store.lock().await;
            let changed = self.detector.refresh_all(&mut store).await;
            store.updates_for(&changed)
        };
        if updates.is_empty() {
            return DispatchReport::default();
        }

        let report = self
            .notifier
            .dispatch(convert_updates_to_notifications(updates))
            .await;

        if !report.unreachable.is_empty() {
            let mut store = self.store.lock().await;
            for recipient in &report.unreachable {
                let regions = store.remove_recipient_everywhere(*recipient);
                tracing::info!(%recipient, regions = regions.len(), "Unsubscribed unreachable recipient");
            }
        }
        report
    }

    /// Runs a cycle on every tick until `shutdown` resolves. A cycle always runs to
    /// completion and ticks missed meanwhile are skipped, so cycles never overlap.
    pub async fn run_every<F>(&self, period: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Stopping refresh loop");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }
    }
}
