use super::listeners::LifecycleListener;
use crate::domain::aggregator::FundingTotals;
use crate::domain::campaign::CampaignId;
use crate::domain::lifecycle_event::LifecycleEvent;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct Slot {
    generation: u64,
    totals: Option<FundingTotals>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(FundingTotals),
    /// Nothing cached. The generation must be handed back to `store` so a
    /// result computed before a concurrent invalidation is discarded.
    Miss { generation: u64 },
}

/// Per-campaign cache of funding totals.
///
/// Every invalidation bumps the campaign's generation, so a reader never sees
/// totals older than the last invalidation delivered to the cache.
#[derive(Default)]
pub struct SnapshotCache {
    slots: Mutex<HashMap<CampaignId, Slot>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lookup(&self, campaign_id: CampaignId) -> CacheLookup {
        let slots = self.slots.lock().await;
        match slots.get(&campaign_id) {
            Some(Slot {
                totals: Some(totals),
                ..
            }) => CacheLookup::Hit(totals.clone()),
            Some(slot) => CacheLookup::Miss {
                generation: slot.generation,
            },
            None => CacheLookup::Miss { generation: 0 },
        }
    }

    /// Stores `totals` computed at `generation`. Returns `false` if the campaign
    /// was invalidated in the meantime.
    pub async fn store(&self, campaign_id: CampaignId, generation: u64, totals: FundingTotals) -> bool {
        let mut slots = self.slots.lock().await;
        let slot = slots.entry(campaign_id).or_default();
        if slot.generation != generation {
            return false;
        }
        slot.totals = Some(totals);
        true
    }

    pub async fn invalidate(&self, campaign_id: CampaignId) {
        let mut slots = self.slots.lock().await;
        let slot = slots.entry(campaign_id).or_default();
        slot.generation += 1;
        slot.totals = None;
    }
}

#[async_trait]
impl LifecycleListener for SnapshotCache {
    async fn on_event(&self, event: &LifecycleEvent) {
        if event.affects_funding() {
            tracing::debug!(campaign = %event.campaign_id(), "invalidating funding snapshot");
            self.invalidate(event.campaign_id()).await;
        }
    }
}
