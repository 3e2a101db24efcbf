use super::snapshot_cache::{CacheLookup, SnapshotCache};
use crate::domain::aggregator::{CampaignFundingSnapshot, compute_totals, snapshot_from_totals};
use crate::domain::campaign::{Campaign, CampaignId};
use crate::domain::ports::{CampaignStoreRef, DonationStoreRef};
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Produces funding snapshots from the stores.
///
/// Totals are cached per campaign when a cache is attached; `days_left` and
/// the percentage are recomputed on every read since they depend on `now`.
pub struct CampaignAggregator {
    campaigns: CampaignStoreRef,
    donations: DonationStoreRef,
    cache: Option<Arc<SnapshotCache>>,
}

impl CampaignAggregator {
    pub fn new(
        campaigns: CampaignStoreRef,
        donations: DonationStoreRef,
        cache: Option<Arc<SnapshotCache>>,
    ) -> Self {
        Self {
            campaigns,
            donations,
            cache,
        }
    }

    pub async fn snapshot(
        &self,
        campaign_id: CampaignId,
        now: DateTime<Utc>,
    ) -> Result<CampaignFundingSnapshot> {
        let campaign = self
            .campaigns
            .get(campaign_id)
            .await?
            .ok_or(EngineError::CampaignNotFound(campaign_id))?;
        self.snapshot_of(&campaign, now).await
    }

    /// Snapshots of every known campaign, ordered by campaign id.
    pub async fn snapshots(&self, now: DateTime<Utc>) -> Result<Vec<CampaignFundingSnapshot>> {
        let mut out = Vec::new();
        for campaign in self.campaigns.all().await? {
            out.push(self.snapshot_of(&campaign, now).await?);
        }
        Ok(out)
    }

    async fn snapshot_of(
        &self,
        campaign: &Campaign,
        now: DateTime<Utc>,
    ) -> Result<CampaignFundingSnapshot> {
        let Some(cache) = &self.cache else {
            let donations = self.donations.for_campaign(campaign.id).await?;
            let totals = compute_totals(campaign, &donations)?;
            return Ok(snapshot_from_totals(campaign, totals, now));
        };

        let totals = match cache.lookup(campaign.id).await {
            CacheLookup::Hit(totals) => {
                tracing::debug!(campaign = %campaign.id, "funding totals served from cache");
                totals
            }
            CacheLookup::Miss { generation } => {
                let donations = self.donations.for_campaign(campaign.id).await?;
                let totals = compute_totals(campaign, &donations)?;
                cache.store(campaign.id, generation, totals.clone()).await;
                totals
            }
        };
        Ok(snapshot_from_totals(campaign, totals, now))
    }
}
