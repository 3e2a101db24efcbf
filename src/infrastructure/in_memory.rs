use crate::domain::campaign::{Campaign, CampaignId};
use crate::domain::donation::{Donation, DonationId, DonationStatus};
use crate::domain::event_log::{DonationEvent, EventLog};
use crate::domain::ports::{
    CampaignStore, DonationStore, EventLogStore, IdempotencyStore, InsertOutcome,
};
use crate::error::StoreResult;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct DonationTable {
    rows: HashMap<DonationId, Donation>,
    by_reference: HashMap<(String, String), DonationId>,
}

/// A thread-safe in-memory donation store.
///
/// Keeps a secondary index on `(gateway_id, reference_number)`. Cloning shares
/// the underlying table.
#[derive(Default, Clone)]
pub struct InMemoryDonationStore {
    table: Arc<RwLock<DonationTable>>,
}

impl InMemoryDonationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DonationStore for InMemoryDonationStore {
    async fn insert(&self, donation: Donation) -> StoreResult<InsertOutcome> {
        let mut table = self.table.write().await;
        if table.rows.contains_key(&donation.id) {
            return Ok(InsertOutcome::DuplicateId);
        }
        let reference = (
            donation.gateway_id.clone(),
            donation.reference_number.clone(),
        );
        if let Some(existing) = table.by_reference.get(&reference) {
            return Ok(InsertOutcome::DuplicateReference(*existing));
        }
        table.by_reference.insert(reference, donation.id);
        table.rows.insert(donation.id, donation);
        Ok(InsertOutcome::Inserted)
    }

    async fn replace(&self, donation: Donation, expected: DonationStatus) -> StoreResult<bool> {
        let mut table = self.table.write().await;
        match table.rows.get_mut(&donation.id) {
            Some(current) if current.status() == expected => {
                *current = donation;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get(&self, id: DonationId) -> StoreResult<Option<Donation>> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn find_by_reference(
        &self,
        gateway_id: &str,
        reference_number: &str,
    ) -> StoreResult<Option<Donation>> {
        let table = self.table.read().await;
        let key = (gateway_id.to_string(), reference_number.to_string());
        Ok(table
            .by_reference
            .get(&key)
            .and_then(|id| table.rows.get(id))
            .cloned())
    }

    async fn for_campaign(&self, campaign_id: CampaignId) -> StoreResult<Vec<Donation>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|d| d.campaign_id == campaign_id)
            .cloned()
            .collect())
    }

    async fn all(&self) -> StoreResult<Vec<Donation>> {
        let table = self.table.read().await;
        let mut donations: Vec<_> = table.rows.values().cloned().collect();
        donations.sort_by_key(|d| d.id);
        Ok(donations)
    }
}

/// In-memory audit trail, one `EventLog` per donation.
#[derive(Default, Clone)]
pub struct InMemoryEventLogStore {
    logs: Arc<RwLock<HashMap<DonationId, EventLog>>>,
}

impl InMemoryEventLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventLogStore for InMemoryEventLogStore {
    async fn append(&self, event: DonationEvent) -> StoreResult<()> {
        let mut logs = self.logs.write().await;
        logs.entry(event.donation_id)
            .or_insert_with(|| EventLog::new(event.donation_id))
            .append(event);
        Ok(())
    }

    async fn history(&self, donation_id: DonationId) -> StoreResult<EventLog> {
        let logs = self.logs.read().await;
        Ok(logs
            .get(&donation_id)
            .cloned()
            .unwrap_or_else(|| EventLog::new(donation_id)))
    }
}

#[derive(Default, Clone)]
pub struct InMemoryIdempotencyStore {
    keys: Arc<RwLock<HashSet<(String, String)>>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn contains(&self, gateway_id: &str, key: &str) -> StoreResult<bool> {
        let keys = self.keys.read().await;
        Ok(keys.contains(&(gateway_id.to_string(), key.to_string())))
    }

    async fn record(&self, gateway_id: &str, key: &str) -> StoreResult<bool> {
        let mut keys = self.keys.write().await;
        Ok(keys.insert((gateway_id.to_string(), key.to_string())))
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCampaignStore {
    campaigns: Arc<RwLock<HashMap<CampaignId, Campaign>>>,
}

impl InMemoryCampaignStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CampaignStore for InMemoryCampaignStore {
    async fn store(&self, campaign: Campaign) -> StoreResult<()> {
        let mut campaigns = self.campaigns.write().await;
        campaigns.insert(campaign.id, campaign);
        Ok(())
    }

    async fn get(&self, id: CampaignId) -> StoreResult<Option<Campaign>> {
        let campaigns = self.campaigns.read().await;
        Ok(campaigns.get(&id).cloned())
    }

    async fn all(&self) -> StoreResult<Vec<Campaign>> {
        let campaigns = self.campaigns.read().await;
        let mut all: Vec<_> = campaigns.values().cloned().collect();
        all.sort_by_key(|c| c.id);
        Ok(all)
    }
}
