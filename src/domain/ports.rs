use super::campaign::{Campaign, CampaignId};
use super::donation::{Donation, DonationId, DonationStatus};
use super::event_log::{DonationEvent, EventLog};
use crate::error::StoreResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Result of `DonationStore::insert`. Nothing is written unless `Inserted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    DuplicateId,
    /// The `(gateway_id, reference_number)` pair already routes to this donation.
    DuplicateReference(DonationId),
}

#[async_trait]
pub trait DonationStore: Send + Sync {
    /// Inserts a new donation unless its id or its reference on the gateway
    /// is already taken.
    async fn insert(&self, donation: Donation) -> StoreResult<InsertOutcome>;

    /// Compare-and-set on status: writes `donation` only if the stored copy
    /// still has `expected`. Returns `false` when the stored status changed.
    async fn replace(&self, donation: Donation, expected: DonationStatus) -> StoreResult<bool>;

    async fn get(&self, id: DonationId) -> StoreResult<Option<Donation>>;

    async fn find_by_reference(
        &self,
        gateway_id: &str,
        reference_number: &str,
    ) -> StoreResult<Option<Donation>>;

    async fn for_campaign(&self, campaign_id: CampaignId) -> StoreResult<Vec<Donation>>;

    async fn all(&self) -> StoreResult<Vec<Donation>>;
}

#[async_trait]
pub trait EventLogStore: Send + Sync {
    async fn append(&self, event: DonationEvent) -> StoreResult<()>;

    /// History of one donation in `occurred_at` order.
    async fn history(&self, donation_id: DonationId) -> StoreResult<EventLog>;
}

/// Durable set of already-processed `(gateway_id, idempotency_key)` pairs.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn contains(&self, gateway_id: &str, key: &str) -> StoreResult<bool>;

    /// Records the key. Returns `false` if it was already present.
    async fn record(&self, gateway_id: &str, key: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn store(&self, campaign: Campaign) -> StoreResult<()>;
    async fn get(&self, id: CampaignId) -> StoreResult<Option<Campaign>>;
    async fn all(&self) -> StoreResult<Vec<Campaign>>;
}

pub type DonationStoreRef = Arc<dyn DonationStore>;
pub type EventLogStoreRef = Arc<dyn EventLogStore>;
pub type IdempotencyStoreRef = Arc<dyn IdempotencyStore>;
pub type CampaignStoreRef = Arc<dyn CampaignStore>;
