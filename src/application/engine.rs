use super::aggregator::CampaignAggregator;
use super::dispatcher::{DispatchOutcome, Dispatcher};
use super::lifecycle::Lifecycle;
use super::listeners::{AuditLogListener, ListenerRegistry};
use super::snapshot_cache::SnapshotCache;
use crate::config::EngineConfig;
use crate::domain::aggregator::CampaignFundingSnapshot;
use crate::domain::campaign::{Campaign, CampaignId};
use crate::domain::donation::{Donation, DonationId, DonationStatus};
use crate::domain::event_log::{DonationEvent, EventLog};
use crate::domain::gateway::{GatewayAdapterRef, Notification};
use crate::domain::ports::{
    CampaignStoreRef, DonationStoreRef, EventLogStoreRef, IdempotencyStoreRef,
};
use crate::error::{DispatchError, EngineError, LifecycleError, MoneyError, Result};
use crate::infrastructure::gateways::bank_transfer::BankTransferAdapter;
use crate::infrastructure::gateways::paypal::{HttpIpnPostback, PayPalAdapter};
use crate::infrastructure::gateways::stripe::StripeAdapter;
use crate::infrastructure::in_memory::{
    InMemoryCampaignStore, InMemoryDonationStore, InMemoryEventLogStore, InMemoryIdempotencyStore,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// The storage backends the engine runs on, one per port.
#[derive(Clone)]
pub struct Stores {
    pub donations: DonationStoreRef,
    pub events: EventLogStoreRef,
    pub idempotency: IdempotencyStoreRef,
    pub campaigns: CampaignStoreRef,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            donations: Arc::new(InMemoryDonationStore::new()),
            events: Arc::new(InMemoryEventLogStore::new()),
            idempotency: Arc::new(InMemoryIdempotencyStore::new()),
            campaigns: Arc::new(InMemoryCampaignStore::new()),
        }
    }

    /// Every port backed by the same RocksDB instance.
    #[cfg(feature = "storage-rocksdb")]
    pub fn rocksdb(store: crate::infrastructure::rocksdb::RocksDBStore) -> Self {
        Self {
            donations: Arc::new(store.clone()),
            events: Arc::new(store.clone()),
            idempotency: Arc::new(store.clone()),
            campaigns: Arc::new(store),
        }
    }
}

/// The main entry point of the donation system.
///
/// `DonationEngine` wires the lifecycle, the gateway dispatcher and the
/// campaign aggregator onto one set of stores. It is `Send + Sync` and meant
/// to be shared behind an `Arc` by concurrent request handlers.
pub struct DonationEngine {
    campaigns: CampaignStoreRef,
    lifecycle: Arc<Lifecycle>,
    dispatcher: Dispatcher,
    aggregator: CampaignAggregator,
}

impl DonationEngine {
    /// Creates an engine with the adapters enabled by `config`.
    ///
    /// The bank transfer adapter is always registered; Stripe and PayPal only
    /// when their credentials are configured.
    pub fn new(stores: Stores, config: &EngineConfig) -> Result<Self> {
        Self::with_listeners(stores, config, ListenerRegistry::new())
    }

    /// Like `new`, with additional lifecycle listeners. The audit listener
    /// and (when enabled) the snapshot cache are registered ahead of them.
    pub fn with_listeners(
        stores: Stores,
        config: &EngineConfig,
        extra: ListenerRegistry,
    ) -> Result<Self> {
        let cache = config.snapshot_cache.then(|| Arc::new(SnapshotCache::new()));

        let mut listeners = ListenerRegistry::new();
        listeners.register(Arc::new(AuditLogListener));
        if let Some(cache) = &cache {
            listeners.register(cache.clone());
        }
        listeners.extend(extra);

        let lifecycle = Arc::new(Lifecycle::new(
            stores.donations.clone(),
            stores.events,
            listeners,
        ));

        let mut dispatcher = Dispatcher::new(lifecycle.clone(), stores.idempotency);
        dispatcher.register(Arc::new(BankTransferAdapter::new()));
        if let Some(secret) = &config.stripe_webhook_secret {
            dispatcher.register(Arc::new(StripeAdapter::new(
                secret.clone(),
                config.stripe_tolerance_secs,
            )));
        }
        if let Some(email) = &config.paypal_receiver_email {
            let mut adapter = PayPalAdapter::new(email.clone());
            if let Some(url) = &config.paypal_ipn_verify_url {
                adapter = adapter.with_postback(Arc::new(HttpIpnPostback::new(url.clone())?));
            }
            dispatcher.register(Arc::new(adapter));
        }
        tracing::debug!(gateways = ?dispatcher.gateway_ids(), "donation engine ready");

        let aggregator =
            CampaignAggregator::new(stores.campaigns.clone(), stores.donations, cache);

        Ok(Self {
            campaigns: stores.campaigns,
            lifecycle,
            dispatcher,
            aggregator,
        })
    }

    /// Registers an additional gateway adapter, replacing one with the same id.
    pub fn register_adapter(&mut self, adapter: GatewayAdapterRef) {
        self.dispatcher.register(adapter);
    }

    pub fn gateway_ids(&self) -> Vec<&str> {
        self.dispatcher.gateway_ids()
    }

    pub async fn register_campaign(&self, campaign: Campaign) -> Result<()> {
        self.campaigns.store(campaign).await?;
        Ok(())
    }

    /// Records a new pending donation for an existing campaign.
    ///
    /// The amount must be in the campaign's currency.
    pub async fn submit_donation(&self, donation: Donation) -> Result<Donation> {
        let campaign = self
            .campaigns
            .get(donation.campaign_id)
            .await?
            .ok_or(EngineError::CampaignNotFound(donation.campaign_id))?;
        if donation.amount().currency() != &campaign.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: campaign.currency,
                right: donation.amount().currency().clone(),
            }
            .into());
        }
        Ok(self.lifecycle.create_donation(donation).await?)
    }

    pub async fn handle_notification(
        &self,
        gateway_id: &str,
        notification: &Notification,
    ) -> std::result::Result<DispatchOutcome, DispatchError> {
        self.dispatcher
            .handle_notification(gateway_id, notification)
            .await
    }

    pub async fn manual_override(
        &self,
        donation_id: DonationId,
        target: DonationStatus,
        note: Option<String>,
    ) -> std::result::Result<DonationEvent, LifecycleError> {
        self.lifecycle
            .manual_override(donation_id, target, note)
            .await
    }

    pub async fn snapshot(
        &self,
        campaign_id: CampaignId,
        now: DateTime<Utc>,
    ) -> Result<CampaignFundingSnapshot> {
        self.aggregator.snapshot(campaign_id, now).await
    }

    pub async fn snapshots(&self, now: DateTime<Utc>) -> Result<Vec<CampaignFundingSnapshot>> {
        self.aggregator.snapshots(now).await
    }

    pub async fn history(&self, donation_id: DonationId) -> Result<EventLog> {
        Ok(self.lifecycle.history(donation_id).await?)
    }

    /// Every donation, ordered by id.
    pub async fn donations(&self) -> Result<Vec<Donation>> {
        Ok(self.lifecycle.donations().all().await?)
    }
}
