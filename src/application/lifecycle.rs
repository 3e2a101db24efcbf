use super::listeners::ListenerRegistry;
use crate::domain::donation::{Donation, DonationId, DonationStatus};
use crate::domain::event_log::{DonationEvent, EventLog};
use crate::domain::gateway::MANUAL_GATEWAY_ID;
use crate::domain::lifecycle_event::LifecycleEvent;
use crate::domain::ports::{DonationStoreRef, EventLogStoreRef, InsertOutcome};
use crate::domain::state_machine::apply_transition;
use crate::error::{LifecycleError, TransitionError};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Attempts at the compare-and-set before giving up with `ConcurrentUpdate`.
const MAX_CAS_ATTEMPTS: usize = 3;

/// Owns every status change of every donation.
///
/// Transitions on the same donation are serialised by a per-donation lock;
/// the store's compare-and-set on status additionally guards against writers
/// outside this process. After a transition is persisted its audit entry is
/// appended and a `LifecycleEvent` is published to the registered listeners.
pub struct Lifecycle {
    donations: DonationStoreRef,
    events: EventLogStoreRef,
    listeners: ListenerRegistry,
    locks: Mutex<HashMap<DonationId, Arc<Mutex<()>>>>,
}

impl Lifecycle {
    pub fn new(
        donations: DonationStoreRef,
        events: EventLogStoreRef,
        listeners: ListenerRegistry,
    ) -> Self {
        Self {
            donations,
            events,
            listeners,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn donations(&self) -> &DonationStoreRef {
        &self.donations
    }

    /// Records a new donation. It must still be `Pending`.
    pub async fn create_donation(&self, donation: Donation) -> Result<Donation, LifecycleError> {
        if donation.status() != DonationStatus::Pending {
            return Err(LifecycleError::Transition(TransitionError::InvalidTransition {
                from: DonationStatus::Pending,
                to: donation.status(),
            }));
        }
        match self.donations.insert(donation.clone()).await? {
            InsertOutcome::Inserted => {}
            InsertOutcome::DuplicateId => {
                return Err(LifecycleError::DuplicateDonation(donation.id));
            }
            InsertOutcome::DuplicateReference(existing) => {
                return Err(LifecycleError::DuplicateReference {
                    gateway: donation.gateway_id,
                    reference: donation.reference_number,
                    existing,
                });
            }
        }
        tracing::debug!(
            donation = %donation.id,
            campaign = %donation.campaign_id,
            reference = %donation.reference_number,
            "donation created"
        );
        Ok(donation)
    }

    /// Applies `target` to the donation on behalf of `gateway_id`.
    pub async fn transition(
        &self,
        donation_id: DonationId,
        target: DonationStatus,
        gateway_id: &str,
        note: Option<String>,
    ) -> Result<DonationEvent, LifecycleError> {
        let lock = self.lock_for(donation_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.transition_locked(donation_id, target, gateway_id, note)
                .await
        };
        self.release_lock(donation_id, lock).await;
        result
    }

    /// Administrator override, e.g. confirming a bank transfer by hand.
    ///
    /// Skips gateway verification but still goes through the state machine.
    pub async fn manual_override(
        &self,
        donation_id: DonationId,
        target: DonationStatus,
        note: Option<String>,
    ) -> Result<DonationEvent, LifecycleError> {
        self.transition(donation_id, target, MANUAL_GATEWAY_ID, note)
            .await
    }

    pub async fn history(&self, donation_id: DonationId) -> Result<EventLog, LifecycleError> {
        Ok(self.events.history(donation_id).await?)
    }

    async fn transition_locked(
        &self,
        donation_id: DonationId,
        target: DonationStatus,
        gateway_id: &str,
        note: Option<String>,
    ) -> Result<DonationEvent, LifecycleError> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let original = self
                .donations
                .get(donation_id)
                .await?
                .ok_or(LifecycleError::DonationNotFound(donation_id))?;
            let expected = original.status();
            let mut donation = original.clone();

            let event = apply_transition(&mut donation, target, gateway_id, note.clone(), Utc::now())?;

            if !self.donations.replace(donation.clone(), expected).await? {
                tracing::warn!(donation = %donation_id, attempt, "status changed during transition, retrying");
                continue;
            }

            if let Err(error) = self.events.append(event.clone()).await {
                self.roll_back(original, target).await;
                return Err(error.into());
            }
            tracing::info!(
                donation = %donation_id,
                from = %expected,
                to = %target,
                gateway = gateway_id,
                "{}",
                event.event_label
            );

            if let Some(lifecycle_event) =
                LifecycleEvent::for_status(target, donation_id, donation.campaign_id)
            {
                self.listeners.publish(&lifecycle_event).await;
            }
            return Ok(event);
        }
        Err(LifecycleError::ConcurrentUpdate(donation_id))
    }

    /// Restores `original` after its audit entry could not be written, so the
    /// status never moves without a matching event.
    async fn roll_back(&self, original: Donation, applied: DonationStatus) {
        let donation_id = original.id;
        match self.donations.replace(original, applied).await {
            Ok(true) => {
                tracing::warn!(donation = %donation_id, "audit append failed, status rolled back");
            }
            Ok(false) => {
                tracing::error!(donation = %donation_id, "audit append failed and status changed before roll back");
            }
            Err(error) => {
                tracing::error!(donation = %donation_id, %error, "audit append failed and roll back failed");
            }
        }
    }

    async fn lock_for(&self, donation_id: DonationId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(donation_id).or_default().clone()
    }

    async fn release_lock(&self, donation_id: DonationId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // One reference held by the map, one by us: nobody else is waiting.
        if Arc::strong_count(&lock) <= 2 {
            locks.remove(&donation_id);
        }
    }
}
