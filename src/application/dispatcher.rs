use super::lifecycle::Lifecycle;
use crate::domain::donation::DonationStatus;
use crate::domain::event_log::DonationEvent;
use crate::domain::gateway::{GatewayAdapterRef, Notification};
use crate::domain::ports::IdempotencyStoreRef;
use crate::error::{DispatchError, LifecycleError, TransitionError};
use std::collections::HashMap;
use std::sync::Arc;

/// What happened to an accepted notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The transition was applied and this audit entry recorded.
    Applied(DonationEvent),
    /// The idempotency key was already processed; nothing was reapplied.
    Duplicate,
    /// The state machine rejected the transition (replay or race). The
    /// notification is still marked processed so the gateway stops retrying.
    Conflict {
        from: DonationStatus,
        to: DonationStatus,
    },
}

/// Routes inbound gateway notifications to the donation lifecycle.
///
/// Processing is at-most-once per `(gateway_id, idempotency_key)`: the key is
/// recorded only after the transition was applied or deliberately ignored, so
/// a crash in between leads to a retry that the state machine rejects.
pub struct Dispatcher {
    adapters: HashMap<String, GatewayAdapterRef>,
    lifecycle: Arc<Lifecycle>,
    idempotency: IdempotencyStoreRef,
}

impl Dispatcher {
    pub fn new(lifecycle: Arc<Lifecycle>, idempotency: IdempotencyStoreRef) -> Self {
        Self {
            adapters: HashMap::new(),
            lifecycle,
            idempotency,
        }
    }

    /// Registers an adapter under its `id()`, replacing any previous one.
    pub fn register(&mut self, adapter: GatewayAdapterRef) {
        self.adapters.insert(adapter.id().to_string(), adapter);
    }

    pub fn gateway_ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.adapters.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    #[tracing::instrument(skip(self, notification))]
    pub async fn handle_notification(
        &self,
        gateway_id: &str,
        notification: &Notification,
    ) -> Result<DispatchOutcome, DispatchError> {
        let adapter = self
            .adapters
            .get(gateway_id)
            .ok_or_else(|| DispatchError::UnknownGateway(gateway_id.to_string()))?;

        let event = adapter
            .verify_notification(notification)
            .await
            .inspect_err(|e| tracing::warn!("notification rejected: {e}"))?;

        if self
            .idempotency
            .contains(gateway_id, &event.idempotency_key)
            .await?
        {
            tracing::debug!(key = %event.idempotency_key, "duplicate notification ignored");
            return Ok(DispatchOutcome::Duplicate);
        }

        let donation = self
            .lifecycle
            .donations()
            .find_by_reference(gateway_id, &event.donation_reference)
            .await?
            .ok_or_else(|| DispatchError::DonationNotFound {
                gateway: gateway_id.to_string(),
                reference: event.donation_reference.clone(),
            })?;

        let outcome = match self
            .lifecycle
            .transition(donation.id, event.reported_status, gateway_id, event.note)
            .await
        {
            Ok(applied) => DispatchOutcome::Applied(applied),
            Err(LifecycleError::Transition(TransitionError::InvalidTransition { from, to })) => {
                tracing::warn!(
                    donation = %donation.id,
                    %from,
                    %to,
                    key = %event.idempotency_key,
                    "conflicting notification ignored"
                );
                DispatchOutcome::Conflict { from, to }
            }
            Err(LifecycleError::DonationNotFound(_)) => {
                return Err(DispatchError::DonationNotFound {
                    gateway: gateway_id.to_string(),
                    reference: event.donation_reference,
                });
            }
            Err(e) => return Err(e.into()),
        };

        self.idempotency
            .record(gateway_id, &event.idempotency_key)
            .await?;
        Ok(outcome)
    }
}
