use crate::domain::lifecycle_event::LifecycleEvent;
use async_trait::async_trait;
use std::sync::Arc;

/// Consumer of lifecycle events (cache invalidation, receipts, audit logging).
///
/// Listeners run after the transition is persisted and cannot veto it.
#[async_trait]
pub trait LifecycleListener: Send + Sync {
    async fn on_event(&self, event: &LifecycleEvent);
}

/// Explicit set of listeners, invoked in registration order.
#[derive(Default, Clone)]
pub struct ListenerRegistry {
    listeners: Vec<Arc<dyn LifecycleListener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Arc<dyn LifecycleListener>) {
        self.listeners.push(listener);
    }

    /// Appends every listener of `other`, keeping its order.
    pub fn extend(&mut self, other: ListenerRegistry) {
        self.listeners.extend(other.listeners);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub async fn publish(&self, event: &LifecycleEvent) {
        for listener in &self.listeners {
            listener.on_event(event).await;
        }
    }
}

/// Emits one structured `tracing` record per lifecycle event.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuditLogListener;

#[async_trait]
impl LifecycleListener for AuditLogListener {
    async fn on_event(&self, event: &LifecycleEvent) {
        tracing::info!(
            donation = %event.donation_id(),
            campaign = %event.campaign_id(),
            affects_funding = event.affects_funding(),
            "lifecycle event: {:?}",
            event
        );
    }
}
