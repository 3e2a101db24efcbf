use super::campaign::CampaignId;
use super::donation::{DonationId, DonationStatus};
use serde::{Deserialize, Serialize};

/// Typed notification published after a transition has been persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    DonationCompleted {
        donation_id: DonationId,
        campaign_id: CampaignId,
    },
    DonationFailed {
        donation_id: DonationId,
        campaign_id: CampaignId,
    },
    DonationRefunded {
        donation_id: DonationId,
        campaign_id: CampaignId,
    },
}

impl LifecycleEvent {
    /// The event for a transition into `status`, if that status is a target.
    pub fn for_status(
        status: DonationStatus,
        donation_id: DonationId,
        campaign_id: CampaignId,
    ) -> Option<Self> {
        match status {
            DonationStatus::Completed => Some(LifecycleEvent::DonationCompleted {
                donation_id,
                campaign_id,
            }),
            DonationStatus::Failed => Some(LifecycleEvent::DonationFailed {
                donation_id,
                campaign_id,
            }),
            DonationStatus::Refunded => Some(LifecycleEvent::DonationRefunded {
                donation_id,
                campaign_id,
            }),
            DonationStatus::Pending => None,
        }
    }

    pub fn donation_id(&self) -> DonationId {
        match self {
            LifecycleEvent::DonationCompleted { donation_id, .. }
            | LifecycleEvent::DonationFailed { donation_id, .. }
            | LifecycleEvent::DonationRefunded { donation_id, .. } => *donation_id,
        }
    }

    pub fn campaign_id(&self) -> CampaignId {
        match self {
            LifecycleEvent::DonationCompleted { campaign_id, .. }
            | LifecycleEvent::DonationFailed { campaign_id, .. }
            | LifecycleEvent::DonationRefunded { campaign_id, .. } => *campaign_id,
        }
    }

    /// True for transitions into or out of `Completed`, which change campaign totals.
    pub fn affects_funding(&self) -> bool {
        matches!(
            self,
            LifecycleEvent::DonationCompleted { .. } | LifecycleEvent::DonationRefunded { .. }
        )
    }
}
