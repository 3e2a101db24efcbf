use super::campaign::CampaignId;
use super::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DonationId(pub u64);

impl fmt::Display for DonationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Payment status of a donation.
///
/// `Pending` is the initial state; `Failed` and `Refunded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl DonationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DonationStatus::Failed | DonationStatus::Refunded)
    }

    pub fn can_transition_to(self, target: DonationStatus) -> bool {
        matches!(
            (self, target),
            (DonationStatus::Pending, DonationStatus::Completed)
                | (DonationStatus::Pending, DonationStatus::Failed)
                | (DonationStatus::Completed, DonationStatus::Refunded)
        )
    }

    /// Only completed donations are counted in campaign totals.
    pub fn counts_toward_funding(self) -> bool {
        self == DonationStatus::Completed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DonationStatus::Pending => "pending",
            DonationStatus::Completed => "completed",
            DonationStatus::Failed => "failed",
            DonationStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DonationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(DonationStatus::Pending),
            "completed" => Ok(DonationStatus::Completed),
            "failed" => Ok(DonationStatus::Failed),
            "refunded" => Ok(DonationStatus::Refunded),
            _ => Err(s.to_string()),
        }
    }
}

/// A single donation as tracked by the engine.
///
/// The amount is fixed at creation; status only changes through
/// `state_machine::apply_transition`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    pub id: DonationId,
    pub campaign_id: CampaignId,
    amount: Money,
    pub gateway_id: String,
    pub(crate) status: DonationStatus,
    pub reference_number: String,
    pub created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Donation {
    /// Creates a pending donation. A missing reference number is generated from
    /// the campaign and donation ids.
    pub fn new(
        id: DonationId,
        campaign_id: CampaignId,
        amount: Money,
        gateway_id: impl Into<String>,
        reference_number: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let reference_number = reference_number
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| Self::generate_reference(campaign_id, id));
        Self {
            id,
            campaign_id,
            amount,
            gateway_id: gateway_id.into(),
            status: DonationStatus::Pending,
            reference_number,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn generate_reference(campaign_id: CampaignId, id: DonationId) -> String {
        format!("DON-{}-{}", campaign_id, id)
    }

    pub fn amount(&self) -> &Money {
        &self.amount
    }

    pub fn status(&self) -> DonationStatus {
        self.status
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
