use super::campaign::{Campaign, CampaignId};
use super::donation::Donation;
use super::money::Money;
use crate::error::MoneyError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Time remaining in a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "days", rename_all = "snake_case")]
pub enum DaysLeft {
    NotStarted,
    Ended,
    Unlimited,
    Remaining(u32),
}

impl DaysLeft {
    pub fn classify(
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        if start_date.is_some_and(|start| start > now) {
            return DaysLeft::NotStarted;
        }
        match end_date {
            None => DaysLeft::Unlimited,
            Some(end) if end < now => DaysLeft::Ended,
            Some(end) => {
                let days = (end - now).num_days();
                DaysLeft::Remaining(u32::try_from(days).unwrap_or(u32::MAX))
            }
        }
    }
}

impl fmt::Display for DaysLeft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaysLeft::NotStarted => f.write_str("not_started"),
            DaysLeft::Ended => f.write_str("ended"),
            DaysLeft::Unlimited => f.write_str("unlimited"),
            DaysLeft::Remaining(n) => write!(f, "{n}"),
        }
    }
}

/// Time-independent part of a snapshot; this is what gets cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingTotals {
    pub raised_amount: Money,
    pub donation_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignFundingSnapshot {
    pub campaign_id: CampaignId,
    pub raised_amount: Money,
    pub goal_amount: Option<Money>,
    pub progress_percentage: Decimal,
    pub donation_count: u64,
    pub days_left: DaysLeft,
}

impl CampaignFundingSnapshot {
    pub fn goal_reached(&self) -> bool {
        self.goal_amount
            .as_ref()
            .is_some_and(|g| !g.is_zero() && self.raised_amount.amount() >= g.amount())
    }
}

/// Sums the completed donations of `campaign`.
///
/// Donations of other campaigns are skipped. A completed donation in a
/// currency other than the campaign's is a `CurrencyMismatch`.
pub fn compute_totals<'a, I>(campaign: &Campaign, donations: I) -> Result<FundingTotals, MoneyError>
where
    I: IntoIterator<Item = &'a Donation>,
{
    let mut raised_amount = Money::zero(campaign.currency.clone());
    let mut donation_count = 0;
    for donation in donations {
        if donation.campaign_id != campaign.id || !donation.status().counts_toward_funding() {
            continue;
        }
        raised_amount = raised_amount.checked_add(donation.amount())?;
        donation_count += 1;
    }
    Ok(FundingTotals {
        raised_amount,
        donation_count,
    })
}

/// `raised / goal * 100`, clamped to `[0, 100]`. Zero when there is no goal.
pub fn progress_percentage(raised: &Money, goal: Option<&Money>) -> Decimal {
    let Some(goal) = goal.filter(|g| !g.is_zero()) else {
        return Decimal::ZERO;
    };
    raised
        .amount()
        .checked_div(goal.amount())
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .unwrap_or(dec!(100))
        .clamp(Decimal::ZERO, dec!(100))
        .round_dp(2)
}

pub fn snapshot_from_totals(
    campaign: &Campaign,
    totals: FundingTotals,
    now: DateTime<Utc>,
) -> CampaignFundingSnapshot {
    CampaignFundingSnapshot {
        campaign_id: campaign.id,
        progress_percentage: progress_percentage(&totals.raised_amount, campaign.goal()),
        raised_amount: totals.raised_amount,
        goal_amount: campaign.goal().cloned(),
        donation_count: totals.donation_count,
        days_left: DaysLeft::classify(campaign.start_date, campaign.end_date, now),
    }
}

/// Computes a fresh funding snapshot. Pure and read-only.
pub fn compute_snapshot<'a, I>(
    campaign: &Campaign,
    donations: I,
    now: DateTime<Utc>,
) -> Result<CampaignFundingSnapshot, MoneyError>
where
    I: IntoIterator<Item = &'a Donation>,
{
    let totals = compute_totals(campaign, donations)?;
    Ok(snapshot_from_totals(campaign, totals, now))
}
