use crate::domain::campaign::{Campaign, CampaignId};
use crate::domain::donation::{Donation, DonationId};
use crate::domain::money::{Currency, Money};
use crate::error::{EngineError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

/// One row of the campaigns CSV: `id,currency,goal,start_date,end_date`.
///
/// Dates are RFC 3339 timestamps or plain `YYYY-MM-DD` (midnight UTC).
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignRecord {
    pub id: u64,
    pub currency: String,
    pub goal: Option<Decimal>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl CampaignRecord {
    pub fn into_campaign(self) -> Result<Campaign> {
        let currency: Currency = self.currency.parse()?;
        let mut campaign = Campaign::new(CampaignId(self.id), currency.clone());
        if let Some(goal) = self.goal {
            campaign = campaign.with_goal(Money::new(goal, currency)?)?;
        }
        let start = self.start_date.as_deref().map(parse_date).transpose()?;
        let end = self.end_date.as_deref().map(parse_date).transpose()?;
        if let (Some(start), Some(end)) = (start, end)
            && end < start
        {
            return Err(EngineError::InvalidRecord(format!(
                "campaign {} ends before it starts",
                self.id
            )));
        }
        Ok(campaign.with_dates(start, end))
    }
}

/// One row of the donations CSV: `id,campaign,amount,currency,gateway,reference`.
#[derive(Debug, Clone, Deserialize)]
pub struct DonationRecord {
    pub id: u64,
    pub campaign: u64,
    pub amount: Decimal,
    pub currency: String,
    pub gateway: String,
    pub reference: Option<String>,
}

impl DonationRecord {
    pub fn into_donation(self, created_at: DateTime<Utc>) -> Result<Donation> {
        let amount = Money::new(self.amount, self.currency.parse()?)?;
        if self.gateway.is_empty() {
            return Err(EngineError::InvalidRecord(format!(
                "donation {} has no gateway",
                self.id
            )));
        }
        Ok(Donation::new(
            DonationId(self.id),
            CampaignId(self.campaign),
            amount,
            self.gateway,
            self.reference.filter(|r| !r.is_empty()),
            created_at,
        ))
    }
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| EngineError::InvalidRecord(format!("invalid date: {raw:?}")))
}
