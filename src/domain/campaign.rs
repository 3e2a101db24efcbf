use super::money::{Currency, Money};
use crate::error::MoneyError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignId(pub u64);

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A fundraising campaign. Owned by the host content system; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub currency: Currency,
    goal: Option<Money>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Campaign {
    /// A campaign without a goal and without a time limit.
    pub fn new(id: CampaignId, currency: Currency) -> Self {
        Self {
            id,
            currency,
            goal: None,
            start_date: None,
            end_date: None,
        }
    }

    /// Sets the funding goal. The goal must be in the campaign currency.
    pub fn with_goal(mut self, goal: Money) -> Result<Self, MoneyError> {
        if goal.currency() != &self.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency.clone(),
                right: goal.currency().clone(),
            });
        }
        self.goal = Some(goal);
        Ok(self)
    }

    pub fn with_dates(
        mut self,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }

    pub fn goal(&self) -> Option<&Money> {
        self.goal.as_ref()
    }

    pub fn has_goal(&self) -> bool {
        self.goal.as_ref().is_some_and(|g| !g.is_zero())
    }
}
