use crate::domain::aggregator::CampaignFundingSnapshot;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct SnapshotRow {
    campaign: u64,
    currency: String,
    raised: Decimal,
    goal: Option<Decimal>,
    percentage: Decimal,
    donations: u64,
    days_left: String,
}

impl From<&CampaignFundingSnapshot> for SnapshotRow {
    fn from(snapshot: &CampaignFundingSnapshot) -> Self {
        Self {
            campaign: snapshot.campaign_id.0,
            currency: snapshot.raised_amount.currency().to_string(),
            raised: snapshot.raised_amount.amount().normalize(),
            goal: snapshot.goal_amount.as_ref().map(|g| g.amount().normalize()),
            percentage: snapshot.progress_percentage.normalize(),
            donations: snapshot.donation_count,
            days_left: snapshot.days_left.to_string(),
        }
    }
}

/// Writes funding snapshots as CSV:
/// `campaign,currency,raised,goal,percentage,donations,days_left`.
pub struct SnapshotWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> SnapshotWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_snapshots<'a, I>(&mut self, snapshots: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a CampaignFundingSnapshot>,
    {
        for snapshot in snapshots {
            self.writer.serialize(SnapshotRow::from(snapshot))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
