use super::donation::{DonationId, DonationStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One audit entry: a status change accepted by the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationEvent {
    pub donation_id: DonationId,
    pub event_label: String,
    /// The status the donation moved to.
    pub status: DonationStatus,
    pub gateway: String,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Append-only history of a single donation.
///
/// Entries are kept in `occurred_at` order; entries with equal timestamps keep
/// the order in which they were appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    donation_id: DonationId,
    entries: Vec<DonationEvent>,
}

impl EventLog {
    pub fn new(donation_id: DonationId) -> Self {
        Self {
            donation_id,
            entries: Vec::new(),
        }
    }

    /// Rebuilds a log from stored entries, dropping any that belong elsewhere.
    pub fn from_entries(
        donation_id: DonationId,
        entries: impl IntoIterator<Item = DonationEvent>,
    ) -> Self {
        let mut log = Self::new(donation_id);
        for entry in entries {
            log.append(entry);
        }
        log
    }

    /// Appends an entry. Returns `false` (and leaves the log as is) when the entry
    /// belongs to another donation.
    pub fn append(&mut self, event: DonationEvent) -> bool {
        if event.donation_id != self.donation_id {
            return false;
        }
        let at = self
            .entries
            .partition_point(|e| e.occurred_at <= event.occurred_at);
        self.entries.insert(at, event);
        true
    }

    pub fn donation_id(&self) -> DonationId {
        self.donation_id
    }

    pub fn entries(&self) -> &[DonationEvent] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &DonationEvent> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&DonationEvent> {
        self.entries.last()
    }

    pub fn into_entries(self) -> Vec<DonationEvent> {
        self.entries
    }
}
