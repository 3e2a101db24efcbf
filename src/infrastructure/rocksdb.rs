use crate::domain::campaign::{Campaign, CampaignId};
use crate::domain::donation::{Donation, DonationId, DonationStatus};
use crate::domain::event_log::{DonationEvent, EventLog};
use crate::domain::ports::{
    CampaignStore, DonationStore, EventLogStore, IdempotencyStore, InsertOutcome,
};
use crate::error::{StorageError, StoreResult};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const CF_CAMPAIGNS: &str = "campaigns";
pub const CF_DONATIONS: &str = "donations";
/// `(gateway_id, reference_number)` -> donation id.
pub const CF_DONATION_REFS: &str = "donation_refs";
/// `donation id ++ sequence` -> event, so a prefix scan yields one donation's history.
pub const CF_EVENTS: &str = "events";
pub const CF_IDEMPOTENCY: &str = "idempotency";

const COLUMN_FAMILIES: [&str; 5] = [
    CF_CAMPAIGNS,
    CF_DONATIONS,
    CF_DONATION_REFS,
    CF_EVENTS,
    CF_IDEMPOTENCY,
];

/// A persistent store implementation using RocksDB.
///
/// Implements every storage port on one database, one column family per
/// record kind. Writes that must land together (a donation and its reference
/// index, the compare-and-set on status) go through a `WriteBatch` under a
/// process-wide write lock.
///
/// `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at `path`, creating missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> StoreResult<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::Backend(format!("{name} column family not found")))
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> StoreResult<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan_json<T: DeserializeOwned>(&self, cf_name: &str, prefix: &[u8]) -> StoreResult<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut out = Vec::new();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }

    fn put_json<T: Serialize>(batch: &mut WriteBatch, cf: &ColumnFamily, key: &[u8], value: &T) -> StoreResult<()> {
        batch.put_cf(cf, key, serde_json::to_vec(value)?);
        Ok(())
    }
}

fn pair_key(first: &str, second: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(first.len() + second.len() + 1);
    key.extend_from_slice(first.as_bytes());
    key.push(0);
    key.extend_from_slice(second.as_bytes());
    key
}

#[async_trait]
impl DonationStore for RocksDBStore {
    async fn insert(&self, donation: Donation) -> StoreResult<InsertOutcome> {
        let _guard = self.write_lock.lock().await;
        let key = donation.id.0.to_be_bytes();
        let donations = self.cf(CF_DONATIONS)?;
        if self.db.get_pinned_cf(donations, key)?.is_some() {
            return Ok(InsertOutcome::DuplicateId);
        }

        let refs = self.cf(CF_DONATION_REFS)?;
        let ref_key = pair_key(&donation.gateway_id, &donation.reference_number);
        if let Some(existing) = self.db.get_pinned_cf(refs, &ref_key)? {
            let id = <[u8; 8]>::try_from(&existing[..])
                .map_err(|_| StorageError::Backend("corrupt donation_refs entry".into()))?;
            return Ok(InsertOutcome::DuplicateReference(DonationId(
                u64::from_be_bytes(id),
            )));
        }

        let mut batch = WriteBatch::default();
        Self::put_json(&mut batch, donations, &key, &donation)?;
        batch.put_cf(refs, ref_key, key);
        self.db.write(batch)?;
        Ok(InsertOutcome::Inserted)
    }

    async fn replace(&self, donation: Donation, expected: DonationStatus) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let key = donation.id.0.to_be_bytes();
        let current: Option<Donation> = self.get_json(CF_DONATIONS, &key)?;
        if current.map(|d| d.status()) != Some(expected) {
            return Ok(false);
        }
        let mut batch = WriteBatch::default();
        Self::put_json(&mut batch, self.cf(CF_DONATIONS)?, &key, &donation)?;
        self.db.write(batch)?;
        Ok(true)
    }

    async fn get(&self, id: DonationId) -> StoreResult<Option<Donation>> {
        self.get_json(CF_DONATIONS, &id.0.to_be_bytes())
    }

    async fn find_by_reference(
        &self,
        gateway_id: &str,
        reference_number: &str,
    ) -> StoreResult<Option<Donation>> {
        let refs = self.cf(CF_DONATION_REFS)?;
        let Some(id) = self
            .db
            .get_pinned_cf(refs, pair_key(gateway_id, reference_number))?
        else {
            return Ok(None);
        };
        self.get_json(CF_DONATIONS, &id)
    }

    async fn for_campaign(&self, campaign_id: CampaignId) -> StoreResult<Vec<Donation>> {
        let all: Vec<Donation> = self.scan_json(CF_DONATIONS, &[])?;
        Ok(all
            .into_iter()
            .filter(|d| d.campaign_id == campaign_id)
            .collect())
    }

    async fn all(&self) -> StoreResult<Vec<Donation>> {
        self.scan_json(CF_DONATIONS, &[])
    }
}

#[async_trait]
impl EventLogStore for RocksDBStore {
    async fn append(&self, event: DonationEvent) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let prefix = event.donation_id.0.to_be_bytes();
        let existing: Vec<DonationEvent> = self.scan_json(CF_EVENTS, &prefix)?;
        let sequence = existing.len() as u64;

        let mut key = prefix.to_vec();
        key.extend_from_slice(&sequence.to_be_bytes());

        let mut batch = WriteBatch::default();
        Self::put_json(&mut batch, self.cf(CF_EVENTS)?, &key, &event)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn history(&self, donation_id: DonationId) -> StoreResult<EventLog> {
        let entries: Vec<DonationEvent> =
            self.scan_json(CF_EVENTS, &donation_id.0.to_be_bytes())?;
        Ok(EventLog::from_entries(donation_id, entries))
    }
}

#[async_trait]
impl IdempotencyStore for RocksDBStore {
    async fn contains(&self, gateway_id: &str, key: &str) -> StoreResult<bool> {
        let cf = self.cf(CF_IDEMPOTENCY)?;
        Ok(self.db.get_pinned_cf(cf, pair_key(gateway_id, key))?.is_some())
    }

    async fn record(&self, gateway_id: &str, key: &str) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let cf = self.cf(CF_IDEMPOTENCY)?;
        let key = pair_key(gateway_id, key);
        if self.db.get_pinned_cf(cf, &key)?.is_some() {
            return Ok(false);
        }
        self.db.put_cf(cf, key, b"")?;
        Ok(true)
    }
}

#[async_trait]
impl CampaignStore for RocksDBStore {
    async fn store(&self, campaign: Campaign) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut batch = WriteBatch::default();
        Self::put_json(
            &mut batch,
            self.cf(CF_CAMPAIGNS)?,
            &campaign.id.0.to_be_bytes(),
            &campaign,
        )?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn get(&self, id: CampaignId) -> StoreResult<Option<Campaign>> {
        self.get_json(CF_CAMPAIGNS, &id.0.to_be_bytes())
    }

    async fn all(&self) -> StoreResult<Vec<Campaign>> {
        self.scan_json(CF_CAMPAIGNS, &[])
    }
}
