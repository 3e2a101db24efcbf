//! Application layer orchestrating the donation domain.
//!
//! `DonationEngine` is the entry point: it owns the `Lifecycle` (every status
//! change), the `Dispatcher` (verified, de-duplicated gateway notifications)
//! and the `CampaignAggregator` (funding snapshots backed by the
//! `SnapshotCache`). Side effects of transitions reach listeners through the
//! `ListenerRegistry`.

pub mod aggregator;
pub mod dispatcher;
pub mod engine;
pub mod lifecycle;
pub mod listeners;
pub mod snapshot_cache;
