use chrono::{DateTime, Utc};
use clap::Parser;
use donation_engine::application::engine::{DonationEngine, Stores};
use donation_engine::config::EngineConfig;
use donation_engine::interfaces::csv::event_writer::EventWriter;
use donation_engine::interfaces::csv::record_reader::RecordReader;
use donation_engine::interfaces::csv::records::{CampaignRecord, DonationRecord};
use donation_engine::interfaces::csv::snapshot_writer::SnapshotWriter;
use donation_engine::interfaces::jsonl::notification_reader::{
    InboundNotification, NotificationReader,
};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Campaigns CSV file (id, currency, goal, start_date, end_date)
    #[arg(long)]
    campaigns: PathBuf,

    /// Donations CSV file (id, campaign, amount, currency, gateway, reference)
    #[arg(long)]
    donations: PathBuf,

    /// Gateway notifications, one JSON object per line
    #[arg(long)]
    notifications: Option<PathBuf>,

    /// Write every donation's event history to this CSV file
    #[arg(long)]
    events_out: Option<PathBuf>,

    /// Reference time for days-left computation (RFC 3339). Defaults to now.
    #[arg(long)]
    now: Option<DateTime<Utc>>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[cfg(feature = "storage-rocksdb")]
fn persistent_stores(db_path: PathBuf) -> Result<Stores> {
    let store = donation_engine::infrastructure::rocksdb::RocksDBStore::open(db_path)
        .into_diagnostic()?;
    Ok(Stores::rocksdb(store))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn persistent_stores(_db_path: PathBuf) -> Result<Stores> {
    eprintln!(
        "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
    );
    Ok(Stores::in_memory())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let config = EngineConfig::from_env().into_diagnostic()?;
    let stores = match cli.db_path {
        Some(db_path) => persistent_stores(db_path)?,
        None => Stores::in_memory(),
    };
    let engine = DonationEngine::new(stores, &config).into_diagnostic()?;
    let now = cli.now.unwrap_or_else(Utc::now);

    // Campaigns
    let file = File::open(&cli.campaigns).into_diagnostic()?;
    for record in RecordReader::new(file).records::<CampaignRecord>() {
        match record.and_then(CampaignRecord::into_campaign) {
            Ok(campaign) => {
                if let Err(e) = engine.register_campaign(campaign).await {
                    eprintln!("Error processing campaign: {}", e);
                }
            }
            Err(e) => eprintln!("Error reading campaign: {}", e),
        }
    }

    // Donations
    let file = File::open(&cli.donations).into_diagnostic()?;
    for record in RecordReader::new(file).records::<DonationRecord>() {
        match record.and_then(|r| r.into_donation(now)) {
            Ok(donation) => {
                if let Err(e) = engine.submit_donation(donation).await {
                    eprintln!("Error processing donation: {}", e);
                }
            }
            Err(e) => eprintln!("Error reading donation: {}", e),
        }
    }

    // Notifications
    if let Some(path) = &cli.notifications {
        let file = File::open(path).into_diagnostic()?;
        for inbound in NotificationReader::new(BufReader::new(file)).notifications() {
            match inbound {
                Ok(InboundNotification::Gateway {
                    gateway_id,
                    notification,
                }) => match engine.handle_notification(&gateway_id, &notification).await {
                    Ok(outcome) => {
                        tracing::debug!(gateway = %gateway_id, ?outcome, "notification handled")
                    }
                    Err(e) => tracing::warn!(
                        gateway = %gateway_id,
                        retryable = e.is_retryable(),
                        "notification failed: {e}"
                    ),
                },
                Ok(InboundNotification::Manual {
                    donation_id,
                    status,
                    note,
                }) => {
                    if let Err(e) = engine.manual_override(donation_id, status, note).await {
                        tracing::warn!(donation = %donation_id, "manual override failed: {e}");
                    }
                }
                Err(e) => eprintln!("Error reading notification: {}", e),
            }
        }
    }

    // Output final state
    let snapshots = engine.snapshots(now).await.into_diagnostic()?;
    SnapshotWriter::new(io::stdout().lock())
        .write_snapshots(&snapshots)
        .into_diagnostic()?;

    if let Some(path) = &cli.events_out {
        let mut writer = EventWriter::new(File::create(path).into_diagnostic()?);
        for donation in engine.donations().await.into_diagnostic()? {
            let log = engine.history(donation.id).await.into_diagnostic()?;
            writer.write_log(&log).into_diagnostic()?;
        }
        writer.flush().into_diagnostic()?;
    }

    Ok(())
}
