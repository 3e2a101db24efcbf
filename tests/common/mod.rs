#![allow(dead_code)]

use assert_cmd::cargo_bin;
use serde_json::Value;
use std::io::{Error, Write};
use std::path::Path;
use std::process::Command;
use tempfile::NamedTempFile;

pub const CAMPAIGN_HEADER: [&str; 5] = ["id", "currency", "goal", "start_date", "end_date"];
pub const DONATION_HEADER: [&str; 6] = ["id", "campaign", "amount", "currency", "gateway", "reference"];

/// Fixed reference time used by CLI runs.
pub const NOW: &str = "2024-06-01T00:00:00Z";

pub fn csv_file(header: &[&str], rows: &[&[&str]]) -> Result<NamedTempFile, Error> {
    let file = NamedTempFile::new()?;
    let mut wtr = csv::WriterBuilder::new().from_path(file.path())?;
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(*row)?;
    }
    wtr.flush()?;
    Ok(file)
}

pub fn jsonl_file(lines: &[Value]) -> Result<NamedTempFile, Error> {
    let mut file = NamedTempFile::new()?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    file.flush()?;
    Ok(file)
}

/// Campaign 1: USD, goal 1000, ends 2.5 days after `NOW`.
/// Donations 1..=3 of 400, 300 and 300 via bank transfer.
pub fn scenario_inputs() -> Result<(NamedTempFile, NamedTempFile), Error> {
    let campaigns = csv_file(
        &CAMPAIGN_HEADER,
        &[&["1", "USD", "1000", "2024-05-01", "2024-06-03T12:00:00Z"]],
    )?;
    let donations = csv_file(
        &DONATION_HEADER,
        &[
            &["1", "1", "400", "USD", "bank_transfer", ""],
            &["2", "1", "300", "USD", "bank_transfer", ""],
            &["3", "1", "300", "USD", "bank_transfer", ""],
        ],
    )?;
    Ok((campaigns, donations))
}

pub fn bank_confirmation(reference: &str, status: &str) -> Value {
    serde_json::json!({
        "gateway": "bank_transfer",
        "body": { "reference": reference, "status": status },
    })
}

pub fn engine_command(campaigns: &Path, donations: &Path) -> Command {
    let mut cmd = Command::new(cargo_bin!("donation-engine"));
    cmd.arg("--campaigns")
        .arg(campaigns)
        .arg("--donations")
        .arg(donations)
        .arg("--now")
        .arg(NOW)
        .env_remove("STRIPE_WEBHOOK_SECRET")
        .env_remove("PAYPAL_RECEIVER_EMAIL")
        .env_remove("PAYPAL_IPN_VERIFY_URL");
    cmd
}
