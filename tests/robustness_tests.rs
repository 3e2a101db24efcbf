mod common;

use assert_cmd::prelude::*;
use common::*;
use predicates::prelude::*;
use std::io::Write;

#[test]
fn test_malformed_csv_handling() -> Result<(), Box<dyn std::error::Error>> {
    let campaigns = csv_file(
        &CAMPAIGN_HEADER,
        &[
            &["1", "USD", "100", "", ""],
            // Invalid currency code
            &["2", "DOLLARS", "100", "", ""],
            // Negative goal
            &["3", "USD", "-5", "", ""],
        ],
    )?;
    let donations = csv_file(
        &DONATION_HEADER,
        &[
            &["1", "1", "10", "USD", "bank_transfer", ""],
            // Text in amount field
            &["2", "1", "ten", "USD", "bank_transfer", ""],
            // Negative amount
            &["3", "1", "-10", "USD", "bank_transfer", ""],
            &["4", "1", "5", "USD", "bank_transfer", ""],
        ],
    )?;
    let notifications = jsonl_file(&[
        bank_confirmation("DON-1-1", "completed"),
        bank_confirmation("DON-1-4", "completed"),
    ])?;

    engine_command(campaigns.path(), donations.path())
        .arg("--notifications")
        .arg(notifications.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Error reading campaign"))
        .stderr(predicate::str::contains("Error reading donation"))
        .stdout(predicate::str::contains("1,USD,15,100,15,2,unlimited"))
        .stdout(predicate::str::contains("2,USD").not())
        .stdout(predicate::str::contains("3,USD").not());

    Ok(())
}

#[test]
fn test_donations_are_checked_against_campaigns() -> Result<(), Box<dyn std::error::Error>> {
    let campaigns = csv_file(&CAMPAIGN_HEADER, &[&["1", "USD", "100", "", ""]])?;
    let donations = csv_file(
        &DONATION_HEADER,
        &[
            // Unknown campaign
            &["1", "9", "10", "USD", "bank_transfer", ""],
            // Wrong currency
            &["2", "1", "10", "EUR", "bank_transfer", ""],
            &["3", "1", "10", "USD", "bank_transfer", ""],
            // Duplicate id
            &["3", "1", "99", "USD", "bank_transfer", ""],
        ],
    )?;
    let notifications = jsonl_file(&[bank_confirmation("DON-1-3", "completed")])?;

    engine_command(campaigns.path(), donations.path())
        .arg("--notifications")
        .arg(notifications.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Error processing donation: Campaign not found: 9"))
        .stderr(predicate::str::contains("Currency mismatch"))
        .stderr(predicate::str::contains("Donation 3 already exists"))
        .stdout(predicate::str::contains("1,USD,10,100,10,1,unlimited"));

    Ok(())
}

#[test]
fn test_bad_notifications_do_not_stop_the_run() -> Result<(), Box<dyn std::error::Error>> {
    let (campaigns, donations) = scenario_inputs()?;
    let mut notifications = tempfile::NamedTempFile::new()?;
    writeln!(notifications, "this is not json")?;
    writeln!(notifications, r#"{{"gateway":"bitcoin","body":{{}}}}"#)?;
    writeln!(notifications, r#"{{"gateway":"stripe","body":"{{}}"}}"#)?;
    writeln!(
        notifications,
        r#"{{"gateway":"bank_transfer","body":{{"reference":"DON-404","status":"completed"}}}}"#
    )?;
    writeln!(
        notifications,
        r#"{{"gateway":"bank_transfer","body":{{"reference":"DON-1-2","status":"on-hold"}}}}"#
    )?;
    writeln!(
        notifications,
        r#"{{"gateway":"bank_transfer","body":{{"reference":"DON-1-2","status":"completed"}}}}"#
    )?;
    notifications.flush()?;

    engine_command(campaigns.path(), donations.path())
        .arg("--notifications")
        .arg(notifications.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Error reading notification"))
        .stderr(predicate::str::contains("Unknown gateway: bitcoin"))
        .stderr(predicate::str::contains("Unknown gateway: stripe"))
        .stderr(predicate::str::contains("No donation with reference"))
        .stderr(predicate::str::contains("Unmappable gateway status: on-hold"))
        .stdout(predicate::str::contains("1,USD,300,1000,30,1,2"));

    Ok(())
}

#[test]
fn test_missing_input_file_fails() {
    engine_command(
        std::path::Path::new("does_not_exist.csv"),
        std::path::Path::new("does_not_exist_either.csv"),
    )
    .assert()
    .failure();
}
