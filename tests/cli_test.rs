mod common;

use assert_cmd::prelude::*;
use common::*;
use predicates::prelude::*;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let (campaigns, donations) = scenario_inputs()?;
    let notifications = jsonl_file(&[
        bank_confirmation("DON-1-1", "completed"),
        bank_confirmation("DON-1-3", "completed"),
    ])?;

    let mut cmd = engine_command(campaigns.path(), donations.path());
    cmd.arg("--notifications").arg(notifications.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "campaign,currency,raised,goal,percentage,donations,days_left",
        ))
        .stdout(predicate::str::contains("1,USD,700,1000,70,2,2"));

    Ok(())
}

#[test]
fn test_cli_without_notifications_reports_zero() -> Result<(), Box<dyn std::error::Error>> {
    let (campaigns, donations) = scenario_inputs()?;

    engine_command(campaigns.path(), donations.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1,USD,0,1000,0,0,2"));

    Ok(())
}

#[test]
fn test_cli_days_left_states() -> Result<(), Box<dyn std::error::Error>> {
    let campaigns = csv_file(
        &CAMPAIGN_HEADER,
        &[
            &["1", "EUR", "", "", ""],
            &["2", "EUR", "50", "2024-07-01", "2024-08-01"],
            &["3", "EUR", "50", "2024-01-01", "2024-02-01"],
        ],
    )?;
    let donations = csv_file(&DONATION_HEADER, &[])?;

    engine_command(campaigns.path(), donations.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1,EUR,0,,0,0,unlimited"))
        .stdout(predicate::str::contains("2,EUR,0,50,0,0,not_started"))
        .stdout(predicate::str::contains("3,EUR,0,50,0,0,ended"));

    Ok(())
}

#[test]
fn test_cli_manual_override_and_events_out() -> Result<(), Box<dyn std::error::Error>> {
    let (campaigns, donations) = scenario_inputs()?;
    let notifications = jsonl_file(&[
        bank_confirmation("DON-1-1", "completed"),
        serde_json::json!({
            "gateway": "manual",
            "body": { "donation": 1, "status": "refunded", "note": "donor request" },
        }),
        // Arrives after the refund: rejected as a conflict.
        serde_json::json!({
            "gateway": "bank_transfer",
            "body": { "reference": "DON-1-1", "status": "completed", "action_id": "late" },
        }),
    ])?;
    let events = tempfile::NamedTempFile::new()?;

    engine_command(campaigns.path(), donations.path())
        .arg("--notifications")
        .arg(notifications.path())
        .arg("--events-out")
        .arg(events.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1,USD,0,1000,0,0,2"))
        .stderr(predicate::str::contains("conflicting notification ignored"));

    let written = std::fs::read_to_string(events.path())?;
    let rows: Vec<_> = written.lines().collect();
    assert_eq!(rows[0], "donation,occurred_at,event,status,gateway,note");
    assert_eq!(rows.len(), 3);
    assert!(rows[1].contains("Payment completed,completed,bank_transfer"));
    assert!(rows[2].contains("Donation refunded,refunded,manual,donor request"));

    Ok(())
}

#[test]
fn test_cli_stripe_webhook() -> Result<(), Box<dyn std::error::Error>> {
    let campaigns = csv_file(&CAMPAIGN_HEADER, &[&["5", "USD", "200", "", ""]])?;
    let donations = csv_file(
        &DONATION_HEADER,
        &[&["1", "5", "50", "USD", "stripe", "cs_test_1"]],
    )?;

    let body = r#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"payment_status":"paid","metadata":{"donation_reference":"cs_test_1"}}}}"#;
    let timestamp = chrono::Utc::now().timestamp();
    let header = donation_engine::infrastructure::gateways::stripe::signature_header(
        "whsec_cli",
        timestamp,
        body.as_bytes(),
    )?;
    let notifications = jsonl_file(&[serde_json::json!({
        "gateway": "stripe",
        "headers": { "Stripe-Signature": header },
        "body": body,
    })])?;

    engine_command(campaigns.path(), donations.path())
        .env("STRIPE_WEBHOOK_SECRET", "whsec_cli")
        .arg("--notifications")
        .arg(notifications.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("5,USD,50,200,25,1,unlimited"));

    Ok(())
}
