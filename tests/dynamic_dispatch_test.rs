use chrono::Utc;
use donation_engine::application::dispatcher::DispatchOutcome;
use donation_engine::application::engine::{DonationEngine, Stores};
use donation_engine::config::EngineConfig;
use donation_engine::domain::campaign::{Campaign, CampaignId};
use donation_engine::domain::donation::{Donation, DonationId, DonationStatus};
use donation_engine::domain::gateway::Notification;
use donation_engine::domain::money::{Currency, Money};
use donation_engine::domain::ports::{CampaignStore, CampaignStoreRef, DonationStore, DonationStoreRef};
use donation_engine::infrastructure::in_memory::{InMemoryCampaignStore, InMemoryDonationStore};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn usd() -> Currency {
    "USD".parse().unwrap()
}

#[tokio::test]
async fn test_stores_as_trait_objects() {
    let campaign_store: CampaignStoreRef = Arc::new(InMemoryCampaignStore::new());
    let donation_store: DonationStoreRef = Arc::new(InMemoryDonationStore::new());

    let donation = Donation::new(
        DonationId(1),
        CampaignId(1),
        Money::new(dec!(100), usd()).unwrap(),
        "stripe",
        None,
        Utc::now(),
    );

    // Verify Send + Sync by spawning tasks
    let cs_handle = tokio::spawn(async move {
        campaign_store.store(Campaign::new(CampaignId(1), usd())).await.unwrap();
        campaign_store.get(CampaignId(1)).await.unwrap().unwrap()
    });

    let ds_handle = tokio::spawn(async move {
        donation_store.insert(donation).await.unwrap();
        donation_store
            .find_by_reference("stripe", "DON-1-1")
            .await
            .unwrap()
            .unwrap()
    });

    let retrieved_campaign = cs_handle.await.unwrap();
    assert_eq!(retrieved_campaign.id, CampaignId(1));

    let retrieved_donation = ds_handle.await.unwrap();
    assert_eq!(retrieved_donation.id, DonationId(1));
}

async fn shared_engine() -> Arc<DonationEngine> {
    let engine = DonationEngine::new(Stores::in_memory(), &EngineConfig::default()).unwrap();
    engine
        .register_campaign(
            Campaign::new(CampaignId(1), usd())
                .with_goal(Money::new(dec!(100), usd()).unwrap())
                .unwrap(),
        )
        .await
        .unwrap();
    engine
        .submit_donation(Donation::new(
            DonationId(1),
            CampaignId(1),
            Money::new(dec!(60), usd()).unwrap(),
            "bank_transfer",
            None,
            Utc::now(),
        ))
        .await
        .unwrap();
    Arc::new(engine)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_completions_apply_once() {
    let engine = shared_engine().await;

    // Distinct keys, so the idempotency store does not short-circuit the race.
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move {
                let body = format!(
                    r#"{{"reference":"DON-1-1","status":"completed","action_id":"a{i}"}}"#
                );
                engine
                    .handle_notification("bank_transfer", &Notification::new(body))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut applied = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            DispatchOutcome::Applied(_) => applied += 1,
            DispatchOutcome::Conflict { from, to } => {
                assert_eq!((from, to), (DonationStatus::Completed, DonationStatus::Completed));
                conflicts += 1;
            }
            DispatchOutcome::Duplicate => panic!("keys are distinct"),
        }
    }
    assert_eq!(applied, 1);
    assert_eq!(conflicts, 15);

    assert_eq!(engine.history(DonationId(1)).await.unwrap().len(), 1);
    let snapshot = engine.snapshot(CampaignId(1), Utc::now()).await.unwrap();
    assert_eq!(snapshot.raised_amount.amount(), dec!(60));
    assert_eq!(snapshot.donation_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_redeliveries_of_one_key() {
    let engine = shared_engine().await;
    let notification =
        Notification::new(r#"{"reference":"DON-1-1","status":"completed","action_id":"same"}"#);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            let notification = notification.clone();
            tokio::spawn(async move {
                engine
                    .handle_notification("bank_transfer", &notification)
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut applied = 0;
    for handle in handles {
        if let DispatchOutcome::Applied(_) = handle.await.unwrap() {
            applied += 1;
        }
    }
    assert_eq!(applied, 1);
    assert_eq!(engine.history(DonationId(1)).await.unwrap().len(), 1);
}
