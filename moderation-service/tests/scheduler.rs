mod common;

use chrono::Utc;
use common::*;
use commentguard_core::ModerationError;
use moderation_service::BackgroundService;
use std::sync::Arc;
use std::time::Duration;

fn fake_with_fresh_spam() -> FakeGraph {
    FakeGraph::with_pages(vec![page("1", "Bakery")])
        .with_posts("1", &["1_10"])
        .with_comments("1_10", vec![comment("c1", Some("spam"), Utc::now())])
}

#[tokio::test]
async fn test_polling_interval_follows_lookback() {
    let api = Arc::new(FakeGraph::default());
    let service = BackgroundService::from_config(api, config(None, 3, "spam"));

    assert_eq!(service.polling_interval(), Duration::from_secs(180));
}

#[tokio::test]
async fn test_run_once_returns_summary() {
    let api = Arc::new(fake_with_fresh_spam());
    let service = BackgroundService::from_config(api.clone(), config(None, 5, "spam"));

    let summary = service.run_once().await.unwrap();

    assert_eq!(summary.comments_hidden, 1);
    assert_eq!(api.hidden_ids(), vec!["c1".to_string()]);
}

#[tokio::test]
async fn test_run_once_surfaces_resolution_abort() {
    let api = Arc::new(FakeGraph::with_pages(vec![page("1", "A")]));
    let service = BackgroundService::from_config(api, config(Some("missing"), 5, "spam"));

    let result = service.run_once().await;

    assert!(matches!(result, Err(ModerationError::PageNotFound { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_cycles_repeat_until_shutdown() {
    let api = Arc::new(fake_with_fresh_spam());
    let service = BackgroundService::from_config(api.clone(), config(None, 1, "spam"));

    // Ticks at 0s, 60s and 120s fall before the shutdown at 150s.
    let cycles = service
        .run_until(tokio::time::sleep(Duration::from_secs(150)))
        .await;

    assert_eq!(cycles, 3);
    assert_eq!(api.list_calls.lock().unwrap().len(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_aborted_cycles_do_not_stop_the_loop() {
    let mut fake = FakeGraph::with_pages(vec![page("1", "A")]);
    fake.reject_account = true;
    let service = BackgroundService::from_config(Arc::new(fake), config(None, 1, "spam"));

    let cycles = service
        .run_until(tokio::time::sleep(Duration::from_secs(90)))
        .await;

    assert_eq!(cycles, 2);
}

#[tokio::test(start_paused = true)]
async fn test_cycle_in_flight_finishes_before_shutdown() {
    let mut fake = fake_with_fresh_spam();
    fake.hide_delay = Some(Duration::from_secs(30));
    let api = Arc::new(fake);
    let service = BackgroundService::from_config(api.clone(), config(None, 1, "spam"));

    // Shutdown fires at 10s while the first cycle's hide runs until 30s.
    let cycles = service
        .run_until(tokio::time::sleep(Duration::from_secs(10)))
        .await;

    assert_eq!(cycles, 1);
    assert_eq!(api.hidden_ids(), vec!["c1".to_string()]);
}
