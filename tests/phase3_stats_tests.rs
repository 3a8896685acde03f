mod common;

use std::sync::Arc;
use std::time::Duration;

use callgate::error::CallError;
use callgate::stats::{StatsAggregator, MAX_INTERVAL};
use callgate::{OverflowPolicy, Pipeline, PipelineConfig, StatusCode};
use common::{call_as, channel_sink, wait_until, CountingHandler, POLICY};
use serde_json::json;
use tokio::time::timeout;

#[tokio::test(start_paused = true)]
async fn test_burst_is_counted_in_one_window_then_reset() {
    let stats = StatsAggregator::new(PipelineConfig::default());
    let mut subscription = stats.subscribe(Duration::from_secs(5));

    // 1. Burst of 40 calls inside the first window (more than the buffer holds)
    for _ in 0..40 {
        stats.record_call("X", "A").await;
    }

    // 2. First snapshot carries the whole burst
    let snapshot = subscription.recv().await.expect("first window");
    assert_eq!(snapshot.by_method.get("A"), Some(&40));
    assert_eq!(snapshot.by_consumer.get("X"), Some(&40));
    assert_eq!(snapshot.by_method.len(), 1);

    // 3. Counters were reset: the next window is empty
    let quiet = subscription.recv().await.expect("second window");
    assert!(quiet.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_subscriptions_keep_their_own_windows() {
    let stats = StatsAggregator::new(PipelineConfig::default());
    let mut fast = stats.subscribe(Duration::from_secs(1));
    let mut slow = stats.subscribe(Duration::from_secs(3));

    // 1. One call per fast window
    stats.record_call("X", "A").await;
    let first = fast.recv().await.expect("fast window");
    assert_eq!(first.total_calls(), 1);

    stats.record_call("Y", "B").await;
    let second = fast.recv().await.expect("fast window");
    assert_eq!(second.by_consumer.get("Y"), Some(&1));
    assert_eq!(second.by_consumer.get("X"), None);

    // 2. The slow window saw both calls
    let combined = slow.recv().await.expect("slow window");
    assert_eq!(combined.total_calls(), 2);
    assert_eq!(combined.by_method.get("A"), Some(&1));
    assert_eq!(combined.by_method.get("B"), Some(&1));
}

#[tokio::test(start_paused = true)]
async fn test_disposed_subscription_stops_and_is_pruned() {
    let stats = StatsAggregator::new(PipelineConfig::default());
    let mut subscription = stats.subscribe(Duration::from_secs(1));
    assert_eq!(stats.subscriber_count(), 1);

    // 1. Dispose: window loop stops, channel closes
    subscription.dispose();
    wait_until(|| !subscription.is_running()).await;
    assert!(subscription.recv().await.is_none());

    // 2. Next notice finds the closed entry and prunes it
    stats.record_call("X", "A").await;
    assert_eq!(stats.subscriber_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_drop_newest_never_stalls_recording() {
    let config = PipelineConfig {
        subscriber_buffer: 1,
        overflow: OverflowPolicy::DropNewest,
    };
    let stats = StatsAggregator::new(config);
    let mut subscription = stats.subscribe(Duration::from_secs(1));

    // 1. Five calls back to back. The window loop has not run yet, so only
    //    the first notice fits in the buffer; the rest are dropped.
    for _ in 0..5 {
        let recorded = timeout(Duration::from_millis(10), stats.record_call("X", "A")).await;
        assert!(recorded.is_ok(), "record_call must not block");
    }

    // 2. Nobody reads snapshots for several windows. The first snapshot fills
    //    the buffer, later ones are dropped by the window loop.
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    assert!(subscription.is_running());

    // 3. Recording still never blocks while snapshots sit unread
    let recorded = timeout(Duration::from_millis(10), stats.record_call("Y", "B")).await;
    assert!(recorded.is_ok(), "record_call must not block");

    // 4. The buffered snapshot holds only the delivered notice
    let first = subscription.recv().await.expect("buffered snapshot");
    assert_eq!(first.total_calls(), 1);
    assert_eq!(first.by_consumer.get("X"), Some(&1));

    // 5. Dropped empty windows are gone; the next one has the later call
    let next = subscription.recv().await.expect("next snapshot");
    assert_eq!(next.total_calls(), 1);
    assert_eq!(next.by_consumer.get("Y"), Some(&1));
}

#[tokio::test(start_paused = true)]
async fn test_oversized_interval_is_clamped() {
    let stats = StatsAggregator::new(PipelineConfig::default());

    // Duration::MAX would overflow the timer deadline
    let subscription = stats.subscribe(Duration::MAX);
    assert_eq!(subscription.interval(), MAX_INTERVAL);

    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(subscription.is_running(), "window loop must survive");
}

#[tokio::test(start_paused = true)]
async fn test_pipeline_counts_only_authorized_calls() {
    let pipeline = Pipeline::new(POLICY, PipelineConfig::default()).expect("pipeline");
    let mut subscription = pipeline.stats().subscribe(Duration::from_secs(2));
    let handler = CountingHandler::default();

    // 1. Three allowed calls, one denied
    for _ in 0..3 {
        pipeline
            .unary(&call_as("biz_user", "/main.Biz/Check"), json!({}), &handler)
            .await
            .expect("allowed");
    }
    let _ = pipeline
        .unary(&call_as("biz_user", "/main.Biz/Test"), json!({}), &handler)
        .await;

    // 2. Denied call never reaches the stats layer
    let snapshot = subscription.recv().await.expect("window");
    assert_eq!(snapshot.by_method.get("/main.Biz/Check"), Some(&3));
    assert_eq!(snapshot.by_method.get("/main.Biz/Test"), None);
    assert_eq!(snapshot.by_consumer.get("biz_user"), Some(&3));
}

#[tokio::test(start_paused = true)]
async fn test_observe_stats_streams_snapshots() {
    let pipeline = Arc::new(Pipeline::new(POLICY, PipelineConfig::default()).expect("pipeline"));
    let admin_call = call_as("stat", "/main.Admin/Statistics");
    let cancel = admin_call.cancel.clone();
    let (mut sink, mut items) = channel_sink();

    // 1. Start the admin stream with a 2s window
    let driver = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            let handler = pipeline.observe_stats();
            pipeline
                .stream(&admin_call, json!({ "interval_seconds": 2 }), &mut sink, &handler)
                .await
        })
    };
    let stats = pipeline.stats();
    wait_until(|| stats.subscriber_count() == 1).await;

    // 2. Two business calls from different consumers
    let handler = CountingHandler::default();
    pipeline
        .unary(&call_as("biz_user", "/main.Biz/Add"), json!({}), &handler)
        .await
        .expect("allowed");
    pipeline
        .unary(&call_as("biz_admin", "/main.Biz/Add"), json!({}), &handler)
        .await
        .expect("allowed");

    // 3. Client sees the window as JSON, then an empty one
    let item = items.recv().await.expect("snapshot");
    assert_eq!(item["by_method"]["/main.Biz/Add"], 2);
    assert_eq!(item["by_consumer"]["biz_user"], 1);
    assert_eq!(item["by_consumer"]["biz_admin"], 1);

    let quiet = items.recv().await.expect("empty snapshot");
    assert_eq!(quiet["by_method"], json!({}));

    // 4. Client goes away: driver ends cleanly
    cancel.cancel();
    driver.await.expect("join").expect("stream ends cleanly");
}

#[tokio::test]
async fn test_observe_stats_rejects_bad_intervals() {
    let pipeline = Pipeline::new(POLICY, PipelineConfig::default()).expect("pipeline");
    let handler = pipeline.observe_stats();
    let call = call_as("stat", "/main.Admin/Statistics");

    // Zero, out of range and malformed requests all fail before subscribing
    for request in [
        json!({ "interval_seconds": 0 }),
        json!({ "interval_seconds": u64::MAX }),
        json!({ "interval_seconds": MAX_INTERVAL.as_secs() + 1 }),
        json!({ "interval": "soon" }),
    ] {
        let (mut sink, _items) = channel_sink();
        let err = pipeline
            .stream(&call, request, &mut sink, &handler)
            .await
            .expect_err("invalid interval");
        assert!(matches!(err, CallError::InvalidArgument(_)));
        assert_eq!(err.code(), StatusCode::InvalidArgument);
    }
    assert_eq!(pipeline.stats().subscriber_count(), 0);
}

#[tokio::test]
async fn test_shutdown_refuses_calls_and_ends_admin_streams() {
    let pipeline = Arc::new(Pipeline::new(POLICY, PipelineConfig::default()).expect("pipeline"));
    let (mut sink, _items) = channel_sink();

    // 1. Long-window admin stream
    let driver = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            let handler = pipeline.observe_stats();
            let call = call_as("stat", "/main.Admin/Statistics");
            pipeline
                .stream(&call, json!({ "interval_seconds": 60 }), &mut sink, &handler)
                .await
        })
    };
    let stats = pipeline.stats();
    wait_until(|| stats.subscriber_count() == 1).await;

    // 2. Shutdown ends the stream well before its first window
    pipeline.shutdown();
    let ended = timeout(Duration::from_secs(1), driver).await;
    ended.expect("driver stops").expect("join").expect("clean end");

    // 3. New calls are refused
    let refused = pipeline
        .unary(&call_as("biz_user", "/main.Biz/Check"), json!({}), &CountingHandler::default())
        .await;
    assert!(matches!(refused, Err(CallError::Unavailable)));
}
