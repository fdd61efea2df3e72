mod common;

use bytes::Bytes;
use chrono::Duration;
use common::*;
use sensorvault_pipeline::{JobState, Trigger};
use sensorvault_source::MemorySource;
use sensorvault_storage::ObjectSink;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
async fn test_manual_trigger_archives_trailing_hours() {
    let sink = memory_sink();
    let service = service(three_sensor_source(), sink.clone(), options(3600, 60))
        .with_clock(Arc::new(|| hour(2024, 1, 1, 1)));

    let result = service.manual_trigger(1).await.unwrap();

    assert_eq!(result.state, JobState::Done);
    assert_eq!(result.record_count, 3);
    assert_eq!(result.window, first_hour_2024());

    let names: Vec<String> = sink
        .list(CONTAINER, None, None)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.name)
        .collect();
    for ext in ["json", "csv", "parquet"] {
        assert!(names.contains(&format!("hourly/20240101_000000.{ext}")));
    }

    let state = service.state();
    assert_eq!(state.cycles_completed, 1);
    assert_eq!(state.cumulative_file_count, 3);
    assert_eq!(state.last_cycle.unwrap().trigger, Trigger::Manual);
}

#[tokio::test]
async fn test_start_twice_is_rejected() {
    let service = service(
        Arc::new(MemorySource::new()),
        memory_sink(),
        options(3600, 60),
    );

    service.start().await.unwrap();
    assert!(service.is_running());
    let err = service.start().await.unwrap_err();
    assert_eq!(err.error_type(), "AlreadyRunning");

    assert!(service.stop().await);
    assert!(!service.is_running());

    service.start().await.unwrap();
    assert!(service.stop().await);
}

#[tokio::test]
async fn test_start_requires_reachable_sink() {
    let service = service(
        Arc::new(MemorySource::new()),
        Arc::new(FaultySink::unreachable()),
        options(3600, 60),
    );

    let err = service.start().await.unwrap_err();

    assert_eq!(err.error_type(), "StorageUnavailable");
    assert!(!service.is_running());
}

#[tokio::test]
async fn test_manual_trigger_rejected_while_job_in_flight() {
    let source = Arc::new(GatedSource::new());
    let service = Arc::new(service(source.clone(), memory_sink(), options(3600, 60)));

    let first = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.manual_trigger(1).await }
    });
    source.entered.notified().await;

    let err = service.manual_trigger(1).await.unwrap_err();
    assert_eq!(err.error_type(), "JobInProgress");

    source.release(1);
    let result = first.await.unwrap().unwrap();
    assert!(result.is_done());

    source.release(1);
    assert!(service.manual_trigger(1).await.is_ok());
    assert_eq!(source.queries.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_scheduled_cycle_holds_the_job_lock() {
    let source = Arc::new(GatedSource::new());
    let service = service(source.clone(), memory_sink(), options(60, 10));

    service.start().await.unwrap();
    source.entered.notified().await;

    let err = service.manual_trigger(1).await.unwrap_err();
    assert_eq!(err.error_type(), "JobInProgress");

    source.release(1);
    wait_for(|| service.state().last_cycle.is_some()).await;

    let cycle = service.state().last_cycle.unwrap();
    assert_eq!(cycle.trigger, Trigger::Scheduled);
    assert_eq!(cycle.result.window.duration(), Duration::seconds(60));
    assert!(cycle.result.is_done());

    assert!(service.stop().await);
    assert!(!service.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_failed_cycle_is_recorded_and_loop_keeps_cadence() {
    let service = service(Arc::new(DownSource), memory_sink(), options(60, 10));
    service.start().await.unwrap();

    tokio::time::sleep(std::time::Duration::from_secs(61)).await;
    let state = service.state();
    assert_eq!(state.cycles_failed, 1);
    let cycle = state.last_cycle.unwrap();
    assert_eq!(cycle.result.state, JobState::Failed);
    assert_eq!(cycle.result.error.unwrap().error_type, "SourceUnavailable");

    // Ordinary failures wait a full interval, not the cool-down.
    tokio::time::sleep(std::time::Duration::from_secs(10)).await;
    assert_eq!(service.state().cycles_failed, 1);

    tokio::time::sleep(std::time::Duration::from_secs(50)).await;
    assert_eq!(service.state().cycles_failed, 2);
    assert!(service.is_running());

    assert!(service.stop().await);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_job_is_aborted_and_retried_after_cooldown() {
    let service = service(Arc::new(PanickingSource), memory_sink(), options(60, 10));
    service.start().await.unwrap();

    tokio::time::sleep(std::time::Duration::from_secs(61)).await;
    let state = service.state();
    assert!(state.running);
    assert_eq!(state.cycles_failed, 1);
    let result = state.last_cycle.unwrap().result;
    assert!(result.is_aborted());
    assert!(result.error.unwrap().message.contains("source exploded"));

    tokio::time::sleep(std::time::Duration::from_secs(10)).await;
    assert_eq!(service.state().cycles_failed, 2);

    assert!(service.stop().await);
}

#[tokio::test(start_paused = true)]
async fn test_stop_waits_for_in_flight_job_up_to_timeout() {
    let source = Arc::new(GatedSource::new());
    let service = service(source.clone(), memory_sink(), options(60, 10));

    service.start().await.unwrap();
    source.entered.notified().await;

    assert!(!service.stop().await);
    assert!(service.is_running());

    source.release(1);
    wait_for(|| !service.is_running()).await;
    assert_eq!(service.state().cycles_completed, 1);
    assert_eq!(source.queries.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_stop_keeps_reporting_in_flight_job() {
    let source = Arc::new(GatedSource::new());
    let service = service(source.clone(), memory_sink(), options(10, 5));

    service.start().await.unwrap();
    source.entered.notified().await;

    assert!(!service.stop().await);
    assert!(!service.stop().await);
    assert!(service.is_running());

    source.release(1);
    assert!(service.stop().await);
    assert!(!service.is_running());
    assert!(service.stop().await);
}

#[tokio::test]
async fn test_status_lists_newest_archives_first() {
    let sink = memory_sink();
    sink.ensure_container(CONTAINER).await.unwrap();
    sink.put(
        CONTAINER,
        "hourly/20231231_230000.json",
        Bytes::from_static(b"[]"),
        "application/json",
    )
    .await
    .unwrap();
    sink.put(
        CONTAINER,
        "daily/20231231_000000.json",
        Bytes::from_static(b"[]"),
        "application/json",
    )
    .await
    .unwrap();

    let service = service(three_sensor_source(), sink, options(3600, 60))
        .with_clock(Arc::new(|| hour(2024, 1, 1, 1)));
    service.manual_trigger(1).await.unwrap();

    let status = service.get_status().await;

    assert!(!status.running);
    assert!(status.sink_connected);
    assert!(status.source_connected);
    assert_eq!(status.source_backend, "memory");
    assert_eq!(status.interval_secs, 3600);
    assert_eq!(status.total_file_count, Some(4));
    let recent: Vec<&str> = status.recent_files.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(
        recent,
        vec!["hourly/20240101_000000.parquet", "hourly/20240101_000000.json"]
    );
    assert_eq!(status.cumulative_file_count, 3);
    assert_eq!(status.cycles_completed, 1);
    assert!(status.error.is_none());
}

#[tokio::test]
async fn test_status_reports_unreachable_sink() {
    let service = service(
        Arc::new(DownSource),
        Arc::new(FaultySink::unreachable()),
        options(3600, 60),
    );

    let status = service.get_status().await;

    assert!(!status.sink_connected);
    assert!(!status.source_connected);
    assert!(status.recent_files.is_empty());
    assert_eq!(status.total_file_count, None);
    assert_eq!(status.error.unwrap().error_type, "StorageUnavailable");
}

#[tokio::test]
async fn test_status_does_not_wait_for_running_job() {
    let source = Arc::new(GatedSource::new());
    let service = Arc::new(service(source.clone(), memory_sink(), options(3600, 60)));

    let job = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.manual_trigger(1).await }
    });
    source.entered.notified().await;

    let status = tokio::time::timeout(std::time::Duration::from_secs(5), service.get_status())
        .await
        .expect("status blocked on the running job");
    assert!(status.last_cycle.is_none());

    source.release(1);
    assert!(job.await.unwrap().unwrap().is_done());
}
