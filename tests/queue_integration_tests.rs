//! Integration Tests for the Queue Manager
//!
//! Ordering, concurrency, capacity, retry and timeout behaviour through the
//! public API.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use taskcache::{ManagerConfig, QueueConfig, QueueError, QueueManager, TaskOptions};
use tokio::sync::Semaphore;

// == Helper Functions ==

fn manager() -> QueueManager {
    QueueManager::new(ManagerConfig::default().with_retry_base_delay(Duration::from_millis(10)))
}

fn single_lane(manager: &QueueManager, name: &str) {
    manager
        .create_queue(name, QueueConfig::default().with_max_concurrent(1))
        .unwrap();
}

/// Submits a task that records `label` when it runs.
fn submit_recording(
    manager: &QueueManager,
    queue: &str,
    log: &Arc<Mutex<Vec<String>>>,
    label: &str,
    priority: i32,
) -> taskcache::TaskHandle<()> {
    let log = log.clone();
    let label = label.to_string();
    manager
        .add_task(
            queue,
            move || {
                let log = log.clone();
                let label = label.clone();
                async move {
                    log.lock().unwrap().push(label);
                    anyhow::Ok(())
                }
            },
            TaskOptions::default().with_priority(priority),
        )
        .unwrap()
}

/// Submits a task that blocks until `gate` hands out a permit.
fn submit_gated(
    manager: &QueueManager,
    queue: &str,
    gate: &Arc<Semaphore>,
) -> taskcache::TaskHandle<()> {
    let gate = gate.clone();
    manager
        .add_task(
            queue,
            move || {
                let gate = gate.clone();
                async move {
                    let _permit = gate.acquire().await?;
                    anyhow::Ok(())
                }
            },
            TaskOptions::default(),
        )
        .unwrap()
}

// == Ordering ==

#[tokio::test]
async fn test_dispatch_follows_priority() {
    let manager = manager();
    single_lane(&manager, "text");
    let log = Arc::new(Mutex::new(Vec::new()));

    let handles = vec![
        submit_recording(&manager, "text", &log, "1", 1),
        submit_recording(&manager, "text", &log, "5", 5),
        submit_recording(&manager, "text", &log, "3", 3),
    ];
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(*log.lock().unwrap(), vec!["5", "3", "1"]);
}

#[tokio::test]
async fn test_equal_priority_runs_in_submission_order() {
    let manager = manager();
    single_lane(&manager, "text");
    let log = Arc::new(Mutex::new(Vec::new()));

    let handles = vec![
        submit_recording(&manager, "text", &log, "first", 4),
        submit_recording(&manager, "text", &log, "second", 4),
        submit_recording(&manager, "text", &log, "urgent", 9),
        submit_recording(&manager, "text", &log, "third", 4),
    ];
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(
        *log.lock().unwrap(),
        vec!["urgent", "first", "second", "third"]
    );
}

// == Concurrency ==

#[tokio::test]
async fn test_running_never_exceeds_max_concurrent() {
    let manager = manager();
    manager
        .create_queue("image", QueueConfig::default().with_max_concurrent(2))
        .unwrap();

    let gate = Arc::new(Semaphore::new(0));
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let (gate, current, peak) = (gate.clone(), current.clone(), peak.clone());
        handles.push(
            manager
                .add_task(
                    "image",
                    move || {
                        let (gate, current, peak) = (gate.clone(), current.clone(), peak.clone());
                        async move {
                            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            let _permit = gate.acquire().await?;
                            current.fetch_sub(1, Ordering::SeqCst);
                            anyhow::Ok(())
                        }
                    },
                    TaskOptions::default(),
                )
                .unwrap(),
        );
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(current.load(Ordering::SeqCst), 2);
    let stats = manager.queue_stats("image").unwrap();
    assert_eq!(stats.running, 2);
    assert_eq!(stats.pending, 8);

    gate.add_permits(10);
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(peak.load(Ordering::SeqCst), 2);
    assert_eq!(manager.queue_stats("image").unwrap().completed, 10);
}

// == Capacity ==

#[tokio::test]
async fn test_full_backlog_rejects_immediately() {
    let manager = manager();
    manager
        .create_queue(
            "text",
            QueueConfig::default().with_max_concurrent(1).with_max_size(2),
        )
        .unwrap();
    let gate = Arc::new(Semaphore::new(0));

    let running = submit_gated(&manager, "text", &gate);
    tokio::time::sleep(Duration::from_millis(20)).await;
    let queued_a = submit_gated(&manager, "text", &gate);
    let queued_b = submit_gated(&manager, "text", &gate);

    let err = manager
        .add_task("text", || async { anyhow::Ok(()) }, TaskOptions::default())
        .unwrap_err();
    assert!(matches!(err, QueueError::QueueFull { capacity: 2, .. }));

    let stats = manager.queue_stats("text").unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.running, 1);

    gate.add_permits(3);
    running.await.unwrap();
    queued_a.await.unwrap();
    queued_b.await.unwrap();
}

// == Retries ==

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let manager = manager();
    manager.create_queue("text", QueueConfig::default()).unwrap();
    let attempts = Arc::new(AtomicU32::new(0));

    let counter = attempts.clone();
    let handle = manager
        .add_task(
            "text",
            move || {
                let counter = counter.clone();
                async move {
                    let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if attempt <= 2 {
                        anyhow::bail!("transient failure {}", attempt);
                    }
                    Ok("done")
                }
            },
            TaskOptions::default().with_retry_attempts(3),
        )
        .unwrap();

    assert_eq!(handle.await.unwrap(), "done");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    let stats = manager.queue_stats("text").unwrap();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn test_retries_exhausted_after_all_attempts() {
    let manager = manager();
    manager.create_queue("text", QueueConfig::default()).unwrap();
    let attempts = Arc::new(AtomicU32::new(0));

    let counter = attempts.clone();
    let handle = manager
        .add_task(
            "text",
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(anyhow::anyhow!("provider down"))
                }
            },
            TaskOptions::default().with_retry_attempts(2),
        )
        .unwrap();

    let err = handle.await.unwrap_err();
    match err {
        QueueError::RetryExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert_eq!(last.to_string(), "provider down");
        }
        other => panic!("expected RetryExhausted, got {:?}", other),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(manager.queue_stats("text").unwrap().failed, 1);
}

#[tokio::test]
async fn test_retry_backoff_is_linear() {
    let manager = QueueManager::new(
        ManagerConfig::default().with_retry_base_delay(Duration::from_millis(40)),
    );
    manager.create_queue("text", QueueConfig::default()).unwrap();

    let started = Instant::now();
    let handle = manager
        .add_task(
            "text",
            || async { Err::<(), _>(anyhow::anyhow!("nope")) },
            TaskOptions::default().with_retry_attempts(2),
        )
        .unwrap();
    assert!(handle.await.is_err());

    // 40ms after the first failure, 80ms after the second
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(120), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(400), "elapsed {:?}", elapsed);
}

// == Timeouts ==

#[tokio::test]
async fn test_timeout_rejects_at_deadline() {
    let manager = manager();
    manager.create_queue("image", QueueConfig::default()).unwrap();

    let started = Instant::now();
    let handle = manager
        .add_task(
            "image",
            || async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                anyhow::Ok(())
            },
            TaskOptions::default()
                .with_timeout(Duration::from_millis(100))
                .with_retry_attempts(0),
        )
        .unwrap();

    let err = handle.await.unwrap_err();
    let elapsed = started.elapsed();

    match &err {
        QueueError::RetryExhausted { attempts: 1, last } => {
            assert!(matches!(**last, QueueError::TaskTimeout(t) if t == Duration::from_millis(100)));
        }
        other => panic!("expected RetryExhausted, got {:?}", other),
    }
    assert!(err.is_timeout());
    assert!(elapsed >= Duration::from_millis(100), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(400), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn test_failure_without_retries_is_still_wrapped() {
    let manager = manager();
    manager.create_queue("text", QueueConfig::default()).unwrap();

    let handle = manager
        .add_task(
            "text",
            || async { Err::<(), _>(anyhow::anyhow!("x")) },
            TaskOptions::default().with_retry_attempts(0),
        )
        .unwrap();

    match handle.await.unwrap_err() {
        QueueError::RetryExhausted { attempts, last } => {
            assert_eq!(attempts, 1);
            assert_eq!(last.to_string(), "x");
        }
        other => panic!("expected RetryExhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_panicking_task_does_not_stall_queue() {
    let manager = manager();
    single_lane(&manager, "text");

    let panicking = manager
        .add_task(
            "text",
            || async {
                if true {
                    panic!("boom");
                }
                anyhow::Ok(0)
            },
            TaskOptions::default().with_retry_attempts(0),
        )
        .unwrap();
    let follow_up = manager
        .add_task("text", || async { anyhow::Ok(7) }, TaskOptions::default())
        .unwrap();

    assert!(matches!(panicking.await, Err(QueueError::RetryExhausted { .. })));
    let value = tokio::time::timeout(Duration::from_millis(500), follow_up)
        .await
        .expect("follow-up task should complete")
        .unwrap();
    assert_eq!(value, 7);

    let stats = manager.queue_stats("text").unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.running, 0);
}

#[tokio::test]
async fn test_timeouts_count_as_failed_attempts() {
    let manager = manager();
    manager.create_queue("image", QueueConfig::default()).unwrap();

    let handle = manager
        .add_task(
            "image",
            || async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                anyhow::Ok(())
            },
            TaskOptions::default()
                .with_timeout(Duration::from_millis(20))
                .with_retry_attempts(1),
        )
        .unwrap();

    let err = handle.await.unwrap_err();
    assert!(matches!(err, QueueError::RetryExhausted { attempts: 2, .. }));
    assert!(err.is_timeout());
}

// == Stats and Health ==

#[tokio::test]
async fn test_health_check_is_idempotent() {
    let manager = manager();
    manager.create_queue("text", QueueConfig::default()).unwrap();
    manager
        .add_task("text", || async { anyhow::Ok(()) }, TaskOptions::default())
        .unwrap()
        .await
        .unwrap();

    let first = manager.check_health();
    let stats_after_first = manager.stats();
    let second = manager.check_health();
    let stats_after_second = manager.stats();

    assert_eq!(first.healthy, second.healthy);
    assert_eq!(first.issues, second.issues);
    assert_eq!(stats_after_first, stats_after_second);
}

#[tokio::test]
async fn test_stats_serialize_with_contract_names() {
    let manager = manager();
    manager.create_queue("text", QueueConfig::default()).unwrap();

    let json = serde_json::to_value(manager.stats()).unwrap();
    assert!(json["global"].get("avgWaitTime").is_some());
    assert!(json["queues"]["text"].get("avgExecutionTime").is_some());
}
