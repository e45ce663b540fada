//! taskcache demo
//!
//! Runs the cache-then-queue flow against a synthetic workload and prints
//! the resulting stats and health reports as JSON.

use std::env;
use std::time::Duration;

use futures::future::join_all;
use serde_json::{json, Value};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskcache::{Config, QueueManager, SharedCache, TaskOptions, TtlTable};

/// Main entry point for the demo.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache (with its sweeper) and the queue manager
/// 4. Serve the workload twice so the second wave hits the cache
/// 5. Print stats and health, then shut both components down
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskcache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting taskcache demo");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_entries={}, default_ttl={:?}, max_concurrent={}, max_size={}",
        config.cache.max_entries,
        config.cache.default_ttl,
        config.queue.max_concurrent,
        config.queue.max_size
    );

    let cache: SharedCache = SharedCache::from_config(&config.cache);
    let manager = QueueManager::new(config.manager.clone());
    manager.create_queue("text", config.queue.clone())?;
    manager.create_queue("image", config.queue.clone().with_max_concurrent(1))?;

    let ttl_table = TtlTable::new(config.cache.default_ttl)
        .with_category("image", config.cache.default_ttl * 4);

    let requests: usize = env::var("DEMO_REQUESTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(24);

    let workload = async {
        for wave in 1..=2 {
            let served = join_all((0..requests).map(|i| {
                let kind = if i % 3 == 0 { "image" } else { "text" };
                serve_request(&cache, &manager, &ttl_table, kind, format!("prompt-{}", i % 8))
            }))
            .await;

            let failed = served.iter().filter(|result| result.is_err()).count();
            for err in served.iter().filter_map(|result| result.as_ref().err()) {
                warn!("Request failed: {}", err);
            }
            info!("Wave {} served {} requests ({} failed)", wave, requests, failed);
        }
    };

    tokio::select! {
        _ = workload => {}
        _ = signal::ctrl_c() => {
            warn!("Received Ctrl+C, stopping early");
        }
    }

    let report = json!({
        "queues": manager.stats(),
        "queueHealth": manager.check_health(),
        "cache": cache.stats().await,
        "cacheHealth": cache.check_health().await,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    manager.shutdown();
    cache.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

/// Looks up the fingerprint and, on a miss, computes the value through the
/// queue and stores it back with the TTL of its category.
async fn serve_request(
    cache: &SharedCache,
    manager: &QueueManager,
    ttl_table: &TtlTable,
    kind: &str,
    prompt: String,
) -> anyhow::Result<Value> {
    let fingerprint = format!("{}:{}", kind, prompt);
    if let Some(hit) = cache.get(&fingerprint).await {
        return Ok(hit);
    }

    let priority = if kind == "text" { 2 } else { 1 };
    let work_kind = kind.to_string();
    let handle = manager.add_task(
        kind,
        move || generate(work_kind.clone(), prompt.clone()),
        TaskOptions::default().with_priority(priority),
    )?;
    let value = handle.await?;

    let category = cache.categorize(&value).await;
    cache
        .set_with_ttl(fingerprint, value.clone(), ttl_table.ttl_for(&category))
        .await;
    Ok(value)
}

/// Stand-in for the content layer.
async fn generate(kind: String, prompt: String) -> anyhow::Result<Value> {
    tokio::time::sleep(Duration::from_millis(25)).await;
    Ok(json!({
        "type": kind,
        "prompt": prompt,
        "body": format!("{} result for '{}'", kind, prompt),
    }))
}
