//! Basic usage example for TYL Metrics Core
//!
//! Registers a few metrics, derives submetrics from tag filter expressions,
//! routes samples through them and prints the resulting summary.

use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tyl_metrics_core::{
    parse_metric_name, MetricType, MetricsError, MetricsRegistry, RegistryConfig, SampleTags,
    ValueType,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🚀 TYL Metrics Core - Basic Usage Example");
    println!("==========================================");

    let registry = MetricsRegistry::new(RegistryConfig::default().with_max_submetrics(16))?;

    let duration = registry
        .new_metric("http_req_duration", MetricType::Trend, ValueType::Time)
        .await?;
    registry
        .new_metric("http_reqs", MetricType::Counter, ValueType::Default)
        .await?;

    // Example 1: Parsing name expressions
    println!("\n🔎 Parsing metric name expressions...");
    for expr in ["http_reqs", "http_req_duration{status:200,method:GET}"] {
        let (name, tags) = parse_metric_name(expr)?;
        println!("  {expr} -> name={name} tags={tags:?}");
    }
    match parse_metric_name("http_reqs{status:200") {
        Err(e) if e.is_name_parsing() => println!("  rejected: {e}"),
        other => println!("  unexpected: {other:?}"),
    }

    // Example 2: Deriving submetrics
    println!("\n🧩 Resolving submetrics...");
    for expr in [
        "http_req_duration{status:200}",
        "http_req_duration{status:200,method:GET}",
        "http_req_duration{method:GET,status:200}",
        "http_reqs{status:500}",
    ] {
        println!("  {expr} -> {}", registry.resolve(expr).await?);
    }

    match registry
        .add_submetric("http_req_duration", "'method':'GET', status:200")
        .await
    {
        Err(MetricsError::DuplicateSubmetric { existing, .. }) => {
            println!("  duplicate of {existing}")
        }
        other => println!("  unexpected: {other:?}"),
    }

    // Example 3: Routing samples
    println!("\n📈 Routing samples...");
    for (status, method, millis) in [
        ("200", "GET", 120.0),
        ("200", "POST", 340.0),
        ("500", "GET", 15.0),
        ("200", "GET", 80.0),
    ] {
        let tags: SampleTags = [("status", status), ("method", method)].into_iter().collect();
        let tags = Arc::new(tags);
        let now = SystemTime::now();

        let sample = duration.read().await.sample(now, tags.clone(), millis);
        registry.ingest(&sample).await?;

        let reqs = registry.get("http_reqs").await.ok_or("http_reqs missing")?;
        let sample = reqs.read().await.sample(now, tags, 1.0);
        registry.ingest(&sample).await?;
    }

    // Example 4: Summary
    println!("\n📋 Summary:");
    let summary = registry.summary(Duration::from_secs(1)).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
