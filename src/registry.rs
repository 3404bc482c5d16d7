//! Metric registry with serialised submetric registration
//!
//! The registry owns every top-level metric behind its own lock. Deriving a
//! submetric takes that metric's write lock for the whole duplicate check and
//! append, so concurrent registrations on one metric can never both succeed
//! with colliding tag sets.

use crate::errors::{from_serde_json_error, metrics_config_error, MetricsError, MetricsResult};
use crate::metric::{parse_criteria, Metric};
use crate::parser::{join_tag_clauses, parse_metric_name};
use crate::types::{MetricType, Sample, ValueType};
use crate::utils::{format_tags, validate_metric_name};
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Shared handle to a registered metric
pub type MetricHandle = Arc<RwLock<Metric>>;

/// Configuration for the metrics registry
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
    /// Whether metric names are checked with [`validate_metric_name`]
    pub validate_names: bool,

    /// Upper bound on submetrics derived from a single metric
    pub max_submetrics_per_metric: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            validate_names: true,
            max_submetrics_per_metric: 1000,
        }
    }
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable metric name validation
    pub fn with_name_validation(mut self, validate: bool) -> Self {
        self.validate_names = validate;
        self
    }

    /// Set the maximum number of submetrics per metric
    pub fn with_max_submetrics(mut self, max: usize) -> Self {
        self.max_submetrics_per_metric = max;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_submetrics_per_metric == 0 {
            return Err(metrics_config_error(
                "max_submetrics_per_metric",
                "Maximum submetrics per metric must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Registry of named metrics
///
/// ## Example Usage
/// ```rust
/// use tyl_metrics_core::{MetricType, MetricsRegistry, RegistryConfig, ValueType};
///
/// # tokio_test::block_on(async {
/// let registry = MetricsRegistry::new(RegistryConfig::default()).unwrap();
/// registry
///     .new_metric("http_req_duration", MetricType::Trend, ValueType::Time)
///     .await
///     .unwrap();
///
/// let name = registry.resolve("http_req_duration{status:200}").await.unwrap();
/// assert_eq!(name, "http_req_duration{status:200}");
/// # });
/// ```
#[derive(Debug)]
pub struct MetricsRegistry {
    config: RegistryConfig,
    metrics: RwLock<HashMap<String, MetricHandle>>,
}

impl MetricsRegistry {
    /// Create a registry, rejecting invalid configuration
    pub fn new(config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            metrics: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a metric, or return the existing one if it has the same shape
    ///
    /// Fails with [`MetricsError::MetricConflict`] when `name` is already
    /// registered with a different type or value type.
    pub async fn new_metric(
        &self,
        name: &str,
        metric_type: MetricType,
        contains: ValueType,
    ) -> MetricsResult<MetricHandle> {
        if self.config.validate_names {
            validate_metric_name(name)?;
        }

        let mut metrics = self.metrics.write().await;

        if let Some(existing) = metrics.get(name) {
            let handle = existing.clone();
            let current = handle.read().await;
            if current.metric_type() != metric_type || current.contains() != contains {
                warn!(
                    "Metric {} redefined as {} ({}), already registered as {} ({})",
                    name,
                    metric_type,
                    contains,
                    current.metric_type(),
                    current.contains()
                );
                return Err(MetricsError::MetricConflict {
                    name: name.to_string(),
                    existing: format!("{} ({})", current.metric_type(), current.contains()),
                    requested: format!("{metric_type} ({contains})"),
                });
            }
            drop(current);
            return Ok(handle);
        }

        let handle = Arc::new(RwLock::new(Metric::new(name, metric_type, contains)));
        metrics.insert(name.to_string(), handle.clone());
        debug!("Registered {} metric {}", metric_type, name);

        Ok(handle)
    }

    /// Look up a registered metric
    pub async fn get(&self, name: &str) -> Option<MetricHandle> {
        self.metrics.read().await.get(name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.metrics.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.metrics.read().await.is_empty()
    }

    /// Names of all registered metrics, sorted
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.metrics.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Derive a submetric of `metric` and return its name
    pub async fn add_submetric(&self, metric: &str, criteria: &str) -> MetricsResult<String> {
        let handle = self.require(metric).await?;
        let mut parent = handle.write().await;
        self.add_locked(&mut parent, criteria)
    }

    /// Resolve a `name{tag:value,...}` expression to a metric or submetric name
    ///
    /// The base metric must already be registered. A submetric with an equal
    /// tag set is reused; otherwise one is derived on first reference.
    pub async fn resolve(&self, expr: &str) -> MetricsResult<String> {
        let (name, clauses) = parse_metric_name(expr)?;
        let handle = self.require(&name).await?;

        if clauses.is_empty() {
            return Ok(name);
        }

        let criteria = join_tag_clauses(&clauses);
        let mut parent = handle.write().await;

        if let Some(existing) = parent.find_submetric(&parse_criteria(criteria.trim())) {
            debug!("Reusing submetric {} for {}", existing.name(), expr);
            return Ok(existing.name().to_string());
        }

        self.add_locked(&mut parent, &criteria)
    }

    /// Route a sample to the metric named in it
    pub async fn ingest(&self, sample: &Sample) -> MetricsResult<()> {
        let handle = self.require(&sample.metric).await?;
        handle.write().await.ingest(sample);
        Ok(())
    }

    /// Serialise every metric along with its aggregated values
    pub async fn summary(&self, elapsed: Duration) -> Result<serde_json::Value> {
        let mut summary = serde_json::Map::new();

        for name in self.names().await {
            let Some(handle) = self.get(&name).await else {
                continue;
            };
            let metric = handle.read().await;

            let mut entry = serde_json::to_value(&*metric).map_err(from_serde_json_error)?;
            entry["values"] = serde_json::json!(metric.sink().format(elapsed));
            if let Some(subs) = entry["submetrics"].as_array_mut() {
                for (json, sm) in subs.iter_mut().zip(metric.submetrics()) {
                    json["values"] = serde_json::json!(sm.metric().sink().format(elapsed));
                }
            }

            summary.insert(name, entry);
        }

        Ok(serde_json::Value::Object(summary))
    }

    async fn require(&self, name: &str) -> MetricsResult<MetricHandle> {
        self.get(name).await.ok_or_else(|| MetricsError::UnknownMetric {
            name: name.to_string(),
        })
    }

    fn add_locked(&self, parent: &mut Metric, criteria: &str) -> MetricsResult<String> {
        let limit = self.config.max_submetrics_per_metric;
        if parent.submetrics().len() >= limit {
            return Err(MetricsError::TooManySubmetrics {
                metric: parent.name().to_string(),
                limit,
            });
        }

        let sub = parent.add_submetric(criteria)?;
        debug!(
            "Derived submetric {} filtering on {}",
            sub.name(),
            format_tags(sub.tags())
        );
        Ok(sub.name().to_string())
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self {
            config: RegistryConfig::default(),
            metrics: RwLock::new(HashMap::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SampleTags;
    use std::time::SystemTime;

    async fn registry_with_trend() -> MetricsRegistry {
        let registry = MetricsRegistry::default();
        registry
            .new_metric("http_req_duration", MetricType::Trend, ValueType::Time)
            .await
            .unwrap();
        registry
    }

    #[test]
    fn test_config_builder() {
        let config = RegistryConfig::new()
            .with_name_validation(false)
            .with_max_submetrics(5);

        assert!(!config.validate_names);
        assert_eq!(config.max_submetrics_per_metric, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let config = RegistryConfig::default().with_max_submetrics(0);
        assert!(config.validate().is_err());
        assert!(MetricsRegistry::new(config).is_err());
    }

    #[tokio::test]
    async fn test_new_metric_is_idempotent() {
        let registry = MetricsRegistry::default();
        let a = registry
            .new_metric("vus", MetricType::Gauge, ValueType::Default)
            .await
            .unwrap();
        let b = registry
            .new_metric("vus", MetricType::Gauge, ValueType::Default)
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_new_metric_conflict() {
        let registry = MetricsRegistry::default();
        registry
            .new_metric("vus", MetricType::Gauge, ValueType::Default)
            .await
            .unwrap();

        let err = registry
            .new_metric("vus", MetricType::Counter, ValueType::Default)
            .await
            .unwrap_err();
        assert!(matches!(err, MetricsError::MetricConflict { .. }));

        let err = registry
            .new_metric("vus", MetricType::Gauge, ValueType::Time)
            .await
            .unwrap_err();
        assert!(matches!(err, MetricsError::MetricConflict { .. }));
    }

    #[tokio::test]
    async fn test_name_validation() {
        let registry = MetricsRegistry::default();
        let err = registry
            .new_metric("bad name", MetricType::Counter, ValueType::Default)
            .await
            .unwrap_err();
        assert!(matches!(err, MetricsError::InvalidName { .. }));

        let lenient =
            MetricsRegistry::new(RegistryConfig::default().with_name_validation(false)).unwrap();
        assert!(lenient
            .new_metric("bad name", MetricType::Counter, ValueType::Default)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_names_sorted() {
        let registry = MetricsRegistry::default();
        assert!(registry.is_empty().await);
        for name in ["iterations", "checks", "vus"] {
            registry
                .new_metric(name, MetricType::Counter, ValueType::Default)
                .await
                .unwrap();
        }
        assert_eq!(registry.names().await, vec!["checks", "iterations", "vus"]);
    }

    #[tokio::test]
    async fn test_resolve_plain_name() {
        let registry = registry_with_trend().await;
        assert_eq!(
            registry.resolve("http_req_duration").await.unwrap(),
            "http_req_duration"
        );
    }

    #[tokio::test]
    async fn test_resolve_creates_then_reuses() {
        let registry = registry_with_trend().await;

        let first = registry
            .resolve("http_req_duration{status:200,method:GET}")
            .await
            .unwrap();
        let second = registry
            .resolve("http_req_duration{method:GET, status:200}")
            .await
            .unwrap();

        assert_eq!(first, "http_req_duration{status:200,method:GET}");
        assert_eq!(second, first);

        let handle = registry.get("http_req_duration").await.unwrap();
        assert_eq!(handle.read().await.submetrics().len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_errors() {
        let registry = registry_with_trend().await;

        let err = registry.resolve("http_req_duration{status}").await.unwrap_err();
        assert!(err.is_name_parsing());

        let err = registry.resolve("missing{status:200}").await.unwrap_err();
        assert_eq!(
            err,
            MetricsError::UnknownMetric {
                name: "missing".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_add_submetric_duplicate_via_registry() {
        let registry = registry_with_trend().await;
        registry
            .add_submetric("http_req_duration", "status:200")
            .await
            .unwrap();

        let err = registry
            .add_submetric("http_req_duration", "'status':'200'")
            .await
            .unwrap_err();
        assert!(matches!(err, MetricsError::DuplicateSubmetric { .. }));
    }

    #[tokio::test]
    async fn test_submetric_limit() {
        let registry = MetricsRegistry::new(RegistryConfig::default().with_max_submetrics(2))
            .unwrap();
        registry
            .new_metric("http_reqs", MetricType::Counter, ValueType::Default)
            .await
            .unwrap();

        registry.add_submetric("http_reqs", "status:200").await.unwrap();
        registry.add_submetric("http_reqs", "status:404").await.unwrap();
        let err = registry
            .add_submetric("http_reqs", "status:500")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            MetricsError::TooManySubmetrics {
                metric: "http_reqs".to_string(),
                limit: 2
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_registration_has_single_winner() {
        let registry = Arc::new(registry_with_trend().await);

        let tasks: Vec<_> = ["a:1,b:2", "b:2,a:1", "'a':'1', b:2", "b:2, a:\"1\""]
            .into_iter()
            .map(|criteria| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry.add_submetric("http_req_duration", criteria).await
                })
            })
            .collect();

        let mut successes = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        let handle = registry.get("http_req_duration").await.unwrap();
        assert_eq!(handle.read().await.submetrics().len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_and_summary() {
        let registry = MetricsRegistry::default();
        let handle = registry
            .new_metric("http_reqs", MetricType::Counter, ValueType::Default)
            .await
            .unwrap();
        registry.resolve("http_reqs{status:200}").await.unwrap();

        let tags: SampleTags = [("status", "200")].into_iter().collect();
        let sample = handle
            .read()
            .await
            .sample(SystemTime::now(), Arc::new(tags), 3.0);
        registry.ingest(&sample).await.unwrap();

        let summary = registry.summary(Duration::from_secs(1)).await.unwrap();
        assert_eq!(summary["http_reqs"]["type"], "counter");
        assert_eq!(summary["http_reqs"]["values"]["count"], 3.0);
        assert_eq!(
            summary["http_reqs"]["submetrics"][0]["name"],
            "http_reqs{status:200}"
        );
        assert_eq!(summary["http_reqs"]["submetrics"][0]["values"]["count"], 3.0);
    }

    #[tokio::test]
    async fn test_ingest_unknown_metric() {
        let registry = MetricsRegistry::default();
        let sample = Metric::new("orphan", MetricType::Rate, ValueType::Default).sample(
            SystemTime::now(),
            Arc::new(SampleTags::new()),
            1.0,
        );

        assert!(matches!(
            registry.ingest(&sample).await,
            Err(MetricsError::UnknownMetric { .. })
        ));
    }
}
