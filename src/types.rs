//! Core domain types for metrics collection
//!
//! These are the value objects that flow between metric definitions, sinks and
//! the registry: metric kinds, value classifications, tag sets and samples.

use crate::errors::{MetricsError, MetricsResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;
use std::time::SystemTime;

/// Enumeration of supported metric kinds
///
/// The kind is fixed when a metric is created and decides which sink
/// aggregates its samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// Counter - Cumulative sum of observed values (requests, bytes sent)
    Counter,

    /// Gauge - Last observed value, tracking min and max (active VUs)
    Gauge,

    /// Trend - Statistical distribution of values (request durations)
    Trend,

    /// Rate - Share of non-zero samples (check pass ratio)
    Rate,
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricType::Counter => write!(f, "counter"),
            MetricType::Gauge => write!(f, "gauge"),
            MetricType::Trend => write!(f, "trend"),
            MetricType::Rate => write!(f, "rate"),
        }
    }
}

impl FromStr for MetricType {
    type Err = MetricsError;

    fn from_str(s: &str) -> MetricsResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "counter" => Ok(MetricType::Counter),
            "gauge" => Ok(MetricType::Gauge),
            "trend" => Ok(MetricType::Trend),
            "rate" => Ok(MetricType::Rate),
            _ => Err(MetricsError::UnsupportedKind {
                kind: s.to_string(),
            }),
        }
    }
}

impl TryFrom<&str> for MetricType {
    type Error = MetricsError;

    fn try_from(value: &str) -> MetricsResult<Self> {
        value.parse()
    }
}

/// What a sampled value represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Plain number
    #[default]
    Default,

    /// Duration in milliseconds
    Time,

    /// Data volume in bytes
    Data,
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueType::Default => write!(f, "default"),
            ValueType::Time => write!(f, "time"),
            ValueType::Data => write!(f, "data"),
        }
    }
}

impl FromStr for ValueType {
    type Err = MetricsError;

    fn from_str(s: &str) -> MetricsResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(ValueType::Default),
            "time" => Ok(ValueType::Time),
            "data" => Ok(ValueType::Data),
            _ => Err(MetricsError::UnsupportedKind {
                kind: s.to_string(),
            }),
        }
    }
}

/// An unordered set of tag key/value pairs
///
/// Equality ignores insertion order: two sets are equal when they hold the
/// same keys mapped to the same values.
///
/// ## Example Usage
/// ```rust
/// use tyl_metrics_core::SampleTags;
///
/// let a: SampleTags = [("status", "200"), ("method", "GET")].into_iter().collect();
/// let b: SampleTags = [("method", "GET"), ("status", "200")].into_iter().collect();
/// assert!(a.is_equal(&b));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleTags {
    tags: BTreeMap<String, String>,
}

impl SampleTags {
    /// Create an empty tag set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tag set from a key/value mapping
    pub fn from_map(raw: &HashMap<String, String>) -> Self {
        raw.iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    /// Order-independent equality
    pub fn is_equal(&self, other: &SampleTags) -> bool {
        self.tags == other.tags
    }

    /// Whether every tag of `subset` is present here with the same value
    pub fn contains_all(&self, subset: &SampleTags) -> bool {
        subset
            .tags
            .iter()
            .all(|(k, v)| self.tags.get(k) == Some(v))
    }

    /// Get the value of a tag
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterate tags in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for SampleTags
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            tags: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, String>> for SampleTags {
    fn from(raw: HashMap<String, String>) -> Self {
        Self {
            tags: raw.into_iter().collect(),
        }
    }
}

/// A single observation attributed to a metric
///
/// Samples are immutable records. They carry the producing metric's name
/// rather than a reference to it, so they can be freely cloned and sent
/// across threads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// When the observation was made
    pub time: SystemTime,

    /// Tags classifying the observation
    pub tags: Arc<SampleTags>,

    /// The observed value
    pub value: f64,

    /// Name of the metric that produced this sample
    pub metric: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_types_display() {
        assert_eq!(MetricType::Counter.to_string(), "counter");
        assert_eq!(MetricType::Gauge.to_string(), "gauge");
        assert_eq!(MetricType::Trend.to_string(), "trend");
        assert_eq!(MetricType::Rate.to_string(), "rate");
    }

    #[test]
    fn test_metric_type_from_str() {
        assert_eq!("trend".parse::<MetricType>().unwrap(), MetricType::Trend);
        assert_eq!(" Rate ".parse::<MetricType>().unwrap(), MetricType::Rate);
        assert_eq!(
            MetricType::try_from("histogram"),
            Err(MetricsError::UnsupportedKind {
                kind: "histogram".to_string()
            })
        );
    }

    #[test]
    fn test_value_type_default_and_parse() {
        assert_eq!(ValueType::default(), ValueType::Default);
        assert_eq!("time".parse::<ValueType>().unwrap(), ValueType::Time);
        assert!("seconds".parse::<ValueType>().is_err());
    }

    #[test]
    fn test_kinds_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&MetricType::Gauge).unwrap(), "\"gauge\"");
        assert_eq!(serde_json::to_string(&ValueType::Data).unwrap(), "\"data\"");
    }

    #[test]
    fn test_sample_tags_order_independent() {
        let mut raw = HashMap::new();
        raw.insert("b".to_string(), "2".to_string());
        raw.insert("a".to_string(), "1".to_string());

        let from_map = SampleTags::from_map(&raw);
        let collected: SampleTags = [("a", "1"), ("b", "2")].into_iter().collect();

        assert!(from_map.is_equal(&collected));
        assert_eq!(from_map, collected);
        assert_eq!(from_map.get("a"), Some("1"));
        assert_eq!(from_map.len(), 2);
    }

    #[test]
    fn test_sample_tags_differ_on_value() {
        let a: SampleTags = [("status", "200")].into_iter().collect();
        let b: SampleTags = [("status", "404")].into_iter().collect();
        assert!(!a.is_equal(&b));
    }

    #[test]
    fn test_sample_tags_contains_all() {
        let sample: SampleTags = [("status", "200"), ("method", "GET"), ("url", "/")]
            .into_iter()
            .collect();
        let filter: SampleTags = [("method", "GET"), ("status", "200")].into_iter().collect();
        let other: SampleTags = [("method", "POST")].into_iter().collect();

        assert!(sample.contains_all(&filter));
        assert!(sample.contains_all(&SampleTags::new()));
        assert!(!sample.contains_all(&other));
        assert!(!filter.contains_all(&sample));
    }

    #[test]
    fn test_sample_tags_serialize_as_object() {
        let tags: SampleTags = [("status", "200")].into_iter().collect();
        assert_eq!(serde_json::to_string(&tags).unwrap(), r#"{"status":"200"}"#);
    }
}
