//! Metrics and their tag-filtered submetrics
//!
//! A [`Metric`] owns its [`Submetric`]s, and each submetric owns the backing
//! metric that accumulates the samples matching its tags. Links pointing back
//! up the tree (submetric to parent, backing metric to submetric) are stored
//! as names and never own anything.

use crate::errors::{MetricsError, MetricsResult};
use crate::sink::{new_sink, Sink};
use crate::types::{MetricType, Sample, SampleTags, ValueType};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

/// A named, typed series of observations
///
/// ## Example Usage
/// ```rust
/// use tyl_metrics_core::{Metric, MetricType, ValueType};
///
/// let mut metric = Metric::new("http_req_duration", MetricType::Trend, ValueType::Time);
/// let sub = metric.add_submetric("status:200").unwrap();
/// assert_eq!(sub.name(), "http_req_duration{status:200}");
/// assert!(metric.add_submetric(" status : 200 ").is_err());
/// ```
#[derive(Debug, Serialize)]
pub struct Metric {
    name: String,

    #[serde(rename = "type")]
    metric_type: MetricType,

    contains: ValueType,

    tainted: Option<bool>,

    thresholds: Vec<String>,

    submetrics: Vec<Submetric>,

    #[serde(skip)]
    sub: Option<SubmetricLink>,

    #[serde(skip)]
    sink: Box<dyn Sink>,

    #[serde(skip)]
    observed: bool,
}

impl Metric {
    /// Create a metric with the sink matching its kind
    pub fn new(name: impl Into<String>, metric_type: MetricType, contains: ValueType) -> Self {
        Self {
            name: name.into(),
            metric_type,
            contains,
            tainted: None,
            thresholds: Vec::new(),
            submetrics: Vec::new(),
            sub: None,
            sink: new_sink(metric_type),
            observed: false,
        }
    }

    /// Create a metric from a textual kind such as `"trend"`
    ///
    /// Fails with [`MetricsError::UnsupportedKind`] when no sink exists for `kind`.
    pub fn from_kind_name(
        name: impl Into<String>,
        kind: &str,
        contains: ValueType,
    ) -> MetricsResult<Self> {
        let metric_type = kind.parse::<MetricType>()?;
        Ok(Self::new(name, metric_type, contains))
    }

    /// Build a sample attributed to this metric
    pub fn sample(&self, time: SystemTime, tags: Arc<SampleTags>, value: f64) -> Sample {
        Sample {
            time,
            tags,
            value,
            metric: self.name.clone(),
        }
    }

    /// Derive a submetric from `key:value` criteria and append it
    ///
    /// Criteria are a comma separated list of `key:value` pairs. Keys and values
    /// are trimmed and may be wrapped in one layer of matching single or double
    /// quotes. A key without a colon gets an empty value, and a repeated key
    /// keeps its last value.
    ///
    /// Fails without modifying the metric when the criteria are empty or denote
    /// the same tag set as an existing submetric.
    pub fn add_submetric(&mut self, key_values: &str) -> MetricsResult<&Submetric> {
        let key_values = key_values.trim();
        if key_values.is_empty() {
            return Err(MetricsError::EmptyCriteria {
                metric: self.name.clone(),
            });
        }

        let tags = parse_criteria(key_values);

        if let Some(existing) = self.find_submetric(&tags) {
            return Err(MetricsError::DuplicateSubmetric {
                criteria: key_values.to_string(),
                metric: self.name.clone(),
                existing: existing.name.clone(),
            });
        }

        let name = format!("{}{{{}}}", self.name, key_values);
        let mut backing = Metric::new(name.clone(), self.metric_type, self.contains);
        backing.sub = Some(SubmetricLink {
            parent: self.name.clone(),
            submetric: name.clone(),
        });

        self.submetrics.push(Submetric {
            name,
            suffix: key_values.to_string(),
            tags: Arc::new(tags),
            metric: Box::new(backing),
            parent: self.name.clone(),
        });

        Ok(&self.submetrics[self.submetrics.len() - 1])
    }

    /// Find the submetric whose tag set equals `tags`
    pub fn find_submetric(&self, tags: &SampleTags) -> Option<&Submetric> {
        self.submetrics.iter().find(|sm| sm.tags.is_equal(tags))
    }

    /// Aggregate a sample into this metric and every submetric it matches
    pub fn ingest(&mut self, sample: &Sample) {
        self.sink.add(sample);
        self.observed = true;

        for sm in &mut self.submetrics {
            if sample.tags.contains_all(&sm.tags) {
                sm.metric.ingest(sample);
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    pub fn contains(&self) -> ValueType {
        self.contains
    }

    /// Submetrics in creation order
    pub fn submetrics(&self) -> &[Submetric] {
        &self.submetrics
    }

    /// Set only on the backing metric of a submetric
    pub fn submetric_link(&self) -> Option<&SubmetricLink> {
        self.sub.as_ref()
    }

    pub fn sink(&self) -> &dyn Sink {
        self.sink.as_ref()
    }

    pub fn is_observed(&self) -> bool {
        self.observed
    }

    pub fn tainted(&self) -> Option<bool> {
        self.tainted
    }

    pub fn set_tainted(&mut self, tainted: bool) {
        self.tainted = Some(tainted);
    }

    /// Threshold source expressions attached to this metric
    pub fn thresholds(&self) -> &[String] {
        &self.thresholds
    }

    pub fn add_threshold(&mut self, source: impl Into<String>) {
        self.thresholds.push(source.into());
    }
}

/// A tag-filtered view over a parent metric
#[derive(Debug, Serialize)]
pub struct Submetric {
    name: String,

    suffix: String,

    tags: Arc<SampleTags>,

    #[serde(skip)]
    metric: Box<Metric>,

    #[serde(skip)]
    parent: String,
}

impl Submetric {
    /// Parent name followed by the criteria in braces
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The criteria exactly as they appear in the name
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn tags(&self) -> &Arc<SampleTags> {
        &self.tags
    }

    /// The metric accumulating samples routed to this submetric
    pub fn metric(&self) -> &Metric {
        &self.metric
    }

    /// Name of the owning metric
    pub fn parent(&self) -> &str {
        &self.parent
    }
}

/// Back-reference from a backing metric to the submetric it serves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmetricLink {
    pub parent: String,
    pub submetric: String,
}

pub(crate) fn parse_criteria(key_values: &str) -> SampleTags {
    let mut raw = HashMap::new();

    for kv in key_values.split(',') {
        if kv.is_empty() {
            continue;
        }
        match kv.split_once(':') {
            Some((key, value)) => {
                raw.insert(unquote(key.trim()), unquote(value.trim()));
            }
            None => {
                raw.insert(unquote(kv.trim()), String::new());
            }
        }
    }

    SampleTags::from(raw)
}

/// Strip one layer of matching `'` or `"` quotes
fn unquote(s: &str) -> String {
    for quote in ['"', '\''] {
        if let Some(inner) = s
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.to_string();
        }
    }
    s.to_string()
}
